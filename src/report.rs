use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

use crate::providers::gitlab::{GitLabMergeRequest, GitLabProject, StateFilter};

/// Merge requests grouped by project.
#[derive(Debug, Serialize, Deserialize)]
pub struct MergeRequestReport {
    pub instance: String,
    pub filter: StateFilter,
    pub generated_at: DateTime<Utc>,
    pub projects: Vec<ProjectReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectReport {
    pub id: u64,
    pub name: String,
    pub path_with_namespace: String,
    pub merge_requests: Vec<GitLabMergeRequest>,
}

impl MergeRequestReport {
    /// Builds a report from projects paired with their merge requests.
    ///
    /// Input order is kept. Merge requests the filter rejects are dropped,
    /// and so is any project left without merge requests.
    pub fn build(
        instance: impl Into<String>,
        filter: StateFilter,
        entries: Vec<(GitLabProject, Vec<GitLabMergeRequest>)>,
    ) -> Self {
        let projects = entries
            .into_iter()
            .filter_map(|(project, merge_requests)| {
                let merge_requests: Vec<_> = merge_requests
                    .into_iter()
                    .filter(|mr| filter.matches(&mr.state))
                    .collect();

                (!merge_requests.is_empty()).then(|| ProjectReport {
                    id: project.id,
                    name: project.name,
                    path_with_namespace: project.path_with_namespace,
                    merge_requests,
                })
            })
            .collect();

        Self {
            instance: instance.into(),
            filter,
            generated_at: Utc::now(),
            projects,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    pub fn total_merge_requests(&self) -> usize {
        self.projects.iter().map(|p| p.merge_requests.len()).sum()
    }

    /// Plain-text rendering: the project name, then one indented line per
    /// merge request.
    pub fn render_text(&self) -> String {
        let mut output = String::new();

        for project in &self.projects {
            let _ = writeln!(output, "{}", project.name);
            for mr in &project.merge_requests {
                let _ = writeln!(output, "  {}", format_merge_request(mr));
            }
        }

        output
    }
}

/// `MR#<iid> (<state>) <description> (<url>)`, without the description part
/// when it is blank.
pub fn format_merge_request(mr: &GitLabMergeRequest) -> String {
    let description = mr.trimmed_description();

    if description.is_empty() {
        format!("MR#{} ({}) ({})", mr.iid, mr.state, mr.web_url)
    } else {
        format!(
            "MR#{} ({}) {} ({})",
            mr.iid, mr.state, description, mr.web_url
        )
    }
}
