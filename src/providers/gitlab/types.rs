use serde::{Deserialize, Serialize};

/// A GitLab group visible to the authenticated user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitLabGroup {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub full_path: String,
}

/// A GitLab project.
///
/// Group listings return a reduced view of the project; the provider
/// re-fetches each one by id to get the full object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitLabProject {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub path_with_namespace: String,
    #[serde(default)]
    pub web_url: String,
}

/// A GitLab user as embedded in other resources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitLabUser {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub name: String,
}

/// A merge request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitLabMergeRequest {
    pub id: u64,
    /// Project-scoped sequence number, not unique across projects
    pub iid: u64,
    pub project_id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Remote-defined state (e.g. "opened", "closed", "merged", "locked")
    pub state: String,
    pub web_url: String,
    #[serde(default)]
    pub reviewers: Vec<GitLabUser>,
}

impl GitLabMergeRequest {
    /// Description with surrounding whitespace removed, empty when absent.
    pub fn trimmed_description(&self) -> &str {
        self.description.as_deref().map_or("", str::trim)
    }
}

/// Merge request state filter forwarded to the listing endpoint.
///
/// `All` is what the `--include-closed` flag selects: it removes the state
/// filter entirely rather than selecting closed merge requests only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateFilter {
    #[default]
    Opened,
    All,
}

impl StateFilter {
    pub fn from_include_closed(include_closed: bool) -> Self {
        if include_closed {
            Self::All
        } else {
            Self::Opened
        }
    }

    /// Query parameters to send with the listing request.
    pub fn query(self) -> Vec<(&'static str, &'static str)> {
        match self {
            Self::Opened => vec![("state", "opened")],
            Self::All => Vec::new(),
        }
    }

    pub fn matches(self, state: &str) -> bool {
        match self {
            Self::Opened => state == "opened",
            Self::All => true,
        }
    }
}
