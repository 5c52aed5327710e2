use indexmap::IndexMap;
use log::{debug, info, warn};

use crate::auth::Token;
use crate::error::Result;
use crate::output::PhaseProgress;
use crate::report::MergeRequestReport;

use super::client::GitLabClient;
use super::types::{GitLabGroup, GitLabMergeRequest, GitLabProject, StateFilter};

/// Walks groups, projects and merge requests for one GitLab instance.
///
/// Every method issues fresh requests; nothing is memoized between calls.
pub struct GitLabProvider {
    pub client: GitLabClient,
}

impl GitLabProvider {
    /// Creates a provider for the instance at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the API URL cannot be built from `base_url`.
    pub fn new(base_url: &str, token: Option<Token>) -> Result<Self> {
        let client = GitLabClient::new(base_url, token)?;

        Ok(Self { client })
    }

    pub async fn list_groups(&self) -> Result<Vec<GitLabGroup>> {
        let groups = self.client.list_groups().await?;
        info!("Found {} groups", groups.len());
        Ok(groups)
    }

    /// Lists the projects of every group, deduplicated by project id.
    ///
    /// Group listings only return project stubs, so each unique project is
    /// fetched again by id. A project shared by several groups keeps the
    /// position of its first occurrence.
    pub async fn list_projects(&self, groups: &[GitLabGroup]) -> Result<Vec<GitLabProject>> {
        let mut stubs: IndexMap<u64, GitLabProject> = IndexMap::new();

        for group in groups {
            let group_projects = self.client.list_group_projects(group.id).await?;
            debug!(
                "Group {} has {} projects",
                group.full_path,
                group_projects.len()
            );

            for stub in group_projects {
                stubs.entry(stub.id).or_insert(stub);
            }
        }

        let mut projects = Vec::with_capacity(stubs.len());
        for project_id in stubs.keys() {
            projects.push(self.client.get_project(*project_id).await?);
        }

        info!("Found {} projects", projects.len());
        Ok(projects)
    }

    pub async fn list_merge_requests(
        &self,
        project: &GitLabProject,
        filter: StateFilter,
    ) -> Result<Vec<GitLabMergeRequest>> {
        let merge_requests = self.client.list_merge_requests(project.id, filter).await?;
        debug!(
            "Project {} has {} matching merge requests",
            project.name,
            merge_requests.len()
        );
        Ok(merge_requests)
    }

    /// Collects the merge request report for every project the token can see.
    ///
    /// Progress is displayed in three phases:
    /// 1. Fetching groups
    /// 2. Fetching projects for each group
    /// 3. Fetching merge requests for each project
    ///
    /// # Errors
    ///
    /// Any failed request aborts the walk; there is no retry.
    pub async fn collect_report(&self, filter: StateFilter) -> Result<MergeRequestReport> {
        let user = self.client.authenticate().await?;
        info!("Authenticated as {}", user.username);

        let progress = PhaseProgress::start_phase_1();
        let groups = self.list_groups().await?;

        let progress = progress.finish_phase_1_start_phase_2(groups.len());
        let projects = self.list_projects(&groups).await?;

        let progress = progress.finish_phase_2_start_phase_3(projects.len());
        let mut entries = Vec::with_capacity(projects.len());
        for project in projects {
            let merge_requests = self.list_merge_requests(&project, filter).await?;
            entries.push((project, merge_requests));
        }

        let report = MergeRequestReport::build(self.client.instance_url(), filter, entries);
        progress.finish_phase_3(report.total_merge_requests());

        if report.is_empty() {
            warn!("No merge requests matched the {filter:?} filter");
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    async fn mock_json(server: &mut Server, path: &str, body: &str) -> mockito::Mock {
        server
            .mock("GET", path)
            .match_query(Matcher::Any)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }

    fn group(id: u64, path: &str) -> GitLabGroup {
        GitLabGroup {
            id,
            name: path.to_string(),
            full_path: path.to_string(),
        }
    }

    #[tokio::test]
    async fn test_list_projects_dedups_shared_projects() {
        let mut server = Server::new_async().await;
        let _group_one = mock_json(
            &mut server,
            "/api/v4/groups/1/projects",
            r#"[{"id": 10, "name": "alpha"}, {"id": 11, "name": "beta"}]"#,
        )
        .await;
        let _group_two = mock_json(
            &mut server,
            "/api/v4/groups/2/projects",
            r#"[{"id": 11, "name": "beta"}, {"id": 12, "name": "gamma"}]"#,
        )
        .await;
        let _alpha = mock_json(
            &mut server,
            "/api/v4/projects/10",
            r#"{"id": 10, "name": "alpha", "path_with_namespace": "one/alpha"}"#,
        )
        .await;
        let beta = server
            .mock("GET", "/api/v4/projects/11")
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": 11, "name": "beta", "path_with_namespace": "one/beta"}"#)
            .expect(1)
            .create_async()
            .await;
        let _gamma = mock_json(
            &mut server,
            "/api/v4/projects/12",
            r#"{"id": 12, "name": "gamma", "path_with_namespace": "two/gamma"}"#,
        )
        .await;

        let provider = GitLabProvider::new(&server.url(), None).unwrap();
        let projects = provider
            .list_projects(&[group(1, "one"), group(2, "two")])
            .await
            .unwrap();

        let ids: Vec<_> = projects.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![10, 11, 12]);
        // The full project object comes from the per-id fetch
        assert_eq!(projects[0].path_with_namespace, "one/alpha");
        beta.assert_async().await;
    }

    #[tokio::test]
    async fn test_collect_report_walks_everything() {
        let mut server = Server::new_async().await;
        let _user = mock_json(
            &mut server,
            "/api/v4/user",
            r#"{"id": 1, "username": "jdoe", "name": "J. Doe"}"#,
        )
        .await;
        let _groups = mock_json(
            &mut server,
            "/api/v4/groups",
            r#"[{"id": 1, "name": "one", "full_path": "one"}]"#,
        )
        .await;
        let _group_projects = mock_json(
            &mut server,
            "/api/v4/groups/1/projects",
            r#"[{"id": 10, "name": "alpha"}, {"id": 11, "name": "beta"}]"#,
        )
        .await;
        let _alpha = mock_json(
            &mut server,
            "/api/v4/projects/10",
            r#"{"id": 10, "name": "alpha"}"#,
        )
        .await;
        let _beta = mock_json(
            &mut server,
            "/api/v4/projects/11",
            r#"{"id": 11, "name": "beta"}"#,
        )
        .await;
        let alpha_mrs = server
            .mock("GET", "/api/v4/projects/10/merge_requests")
            .match_query(Matcher::UrlEncoded("state".into(), "opened".into()))
            .with_header("content-type", "application/json")
            .with_body(
                r#"[{"id": 100, "iid": 1, "project_id": 10, "description": "",
                     "state": "opened", "web_url": "http://x/1"}]"#,
            )
            .create_async()
            .await;
        let _beta_mrs =
            mock_json(&mut server, "/api/v4/projects/11/merge_requests", "[]").await;

        let provider =
            GitLabProvider::new(&server.url(), Some(Token::from("glpat-test"))).unwrap();
        let report = provider.collect_report(StateFilter::Opened).await.unwrap();

        assert_eq!(report.render_text(), "alpha\n  MR#1 (opened) (http://x/1)\n");
        alpha_mrs.assert_async().await;
    }

    #[tokio::test]
    async fn test_collect_report_fails_on_bad_token() {
        let mut server = Server::new_async().await;
        let _user = server
            .mock("GET", "/api/v4/user")
            .with_status(401)
            .create_async()
            .await;
        let groups = server
            .mock("GET", "/api/v4/groups")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let provider = GitLabProvider::new(&server.url(), Some(Token::from("bad"))).unwrap();
        let result = provider.collect_report(StateFilter::Opened).await;

        assert!(matches!(
            result,
            Err(crate::error::FulgensError::Unauthorized)
        ));
        groups.assert_async().await;
    }
}
