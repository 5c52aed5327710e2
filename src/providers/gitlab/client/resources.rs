use super::core::GitLabClient;
use crate::error::Result;
use crate::providers::gitlab::types::{
    GitLabGroup, GitLabMergeRequest, GitLabProject, GitLabUser, StateFilter,
};

impl GitLabClient {
    /// Fetches the user the token belongs to. Fails fast on a bad token.
    pub async fn authenticate(&self) -> Result<GitLabUser> {
        self.get_json("user").await
    }

    pub async fn list_groups(&self) -> Result<Vec<GitLabGroup>> {
        self.get_all_pages("groups", &[]).await
    }

    /// Lists the group-scoped project views, which carry no merge request data.
    pub async fn list_group_projects(&self, group_id: u64) -> Result<Vec<GitLabProject>> {
        self.get_all_pages(&format!("groups/{group_id}/projects"), &[])
            .await
    }

    pub async fn get_project(&self, project_id: u64) -> Result<GitLabProject> {
        self.get_json(&format!("projects/{project_id}")).await
    }

    pub async fn list_merge_requests(
        &self,
        project_id: u64,
        filter: StateFilter,
    ) -> Result<Vec<GitLabMergeRequest>> {
        self.get_all_pages(
            &format!("projects/{project_id}/merge_requests"),
            &filter.query(),
        )
        .await
    }
}
