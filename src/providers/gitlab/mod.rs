mod client;
mod provider;
mod types;

pub use provider::GitLabProvider;
pub use types::{GitLabMergeRequest, GitLabProject, StateFilter};
