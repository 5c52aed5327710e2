use thiserror::Error;

#[derive(Error, Debug)]
pub enum FulgensError {
    #[error("GitLab rejected the token (401): invalid or expired token")]
    Unauthorized,

    #[error("GitLab resource not found: {0}")]
    NotFound(String),

    #[error("GitLab API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, FulgensError>;
