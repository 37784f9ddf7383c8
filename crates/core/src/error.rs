use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecapError {
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("Content not found: {reason}")]
    NotFound { reason: String },

    #[error("Summarization failed: {reason}")]
    SummarizationFailed { reason: String },

    #[error("Store error: {reason}")]
    Store { reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Background task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),

    #[error("Missing API key: {env_var} environment variable is not set")]
    MissingApiKey { env_var: String },
}

impl RecapError {
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    pub fn not_found(reason: impl Into<String>) -> Self {
        Self::NotFound {
            reason: reason.into(),
        }
    }

    /// The caller sent something unusable; retrying the same input won't help.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, RecapError>;
