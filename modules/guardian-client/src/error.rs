use thiserror::Error;

pub type Result<T> = std::result::Result<T, GuardianError>;

#[derive(Debug, Error)]
pub enum GuardianError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for GuardianError {
    fn from(err: reqwest::Error) -> Self {
        GuardianError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for GuardianError {
    fn from(err: serde_json::Error) -> Self {
        GuardianError::Parse(err.to_string())
    }
}
