use thiserror::Error;

pub type Result<T> = std::result::Result<T, ChronamError>;

#[derive(Debug, Error)]
pub enum ChronamError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for ChronamError {
    fn from(err: reqwest::Error) -> Self {
        ChronamError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for ChronamError {
    fn from(err: serde_json::Error) -> Self {
        ChronamError::Parse(err.to_string())
    }
}
