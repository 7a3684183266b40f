use thiserror::Error;

pub type Result<T> = std::result::Result<T, GdeltError>;

#[derive(Debug, Error)]
pub enum GdeltError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Query job did not complete before the server timeout")]
    Incomplete,
}

impl From<reqwest::Error> for GdeltError {
    fn from(err: reqwest::Error) -> Self {
        GdeltError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for GdeltError {
    fn from(err: serde_json::Error) -> Self {
        GdeltError::Parse(err.to_string())
    }
}
