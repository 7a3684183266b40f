use thiserror::Error;

pub type Result<T> = std::result::Result<T, NytError>;

#[derive(Debug, Error)]
pub enum NytError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for NytError {
    fn from(err: reqwest::Error) -> Self {
        NytError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for NytError {
    fn from(err: serde_json::Error) -> Self {
        NytError::Parse(err.to_string())
    }
}
