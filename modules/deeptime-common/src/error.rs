use chrono::NaiveDate;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DeeptimeError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeeptimeError {
    #[error("Invalid date range: {from} is after {to}")]
    InvalidRange { from: NaiveDate, to: NaiveDate },

    #[error("Unknown source: {0}")]
    UnknownSource(String),

    #[error("Duplicate source: {0}")]
    DuplicateSource(String),

    #[error("Invalid source descriptor {id}: {reason}")]
    InvalidDescriptor { id: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),
}
