pub mod config;
pub mod dates;
pub mod error;
pub mod types;

pub use config::{AppConfig, ArchiveLinkMode};
pub use dates::{coerce_calendar_date, DateParamShape};
pub use error::{DeeptimeError, Result};
pub use types::*;
