use serde::Serialize;
use thiserror::Error;

use chronam_client::ChronamError;
use gdelt_client::GdeltError;
use guardian_client::GuardianError;
use nyt_client::NytError;
use wayback_client::WaybackError;

/// Failure of one provider call. Contained to that provider's slice of the
/// plan; the retriever folds it into a [`ProviderStatus`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderFailure {
    #[error("rate limited by provider")]
    RateLimited,

    #[error("daily quota of {0} requests used up")]
    QuotaExhausted(u32),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected response shape: {0}")]
    SchemaDrift(String),

    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

impl ProviderFailure {
    /// Worth another attempt after backing off.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderFailure::RateLimited | ProviderFailure::Network(_) => true,
            ProviderFailure::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub(crate) fn from_status(status: u16, message: String) -> Self {
        if status == 429 {
            ProviderFailure::RateLimited
        } else {
            ProviderFailure::Http { status, message }
        }
    }
}

impl From<WaybackError> for ProviderFailure {
    fn from(err: WaybackError) -> Self {
        match err {
            WaybackError::Network(e) => ProviderFailure::Network(e),
            WaybackError::Api { status, message } => ProviderFailure::from_status(status, message),
            WaybackError::Parse(e) => ProviderFailure::SchemaDrift(e),
        }
    }
}

impl From<ChronamError> for ProviderFailure {
    fn from(err: ChronamError) -> Self {
        match err {
            ChronamError::Network(e) => ProviderFailure::Network(e),
            ChronamError::Api { status, message } => ProviderFailure::from_status(status, message),
            ChronamError::Parse(e) => ProviderFailure::SchemaDrift(e),
        }
    }
}

impl From<NytError> for ProviderFailure {
    fn from(err: NytError) -> Self {
        match err {
            NytError::Network(e) => ProviderFailure::Network(e),
            NytError::Api { status, message } => ProviderFailure::from_status(status, message),
            NytError::Parse(e) => ProviderFailure::SchemaDrift(e),
        }
    }
}

impl From<GuardianError> for ProviderFailure {
    fn from(err: GuardianError) -> Self {
        match err {
            GuardianError::Network(e) => ProviderFailure::Network(e),
            GuardianError::Api { status, message } => ProviderFailure::from_status(status, message),
            GuardianError::Parse(e) => ProviderFailure::SchemaDrift(e),
        }
    }
}

impl From<GdeltError> for ProviderFailure {
    fn from(err: GdeltError) -> Self {
        match err {
            GdeltError::Network(e) => ProviderFailure::Network(e),
            GdeltError::Api { status, message } => ProviderFailure::from_status(status, message),
            GdeltError::Parse(e) => ProviderFailure::SchemaDrift(e),
            GdeltError::Incomplete => {
                ProviderFailure::Network("query job still running at server timeout".into())
            }
        }
    }
}

// The two web search adapters talk to their APIs directly.
impl From<reqwest::Error> for ProviderFailure {
    fn from(err: reqwest::Error) -> Self {
        ProviderFailure::Network(err.to_string())
    }
}

impl From<serde_json::Error> for ProviderFailure {
    fn from(err: serde_json::Error) -> Self {
        ProviderFailure::SchemaDrift(err.to_string())
    }
}

/// Per-provider outcome reported alongside partial results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum ProviderStatus {
    Ok,
    /// No adapter or no credentials configured.
    Unavailable(String),
    TimedOut,
    RateLimited,
    Failed(String),
    SchemaDrift(String),
}

impl ProviderStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, ProviderStatus::Ok)
    }
}

impl From<ProviderFailure> for ProviderStatus {
    fn from(failure: ProviderFailure) -> Self {
        match failure {
            ProviderFailure::RateLimited => ProviderStatus::RateLimited,
            ProviderFailure::QuotaExhausted(_) => ProviderStatus::RateLimited,
            ProviderFailure::SchemaDrift(e) => ProviderStatus::SchemaDrift(e),
            ProviderFailure::Unavailable(e) => ProviderStatus::Unavailable(e),
            other => ProviderStatus::Failed(other.to_string()),
        }
    }
}
