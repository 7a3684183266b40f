use std::path::PathBuf;
use std::time::Duration;

use crate::error::{DeeptimeError, Result};
use crate::types::LinkRotRisk;

/// Which result links get an archive lookup attached before being returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveLinkMode {
    Off,
    /// Only links from MEDIUM or HIGH link-rot providers.
    Risky,
    All,
}

impl ArchiveLinkMode {
    pub fn applies_to(self, risk: LinkRotRisk) -> bool {
        match self {
            ArchiveLinkMode::Off => false,
            ArchiveLinkMode::Risky => risk >= LinkRotRisk::Medium,
            ArchiveLinkMode::All => true,
        }
    }
}

impl std::str::FromStr for ArchiveLinkMode {
    type Err = DeeptimeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "none" => Ok(ArchiveLinkMode::Off),
            "risky" => Ok(ArchiveLinkMode::Risky),
            "all" => Ok(ArchiveLinkMode::All),
            other => Err(DeeptimeError::Config(format!(
                "DEEPTIME_ARCHIVE_LINKS must be off, risky or all, got '{other}'"
            ))),
        }
    }
}

/// Application configuration loaded from environment variables.
/// Every credential is optional; a provider without one reports itself
/// unavailable instead of failing the query.
#[derive(Debug, Clone)]
pub struct AppConfig {
    // News APIs
    pub nyt_api_key: Option<String>,
    pub guardian_api_key: Option<String>,

    // Web search
    pub serper_api_key: Option<String>,
    pub bing_api_key: Option<String>,

    // GDELT via BigQuery
    pub gdelt_bq_project: Option<String>,
    pub gdelt_bq_token: Option<String>,

    // Retrieval tuning
    pub provider_timeout: Duration,
    pub max_results_per_provider: usize,
    pub archive_links: ArchiveLinkMode,
    pub resolve_concurrency: usize,

    /// Optional TOML catalog replacing the built-in provider list.
    pub sources_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            nyt_api_key: None,
            guardian_api_key: None,
            serper_api_key: None,
            bing_api_key: None,
            gdelt_bq_project: None,
            gdelt_bq_token: None,
            provider_timeout: Duration::from_secs(20),
            max_results_per_provider: 100,
            archive_links: ArchiveLinkMode::Risky,
            resolve_concurrency: 8,
            sources_path: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let config = Self {
            nyt_api_key: optional_env("NYT_API_KEY"),
            guardian_api_key: optional_env("GUARDIAN_API_KEY"),
            serper_api_key: optional_env("SERPER_API_KEY"),
            bing_api_key: optional_env("BING_API_KEY"),
            gdelt_bq_project: optional_env("GDELT_BQ_PROJECT"),
            gdelt_bq_token: optional_env("GDELT_BQ_TOKEN"),
            provider_timeout: parsed_env("DEEPTIME_PROVIDER_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.provider_timeout),
            max_results_per_provider: parsed_env("DEEPTIME_MAX_RESULTS")?
                .unwrap_or(defaults.max_results_per_provider),
            archive_links: match optional_env("DEEPTIME_ARCHIVE_LINKS") {
                Some(v) => v.parse()?,
                None => defaults.archive_links,
            },
            resolve_concurrency: parsed_env("DEEPTIME_RESOLVE_CONCURRENCY")?
                .unwrap_or(defaults.resolve_concurrency)
                .max(1),
            sources_path: optional_env("DEEPTIME_SOURCES").map(PathBuf::from),
        };

        config.log_keys();
        Ok(config)
    }

    fn log_keys(&self) {
        fn preview_opt(val: &Option<String>) -> String {
            match val {
                Some(v) if !v.is_empty() => {
                    let n = v.chars().take(4).map(char::len_utf8).sum::<usize>();
                    format!("{}...({} chars)", &v[..n], v.len())
                }
                _ => "<not set>".to_string(),
            }
        }

        tracing::info!("Config loaded:");
        tracing::info!("  NYT_API_KEY: {}", preview_opt(&self.nyt_api_key));
        tracing::info!("  GUARDIAN_API_KEY: {}", preview_opt(&self.guardian_api_key));
        tracing::info!("  SERPER_API_KEY: {}", preview_opt(&self.serper_api_key));
        tracing::info!("  BING_API_KEY: {}", preview_opt(&self.bing_api_key));
        tracing::info!("  GDELT_BQ_PROJECT: {}", self.gdelt_bq_project.as_deref().unwrap_or("<not set>"));
        tracing::info!("  GDELT_BQ_TOKEN: {}", preview_opt(&self.gdelt_bq_token));
        tracing::info!(
            timeout_secs = self.provider_timeout.as_secs(),
            max_results = self.max_results_per_provider,
            archive_links = ?self.archive_links,
            "  Retrieval settings"
        );
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| DeeptimeError::Config(format!("{key} must be a number, got '{raw}'"))),
        None => Ok(None),
    }
}
