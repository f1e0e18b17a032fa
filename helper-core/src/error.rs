use crate::types::{AggregatedResult, TabId};
use thiserror::Error;

pub const NETWORK_ERROR_MARKER: &str = "Fetch error:";
pub const DECODE_ERROR_MARKER: &str = "JSON parse error from backend:";

#[derive(Error, Debug)]
pub enum HelperError {
    #[error("Could not get post data from tab {tab_id}: {reason}")]
    ExtractionUnavailable { tab_id: TabId, reason: String },

    #[error("No title or body found on tab {tab_id}")]
    EmptyContent { tab_id: TabId },

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("No post body found on {url}")]
    InjectionTargetMissing { url: String },

    #[error("Tab {tab_id} is no longer reachable")]
    TabClosed { tab_id: TabId },

    #[error("Background context is not running")]
    BackgroundUnavailable,

    #[error("Analysis already in flight for tab {tab_id}")]
    AlreadyRunning { tab_id: TabId },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failure talking to the summarization backend.
///
/// The `Display` text of each variant is exactly what the user sees in place
/// of a summary, so the markers live here and nowhere else.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("{} {message}", NETWORK_ERROR_MARKER)]
    Network { message: String },

    #[error("{} {message}", DECODE_ERROR_MARKER)]
    Decode { message: String },

    #[error("Backend error ({status}): {detail}")]
    Http { status: u16, detail: String },
}

impl From<reqwest::Error> for BackendError {
    fn from(error: reqwest::Error) -> Self {
        BackendError::Network {
            message: error.to_string(),
        }
    }
}

impl From<BackendError> for AggregatedResult {
    fn from(error: BackendError) -> Self {
        AggregatedResult::failure(error.to_string())
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Configuration validation failed: {reason}")]
    ValidationFailed { reason: String },

    #[error("Configuration parsing error: {0}")]
    Parse(#[from] toml::de::Error),
}
