use serde::{Deserialize, Serialize};
use std::fmt;

/// Browser tab identifier, as handed out by the popup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub u32);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for TabId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Snapshot of a forum post as read from the page. Unmatched fields are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostData {
    pub title: String,
    pub body: String,
    pub source: String,
    pub url: String,
}

impl PostData {
    /// A post with neither title nor body has nothing to analyze.
    pub fn has_content(&self) -> bool {
        !self.title.is_empty() || !self.body.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl SourceResult {
    pub const UNKNOWN_LABEL: &'static str = "Unknown";

    /// Visible label: title, else url, else source name. Empty strings count as absent.
    pub fn label(&self) -> &str {
        [&self.title, &self.url, &self.source]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|value| !value.is_empty())
            .unwrap_or(Self::UNKNOWN_LABEL)
    }

    pub fn link(&self) -> Option<&str> {
        self.url.as_deref().filter(|url| !url.is_empty())
    }

    pub fn source_name(&self) -> Option<&str> {
        self.source.as_deref().filter(|source| !source.is_empty())
    }
}

/// Display-ready answer. Always well shaped, whether the backend succeeded or not.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatedResult {
    pub final_summary: String,
    pub per_source_results: Vec<SourceResult>,
}

impl AggregatedResult {
    pub fn new(final_summary: impl Into<String>, per_source_results: Vec<SourceResult>) -> Self {
        Self {
            final_summary: final_summary.into(),
            per_source_results,
        }
    }

    /// Synthetic result carrying a failure description in place of a summary.
    pub fn failure(summary: impl Into<String>) -> Self {
        Self::new(summary, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.final_summary.is_empty() && self.per_source_results.is_empty()
    }
}
