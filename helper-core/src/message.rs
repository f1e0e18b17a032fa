use crate::types::{AggregatedResult, TabId};
use serde::{Deserialize, Serialize};

/// Tagged value exchanged between the popup, background and content contexts.
///
/// The wire form matches the extension runtime messages, e.g.
/// `{"action":"RUN_ANALYSIS","tabId":3}` or `{"action":"GET_POST_DATA"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    /// popup -> background, no response
    RunAnalysis {
        #[serde(rename = "tabId")]
        tab_id: TabId,
    },
    /// background -> content, answered with a `PostData`
    GetPostData,
    /// background -> content, fire-and-forget
    InjectResult { aggregated: AggregatedResult },
}

impl Message {
    pub fn action(&self) -> &'static str {
        match self {
            Message::RunAnalysis { .. } => "RUN_ANALYSIS",
            Message::GetPostData => "GET_POST_DATA",
            Message::InjectResult { .. } => "INJECT_RESULT",
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}
