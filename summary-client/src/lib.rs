//! Client for the summarization backend's `POST /generate_summary` endpoint.
//!
//! Every failure is folded into an `AggregatedResult` whose summary carries
//! the error text, so callers always have something to show the user.

mod normalize;

pub use normalize::normalize_summary;

use async_trait::async_trait;
use helper_core::{AggregatedResult, BackendConfig, BackendError, ConfigError, PostData};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

#[async_trait]
pub trait SummaryBackend: Send + Sync {
    /// Never fails: transport, status and decode errors come back as a
    /// failure result with no sources.
    async fn generate_summary(&self, post: &PostData) -> AggregatedResult;
}

#[derive(Debug, Clone)]
pub struct HttpSummaryClient {
    http: Client,
    endpoint: Url,
}

impl HttpSummaryClient {
    pub fn new(http: Client, endpoint: Url) -> Self {
        Self { http, endpoint }
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self, ConfigError> {
        let endpoint = config.summary_endpoint()?;

        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(|e| ConfigError::InvalidValue {
            field: "backend".to_string(),
            value: e.to_string(),
        })?;

        Ok(Self::new(http, endpoint))
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub async fn try_generate_summary(
        &self,
        post: &PostData,
    ) -> Result<AggregatedResult, BackendError> {
        debug!(
            endpoint = %self.endpoint,
            title_len = post.title.len(),
            body_len = post.body.len(),
            "Sending post to backend"
        );

        let response = self
            .http
            .post(self.endpoint.clone())
            .json(post)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(BackendError::Http {
                status: status.as_u16(),
                detail: error_detail(status, &body),
            });
        }

        let value: Value = serde_json::from_str(&body).map_err(|e| BackendError::Decode {
            message: e.to_string(),
        })?;
        Ok(normalize_summary(&value))
    }
}

#[async_trait]
impl SummaryBackend for HttpSummaryClient {
    async fn generate_summary(&self, post: &PostData) -> AggregatedResult {
        match self.try_generate_summary(post).await {
            Ok(result) => {
                info!(
                    sources = result.per_source_results.len(),
                    "Received summary from backend"
                );
                result
            }
            Err(e) => {
                warn!(error = %e, "Backend request failed");
                e.into()
            }
        }
    }
}

/// `detail` from a JSON error body when present, else the raw body text.
fn error_detail(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        match value.get("detail") {
            Some(Value::String(detail)) => return detail.clone(),
            Some(Value::Null) | None => {}
            Some(other) => return other.to_string(),
        }
    }

    let body = body.trim();
    if body.is_empty() {
        status.canonical_reason().unwrap_or("no details").to_string()
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_string() {
        assert_eq!(
            error_detail(StatusCode::SERVICE_UNAVAILABLE, r#"{"detail":"model is loading"}"#),
            "model is loading"
        );
    }

    #[test]
    fn test_detail_structured() {
        let body = r#"{"detail":[{"loc":["body","title"],"msg":"field required"}]}"#;
        assert_eq!(
            error_detail(StatusCode::UNPROCESSABLE_ENTITY, body),
            r#"[{"loc":["body","title"],"msg":"field required"}]"#
        );
    }

    #[test]
    fn test_detail_falls_back_to_body() {
        assert_eq!(
            error_detail(StatusCode::BAD_GATEWAY, "<html>upstream down</html>\n"),
            "<html>upstream down</html>"
        );
        assert_eq!(
            error_detail(StatusCode::INTERNAL_SERVER_ERROR, r#"{"error":"boom"}"#),
            r#"{"error":"boom"}"#
        );
        assert_eq!(
            error_detail(StatusCode::SERVICE_UNAVAILABLE, ""),
            "Service Unavailable"
        );
    }

    #[test]
    fn test_from_config_builds_endpoint() {
        let config = BackendConfig {
            base_url: "http://backend.local:9000/".to_string(),
            request_timeout_secs: 5,
        };
        let client = HttpSummaryClient::from_config(&config).unwrap();
        assert_eq!(
            client.endpoint().as_str(),
            "http://backend.local:9000/generate_summary"
        );
    }

    #[test]
    fn test_from_config_rejects_bad_url() {
        let config = BackendConfig {
            base_url: "not a url".to_string(),
            request_timeout_secs: 0,
        };
        assert!(HttpSummaryClient::from_config(&config).is_err());
    }
}
