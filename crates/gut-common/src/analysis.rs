use std::future::Future;

use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::DecodeError;
use crate::model::{decode_response, AnalysisResponse, AnalyzeRequest, ValidationIssue};

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
pub const ANALYZE_PATH: &str = "/api/v1/analyze";

#[derive(Clone, Debug)]
pub struct AnalysisClientConfig {
    pub base_url: String,
    /// Sent as `model` when the request does not name one.
    pub model: Option<String>,
    pub max_error_body_bytes: usize,
}

impl AnalysisClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: None,
            max_error_body_bytes: 8 * 1024,
        }
    }

    /// Optional:
    /// - `GUT_API_URL` (default: "http://127.0.0.1:8000")
    /// - `GUT_API_MODEL`
    /// - `GUT_MAX_ERROR_BODY_BYTES` (default: 8192)
    pub fn from_env() -> Self {
        let base_url = std::env::var("GUT_API_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let model = std::env::var("GUT_API_MODEL")
            .ok()
            .filter(|s| !s.trim().is_empty());

        let max_error_body_bytes = std::env::var("GUT_MAX_ERROR_BODY_BYTES")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(8 * 1024);

        Self {
            model,
            max_error_body_bytes,
            ..Self::new(&base_url)
        }
    }

    pub fn analyze_url(&self) -> String {
        format!("{}{ANALYZE_PATH}", self.base_url)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid response: {0}")]
    Decode(#[from] DecodeError),

    #[error("upstream rejected the query: {}", join_messages(.0))]
    Validation(Vec<ValidationIssue>),

    #[error("{message}")]
    Upstream { status: StatusCode, message: String },

    #[error("API request failed with status {}: {}", .status.as_u16(), .body)]
    UpstreamBody { status: StatusCode, body: String },
}

impl AnalysisError {
    /// Message worth showing to the user verbatim, if upstream supplied one.
    pub fn upstream_message(&self) -> Option<String> {
        match self {
            AnalysisError::Upstream { message, .. } => Some(message.clone()),
            AnalysisError::UpstreamBody { .. } => Some(self.to_string()),
            AnalysisError::Request(_) | AnalysisError::Decode(_) | AnalysisError::Validation(_) => {
                None
            }
        }
    }
}

fn join_messages(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|i| i.msg.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Anything that can answer an analysis request.
pub trait Analyzer: Send + Sync {
    fn analyze(
        &self,
        request: AnalyzeRequest,
    ) -> impl Future<Output = Result<AnalysisResponse, AnalysisError>> + Send;
}

#[derive(Clone)]
pub struct AnalysisClient {
    config: AnalysisClientConfig,
    http: reqwest::Client,
}

impl AnalysisClient {
    pub fn new(config: AnalysisClientConfig) -> Result<Self, AnalysisError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("gut-insight/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { config, http })
    }

    /// One POST per call. No retries and no client-side timeout.
    pub async fn send(&self, request: AnalyzeRequest) -> Result<AnalysisResponse, AnalysisError> {
        let url = self.config.analyze_url();
        let body = AnalyzeRequest {
            model: request.model.or_else(|| self.config.model.clone()),
            ..request
        };
        debug!(url = %url, query = %body.query, model = ?body.model, "sending analysis request");

        let resp = self
            .http
            .post(&url)
            .header(ACCEPT, "application/json")
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let err = Self::to_upstream_error(resp, self.config.max_error_body_bytes).await;
            warn!(error = %err, "analysis request failed");
            return Err(err);
        }

        let text = resp.text().await?;
        let decoded = decode_response(&text)?;
        debug!(
            citations = decoded.citations.len(),
            placeholder = decoded.analysis.is_unavailable(),
            "analysis response decoded"
        );
        Ok(decoded)
    }

    async fn to_upstream_error(resp: reqwest::Response, max_error_body_bytes: usize) -> AnalysisError {
        let status = resp.status();
        let body = read_limited_text(resp, max_error_body_bytes).await;
        match serde_json::from_str::<ErrorEnvelope>(&body) {
            Ok(envelope) => envelope.into_error(status),
            Err(_) => AnalysisError::UpstreamBody { status, body },
        }
    }
}

impl Analyzer for AnalysisClient {
    fn analyze(
        &self,
        request: AnalyzeRequest,
    ) -> impl Future<Output = Result<AnalysisResponse, AnalysisError>> + Send {
        self.send(request)
    }
}

async fn read_limited_text(resp: reqwest::Response, max_bytes: usize) -> String {
    match resp.bytes().await {
        Ok(b) => {
            let end = b.len().min(max_bytes);
            String::from_utf8_lossy(&b[..end]).to_string()
        }
        Err(e) => {
            warn!(error = %e, "failed to read upstream error body");
            "<failed to read error body>".to_string()
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    detail: Option<Value>,
    message: Option<String>,
}

impl ErrorEnvelope {
    fn into_error(self, status: StatusCode) -> AnalysisError {
        let fallback = || format!("API request failed with status {}", status.as_u16());
        match self.detail {
            Some(Value::Array(entries)) => {
                match serde_json::from_value::<Vec<ValidationIssue>>(Value::Array(entries)) {
                    Ok(issues) if !issues.is_empty() => AnalysisError::Validation(issues),
                    _ => AnalysisError::Upstream {
                        status,
                        message: fallback(),
                    },
                }
            }
            Some(Value::String(message)) => AnalysisError::Upstream { status, message },
            _ => AnalysisError::Upstream {
                status,
                message: self.message.unwrap_or_else(fallback),
            },
        }
    }
}
