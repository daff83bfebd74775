use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::DecodeError;

pub const UNAVAILABLE_SUMMARY: &str =
    "Summary unavailable. The analysis response could not be parsed.";
pub const UNAVAILABLE_MECHANISMS: &str = "Data unavailable";

/// Structured analysis produced by the upstream service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub summary: String,
    #[serde(default)]
    pub impacts: Impacts,
    pub mechanisms: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Impacts {
    #[serde(default)]
    pub positive_impacts: Vec<String>,
    #[serde(default)]
    pub potential_concerns: Vec<String>,
}

impl AnalysisResult {
    /// Placeholder shown when the payload cannot be parsed.
    pub fn unavailable() -> Self {
        Self {
            summary: UNAVAILABLE_SUMMARY.to_string(),
            impacts: Impacts::default(),
            mechanisms: UNAVAILABLE_MECHANISMS.to_string(),
        }
    }

    pub fn is_unavailable(&self) -> bool {
        self.summary == UNAVAILABLE_SUMMARY && self.mechanisms == UNAVAILABLE_MECHANISMS
    }
}

/// First element of the success array. The service sends either the object
/// itself or the object serialized into a JSON string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AnalysisPayload {
    Object(Map<String, Value>),
    Encoded(String),
}

impl AnalysisPayload {
    /// Never fails: anything that does not fit `AnalysisResult` becomes the placeholder.
    pub fn into_result(self) -> AnalysisResult {
        let parsed = match self {
            AnalysisPayload::Object(map) => serde_json::from_value(Value::Object(map)),
            AnalysisPayload::Encoded(raw) => serde_json::from_str(&raw),
        };
        parsed
            .inspect_err(|e| warn!(error = %e, "analysis payload did not parse, using placeholder"))
            .unwrap_or_else(|_| AnalysisResult::unavailable())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisResponse {
    pub analysis: AnalysisResult,
    pub citations: Vec<String>,
}

/// Decode a success body of the form `[payload, citations?]`.
pub fn decode_response(body: &str) -> Result<AnalysisResponse, DecodeError> {
    let items: Vec<Value> = serde_json::from_str(body).map_err(DecodeError::NotAnArray)?;
    let mut items = items.into_iter();

    let first = items.next().ok_or(DecodeError::MissingAnalysis)?;
    let analysis = match serde_json::from_value::<AnalysisPayload>(first) {
        Ok(payload) => payload.into_result(),
        Err(e) => {
            warn!(error = %e, "analysis payload has unexpected type, using placeholder");
            AnalysisResult::unavailable()
        }
    };

    let citations = match items.next() {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(entries)) => entries
            .into_iter()
            .filter_map(|entry| match entry {
                Value::String(url) => Some(url),
                other => {
                    warn!(entry = %other, "skipping non-string citation");
                    None
                }
            })
            .collect(),
        Some(other) => {
            warn!(citations = %other, "citations are not an array, ignoring");
            Vec::new()
        }
    };

    Ok(AnalysisResponse {
        analysis,
        citations,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalyzeRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// One entry of a `{ "detail": [...] }` validation error body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub loc: Vec<Value>,
    pub msg: String,
    #[serde(default)]
    pub input: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ctx: Option<ValidationContext>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationContext {
    /// Kept loosely typed: some services send `"10"` or `10.0`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ValidationIssue {
    pub fn min_length_hint(&self) -> Option<String> {
        let min = match self.ctx.as_ref()?.min_length.as_ref()? {
            Value::Number(n) => match n.as_u64() {
                Some(v) => v.to_string(),
                None => {
                    let v = n.as_f64().filter(|v| *v >= 0.0 && v.fract() == 0.0)?;
                    format!("{v:.0}")
                }
            },
            Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
            _ => return None,
        };
        Some(format!("Minimum length required: {min} characters"))
    }
}
