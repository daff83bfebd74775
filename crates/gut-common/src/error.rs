/// Error types shared by the gut-insight crates.
///
/// `QueryError` covers local input validation before anything is sent upstream.
/// `DecodeError` covers success bodies that cannot be read at all; payloads that
/// merely fail to parse are recovered with a placeholder instead (see `model`).
/// Transport and upstream failures live in `analysis::AnalysisError`.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("query must not be empty")]
    Empty,

    #[error("query must be at least {min} characters (got {actual})")]
    TooShort { min: usize, actual: usize },

    #[error("a submission is already in progress")]
    Pending,
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("response body is not a JSON array: {0}")]
    NotAnArray(#[source] serde_json::Error),

    #[error("response array is empty")]
    MissingAnalysis,
}
