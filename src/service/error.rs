use thiserror::Error;

use crate::embedding::RerankerError;

/// Errors surfaced to callers of the retrieval service.
///
/// Retrieval-source and augmentation failures are absorbed (degraded or reported in the
/// response); only bad requests, model failures and timeouts reach the caller.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("invalid request: {reason}")]
    InvalidRequest { reason: String },

    #[error("reranking failed: {0}")]
    Scoring(#[from] RerankerError),

    #[error("request timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },
}
