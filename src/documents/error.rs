use thiserror::Error;

/// Errors from the full-document store.
#[derive(Debug, Error)]
pub enum DocumentStoreError {
    #[error("document store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("failed to load documents from '{path}': {reason}")]
    LoadFailed { path: String, reason: String },
}
