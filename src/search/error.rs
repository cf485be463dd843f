use thiserror::Error;

use crate::embedding::EmbeddingError;
use crate::vectordb::VectorDbError;

/// Errors from a single retrieval source.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("semantic search failed: {reason}")]
    Semantic { reason: String },

    #[error("lexical search failed: {reason}")]
    Lexical { reason: String },

    #[error("query embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    VectorDb(#[from] VectorDbError),

    #[error("failed to load corpus from '{path}': {reason}")]
    CorpusLoad { path: String, reason: String },
}
