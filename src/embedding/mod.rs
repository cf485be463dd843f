//! Model plumbing (candle).
//!
//! - [`encoder`] turns queries into vectors for semantic search.
//! - [`reranker`] is the cross-encoder driven by [`crate::scoring`].

/// BERT trunks: single-logit classifier and mean-pooled encoder.
pub mod bert;
/// Device selection (CPU / Metal / CUDA).
pub mod device;
/// Query encoder for the vector store.
pub mod encoder;
mod error;
/// Cross-encoder reranker.
pub mod reranker;
/// Tokenizer/model loading helpers.
pub mod utils;

pub use encoder::{EncoderConfig, QueryEmbedder, QueryEncoder};
pub use error::EmbeddingError;
pub use reranker::{Reranker, RerankerConfig, RerankerError};
