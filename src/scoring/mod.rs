//! Cross-encoder scoring.
//!
//! [`ScoringModel`] is the seam between the pipeline and the model; the production
//! implementation is [`Reranker`](crate::embedding::Reranker). [`CrossEncoderScorer`] owns the
//! lazily loaded model and the bounded inference pool, and returns passages in rank order.

#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod model;
pub mod ranking;
pub mod scorer;

#[cfg(test)]
mod tests;

#[cfg(any(test, feature = "mock"))]
pub use mock::MockScoringModel;
pub use model::{ModelIdentity, ScoringModel};
pub use ranking::{apply_order, rank_indices};
pub use scorer::CrossEncoderScorer;
