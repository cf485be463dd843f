//! Candidate generation.
//!
//! [`HybridSearch`] queries a [`SemanticSearch`] and a [`LexicalSearch`] source concurrently and
//! merges their results into one deduplicated candidate set. Recall matters here, not
//! precision; ranking is left to the cross-encoder. A failing source is logged and skipped.

pub mod bm25;
pub mod error;
pub mod hybrid;
pub mod lexical;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod semantic;

#[cfg(test)]
mod tests;

pub use bm25::Bm25Index;
pub use error::SearchError;
pub use hybrid::{CandidateSource, Candidates, HybridSearch, merge_candidates};
pub use lexical::{LexicalMode, LexicalModePolicy, LexicalSearch, is_code_like, phrase_terms};
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockCandidateSource, MockLexicalSearch, MockSemanticSearch};
pub use semantic::SemanticSearch;
