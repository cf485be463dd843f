//! Memoized cross-encoder scores.
//!
//! A [`ScoreCache`] maps a [`CacheKey`] (query plus sorted candidate ids) to the full ranked
//! score list of one complete rerank. Callers must still check that the entry covers every
//! current candidate before using it; see [`ScoreEntry::scores_for`].

pub mod score_cache;
pub mod types;


pub use score_cache::ScoreCache;
pub use types::{CacheKey, CacheStats, CacheStatus, ScoreEntry};
