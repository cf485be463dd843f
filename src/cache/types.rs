use std::fmt;
use std::time::Instant;

use serde::Serialize;

use crate::hashing::hash_candidate_set;

/// Fingerprint of a query and its candidate id set.
///
/// Built from the sorted ids, so the same set in any order gives the same key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey([u8; 32]);

impl CacheKey {
    pub fn new<S: AsRef<str>>(query: &str, candidate_ids: &[S]) -> Self {
        Self(hash_candidate_set(query, candidate_ids))
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CacheKey(")?;
        for byte in &self.0[..8] {
            write!(f, "{byte:02x}")?;
        }
        write!(f, "..)")
    }
}

/// Full scored candidate set, in rank order, as written by one complete rerank.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreEntry {
    scores: Vec<(String, f32)>,
    inserted_at: Instant,
}

impl ScoreEntry {
    pub fn new(scores: Vec<(String, f32)>) -> Self {
        Self {
            scores,
            inserted_at: Instant::now(),
        }
    }

    #[inline]
    pub fn scores(&self) -> &[(String, f32)] {
        &self.scores
    }

    #[inline]
    pub fn inserted_at(&self) -> Instant {
        self.inserted_at
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Score recorded for `id`, if the entry covers it.
    pub fn score_of(&self, id: &str) -> Option<f32> {
        self.scores
            .iter()
            .find_map(|(entry_id, score)| (entry_id == id).then_some(*score))
    }

    /// Scores for `ids` in the given order, or `None` unless every id is covered.
    pub fn scores_for<S: AsRef<str>>(&self, ids: &[S]) -> Option<Vec<f32>> {
        let lookup: std::collections::HashMap<&str, f32> = self
            .scores
            .iter()
            .map(|(id, score)| (id.as_str(), *score))
            .collect();
        ids.iter()
            .map(|id| lookup.get(id.as_ref()).copied())
            .collect()
    }

    pub(crate) fn is_well_formed(&self) -> bool {
        self.scores.iter().all(|(id, score)| !id.is_empty() && score.is_finite())
    }
}

/// How a response's ranking was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStatus {
    /// Reordered from a cached scored set.
    Hit,
    /// Freshly reranked and stored.
    Miss,
    /// No candidates; neither the cache nor the model was consulted.
    Skipped,
}

impl CacheStatus {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "hit",
            CacheStatus::Miss => "miss",
            CacheStatus::Skipped => "skipped",
        }
    }

    #[inline]
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheStatus::Hit)
    }
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Process-lifetime counters plus the live entry count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: u64,
}
