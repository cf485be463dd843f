use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::embedding::RerankerError;

use super::model::{ModelIdentity, ScoringModel};

/// Deterministic model: scores come from a content lookup table.
#[derive(Debug, Clone)]
pub struct MockScoringModel {
    scores: HashMap<String, f32>,
    default_score: f32,
    delay: Option<Duration>,
    fail: bool,
    calls: Arc<AtomicUsize>,
    scored_pairs: Arc<AtomicUsize>,
}

impl Default for MockScoringModel {
    fn default() -> Self {
        Self::new()
    }
}

impl MockScoringModel {
    pub const NAME: &'static str = "mock-cross-encoder";

    pub fn new() -> Self {
        Self {
            scores: HashMap::new(),
            default_score: 0.0,
            delay: None,
            fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
            scored_pairs: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_score(mut self, content: impl Into<String>, score: f32) -> Self {
        self.scores.insert(content.into(), score);
        self
    }

    pub fn with_default_score(mut self, score: f32) -> Self {
        self.default_score = score;
        self
    }

    /// Blocks the worker thread for `delay` on every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    /// Number of `score` calls; shared with clones.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    /// Number of (query, passage) pairs scored; shared with clones.
    pub fn scored_pairs(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.scored_pairs)
    }
}

impl ScoringModel for MockScoringModel {
    fn identity(&self) -> ModelIdentity {
        ModelIdentity::new(Self::NAME, "cpu")
    }

    fn score(&self, _query: &str, contents: &[&str]) -> Result<Vec<f32>, RerankerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if self.fail {
            return Err(RerankerError::InferenceFailed {
                reason: "mock inference failure".to_string(),
            });
        }

        self.scored_pairs.fetch_add(contents.len(), Ordering::SeqCst);
        Ok(contents
            .iter()
            .map(|content| self.scores.get(*content).copied().unwrap_or(self.default_score))
            .collect())
    }
}
