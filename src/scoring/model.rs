use serde::{Deserialize, Serialize};

use crate::embedding::RerankerError;

/// Name and device of the scoring model, reported by stats and health.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelIdentity {
    pub name: String,
    pub device: String,
}

impl ModelIdentity {
    pub fn new(name: impl Into<String>, device: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            device: device.into(),
        }
    }
}

/// Relevance model over (query, passage) pairs.
///
/// Implementations are synchronous and may be CPU/accelerator bound; callers run them on the
/// blocking pool. `score` must return exactly one score per input, in input order.
pub trait ScoringModel: Send + Sync + 'static {
    fn identity(&self) -> ModelIdentity;

    fn score(&self, query: &str, contents: &[&str]) -> Result<Vec<f32>, RerankerError>;
}
