use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::RetrievalError;
use crate::cache::CacheStatus;
use crate::constants::{
    DEFAULT_ENTITY_KEY, DEFAULT_K_RETRIEVE, DEFAULT_K_RETURN, DEFAULT_REQUEST_TIMEOUT_MS,
    DEFAULT_RERANKER_MODEL,
};
use crate::documents::FullDocument;
use crate::passage::{MetadataFilter, ScoredPassage};
use crate::scoring::ModelIdentity;

fn default_k_retrieve() -> usize {
    DEFAULT_K_RETRIEVE
}

fn default_k_return() -> usize {
    DEFAULT_K_RETURN
}

/// One "rerank this query against the corpus" call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerankRequest {
    pub query: String,
    #[serde(default = "default_k_retrieve")]
    pub k_retrieve: usize,
    #[serde(default = "default_k_return")]
    pub k_return: usize,
    #[serde(default)]
    pub filter: MetadataFilter,
}

impl RerankRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            k_retrieve: DEFAULT_K_RETRIEVE,
            k_return: DEFAULT_K_RETURN,
            filter: MetadataFilter::new(),
        }
    }

    pub fn with_k_retrieve(mut self, k: usize) -> Self {
        self.k_retrieve = k;
        self
    }

    pub fn with_k_return(mut self, k: usize) -> Self {
        self.k_return = k;
        self
    }

    pub fn with_filter(mut self, filter: MetadataFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn validate(&self) -> Result<(), RetrievalError> {
        let reason = if self.query.trim().is_empty() {
            "query must not be empty"
        } else if self.k_retrieve == 0 {
            "k_retrieve must be at least 1"
        } else if self.k_return == 0 {
            "k_return must be at least 1"
        } else {
            return Ok(());
        };

        Err(RetrievalError::InvalidRequest {
            reason: reason.to_string(),
        })
    }
}

/// Ranked passages for one request, best first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RerankResponse {
    pub query: String,
    pub results: Vec<ScoredPassage>,
    pub cache_status: CacheStatus,
}

impl RerankResponse {
    pub fn empty(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            results: Vec::new(),
            cache_status: CacheStatus::Skipped,
        }
    }
}

/// Outcome of the optional full-document fetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Augmentation {
    NotRequested,
    /// No entity ids were referenced, or none had documents.
    Empty,
    Fetched { documents: Vec<FullDocument> },
    Failed { reason: String },
}

impl Augmentation {
    /// Fetched documents; empty for every other outcome.
    pub fn documents(&self) -> &[FullDocument] {
        match self {
            Augmentation::Fetched { documents } => documents,
            _ => &[],
        }
    }
}

/// [`RerankResponse`] plus the augmentation outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextResponse {
    #[serde(flatten)]
    pub response: RerankResponse,
    pub full_documents: Augmentation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceStats {
    pub model_name: String,
    pub device: String,
    pub model_loaded: bool,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy { model: ModelIdentity },
    Unhealthy { reason: String },
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy { .. })
    }
}

/// Orchestrator settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Bound on one whole request: generation, rerank and augmentation.
    pub timeout: Duration,
    /// Metadata key naming a passage's source entity.
    pub entity_key: String,
    /// Name reported by `stats()` until the model has loaded.
    pub model_name: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            entity_key: DEFAULT_ENTITY_KEY.to_string(),
            model_name: DEFAULT_RERANKER_MODEL.to_string(),
        }
    }
}
