//! Reflex rerank library crate (used by the binary and integration tests).
//!
//! Hybrid passage retrieval with a cached cross-encoder reranking stage. A request flows
//! through:
//!
//! 1. [`HybridSearch`] - semantic ([`VectorSemanticSearch`] over Qdrant) and lexical
//!    ([`Bm25Index`]) candidate generation, merged and deduplicated by passage id
//! 2. [`ScoreCache`] - scores keyed by the query plus the candidate id set
//! 3. [`CrossEncoderScorer`] - lazily loaded [`Reranker`] run on blocking workers
//! 4. [`DocumentStore`] - optional full-document augmentation
//!
//! [`RetrievalService`] ties the stages together under one request timeout.
//!
//! ## Test/Mock Support
//! Mock implementations are available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod cache;
pub mod config;
pub mod constants;
pub mod documents;
pub mod embedding;
pub mod hashing;
pub mod passage;
pub mod scoring;
pub mod search;
pub mod service;
pub mod vectordb;

pub use cache::{CacheKey, CacheStats, CacheStatus, ScoreCache, ScoreEntry};
pub use config::{Config, ConfigError};
pub use documents::{DocumentStore, DocumentStoreError, FullDocument, InMemoryDocumentStore};
pub use embedding::{
    EmbeddingError, EncoderConfig, QueryEmbedder, QueryEncoder, Reranker, RerankerConfig,
    RerankerError,
};
pub use hashing::{content_hash_hex, hash_candidate_set};
pub use passage::{Metadata, MetadataFilter, MetadataValue, Passage, ScoredPassage};
#[cfg(any(test, feature = "mock"))]
pub use scoring::MockScoringModel;
pub use scoring::{CrossEncoderScorer, ModelIdentity, ScoringModel};
#[cfg(any(test, feature = "mock"))]
pub use search::{MockCandidateSource, MockLexicalSearch, MockSemanticSearch};
pub use search::{
    Bm25Index, CandidateSource, Candidates, HybridSearch, LexicalMode, LexicalModePolicy,
    LexicalSearch, SearchError, SemanticSearch,
};
pub use service::{
    Augmentation, ContextResponse, HealthStatus, RerankRequest, RerankResponse, RetrievalError,
    RetrievalService, ServiceConfig, ServiceStats,
};
#[cfg(any(test, feature = "mock"))]
pub use vectordb::MockVectorDbClient;
pub use vectordb::{QdrantClient, VectorDbClient, VectorDbError, VectorSemanticSearch};
