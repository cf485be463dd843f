//! Cross-cutting, shared constants.
//!
//! Config types and request builders fall back to these values; keep them in one place so the
//! binary, the service defaults and the tests agree.

/// Candidates fetched from hybrid search when a request does not specify `k_retrieve`.
pub const DEFAULT_K_RETRIEVE: usize = 50;

/// Results returned when a request does not specify `k_return`.
pub const DEFAULT_K_RETURN: usize = 10;

/// Score cache time-to-live in seconds.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

/// Score cache capacity in entries.
pub const DEFAULT_CACHE_MAX_SIZE: u64 = 10_000;

/// Upper bound for a whole rerank pipeline (generation + rerank + augmentation).
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Concurrent blocking scoring jobs allowed at once.
pub const DEFAULT_SCORING_WORKERS: usize = 2;

/// Pairs per cross-encoder forward pass.
pub const DEFAULT_RERANKER_BATCH_SIZE: usize = 32;

/// Maximum tokens per (query, passage) pair fed to the cross-encoder.
pub const RERANKER_MAX_SEQ_LEN: usize = 512;

/// Maximum tokens per query fed to the query encoder.
pub const ENCODER_MAX_SEQ_LEN: usize = 512;

/// Query vector size used by the stub encoder (matches MiniLM-class encoders).
pub const DEFAULT_EMBEDDING_DIM: usize = 384;

/// Reported model identity when no explicit name is configured.
pub const DEFAULT_RERANKER_MODEL: &str = "cross-encoder/ms-marco-MiniLM-L-6-v2";

/// Metadata key naming the source entity of a passage (used for augmentation).
pub const DEFAULT_ENTITY_KEY: &str = "patient_id";

/// Qdrant collection holding the passage vectors.
pub const DEFAULT_COLLECTION_NAME: &str = "passages";

/// Payload field holding the passage id written at upsert time.
pub const PAYLOAD_ID_FIELD: &str = "passage_id";

/// Payload field holding passage text in the vector store.
pub const PAYLOAD_CONTENT_FIELD: &str = "page_content";

/// Payload field holding passage metadata in the vector store.
pub const PAYLOAD_METADATA_FIELD: &str = "metadata";

/// Metadata keys consulted, in order, for a stable passage id.
pub const PASSAGE_ID_KEYS: [&str; 3] = ["chunk_id", "resource_id", "id"];
