//! Shared data shapes: passages, scored passages and their metadata.
//!
//! A [`Passage`] is created once by a retrieval backend and never mutated afterwards. Its `id`
//! travels with it through scoring, sorting and truncation, so nothing downstream needs to
//! recover identity from anything else.

pub mod metadata;


pub use metadata::{Metadata, MetadataFilter, MetadataValue};

use serde::{Deserialize, Serialize};

use crate::constants::PASSAGE_ID_KEYS;
use crate::hashing::content_hash_hex;

/// Immutable unit of retrieved text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Passage {
    pub fn new(id: impl Into<String>, content: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            metadata,
        }
    }

    /// Builds a passage, deriving its id with [`resolve_passage_id`].
    pub fn from_parts(
        explicit_id: Option<&str>,
        content: impl Into<String>,
        metadata: Metadata,
        ordinal: usize,
    ) -> Self {
        let content = content.into();
        let id = resolve_passage_id(explicit_id, &metadata, &content, ordinal);
        Self {
            id,
            content,
            metadata,
        }
    }

    /// Returns `metadata[key]` rendered as an identifier, if present.
    pub fn entity_id(&self, key: &str) -> Option<String> {
        self.metadata.get(key).and_then(MetadataValue::as_identifier)
    }
}

/// Picks a stable id for a passage.
///
/// Order: the backend's own id, then `chunk_id`, `resource_id`, `id` from metadata, and finally
/// `content:{ordinal}:{blake3(content)}`. The ordinal keeps identical texts at different
/// positions apart.
pub fn resolve_passage_id(
    explicit_id: Option<&str>,
    metadata: &Metadata,
    content: &str,
    ordinal: usize,
) -> String {
    if let Some(id) = explicit_id.map(str::trim).filter(|id| !id.is_empty()) {
        return id.to_string();
    }

    PASSAGE_ID_KEYS
        .iter()
        .find_map(|key| metadata.get(key).and_then(MetadataValue::as_identifier))
        .unwrap_or_else(|| format!("content:{}:{}", ordinal, content_hash_hex(content)))
}

/// A passage paired with its cross-encoder relevance score (higher is more relevant).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPassage {
    #[serde(flatten)]
    pub passage: Passage,
    pub score: f32,
}

impl ScoredPassage {
    pub fn new(passage: Passage, score: f32) -> Self {
        Self { passage, score }
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.passage.id
    }
}
