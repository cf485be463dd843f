//! Full source documents for result augmentation.
//!
//! Fetching is strictly additive: it runs after ranking and its failure never changes which
//! passages were selected.

pub mod error;
pub mod memory;

#[cfg(test)]
mod tests;

pub use error::DocumentStoreError;
pub use memory::InMemoryDocumentStore;

use std::future::Future;

use serde::{Deserialize, Serialize};

/// A complete source record for one entity (for example one patient's chart).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullDocument {
    pub entity_id: String,
    #[serde(default)]
    pub source_name: Option<String>,
    pub body: serde_json::Value,
}

impl FullDocument {
    pub fn new(entity_id: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            entity_id: entity_id.into(),
            source_name: None,
            body,
        }
    }

    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = Some(name.into());
        self
    }
}

/// Lookup of full documents by entity id.
pub trait DocumentStore: Send + Sync {
    /// Returns the documents for `entity_ids`; unknown ids are skipped, not errors.
    fn fetch_full_documents(
        &self,
        entity_ids: &[String],
    ) -> impl Future<Output = Result<Vec<FullDocument>, DocumentStoreError>> + Send;
}
