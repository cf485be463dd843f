use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use tracing::{debug, info};

use super::{DocumentStore, DocumentStoreError, FullDocument};

/// Document store held in memory, keyed by entity id.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    documents: RwLock<HashMap<String, Vec<FullDocument>>>,
    unavailable: AtomicBool,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_documents<I: IntoIterator<Item = FullDocument>>(documents: I) -> Self {
        let store = Self::new();
        for document in documents {
            store.insert(document);
        }
        store
    }

    /// Loads a JSON array of [`FullDocument`]s.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self, DocumentStoreError> {
        let path = path.as_ref();
        let load_error = |reason: String| DocumentStoreError::LoadFailed {
            path: path.display().to_string(),
            reason,
        };

        let raw = std::fs::read_to_string(path).map_err(|e| load_error(e.to_string()))?;
        let documents: Vec<FullDocument> =
            serde_json::from_str(&raw).map_err(|e| load_error(e.to_string()))?;

        let store = Self::from_documents(documents);
        info!(path = %path.display(), entities = store.entity_count(), "Loaded document store");
        Ok(store)
    }

    /// Adds a document; one entity may own several.
    pub fn insert(&self, document: FullDocument) {
        self.documents
            .write()
            .entry(document.entity_id.clone())
            .or_default()
            .push(document);
    }

    pub fn entity_count(&self) -> usize {
        self.documents.read().len()
    }

    /// Makes every fetch fail, for exercising degraded augmentation.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

impl DocumentStore for InMemoryDocumentStore {
    async fn fetch_full_documents(
        &self,
        entity_ids: &[String],
    ) -> Result<Vec<FullDocument>, DocumentStoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DocumentStoreError::Unavailable {
                reason: "store marked unavailable".to_string(),
            });
        }

        let documents = self.documents.read();
        let found: Vec<FullDocument> = entity_ids
            .iter()
            .filter_map(|id| documents.get(id))
            .flatten()
            .cloned()
            .collect();

        debug!(requested = entity_ids.len(), found = found.len(), "Fetched full documents");
        Ok(found)
    }
}
