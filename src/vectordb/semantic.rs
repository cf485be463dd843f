use std::sync::Arc;

use tracing::debug;

use super::client::VectorDbClient;
use super::error::VectorDbError;
use crate::embedding::{EmbeddingError, QueryEmbedder};
use crate::passage::{MetadataFilter, Passage};
use crate::search::{SearchError, SemanticSearch};

/// Semantic source backed by a vector collection.
///
/// The query is embedded on the blocking pool, then searched with the metadata filter pushed
/// down to the backend.
pub struct VectorSemanticSearch<C, E> {
    client: C,
    embedder: Arc<E>,
    collection: String,
}

impl<C: VectorDbClient, E: QueryEmbedder> VectorSemanticSearch<C, E> {
    pub fn new(client: C, embedder: Arc<E>, collection: impl Into<String>) -> Self {
        Self {
            client,
            embedder,
            collection: collection.into(),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    async fn embed(&self, query: &str) -> Result<Vec<f32>, SearchError> {
        let embedder = Arc::clone(&self.embedder);
        let query = query.to_string();
        let vector = tokio::task::spawn_blocking(move || embedder.embed_query(&query))
            .await
            .map_err(|e| EmbeddingError::InferenceFailed {
                reason: format!("embedding task failed: {e}"),
            })??;

        let expected = self.embedder.dimension();
        if vector.len() != expected {
            return Err(VectorDbError::InvalidDimension {
                expected,
                actual: vector.len(),
            }
            .into());
        }
        Ok(vector)
    }
}

impl<C: VectorDbClient, E: QueryEmbedder> SemanticSearch for VectorSemanticSearch<C, E> {
    async fn search(
        &self,
        query: &str,
        k: usize,
        filter: &MetadataFilter,
    ) -> Result<Vec<Passage>, SearchError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let vector = self.embed(query).await?;
        let hits = self
            .client
            .search(&self.collection, vector, k as u64, filter)
            .await?;

        debug!(
            collection = %self.collection,
            hits = hits.len(),
            top_similarity = hits.first().map(|h| h.score),
            "Vector search"
        );

        Ok(hits.into_iter().map(|hit| hit.passage).collect())
    }
}
