use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use crate::passage::MetadataFilter;
use crate::vectordb::{SearchResult, VectorDbClient, VectorDbError, VectorPoint};

/// In-memory stand-in for Qdrant: brute-force cosine search with post-filtering.
#[derive(Default)]
pub struct MockVectorDbClient {
    collections: RwLock<HashMap<String, HashMap<u64, VectorPoint>>>,
    unavailable: AtomicBool,
}

impl MockVectorDbClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn point_count(&self, collection: &str) -> Option<usize> {
        self.collections.read().get(collection).map(HashMap::len)
    }

    /// Makes every subsequent call fail with `ConnectionFailed`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), VectorDbError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(VectorDbError::ConnectionFailed {
                url: "mock://qdrant".to_string(),
                message: "backend marked unavailable".to_string(),
            });
        }
        Ok(())
    }
}

impl VectorDbClient for MockVectorDbClient {
    async fn health_check(&self) -> Result<(), VectorDbError> {
        self.check_available()
    }

    async fn upsert_points(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
    ) -> Result<(), VectorDbError> {
        self.check_available()?;
        let mut collections = self.collections.write();
        let coll = collections.entry(collection.to_string()).or_default();

        for point in points {
            if let Some(existing) = coll.values().next()
                && existing.vector.len() != point.vector.len()
            {
                return Err(VectorDbError::InvalidDimension {
                    expected: existing.vector.len(),
                    actual: point.vector.len(),
                });
            }
            coll.insert(point.id, point);
        }

        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        query: Vec<f32>,
        limit: u64,
        filter: &MetadataFilter,
    ) -> Result<Vec<SearchResult>, VectorDbError> {
        self.check_available()?;
        let collections = self.collections.read();
        let coll = collections
            .get(collection)
            .ok_or_else(|| VectorDbError::CollectionNotFound {
                collection: collection.to_string(),
            })?;

        let mut results: Vec<(u64, SearchResult)> = coll
            .values()
            .filter(|p| filter.matches(&p.passage.metadata))
            .map(|p| {
                (
                    p.id,
                    SearchResult {
                        score: cosine_similarity(&query, &p.vector),
                        passage: p.passage.clone(),
                    },
                )
            })
            .collect();

        results.sort_by(|(a_id, a), (b_id, b)| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a_id.cmp(b_id))
        });

        results.truncate(limit as usize);
        Ok(results.into_iter().map(|(_, hit)| hit).collect())
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product / (norm_a * norm_b)
    }
}
