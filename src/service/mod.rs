//! Retrieval orchestration: candidates, cache, rerank, truncate, augment.
//!
//! [`RetrievalService`] is an explicitly constructed component; share it behind an `Arc`. The
//! score cache and the lazily loaded model are its only shared mutable state, and both
//! synchronize internally.
//!
//! Per request the steps run strictly in order:
//!
//! 1. fetch up to `k_retrieve` candidates (source failures degrade, never error)
//! 2. no candidates: return an empty result, [`CacheStatus::Skipped`]
//! 3. fingerprint the query and the sorted candidate ids
//! 4. cache hit covering every candidate: reorder by the cached scores
//! 5. otherwise rerank the full set and store the full scored list
//! 6. truncate to `k_return`
//! 7. optionally fetch full documents for the entities the results reference
//!
//! Steps 1 to 6 run under the request timeout. Step 7 gets whatever time is left; running out
//! there reports the fetch as failed and keeps the ranking. The cache is written only after a
//! complete rerank, so a request that times out before that leaves nothing behind.

pub mod error;
pub mod types;


pub use error::RetrievalError;
pub use types::{
    Augmentation, ContextResponse, HealthStatus, RerankRequest, RerankResponse, ServiceConfig,
    ServiceStats,
};

use std::collections::BTreeSet;
use std::future::Future;

use futures_util::future::join_all;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::cache::{CacheKey, CacheStatus, ScoreCache};
use crate::documents::DocumentStore;
use crate::passage::ScoredPassage;
use crate::scoring::{CrossEncoderScorer, ScoringModel, apply_order, rank_indices};
use crate::search::CandidateSource;

pub struct RetrievalService<C, D, M: ScoringModel> {
    candidates: C,
    documents: D,
    scorer: CrossEncoderScorer<M>,
    cache: ScoreCache,
    config: ServiceConfig,
}

impl<C, D, M> std::fmt::Debug for RetrievalService<C, D, M>
where
    M: ScoringModel,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalService")
            .field("scorer", &self.scorer)
            .field("cache", &self.cache)
            .field("config", &self.config)
            .finish()
    }
}

impl<C, D, M> RetrievalService<C, D, M>
where
    C: CandidateSource,
    D: DocumentStore,
    M: ScoringModel,
{
    pub fn new(
        candidates: C,
        documents: D,
        scorer: CrossEncoderScorer<M>,
        cache: ScoreCache,
        config: ServiceConfig,
    ) -> Self {
        Self {
            candidates,
            documents,
            scorer,
            cache,
            config,
        }
    }

    pub fn candidates(&self) -> &C {
        &self.candidates
    }

    pub fn documents(&self) -> &D {
        &self.documents
    }

    pub fn scorer(&self) -> &CrossEncoderScorer<M> {
        &self.scorer
    }

    pub fn cache(&self) -> &ScoreCache {
        &self.cache
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Reranks `request.query` against the corpus.
    #[instrument(
        skip_all,
        fields(
            query_len = request.query.len(),
            k_retrieve = request.k_retrieve,
            k_return = request.k_return
        )
    )]
    pub async fn rerank(&self, request: &RerankRequest) -> Result<RerankResponse, RetrievalError> {
        request.validate()?;
        self.with_timeout(self.rank(request)).await
    }

    /// Like [`rerank`](Self::rerank), then fetches full documents for the entities referenced
    /// by the returned passages when `include_full_documents` is set.
    ///
    /// A failed fetch, or one still running at the request deadline, is reported as
    /// [`Augmentation::Failed`]; the ranking is returned as is.
    #[instrument(
        skip_all,
        fields(
            query_len = request.query.len(),
            include_full_documents = include_full_documents
        )
    )]
    pub async fn rerank_with_context(
        &self,
        request: &RerankRequest,
        include_full_documents: bool,
    ) -> Result<ContextResponse, RetrievalError> {
        request.validate()?;
        let deadline = Instant::now() + self.config.timeout;
        let response = self.with_deadline(deadline, self.rank(request)).await?;

        let full_documents = if include_full_documents {
            tokio::time::timeout_at(deadline, self.augment(&response.results))
                .await
                .unwrap_or_else(|_| {
                    warn!("Full document fetch ran past the request deadline");
                    Augmentation::Failed {
                        reason: "timed out".to_string(),
                    }
                })
        } else {
            Augmentation::NotRequested
        };

        Ok(ContextResponse {
            response,
            full_documents,
        })
    }

    /// Runs independent requests concurrently; results keep the input order.
    pub async fn rerank_batch(
        &self,
        requests: &[RerankRequest],
    ) -> Vec<Result<RerankResponse, RetrievalError>> {
        debug!(batch_size = requests.len(), "Reranking batch");
        join_all(requests.iter().map(|request| self.rerank(request))).await
    }

    pub fn stats(&self) -> ServiceStats {
        let cache = self.cache.stats();
        let (model_name, device, model_loaded) = match self.scorer.identity() {
            Some(identity) => (identity.name, identity.device, true),
            None => (self.config.model_name.clone(), "unloaded".to_string(), false),
        };

        ServiceStats {
            model_name,
            device,
            model_loaded,
            cache_hits: cache.hits,
            cache_misses: cache.misses,
            cache_size: cache.size,
        }
    }

    /// Loads the model if needed and reports whether it is usable.
    pub async fn health(&self) -> HealthStatus {
        match tokio::time::timeout(self.config.timeout, self.scorer.model()).await {
            Ok(Ok(model)) => HealthStatus::Healthy {
                model: model.identity(),
            },
            Ok(Err(e)) => {
                warn!(error = %e, "Health check failed");
                HealthStatus::Unhealthy {
                    reason: e.to_string(),
                }
            }
            Err(_) => HealthStatus::Unhealthy {
                reason: format!(
                    "model did not load within {} ms",
                    self.config.timeout.as_millis()
                ),
            },
        }
    }

    async fn with_timeout<T, F>(&self, work: F) -> Result<T, RetrievalError>
    where
        F: Future<Output = Result<T, RetrievalError>>,
    {
        self.with_deadline(Instant::now() + self.config.timeout, work)
            .await
    }

    async fn with_deadline<T, F>(&self, deadline: Instant, work: F) -> Result<T, RetrievalError>
    where
        F: Future<Output = Result<T, RetrievalError>>,
    {
        tokio::time::timeout_at(deadline, work)
            .await
            .unwrap_or_else(|_| {
                let timeout_ms = self.config.timeout.as_millis() as u64;
                warn!(timeout_ms, "Request timed out");
                Err(RetrievalError::Timeout { timeout_ms })
            })
    }

    async fn rank(&self, request: &RerankRequest) -> Result<RerankResponse, RetrievalError> {
        let candidates = self
            .candidates
            .candidates(&request.query, request.k_retrieve, &request.filter)
            .await;

        if candidates.is_empty() {
            debug!(
                degraded = candidates.is_degraded(),
                "No candidates, skipping rerank"
            );
            return Ok(RerankResponse::empty(request.query.clone()));
        }

        let passages = candidates.passages;
        let (key, cached) = {
            let ids: Vec<&str> = passages.iter().map(|p| p.id.as_str()).collect();
            let key = CacheKey::new(&request.query, &ids);
            (key, self.cache.lookup(&key, &ids))
        };

        let (mut ranked, cache_status) = match cached {
            Some(scores) => {
                let order = rank_indices(&scores);
                let scored: Vec<ScoredPassage> = passages
                    .into_iter()
                    .zip(scores)
                    .map(|(passage, score)| ScoredPassage::new(passage, score))
                    .collect();
                (apply_order(scored, &order), CacheStatus::Hit)
            }
            None => {
                let ranked = self.scorer.score_all(&request.query, passages).await?;
                self.cache.set(
                    key,
                    ranked
                        .iter()
                        .map(|p| (p.id().to_string(), p.score))
                        .collect(),
                );
                (ranked, CacheStatus::Miss)
            }
        };

        let candidate_count = ranked.len();
        ranked.truncate(request.k_return);

        info!(
            candidates = candidate_count,
            returned = ranked.len(),
            cache = %cache_status,
            "Rerank complete"
        );

        Ok(RerankResponse {
            query: request.query.clone(),
            results: ranked,
            cache_status,
        })
    }

    async fn augment(&self, results: &[ScoredPassage]) -> Augmentation {
        let entity_ids: Vec<String> = results
            .iter()
            .filter_map(|p| p.passage.entity_id(&self.config.entity_key))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        if entity_ids.is_empty() {
            return Augmentation::Empty;
        }

        match self.documents.fetch_full_documents(&entity_ids).await {
            Ok(documents) if documents.is_empty() => Augmentation::Empty,
            Ok(documents) => {
                debug!(
                    entities = entity_ids.len(),
                    documents = documents.len(),
                    "Augmented results"
                );
                Augmentation::Fetched { documents }
            }
            Err(e) => {
                warn!(error = %e, entities = entity_ids.len(), "Full document fetch failed");
                Augmentation::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}
