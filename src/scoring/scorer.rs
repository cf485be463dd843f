use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::{OnceCell, Semaphore};
use tracing::{debug, info, instrument};

use crate::embedding::RerankerError;
use crate::passage::{Passage, ScoredPassage};

use super::model::{ModelIdentity, ScoringModel};
use super::ranking::{apply_order, rank_indices};

type Loader<M> = Arc<dyn Fn() -> Result<M, RerankerError> + Send + Sync>;

/// Shared cross-encoder front end.
///
/// The model is loaded at most once, on first use, and shared by every caller afterwards.
/// Inference runs on the blocking pool; at most `workers` batches run at the same time so a
/// burst of requests cannot starve the async runtime.
pub struct CrossEncoderScorer<M: ScoringModel> {
    model: Arc<OnceCell<Arc<M>>>,
    loader: Loader<M>,
    workers: Arc<Semaphore>,
    worker_count: usize,
}

impl<M: ScoringModel> std::fmt::Debug for CrossEncoderScorer<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrossEncoderScorer")
            .field("initialized", &self.is_initialized())
            .field("workers", &self.worker_count)
            .finish()
    }
}

impl<M: ScoringModel> CrossEncoderScorer<M> {
    /// Creates a scorer that runs `loader` on first use.
    pub fn new<F>(loader: F, workers: usize) -> Self
    where
        F: Fn() -> Result<M, RerankerError> + Send + Sync + 'static,
    {
        let worker_count = workers.max(1);
        Self {
            model: Arc::new(OnceCell::new()),
            loader: Arc::new(loader),
            workers: Arc::new(Semaphore::new(worker_count)),
            worker_count,
        }
    }

    /// Creates a scorer around an already loaded model.
    pub fn with_model(model: M, workers: usize) -> Self {
        let worker_count = workers.max(1);
        Self {
            model: Arc::new(OnceCell::new_with(Some(Arc::new(model)))),
            loader: Arc::new(|| {
                Err(RerankerError::ModelLoadFailed {
                    reason: "scorer was built around a preloaded model".to_string(),
                })
            }),
            workers: Arc::new(Semaphore::new(worker_count)),
            worker_count,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.model.initialized()
    }

    /// Identity of the loaded model, or `None` before first use.
    pub fn identity(&self) -> Option<ModelIdentity> {
        self.model.get().map(|model| model.identity())
    }

    /// Returns the shared model, loading it if this is the first call.
    ///
    /// Concurrent first callers wait on the same load. The load runs in its own task, so a
    /// caller that gives up does not release the guard while construction is still running.
    /// A failed load leaves the cell empty, so the next call retries.
    pub async fn model(&self) -> Result<Arc<M>, RerankerError> {
        if let Some(model) = self.model.get() {
            return Ok(Arc::clone(model));
        }

        let cell = Arc::clone(&self.model);
        let loader = Arc::clone(&self.loader);
        tokio::spawn(async move {
            cell.get_or_try_init(move || async move {
                info!("Loading cross-encoder model");
                let model = tokio::task::spawn_blocking(move || loader())
                    .await
                    .map_err(|e| RerankerError::WorkerFailed {
                        reason: e.to_string(),
                    })??;
                let identity = model.identity();
                info!(model = %identity.name, device = %identity.device, "Cross-encoder ready");
                Ok::<_, RerankerError>(Arc::new(model))
            })
            .await
            .map(Arc::clone)
        })
        .await
        .map_err(|e| RerankerError::WorkerFailed {
            reason: e.to_string(),
        })?
    }

    /// Scores every passage against `query` and returns them best first.
    ///
    /// Equal scores keep their input order.
    #[instrument(skip_all, fields(num_passages = passages.len()))]
    pub async fn score_all(
        &self,
        query: &str,
        passages: Vec<Passage>,
    ) -> Result<Vec<ScoredPassage>, RerankerError> {
        if passages.is_empty() {
            return Ok(Vec::new());
        }

        let model = self.model().await?;
        let permit = Arc::clone(&self.workers)
            .acquire_owned()
            .await
            .map_err(|e| RerankerError::WorkerFailed {
                reason: e.to_string(),
            })?;

        let query = query.to_string();
        let (passages, scores) = tokio::task::spawn_blocking(move || {
            // The permit is released only when inference finishes, even if the caller gave up.
            let _permit = permit;
            let scores = {
                let contents: Vec<&str> = passages.iter().map(|p| p.content.as_str()).collect();
                model.score(&query, &contents)
            };
            (passages, scores)
        })
        .await
        .map_err(|e| RerankerError::WorkerFailed {
            reason: e.to_string(),
        })?;
        let scores = scores?;

        if scores.len() != passages.len() {
            return Err(RerankerError::ScoreCountMismatch {
                expected: passages.len(),
                actual: scores.len(),
            });
        }

        let order = rank_indices(&scores);
        let scored: Vec<ScoredPassage> = passages
            .into_iter()
            .zip(scores)
            .map(|(passage, score)| ScoredPassage::new(passage, score))
            .collect();

        debug!(
            top_score = order.first().map(|&i| scored[i].score),
            "Scored candidate set"
        );

        Ok(apply_order(scored, &order))
    }

    /// Like [`score_all`](Self::score_all), keeping only the best `k`.
    pub async fn rerank(
        &self,
        query: &str,
        passages: Vec<Passage>,
        k: usize,
    ) -> Result<Vec<ScoredPassage>, RerankerError> {
        let mut ranked = self.score_all(query, passages).await?;
        ranked.truncate(k);
        Ok(ranked)
    }

    /// Reranks independent `(query, passages)` pairs concurrently.
    ///
    /// Results come back in input order; one failed pair does not affect the others.
    pub async fn rerank_batch(
        &self,
        pairs: Vec<(String, Vec<Passage>)>,
        k: usize,
    ) -> Vec<Result<Vec<ScoredPassage>, RerankerError>> {
        join_all(
            pairs
                .into_iter()
                .map(|(query, passages)| async move { self.rerank(&query, passages, k).await }),
        )
        .await
    }
}
