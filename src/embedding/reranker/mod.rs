pub mod config;
pub mod error;


pub use config::{MAX_SEQ_LEN, RerankerConfig};
pub use error::RerankerError;

use std::collections::HashSet;

use candle_core::{Device, Tensor};
use tokenizers::{Encoding, Tokenizer};
use tracing::{debug, info};

use crate::embedding::bert::BertClassifier;
use crate::embedding::device::{device_label, select_device};
use crate::embedding::utils::{load_batch_tokenizer, missing_model_file};
use crate::scoring::{ModelIdentity, ScoringModel};

/// Cross-encoder relevance model over (query, passage) pairs.
pub struct Reranker {
    device: Device,
    config: RerankerConfig,
    model: Option<BertClassifier>,
    tokenizer: Option<Tokenizer>,
}

impl std::fmt::Debug for Reranker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reranker")
            .field("device", &format!("{:?}", self.device))
            .field("config", &self.config)
            .field("model_loaded", &self.is_model_loaded())
            .finish()
    }
}

impl Reranker {
    pub fn load(config: RerankerConfig) -> Result<Self, RerankerError> {
        if let Err(msg) = config.validate() {
            return Err(RerankerError::InvalidConfig { reason: msg });
        }

        let device = select_device()?;
        debug!(?device, "Selected compute device for reranker");

        let Some(model_path) = config.model_path.clone() else {
            info!("No reranker model path configured, operating in stub mode");
            return Ok(Self {
                device,
                config,
                model: None,
                tokenizer: None,
            });
        };

        if !model_path.exists() {
            return Err(RerankerError::ModelLoadFailed {
                reason: format!("Reranker model path not found: {}", model_path.display()),
            });
        }
        if let Some(file) = missing_model_file(&model_path) {
            return Err(RerankerError::ModelLoadFailed {
                reason: format!("Missing {} in {}", file, model_path.display()),
            });
        }

        info!(
            model_path = %model_path.display(),
            model_name = %config.model_name,
            batch_size = config.batch_size,
            "Loading reranker model"
        );

        let model = BertClassifier::load(&model_path, &device).map_err(|e| {
            RerankerError::ModelLoadFailed {
                reason: format!("Failed to load BERT model: {}", e),
            }
        })?;

        let tokenizer = load_batch_tokenizer(&model_path, MAX_SEQ_LEN).map_err(|e| {
            RerankerError::ModelLoadFailed {
                reason: format!("Failed to load tokenizer: {}", e),
            }
        })?;

        info!(model_name = %config.model_name, "Reranker model loaded successfully");

        Ok(Self {
            device,
            config,
            model: Some(model),
            tokenizer: Some(tokenizer),
        })
    }

    pub fn stub() -> Result<Self, RerankerError> {
        Self::load(RerankerConfig::stub())
    }

    pub fn is_model_loaded(&self) -> bool {
        self.model.is_some()
    }

    pub fn config(&self) -> &RerankerConfig {
        &self.config
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Scores one batch of pairs in a single forward pass.
    fn score_batch(
        &self,
        model: &BertClassifier,
        tokenizer: &Tokenizer,
        query: &str,
        contents: &[&str],
    ) -> Result<Vec<f32>, RerankerError> {
        let pairs: Vec<(&str, &str)> = contents.iter().map(|content| (query, *content)).collect();
        let encodings = tokenizer.encode_batch(pairs, true).map_err(|e| {
            RerankerError::TokenizationFailed {
                reason: e.to_string(),
            }
        })?;

        let token_ids = stack(&encodings, Encoding::get_ids, &self.device)?;
        let type_ids = stack(&encodings, Encoding::get_type_ids, &self.device)?;
        let attention_mask = stack(&encodings, Encoding::get_attention_mask, &self.device)?;

        let logits = model
            .forward(&token_ids, &type_ids, Some(&attention_mask))
            .map_err(|e| RerankerError::InferenceFailed {
                reason: e.to_string(),
            })?;

        let logits = logits.flatten_all()?.to_vec1::<f32>()?;
        if self.config.apply_sigmoid {
            Ok(logits.into_iter().map(sigmoid).collect())
        } else {
            Ok(logits)
        }
    }

    fn compute_placeholder_score(&self, query: &str, candidate: &str) -> f32 {
        let stop_words: HashSet<&str> = [
            "a", "an", "the", "is", "are", "was", "were", "be", "been", "being", "have", "has",
            "had", "do", "does", "did", "will", "would", "could", "should", "may", "might", "must",
            "can", "to", "of", "in", "for", "on", "with", "at", "by", "from", "as", "into",
            "then", "here", "there", "when", "where", "why", "how", "all", "each", "other",
            "some", "such", "no", "nor", "not", "only", "so", "than", "too", "very", "just", "and",
            "but", "if", "or", "because", "while", "what", "which", "who", "whom", "this", "that",
            "these", "those", "am", "it", "its",
        ]
        .into_iter()
        .collect();

        let query_lower = query.to_lowercase();
        let query_words: HashSet<&str> = query_lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty() && !stop_words.contains(w))
            .collect();

        let candidate_lower = candidate.to_lowercase();
        let candidate_words: HashSet<&str> = candidate_lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty() && !stop_words.contains(w))
            .collect();

        if query_words.is_empty() {
            let len_ratio = (query.len().min(candidate.len()) as f32)
                / (query.len().max(candidate.len()).max(1) as f32);
            return len_ratio * 0.3;
        }

        let matches = query_words.intersection(&candidate_words).count();
        let recall = matches as f32 / query_words.len() as f32;

        let union = query_words.union(&candidate_words).count();
        let jaccard = if union > 0 {
            matches as f32 / union as f32
        } else {
            0.0
        };

        let base_score = 0.6 * recall + 0.4 * jaccard;

        sigmoid(8.0 * (base_score - 0.5)).clamp(0.0, 1.0)
    }
}

impl ScoringModel for Reranker {
    fn identity(&self) -> ModelIdentity {
        ModelIdentity::new(&self.config.model_name, device_label(&self.device))
    }

    fn score(&self, query: &str, contents: &[&str]) -> Result<Vec<f32>, RerankerError> {
        debug!(
            query_len = query.len(),
            num_passages = contents.len(),
            model_loaded = self.is_model_loaded(),
            "Scoring passages"
        );

        let (Some(model), Some(tokenizer)) = (&self.model, &self.tokenizer) else {
            return Ok(contents
                .iter()
                .map(|content| self.compute_placeholder_score(query, content))
                .collect());
        };

        let mut scores = Vec::with_capacity(contents.len());
        for batch in contents.chunks(self.config.batch_size) {
            let batch_scores = self.score_batch(model, tokenizer, query, batch)?;
            if batch_scores.len() != batch.len() {
                return Err(RerankerError::ScoreCountMismatch {
                    expected: batch.len(),
                    actual: batch_scores.len(),
                });
            }
            scores.extend(batch_scores);
        }

        Ok(scores)
    }
}

fn stack(
    encodings: &[Encoding],
    field: fn(&Encoding) -> &[u32],
    device: &Device,
) -> Result<Tensor, RerankerError> {
    let seq_len = encodings.first().map(|e| field(e).len()).unwrap_or(0);
    let flat: Vec<u32> = encodings
        .iter()
        .flat_map(|e| field(e).iter().copied())
        .collect();

    if flat.len() != seq_len * encodings.len() {
        return Err(RerankerError::TokenizationFailed {
            reason: "batch encodings are not padded to a common length".to_string(),
        });
    }

    Ok(Tensor::from_vec(flat, (encodings.len(), seq_len), device)?)
}

#[inline]
fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
