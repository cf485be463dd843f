//! Query encoder used by semantic search.
//!
//! Loads a BERT-family sentence encoder with candle and mean-pools the last hidden layer.
//! Without a model directory it runs as a deterministic stub: the query is hashed into a seed
//! and expanded into a unit vector, which is enough to exercise the vector store end to end.

pub mod config;


pub use config::EncoderConfig;

use candle_core::{Device, Tensor};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use crate::embedding::bert::BertEncoder;
use crate::embedding::device::select_device;
use crate::embedding::error::EmbeddingError;
use crate::embedding::utils::{load_tokenizer_with_truncation, missing_model_file};
use crate::hashing::content_hash_hex;

enum EncoderBackend {
    Model {
        model: BertEncoder,
        tokenizer: Tokenizer,
        device: Device,
    },
    Stub {
        dim: usize,
    },
}

/// Turns query text into a vector for the semantic backend.
pub trait QueryEmbedder: Send + Sync + 'static {
    fn embed_query(&self, query: &str) -> Result<Vec<f32>, EmbeddingError>;

    fn dimension(&self) -> usize;
}

pub struct QueryEncoder {
    backend: EncoderBackend,
    config: EncoderConfig,
}

impl std::fmt::Debug for QueryEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let backend = match &self.backend {
            EncoderBackend::Model { device, .. } => format!("Model({:?})", device),
            EncoderBackend::Stub { dim } => format!("Stub(dim={dim})"),
        };
        f.debug_struct("QueryEncoder")
            .field("backend", &backend)
            .field("max_seq_len", &self.config.max_seq_len)
            .finish()
    }
}

impl QueryEncoder {
    pub fn load(config: EncoderConfig) -> Result<Self, EmbeddingError> {
        config.validate()?;

        let Some(model_path) = config.model_path.clone() else {
            warn!("No encoder model path configured, query encoder running in stub mode");
            return Ok(Self {
                backend: EncoderBackend::Stub {
                    dim: config.stub_dim,
                },
                config,
            });
        };

        if !model_path.is_dir() {
            return Err(EmbeddingError::ModelNotFound { path: model_path });
        }
        if let Some(file) = missing_model_file(&model_path) {
            return Err(EmbeddingError::ModelLoadFailed {
                reason: format!("Missing {} in {}", file, model_path.display()),
            });
        }

        let device = select_device()?;
        debug!(?device, "Selected compute device for query encoder");

        let model = BertEncoder::load(&model_path, &device).map_err(|e| {
            EmbeddingError::ModelLoadFailed {
                reason: format!("Failed to load BERT encoder: {}", e),
            }
        })?;
        let tokenizer = load_tokenizer_with_truncation(&model_path, config.max_seq_len)
            .map_err(|e| EmbeddingError::TokenizationFailed {
                reason: format!("Failed to load tokenizer: {}", e),
            })?;

        info!(
            model_path = %model_path.display(),
            hidden_size = model.hidden_size(),
            "Query encoder loaded"
        );

        Ok(Self {
            backend: EncoderBackend::Model {
                model,
                tokenizer,
                device,
            },
            config,
        })
    }

    pub fn stub() -> Result<Self, EmbeddingError> {
        Self::load(EncoderConfig::stub())
    }

    pub fn is_stub(&self) -> bool {
        matches!(self.backend, EncoderBackend::Stub { .. })
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    fn encode_with_model(
        &self,
        query: &str,
        model: &BertEncoder,
        tokenizer: &Tokenizer,
        device: &Device,
    ) -> Result<Vec<f32>, EmbeddingError> {
        let encoding =
            tokenizer
                .encode(query, true)
                .map_err(|e| EmbeddingError::TokenizationFailed {
                    reason: e.to_string(),
                })?;

        if encoding.get_ids().is_empty() {
            return Ok(vec![0.0; model.hidden_size()]);
        }

        let input_ids = Tensor::new(encoding.get_ids(), device)?.unsqueeze(0)?;
        let type_ids = Tensor::new(encoding.get_type_ids(), device)?.unsqueeze(0)?;
        let attention_mask = Tensor::new(encoding.get_attention_mask(), device)?.unsqueeze(0)?;

        let pooled = model.forward(&input_ids, &type_ids, &attention_mask)?;
        let embedding = pooled.squeeze(0)?.to_vec1::<f32>()?;

        Ok(normalize(embedding))
    }

    fn encode_stub(&self, query: &str, dim: usize) -> Vec<f32> {
        let hex = content_hash_hex(query);
        let mut state = u64::from_str_radix(&hex[..16], 16).unwrap_or(0);

        let embedding = (0..dim)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
                ((state >> 32) as f32 / u32::MAX as f32) * 2.0 - 1.0
            })
            .collect();

        normalize(embedding)
    }
}

impl QueryEmbedder for QueryEncoder {
    fn embed_query(&self, query: &str) -> Result<Vec<f32>, EmbeddingError> {
        debug!(query_len = query.len(), stub = self.is_stub(), "Encoding query");
        match &self.backend {
            EncoderBackend::Model {
                model,
                tokenizer,
                device,
            } => self.encode_with_model(query, model, tokenizer, device),
            EncoderBackend::Stub { dim } => Ok(self.encode_stub(query, *dim)),
        }
    }

    fn dimension(&self) -> usize {
        match &self.backend {
            EncoderBackend::Model { model, .. } => model.hidden_size(),
            EncoderBackend::Stub { dim } => *dim,
        }
    }
}

fn normalize(mut embedding: Vec<f32>) -> Vec<f32> {
    let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut embedding {
            *x /= norm;
        }
    }
    embedding
}
