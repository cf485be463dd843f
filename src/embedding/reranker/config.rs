use std::path::PathBuf;

use crate::constants::{DEFAULT_RERANKER_BATCH_SIZE, DEFAULT_RERANKER_MODEL, RERANKER_MAX_SEQ_LEN};

pub const MAX_SEQ_LEN: usize = RERANKER_MAX_SEQ_LEN;

#[derive(Debug, Clone)]
pub struct RerankerConfig {
    /// Cross-encoder directory (BERT weights + tokenizer). `None` selects the stub scorer.
    pub model_path: Option<PathBuf>,

    /// Name reported in stats and health output.
    pub model_name: String,

    /// Pairs per forward pass.
    pub batch_size: usize,

    /// Map raw logits through a sigmoid.
    pub apply_sigmoid: bool,
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            model_name: DEFAULT_RERANKER_MODEL.to_string(),
            batch_size: DEFAULT_RERANKER_BATCH_SIZE,
            apply_sigmoid: true,
        }
    }
}

impl RerankerConfig {
    pub fn new<P: Into<PathBuf>>(model_path: P) -> Self {
        let model_path = model_path.into();
        let model_name = model_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_RERANKER_MODEL.to_string());

        Self {
            model_path: Some(model_path),
            model_name,
            ..Default::default()
        }
    }

    pub fn stub() -> Self {
        Self {
            model_name: "stub-lexical-overlap".to_string(),
            ..Default::default()
        }
    }

    pub fn with_model_name(mut self, name: impl Into<String>) -> Self {
        self.model_name = name.into();
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        assert!(batch_size > 0, "batch_size must be greater than zero");
        self.batch_size = batch_size;
        self
    }

    pub fn with_sigmoid(mut self, apply_sigmoid: bool) -> Self {
        self.apply_sigmoid = apply_sigmoid;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.batch_size == 0 {
            return Err("batch_size must be greater than zero".to_string());
        }

        if self.model_name.trim().is_empty() {
            return Err("model_name cannot be empty".to_string());
        }

        if let Some(ref path) = self.model_path
            && path.as_os_str().is_empty()
        {
            return Err("model_path cannot be empty when provided".to_string());
        }

        Ok(())
    }
}
