//! Environment-backed configuration.
//!
//! Every setting has a default. Override with `RERANK_*` environment variables.

pub mod error;


pub use error::ConfigError;

use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::cache::ScoreCache;
use crate::constants::{
    DEFAULT_CACHE_MAX_SIZE, DEFAULT_CACHE_TTL_SECS, DEFAULT_COLLECTION_NAME, DEFAULT_ENTITY_KEY,
    DEFAULT_K_RETRIEVE, DEFAULT_K_RETURN, DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_RERANKER_BATCH_SIZE,
    DEFAULT_SCORING_WORKERS,
};
use crate::embedding::{EncoderConfig, RerankerConfig};
use crate::search::LexicalModePolicy;
use crate::service::{RerankRequest, ServiceConfig};

/// Default Qdrant URL used when `RERANK_QDRANT_URL` is not set.
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";

/// Service configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read `RERANK_*` overrides on top of defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Qdrant endpoint URL. Default: `http://localhost:6334`.
    pub qdrant_url: String,

    /// Collection holding passage vectors. Default: `passages`.
    pub collection: String,

    /// Query encoder directory (BERT + tokenizer). `None` uses the hashed stub encoder.
    pub encoder_path: Option<PathBuf>,

    /// Cross-encoder directory (BERT + classifier head + tokenizer). `None` uses the stub.
    pub reranker_path: Option<PathBuf>,

    /// Overrides the model name reported in stats.
    pub reranker_model: Option<String>,

    /// Pairs per cross-encoder forward pass. Default: `32`.
    pub reranker_batch_size: usize,

    /// Concurrent inference jobs. Default: `2`.
    pub scoring_workers: usize,

    /// Default candidate count per request. Default: `50`.
    pub k_retrieve: usize,

    /// Default result count per request. Default: `10`.
    pub k_return: usize,

    /// Score cache entry lifetime. Default: one hour.
    pub cache_ttl: Duration,

    /// Max score cache entries. Default: `10_000`.
    pub cache_max_size: u64,

    /// Bound on one whole request. Default: 30 s.
    pub request_timeout: Duration,

    /// Metadata key naming the source entity. Default: `patient_id`.
    pub entity_key: String,

    /// Lexical query mode selection. Default: auto.
    pub lexical_mode: LexicalModePolicy,

    /// JSONL passages for the in-memory lexical index.
    pub corpus_path: Option<PathBuf>,

    /// JSON array of full documents for augmentation.
    pub documents_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            qdrant_url: DEFAULT_QDRANT_URL.to_string(),
            collection: DEFAULT_COLLECTION_NAME.to_string(),
            encoder_path: None,
            reranker_path: None,
            reranker_model: None,
            reranker_batch_size: DEFAULT_RERANKER_BATCH_SIZE,
            scoring_workers: DEFAULT_SCORING_WORKERS,
            k_retrieve: DEFAULT_K_RETRIEVE,
            k_return: DEFAULT_K_RETURN,
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            cache_max_size: DEFAULT_CACHE_MAX_SIZE,
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            entity_key: DEFAULT_ENTITY_KEY.to_string(),
            lexical_mode: LexicalModePolicy::Auto,
            corpus_path: None,
            documents_path: None,
        }
    }
}

impl Config {
    const ENV_QDRANT_URL: &'static str = "RERANK_QDRANT_URL";
    const ENV_COLLECTION: &'static str = "RERANK_COLLECTION";
    const ENV_ENCODER_PATH: &'static str = "RERANK_ENCODER_PATH";
    const ENV_RERANKER_PATH: &'static str = "RERANK_RERANKER_PATH";
    const ENV_RERANKER_MODEL: &'static str = "RERANK_RERANKER_MODEL";
    const ENV_RERANKER_BATCH_SIZE: &'static str = "RERANK_RERANKER_BATCH_SIZE";
    const ENV_SCORING_WORKERS: &'static str = "RERANK_SCORING_WORKERS";
    const ENV_K_RETRIEVE: &'static str = "RERANK_K_RETRIEVE";
    const ENV_K_RETURN: &'static str = "RERANK_K_RETURN";
    const ENV_CACHE_TTL_SECS: &'static str = "RERANK_CACHE_TTL_SECS";
    const ENV_CACHE_MAX_SIZE: &'static str = "RERANK_CACHE_MAX_SIZE";
    const ENV_TIMEOUT_MS: &'static str = "RERANK_TIMEOUT_MS";
    const ENV_ENTITY_KEY: &'static str = "RERANK_ENTITY_KEY";
    const ENV_LEXICAL_MODE: &'static str = "RERANK_LEXICAL_MODE";
    const ENV_CORPUS_PATH: &'static str = "RERANK_CORPUS_PATH";
    const ENV_DOCUMENTS_PATH: &'static str = "RERANK_DOCUMENTS_PATH";

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let lexical_mode = match Self::parse_optional_string_from_env(Self::ENV_LEXICAL_MODE) {
            Some(value) => {
                value
                    .parse()
                    .map_err(|reason| ConfigError::InvalidValue {
                        name: Self::ENV_LEXICAL_MODE,
                        reason,
                    })?
            }
            None => defaults.lexical_mode,
        };

        Ok(Self {
            qdrant_url: Self::parse_string_from_env(Self::ENV_QDRANT_URL, defaults.qdrant_url),
            collection: Self::parse_string_from_env(Self::ENV_COLLECTION, defaults.collection),
            encoder_path: Self::parse_optional_path_from_env(Self::ENV_ENCODER_PATH),
            reranker_path: Self::parse_optional_path_from_env(Self::ENV_RERANKER_PATH),
            reranker_model: Self::parse_optional_string_from_env(Self::ENV_RERANKER_MODEL),
            reranker_batch_size: Self::parse_number_from_env(
                Self::ENV_RERANKER_BATCH_SIZE,
                defaults.reranker_batch_size,
            )?,
            scoring_workers: Self::parse_number_from_env(
                Self::ENV_SCORING_WORKERS,
                defaults.scoring_workers,
            )?,
            k_retrieve: Self::parse_number_from_env(Self::ENV_K_RETRIEVE, defaults.k_retrieve)?,
            k_return: Self::parse_number_from_env(Self::ENV_K_RETURN, defaults.k_return)?,
            cache_ttl: Duration::from_secs(Self::parse_number_from_env(
                Self::ENV_CACHE_TTL_SECS,
                defaults.cache_ttl.as_secs(),
            )?),
            cache_max_size: Self::parse_number_from_env(
                Self::ENV_CACHE_MAX_SIZE,
                defaults.cache_max_size,
            )?,
            request_timeout: Duration::from_millis(Self::parse_number_from_env(
                Self::ENV_TIMEOUT_MS,
                defaults.request_timeout.as_millis() as u64,
            )?),
            entity_key: Self::parse_string_from_env(Self::ENV_ENTITY_KEY, defaults.entity_key),
            lexical_mode,
            corpus_path: Self::parse_optional_path_from_env(Self::ENV_CORPUS_PATH),
            documents_path: Self::parse_optional_path_from_env(Self::ENV_DOCUMENTS_PATH),
        })
    }

    /// Checks ranges and paths (does not create anything).
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            (Self::ENV_RERANKER_BATCH_SIZE, self.reranker_batch_size as u64),
            (Self::ENV_SCORING_WORKERS, self.scoring_workers as u64),
            (Self::ENV_K_RETRIEVE, self.k_retrieve as u64),
            (Self::ENV_K_RETURN, self.k_return as u64),
            (Self::ENV_CACHE_TTL_SECS, self.cache_ttl.as_secs()),
            (Self::ENV_CACHE_MAX_SIZE, self.cache_max_size),
            (Self::ENV_TIMEOUT_MS, self.request_timeout.as_millis() as u64),
        ];
        if let Some(&(name, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::InvalidValue {
                name,
                reason: "must be greater than zero".to_string(),
            });
        }

        if self.entity_key.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                name: Self::ENV_ENTITY_KEY,
                reason: "cannot be empty".to_string(),
            });
        }

        for dir in [&self.encoder_path, &self.reranker_path].into_iter().flatten() {
            Self::require_dir(dir)?;
        }
        for file in [&self.corpus_path, &self.documents_path].into_iter().flatten() {
            Self::require_file(file)?;
        }

        Ok(())
    }

    pub fn reranker_config(&self) -> RerankerConfig {
        let mut config = match &self.reranker_path {
            Some(path) => RerankerConfig::new(path),
            None => RerankerConfig::stub(),
        };
        if let Some(name) = &self.reranker_model {
            config = config.with_model_name(name);
        }
        config.batch_size = self.reranker_batch_size;
        config
    }

    pub fn encoder_config(&self) -> EncoderConfig {
        match &self.encoder_path {
            Some(path) => EncoderConfig::new(path),
            None => EncoderConfig::stub(),
        }
    }

    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            timeout: self.request_timeout,
            entity_key: self.entity_key.clone(),
            model_name: self.reranker_config().model_name,
        }
    }

    pub fn score_cache(&self) -> ScoreCache {
        ScoreCache::new(self.cache_ttl, self.cache_max_size)
    }

    /// A request for `query` using the configured `k_retrieve`/`k_return`.
    pub fn request(&self, query: impl Into<String>) -> RerankRequest {
        RerankRequest::new(query)
            .with_k_retrieve(self.k_retrieve)
            .with_k_return(self.k_return)
    }

    fn require_dir(path: &Path) -> Result<(), ConfigError> {
        if !path.exists() {
            return Err(ConfigError::PathNotFound {
                path: path.to_path_buf(),
            });
        }
        if !path.is_dir() {
            return Err(ConfigError::NotADirectory {
                path: path.to_path_buf(),
            });
        }
        Ok(())
    }

    fn require_file(path: &Path) -> Result<(), ConfigError> {
        if !path.exists() {
            return Err(ConfigError::PathNotFound {
                path: path.to_path_buf(),
            });
        }
        if !path.is_file() {
            return Err(ConfigError::NotAFile {
                path: path.to_path_buf(),
            });
        }
        Ok(())
    }

    fn parse_optional_path_from_env(var_name: &str) -> Option<PathBuf> {
        Self::parse_optional_string_from_env(var_name).map(PathBuf::from)
    }

    fn parse_optional_string_from_env(var_name: &str) -> Option<String> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_string_from_env(var_name: &str, default: String) -> String {
        Self::parse_optional_string_from_env(var_name).unwrap_or(default)
    }

    fn parse_number_from_env<T>(name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr<Err = std::num::ParseIntError>,
    {
        match Self::parse_optional_string_from_env(name) {
            Some(value) => value
                .parse()
                .map_err(|source| ConfigError::NumberParseError {
                    name,
                    value,
                    source,
                }),
            None => Ok(default),
        }
    }
}
