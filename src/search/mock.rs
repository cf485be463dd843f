use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};

use super::error::SearchError;
use super::hybrid::{CandidateSource, Candidates};
use super::lexical::{LexicalMode, LexicalSearch};
use super::semantic::SemanticSearch;
use crate::passage::{MetadataFilter, Passage};

fn filtered(passages: &[Passage], k: usize, filter: &MetadataFilter) -> Vec<Passage> {
    passages
        .iter()
        .filter(|p| filter.matches(&p.metadata))
        .take(k)
        .cloned()
        .collect()
}

/// Semantic source returning a fixed ranked list.
#[derive(Debug, Default)]
pub struct MockSemanticSearch {
    passages: Vec<Passage>,
    fail: bool,
    calls: AtomicUsize,
}

impl MockSemanticSearch {
    pub fn new(passages: Vec<Passage>) -> Self {
        Self {
            passages,
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SemanticSearch for MockSemanticSearch {
    async fn search(
        &self,
        _query: &str,
        k: usize,
        filter: &MetadataFilter,
    ) -> Result<Vec<Passage>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(SearchError::Semantic {
                reason: "mock semantic backend unavailable".to_string(),
            });
        }
        Ok(filtered(&self.passages, k, filter))
    }
}

/// Lexical source returning a fixed ranked list and recording the requested mode.
#[derive(Debug, Default)]
pub struct MockLexicalSearch {
    passages: Vec<Passage>,
    fail: bool,
    last_mode: Mutex<Option<LexicalMode>>,
}

impl MockLexicalSearch {
    pub fn new(passages: Vec<Passage>) -> Self {
        Self {
            passages,
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn last_mode(&self) -> Option<LexicalMode> {
        *self.last_mode.lock()
    }
}

impl LexicalSearch for MockLexicalSearch {
    async fn search(
        &self,
        _query: &str,
        k: usize,
        filter: &MetadataFilter,
        mode: LexicalMode,
    ) -> Result<Vec<Passage>, SearchError> {
        *self.last_mode.lock() = Some(mode);
        if self.fail {
            return Err(SearchError::Lexical {
                reason: "mock lexical backend unavailable".to_string(),
            });
        }
        Ok(filtered(&self.passages, k, filter))
    }
}

/// Candidate source with a replaceable passage list and optional latency.
#[derive(Debug, Default)]
pub struct MockCandidateSource {
    passages: RwLock<Vec<Passage>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockCandidateSource {
    pub fn new(passages: Vec<Passage>) -> Self {
        Self {
            passages: RwLock::new(passages),
            ..Default::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_passages(&self, passages: Vec<Passage>) {
        *self.passages.write() = passages;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CandidateSource for MockCandidateSource {
    async fn candidates(&self, _query: &str, k: usize, filter: &MetadataFilter) -> Candidates {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let passages = filtered(&self.passages.read(), k, filter);
        let hits = passages.len();
        Candidates::new(passages, Some(hits), Some(0))
    }
}
