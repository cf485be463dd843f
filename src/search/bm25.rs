//! In-process BM25 index used as the lexical source.

use std::collections::{HashMap, HashSet};
use std::io::{BufRead, BufReader};
use std::path::Path;

use bm25::{Document, Language, SearchEngine, SearchEngineBuilder};
use parking_lot::RwLock;
use serde::Deserialize;
use tracing::{debug, info};

use super::error::SearchError;
use super::lexical::{LexicalMode, LexicalSearch, phrase_terms};
use crate::passage::{Metadata, MetadataFilter, Passage};

#[derive(Deserialize)]
struct CorpusRecord {
    #[serde(default)]
    id: Option<String>,
    content: String,
    #[serde(default)]
    metadata: Metadata,
}

struct IndexState {
    engine: SearchEngine<u64>,
    passages: Vec<Passage>,
    positions: HashMap<String, u64>,
}

/// Thread-safe BM25 index over [`Passage`]s.
///
/// Filters are applied after ranking, so a filtered search still returns up to `k` matches.
pub struct Bm25Index {
    state: RwLock<IndexState>,
}

impl std::fmt::Debug for Bm25Index {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bm25Index")
            .field("passages", &self.len())
            .finish()
    }
}

impl Default for Bm25Index {
    fn default() -> Self {
        Self::new()
    }
}

impl Bm25Index {
    pub fn new() -> Self {
        let empty: Vec<Document<u64>> = Vec::new();
        Self {
            state: RwLock::new(IndexState {
                engine: SearchEngineBuilder::<u64>::with_documents(Language::English, empty)
                    .build(),
                passages: Vec::new(),
                positions: HashMap::new(),
            }),
        }
    }

    pub fn from_passages<I: IntoIterator<Item = Passage>>(passages: I) -> Self {
        let index = Self::new();
        for passage in passages {
            index.upsert(passage);
        }
        index
    }

    /// Loads one JSON passage per line (`{"id"?, "content", "metadata"?}`); blank lines are
    /// skipped. Missing ids are derived from metadata or content.
    pub fn load_jsonl<P: AsRef<Path>>(path: P) -> Result<Self, SearchError> {
        let path = path.as_ref();
        let load_error = |reason: String| SearchError::CorpusLoad {
            path: path.display().to_string(),
            reason,
        };

        let file = std::fs::File::open(path).map_err(|e| load_error(e.to_string()))?;
        let index = Self::new();

        for (line_no, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| load_error(e.to_string()))?;
            if line.trim().is_empty() {
                continue;
            }
            let record: CorpusRecord = serde_json::from_str(&line)
                .map_err(|e| load_error(format!("line {}: {}", line_no + 1, e)))?;
            index.upsert(Passage::from_parts(
                record.id.as_deref(),
                record.content,
                record.metadata,
                line_no,
            ));
        }

        info!(path = %path.display(), passages = index.len(), "Loaded lexical corpus");
        Ok(index)
    }

    /// Adds a passage, replacing any passage with the same id.
    pub fn upsert(&self, passage: Passage) {
        let mut guard = self.state.write();
        let state = &mut *guard;
        let slot = match state.positions.get(&passage.id).copied() {
            Some(slot) => slot,
            None => {
                let slot = state.passages.len() as u64;
                state.positions.insert(passage.id.clone(), slot);
                slot
            }
        };

        state.engine.upsert(Document {
            id: slot,
            contents: passage.content.clone(),
        });
        match state.passages.get_mut(slot as usize) {
            Some(existing) => *existing = passage,
            None => state.passages.push(passage),
        }
    }

    pub fn len(&self) -> usize {
        self.state.read().passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ranks passages for `query`; see [`LexicalMode`] for the two matching rules.
    ///
    /// Phrase mode keeps BM25 order for the passages it ranks and appends the remaining exact
    /// matches in insertion order.
    pub fn query(
        &self,
        query: &str,
        k: usize,
        filter: &MetadataFilter,
        mode: LexicalMode,
    ) -> Vec<Passage> {
        let state = self.state.read();
        if k == 0 || state.passages.is_empty() {
            return Vec::new();
        }

        // Unfiltered natural queries need only the top k; filters and phrase matching scan
        // the full ranking.
        let window = if mode == LexicalMode::Natural && filter.is_empty() {
            k.min(state.passages.len())
        } else {
            state.passages.len()
        };
        let ranked: Vec<usize> = state
            .engine
            .search(query, window)
            .into_iter()
            .map(|result| result.document.id as usize)
            .collect();

        let results: Vec<Passage> = match mode {
            LexicalMode::Natural => ranked
                .iter()
                .filter_map(|&slot| state.passages.get(slot))
                .filter(|p| filter.matches(&p.metadata))
                .take(k)
                .cloned()
                .collect(),
            LexicalMode::Phrase => {
                let terms = phrase_terms(query);
                if terms.is_empty() {
                    return Vec::new();
                }
                let accept = |p: &Passage| {
                    let content = p.content.to_lowercase();
                    filter.matches(&p.metadata)
                        && terms.iter().all(|term| content.contains(term.as_str()))
                };

                let ranked_set: HashSet<usize> = ranked.iter().copied().collect();
                let unranked = (0..state.passages.len()).filter(|slot| !ranked_set.contains(slot));

                ranked
                    .iter()
                    .copied()
                    .chain(unranked)
                    .filter_map(|slot| state.passages.get(slot))
                    .filter(|p| accept(p))
                    .take(k)
                    .cloned()
                    .collect()
            }
        };

        debug!(%mode, k, hits = results.len(), "BM25 search");
        results
    }
}

impl LexicalSearch for Bm25Index {
    async fn search(
        &self,
        query: &str,
        k: usize,
        filter: &MetadataFilter,
        mode: LexicalMode,
    ) -> Result<Vec<Passage>, SearchError> {
        Ok(self.query(query, k, filter, mode))
    }
}
