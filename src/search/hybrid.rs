use std::collections::HashSet;
use std::future::Future;

use tracing::{debug, warn};

use super::lexical::{LexicalModePolicy, LexicalSearch};
use super::semantic::SemanticSearch;
use crate::passage::{MetadataFilter, Passage};

/// Deduplicated candidate set plus per-source hit counts.
///
/// A `None` count means that source failed and the set was built without it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Candidates {
    pub passages: Vec<Passage>,
    pub semantic_hits: Option<usize>,
    pub lexical_hits: Option<usize>,
}

impl Candidates {
    pub fn new(
        passages: Vec<Passage>,
        semantic_hits: Option<usize>,
        lexical_hits: Option<usize>,
    ) -> Self {
        Self {
            passages,
            semantic_hits,
            lexical_hits,
        }
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    /// `true` when at least one source failed.
    pub fn is_degraded(&self) -> bool {
        self.semantic_hits.is_none() || self.lexical_hits.is_none()
    }
}

/// Anything that can produce candidates for a query.
///
/// Infallible by contract: source failures degrade into a smaller (possibly empty) set.
pub trait CandidateSource: Send + Sync {
    fn candidates(
        &self,
        query: &str,
        k: usize,
        filter: &MetadataFilter,
    ) -> impl Future<Output = Candidates> + Send;
}

/// Union of semantic and lexical retrieval.
pub struct HybridSearch<S, L> {
    semantic: S,
    lexical: L,
    mode_policy: LexicalModePolicy,
}

impl<S: SemanticSearch, L: LexicalSearch> HybridSearch<S, L> {
    pub fn new(semantic: S, lexical: L) -> Self {
        Self {
            semantic,
            lexical,
            mode_policy: LexicalModePolicy::default(),
        }
    }

    pub fn with_mode_policy(mut self, policy: LexicalModePolicy) -> Self {
        self.mode_policy = policy;
        self
    }

    pub fn semantic(&self) -> &S {
        &self.semantic
    }

    pub fn lexical(&self) -> &L {
        &self.lexical
    }

    pub fn mode_policy(&self) -> LexicalModePolicy {
        self.mode_policy
    }
}

impl<S: SemanticSearch, L: LexicalSearch> CandidateSource for HybridSearch<S, L> {
    async fn candidates(&self, query: &str, k: usize, filter: &MetadataFilter) -> Candidates {
        if k == 0 {
            return Candidates::default();
        }

        let mode = self.mode_policy.resolve(query);
        let (semantic, lexical) = tokio::join!(
            self.semantic.search(query, k, filter),
            self.lexical.search(query, k, filter, mode),
        );

        let semantic = semantic
            .inspect_err(|e| warn!(error = %e, "Semantic search failed, using lexical results only"))
            .ok();
        let lexical = lexical
            .inspect_err(|e| warn!(error = %e, "Lexical search failed, using semantic results only"))
            .ok();

        let semantic_hits = semantic.as_ref().map(Vec::len);
        let lexical_hits = lexical.as_ref().map(Vec::len);
        let passages = merge_candidates(
            semantic.unwrap_or_default(),
            lexical.unwrap_or_default(),
            k,
        );

        debug!(
            %mode,
            semantic_hits,
            lexical_hits,
            merged = passages.len(),
            "Hybrid candidates"
        );

        Candidates::new(passages, semantic_hits, lexical_hits)
    }
}

/// Interleaves both ranked lists by rank (semantic first on equal rank), keeps the first copy of
/// each id, and stops at `k`.
pub fn merge_candidates(semantic: Vec<Passage>, lexical: Vec<Passage>, k: usize) -> Vec<Passage> {
    let mut seen: HashSet<String> = HashSet::with_capacity(semantic.len() + lexical.len());
    let mut merged = Vec::with_capacity(k.min(semantic.len() + lexical.len()));

    let mut semantic = semantic.into_iter();
    let mut lexical = lexical.into_iter();

    loop {
        let (s, l) = (semantic.next(), lexical.next());
        if s.is_none() && l.is_none() {
            break;
        }
        for passage in [s, l].into_iter().flatten() {
            if merged.len() == k {
                return merged;
            }
            if seen.insert(passage.id.clone()) {
                merged.push(passage);
            }
        }
    }

    merged
}
