use std::future::Future;

use super::error::SearchError;
use crate::passage::{MetadataFilter, Passage};

/// Vector-similarity retrieval, best match first.
pub trait SemanticSearch: Send + Sync {
    fn search(
        &self,
        query: &str,
        k: usize,
        filter: &MetadataFilter,
    ) -> impl Future<Output = Result<Vec<Passage>, SearchError>> + Send;
}
