//! Fixed-policy retrieval over the listing index.

use std::sync::Arc;

use tracing::info;

use crate::config::RetrievalConfig;
use crate::document::SearchResult;
use crate::error::Result;
use crate::index::VectorIndex;

/// Runs every query against the index with the same [`RetrievalConfig`].
pub struct Retriever {
    index: Arc<VectorIndex>,
    config: RetrievalConfig,
}

impl Retriever {
    /// Create a retriever with the default policy (`k = 3`, `fetch_k = 20`, weight `0.7`).
    pub fn new(index: Arc<VectorIndex>) -> Self {
        Self { index, config: RetrievalConfig::default() }
    }

    /// Create a retriever with a custom policy.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`](crate::RagError::ConfigError) if the
    /// policy is inconsistent.
    pub fn with_config(index: Arc<VectorIndex>, config: RetrievalConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { index, config })
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    /// Retrieve at most `k` diverse, relevant listings for `query`.
    ///
    /// # Errors
    ///
    /// Propagates query embedding and search failures.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<SearchResult>> {
        let RetrievalConfig { k, fetch_k, diversity_weight } = self.config;
        let results = self.index.search(query, k, fetch_k, diversity_weight).await?;
        info!(result_count = results.len(), k, fetch_k, "retrieved listings");
        Ok(results)
    }
}
