//! Configuration for the retrieval policy.

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Query policy applied by the [`Retriever`](crate::Retriever) on every search.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of documents returned per query.
    pub k: usize,
    /// Size of the nearest-neighbour candidate pool handed to MMR selection.
    pub fetch_k: usize,
    /// Weight of query relevance against diversity, in `[0, 1]`. `1.0` is pure relevance.
    pub diversity_weight: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { k: 3, fetch_k: 20, diversity_weight: 0.7 }
    }
}

impl RetrievalConfig {
    /// Create a new builder for constructing a [`RetrievalConfig`].
    pub fn builder() -> RetrievalConfigBuilder {
        RetrievalConfigBuilder::default()
    }

    /// Check that the parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `k == 0`
    /// - `k > fetch_k`
    /// - `diversity_weight` is outside `[0, 1]`
    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(RagError::ConfigError("k must be greater than zero".to_string()));
        }
        if self.k > self.fetch_k {
            return Err(RagError::ConfigError(format!(
                "k ({}) must not exceed fetch_k ({})",
                self.k, self.fetch_k
            )));
        }
        if !(0.0..=1.0).contains(&self.diversity_weight) {
            return Err(RagError::ConfigError(format!(
                "diversity_weight ({}) must be within [0, 1]",
                self.diversity_weight
            )));
        }
        Ok(())
    }
}

/// Builder for constructing a validated [`RetrievalConfig`].
#[derive(Debug, Clone, Default)]
pub struct RetrievalConfigBuilder {
    config: RetrievalConfig,
}

impl RetrievalConfigBuilder {
    /// Set the number of documents returned per query.
    pub fn k(mut self, k: usize) -> Self {
        self.config.k = k;
        self
    }

    /// Set the candidate pool size.
    pub fn fetch_k(mut self, fetch_k: usize) -> Self {
        self.config.fetch_k = fetch_k;
        self
    }

    /// Set the relevance/diversity weight.
    pub fn diversity_weight(mut self, weight: f32) -> Self {
        self.config.diversity_weight = weight;
        self
    }

    /// Build the [`RetrievalConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// See [`RetrievalConfig::validate`].
    pub fn build(self) -> Result<RetrievalConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
