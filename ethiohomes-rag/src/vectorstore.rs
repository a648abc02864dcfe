//! Vector store trait for storing and searching listing embeddings.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::error::Result;

/// A document together with the embedding of its body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredEntry {
    pub document: Document,
    pub embedding: Vec<f32>,
}

impl StoredEntry {
    /// Storage key of the entry (the property id).
    pub fn id(&self) -> &str {
        &self.document.id
    }
}

/// Describes what a persisted collection was built from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexManifest {
    pub collection: String,
    pub embedding_model: String,
    pub dimensions: usize,
    pub document_count: usize,
    /// SHA-256 over the documents the collection was built from.
    pub fingerprint: String,
}

/// A storage backend for listing embeddings with similarity search.
///
/// Entries are keyed by property id; upserting an existing id replaces it.
/// Writes are staged in memory until [`commit`](VectorStore::commit) records
/// a manifest, so a collection without a manifest is treated as unbuilt.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace entries.
    async fn upsert(&self, entries: Vec<StoredEntry>) -> Result<()>;

    /// Return up to `limit` entries ordered by descending cosine similarity
    /// to `embedding`, paired with that similarity.
    async fn nearest(&self, embedding: &[f32], limit: usize) -> Result<Vec<(StoredEntry, f32)>>;

    /// Number of stored entries.
    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Remove every entry and the manifest.
    async fn clear(&self) -> Result<()>;

    /// Manifest of the last commit, if any.
    async fn manifest(&self) -> Option<IndexManifest>;

    /// Durably record the current entries under `manifest`.
    async fn commit(&self, manifest: IndexManifest) -> Result<()>;
}
