//! The persisted listing index.
//!
//! [`VectorIndex`] owns an [`EmbeddingProvider`] and a [`VectorStore`] and
//! exposes the three operations the query path needs: open a collection,
//! fill it, and search it with MMR re-ranking.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ethiohomes_rag::{VectorIndex, document, record};
//!
//! let documents = document::build_all(&record::load("review.csv")?);
//! let index = VectorIndex::open_or_create("./real_estate_index", Arc::new(embedder)).await?;
//! index.ensure_indexed(&documents).await?;
//! let results = index.search("apartments in Bahir Dar", 3, 20, 0.7).await?;
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn};

use crate::document::{Document, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::invoke::{CallPolicy, call_with_policy};
use crate::local::LocalVectorStore;
use crate::mmr::maximal_marginal_relevance;
use crate::vectorstore::{IndexManifest, StoredEntry, VectorStore};

/// Collection name recorded in the manifest.
pub const DEFAULT_COLLECTION: &str = "real_estate_properties";

/// Documents embedded per provider call while building.
pub const DEFAULT_BATCH_SIZE: usize = 32;

/// What [`VectorIndex::ensure_indexed`] had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOutcome {
    /// The stored collection already matches the dataset; nothing was embedded.
    UpToDate,
    /// The collection was empty and has been built.
    Built,
    /// The dataset or embedding model changed; the collection was rebuilt.
    Rebuilt,
}

/// A vector index over listing documents.
///
/// Built once at startup, then shared read-only (for example behind an `Arc`)
/// by any number of concurrent searches.
pub struct VectorIndex {
    collection: String,
    location: Option<PathBuf>,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    policy: CallPolicy,
    batch_size: usize,
}

impl VectorIndex {
    /// Open the collection persisted at `location`, or create an empty one there.
    ///
    /// Opening an existing collection never calls the embedder.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::VectorStoreError`] if the location cannot be read or created.
    pub async fn open_or_create(
        location: impl Into<PathBuf>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        let store = LocalVectorStore::open(location).await?;
        let location = store.location().to_path_buf();
        let mut index = Self::from_store(Arc::new(store), embedder);
        index.location = Some(location);
        Ok(index)
    }

    /// Wrap an already opened store.
    pub fn from_store(store: Arc<dyn VectorStore>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            collection: DEFAULT_COLLECTION.to_string(),
            location: None,
            embedder,
            store,
            policy: CallPolicy::embedding(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Override the timeout/retry policy for embedding calls.
    pub fn with_policy(mut self, policy: CallPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Override how many documents are embedded per provider call.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Override the collection name recorded in the manifest.
    pub fn with_collection(mut self, name: impl Into<String>) -> Self {
        self.collection = name.into();
        self
    }

    /// Directory the collection persists to, when opened from disk.
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    /// Number of indexed documents.
    pub async fn len(&self) -> usize {
        self.store.len().await
    }

    pub async fn is_empty(&self) -> bool {
        self.store.is_empty().await
    }

    /// Fingerprint of the dataset the collection was last built from.
    pub async fn fingerprint(&self) -> Option<String> {
        self.store.manifest().await.map(|m| m.fingerprint)
    }

    /// Remove every document from the collection.
    pub async fn clear(&self) -> Result<()> {
        self.store.clear().await
    }

    /// Embed and store `documents`, keyed by property id, then persist.
    ///
    /// Documents whose id is already stored are replaced, so indexing the
    /// same documents twice leaves the document count unchanged.
    ///
    /// # Errors
    ///
    /// Returns the embedding error (after retries) or a vector store error.
    pub async fn index(&self, documents: &[Document]) -> Result<()> {
        self.store_documents(documents, dataset_fingerprint(documents)).await
    }

    /// Make sure the collection reflects `documents`.
    ///
    /// Compares the dataset fingerprint and embedding model against the
    /// stored manifest and only embeds when they differ.
    ///
    /// # Errors
    ///
    /// Same as [`index`](Self::index).
    pub async fn ensure_indexed(&self, documents: &[Document]) -> Result<IndexOutcome> {
        let fingerprint = dataset_fingerprint(documents);
        let model = self.embedder.model_name();

        match self.store.manifest().await {
            Some(manifest)
                if manifest.fingerprint == fingerprint && manifest.embedding_model == model =>
            {
                info!(
                    document_count = manifest.document_count,
                    "index is up to date, skipping embedding"
                );
                Ok(IndexOutcome::UpToDate)
            }
            Some(manifest) => {
                warn!(
                    stored_fingerprint = %manifest.fingerprint,
                    dataset_fingerprint = %fingerprint,
                    stored_model = %manifest.embedding_model,
                    model,
                    "index is stale, rebuilding"
                );
                self.store.clear().await?;
                self.store_documents(documents, fingerprint).await?;
                Ok(IndexOutcome::Rebuilt)
            }
            None => {
                // Leftovers from an interrupted build have no manifest.
                if !self.store.is_empty().await {
                    self.store.clear().await?;
                }
                self.store_documents(documents, fingerprint).await?;
                Ok(IndexOutcome::Built)
            }
        }
    }

    async fn store_documents(&self, documents: &[Document], fingerprint: String) -> Result<()> {
        let embedder = self.embedder.as_ref();

        for batch in documents.chunks(self.batch_size) {
            let texts: Vec<&str> = batch.iter().map(|d| d.body.as_str()).collect();
            let texts = texts.as_slice();
            let embeddings = call_with_policy(&self.policy, "embed documents", move || {
                embedder.embed_batch(texts)
            })
            .await
            .map_err(|e| {
                error!(batch_size = batch.len(), error = %e, "embedding failed during indexing");
                e
            })?;

            if embeddings.len() != batch.len() {
                return Err(RagError::EmbeddingError {
                    provider: embedder.model_name().to_string(),
                    message: format!(
                        "expected {} embeddings, got {}",
                        batch.len(),
                        embeddings.len()
                    ),
                });
            }

            if let Some(position) = embeddings.iter().position(|v| !all_finite(v)) {
                error!(property_id = %batch[position].id, "embedding contains non-finite values");
                return Err(non_finite(embedder, &format!("document '{}'", batch[position].id)));
            }

            let entries = batch
                .iter()
                .cloned()
                .zip(embeddings)
                .map(|(document, embedding)| StoredEntry { document, embedding })
                .collect();
            self.store.upsert(entries).await?;
        }

        self.store
            .commit(IndexManifest {
                collection: self.collection.clone(),
                embedding_model: embedder.model_name().to_string(),
                dimensions: embedder.dimensions(),
                document_count: documents.len(),
                fingerprint,
            })
            .await?;

        info!(
            collection = %self.collection,
            document_count = self.store.len().await,
            "indexed documents"
        );
        Ok(())
    }

    /// Search the collection: embed the query, take the `fetch_k` nearest
    /// documents, then pick `k` of them with maximal marginal relevance.
    ///
    /// Results come back in selection order, most relevant first. Fewer than
    /// `k` results are returned when the collection is smaller than `k`.
    ///
    /// # Errors
    ///
    /// Returns the query embedding error (after retries) or a vector store error.
    pub async fn search(
        &self,
        query: &str,
        k: usize,
        fetch_k: usize,
        diversity_weight: f32,
    ) -> Result<Vec<SearchResult>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let embedder = self.embedder.as_ref();
        let query_embedding =
            call_with_policy(&self.policy, "embed query", move || embedder.embed(query))
                .await
                .map_err(|e| {
                    error!(error = %e, "embedding failed during query");
                    e
                })?;
        if !all_finite(&query_embedding) {
            error!("query embedding contains non-finite values");
            return Err(non_finite(embedder, "query"));
        }

        let candidates = self.store.nearest(&query_embedding, fetch_k.max(k)).await.map_err(|e| {
            error!(collection = %self.collection, error = %e, "vector store search failed");
            e
        })?;

        let vectors: Vec<&[f32]> = candidates.iter().map(|(e, _)| e.embedding.as_slice()).collect();
        let picked = maximal_marginal_relevance(&query_embedding, &vectors, k, diversity_weight);

        let results: Vec<SearchResult> = picked
            .into_iter()
            .map(|i| {
                let (entry, score) = &candidates[i];
                SearchResult { document: entry.document.clone(), score: *score }
            })
            .collect();

        debug!(
            candidate_count = candidates.len(),
            result_count = results.len(),
            "search completed"
        );
        Ok(results)
    }
}

fn all_finite(vector: &[f32]) -> bool {
    vector.iter().all(|x| x.is_finite())
}

fn non_finite(embedder: &dyn EmbeddingProvider, subject: &str) -> RagError {
    RagError::EmbeddingError {
        provider: embedder.model_name().to_string(),
        message: format!("embedding for {subject} contains NaN or infinite values"),
    }
}

/// SHA-256 over every document's id and body, independent of row order.
///
/// The body renders every source field, so any edit to the dataset changes
/// the fingerprint.
pub fn dataset_fingerprint(documents: &[Document]) -> String {
    let mut sorted: Vec<&Document> = documents.iter().collect();
    sorted.sort_by(|a, b| a.id.cmp(&b.id));

    let mut hasher = Sha256::new();
    for document in sorted {
        hasher.update(document.id.as_bytes());
        hasher.update([0u8]);
        hasher.update(document.body.as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}
