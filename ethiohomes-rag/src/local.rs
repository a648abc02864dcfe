//! File-backed vector store using cosine similarity.
//!
//! [`LocalVectorStore`] keeps every entry in a `HashMap` behind a
//! `tokio::sync::RwLock` and persists the collection to a directory:
//!
//! ```text
//! <location>/entries.json    stored entries, sorted by id
//! <location>/manifest.json   written last; its presence marks a built collection
//! ```
//!
//! Searches are brute force, which is fine for a single-city listing table.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{RagError, Result};
use crate::mmr::cosine_similarity;
use crate::vectorstore::{IndexManifest, StoredEntry, VectorStore};

const BACKEND: &str = "Local";
const MANIFEST_FILE: &str = "manifest.json";
const ENTRIES_FILE: &str = "entries.json";

#[derive(Debug, Default)]
struct Collection {
    entries: HashMap<String, StoredEntry>,
    manifest: Option<IndexManifest>,
}

/// A vector store persisted as JSON files under one directory.
///
/// # Example
///
/// ```rust,ignore
/// use ethiohomes_rag::{LocalVectorStore, VectorStore};
///
/// let store = LocalVectorStore::open("./real_estate_index").await?;
/// let hits = store.nearest(&query_embedding, 20).await?;
/// ```
#[derive(Debug)]
pub struct LocalVectorStore {
    location: PathBuf,
    collection: RwLock<Collection>,
}

impl LocalVectorStore {
    /// Whether a committed collection exists at `location`.
    pub fn exists(location: impl AsRef<Path>) -> bool {
        location.as_ref().join(MANIFEST_FILE).is_file()
    }

    /// Open the collection at `location`, or bind an empty one to it.
    ///
    /// An existing collection is loaded as-is; nothing is re-embedded.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::VectorStoreError`] if the directory cannot be
    /// created or the persisted files are unreadable or inconsistent.
    pub async fn open(location: impl Into<PathBuf>) -> Result<Self> {
        let location = location.into();
        let collection = if Self::exists(&location) {
            let manifest: IndexManifest = read_json(&location.join(MANIFEST_FILE)).await?;
            let stored: Vec<StoredEntry> = read_json(&location.join(ENTRIES_FILE)).await?;
            if stored.len() != manifest.document_count {
                return Err(RagError::store(
                    BACKEND,
                    format!(
                        "manifest at '{}' lists {} documents but {} entries were found",
                        location.display(),
                        manifest.document_count,
                        stored.len()
                    ),
                ));
            }
            info!(
                location = %location.display(),
                document_count = stored.len(),
                "opened existing collection"
            );
            let entries = stored.into_iter().map(|e| (e.id().to_string(), e)).collect();
            Collection { entries, manifest: Some(manifest) }
        } else {
            tokio::fs::create_dir_all(&location).await.map_err(|e| {
                RagError::store(BACKEND, format!("cannot create '{}': {e}", location.display()))
            })?;
            info!(location = %location.display(), "created empty collection");
            Collection::default()
        };

        Ok(Self { location, collection: RwLock::new(collection) })
    }

    /// Directory backing this store.
    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Whether an entry with `id` is stored.
    pub async fn contains(&self, id: &str) -> bool {
        self.collection.read().await.entries.contains_key(id)
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| RagError::store(BACKEND, format!("cannot read '{}': {e}", path.display())))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| RagError::store(BACKEND, format!("cannot parse '{}': {e}", path.display())))
}

/// Write through a temporary file so readers never see a partial file.
async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec(value).map_err(|e| {
        RagError::store(BACKEND, format!("cannot serialize '{}': {e}", path.display()))
    })?;
    let staging = path.with_extension("json.tmp");
    tokio::fs::write(&staging, bytes).await.map_err(|e| {
        RagError::store(BACKEND, format!("cannot write '{}': {e}", staging.display()))
    })?;
    tokio::fs::rename(&staging, path)
        .await
        .map_err(|e| RagError::store(BACKEND, format!("cannot replace '{}': {e}", path.display())))
}

async fn remove_if_present(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => {
            Err(RagError::store(BACKEND, format!("cannot remove '{}': {e}", path.display())))
        }
    }
}

#[async_trait]
impl VectorStore for LocalVectorStore {
    async fn upsert(&self, entries: Vec<StoredEntry>) -> Result<()> {
        let mut collection = self.collection.write().await;
        for entry in entries {
            collection.entries.insert(entry.id().to_string(), entry);
        }
        Ok(())
    }

    async fn nearest(&self, embedding: &[f32], limit: usize) -> Result<Vec<(StoredEntry, f32)>> {
        let collection = self.collection.read().await;

        let mut scored: Vec<(&StoredEntry, f32)> = collection
            .entries
            .values()
            .map(|entry| (entry, cosine_similarity(&entry.embedding, embedding)))
            .collect();

        scored.sort_by(|(a, sa), (b, sb)| {
            sb.total_cmp(sa).then_with(|| a.id().cmp(b.id()))
        });
        scored.truncate(limit);
        Ok(scored.into_iter().map(|(entry, score)| (entry.clone(), score)).collect())
    }

    async fn len(&self) -> usize {
        self.collection.read().await.entries.len()
    }

    async fn clear(&self) -> Result<()> {
        let mut collection = self.collection.write().await;
        // Manifest first: without it the directory reads as unbuilt.
        remove_if_present(&self.location.join(MANIFEST_FILE)).await?;
        remove_if_present(&self.location.join(ENTRIES_FILE)).await?;
        collection.entries.clear();
        collection.manifest = None;
        debug!(location = %self.location.display(), "cleared collection");
        Ok(())
    }

    async fn manifest(&self) -> Option<IndexManifest> {
        self.collection.read().await.manifest.clone()
    }

    async fn commit(&self, mut manifest: IndexManifest) -> Result<()> {
        let mut collection = self.collection.write().await;

        let mut entries: Vec<&StoredEntry> = collection.entries.values().collect();
        entries.sort_by(|a, b| a.id().cmp(b.id()));
        manifest.document_count = entries.len();

        tokio::fs::create_dir_all(&self.location).await.map_err(|e| {
            RagError::store(BACKEND, format!("cannot create '{}': {e}", self.location.display()))
        })?;
        write_json(&self.location.join(ENTRIES_FILE), &entries).await?;
        write_json(&self.location.join(MANIFEST_FILE), &manifest).await?;

        debug!(
            location = %self.location.display(),
            document_count = manifest.document_count,
            "committed collection"
        );
        collection.manifest = Some(manifest);
        Ok(())
    }
}
