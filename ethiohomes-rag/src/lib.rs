//! # ethiohomes-rag
//!
//! Retrieval-augmented property recommendations for the EthioHomes listing
//! dataset (Addis Ababa and Bahir Dar).
//!
//! ```text
//! review.csv -> record::load -> document::build -> VectorIndex (persisted, built once)
//!                                                      |
//! question -> QueryService -> Retriever (MMR search) --+
//!                                 |
//!                          AnswerComposer -> GenerationProvider -> reply text
//! ```
//!
//! Embedding and generation backends plug in through [`EmbeddingProvider`] and
//! [`GenerationProvider`]. Enable the `ollama` feature for the local Ollama
//! implementations.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ethiohomes_rag::{AnswerComposer, QueryService, Retriever, VectorIndex, document, record};
//!
//! let documents = document::build_all(&record::load("review.csv")?);
//! let index = VectorIndex::open_or_create("./real_estate_index", embedder).await?;
//! index.ensure_indexed(&documents).await?;
//!
//! let service = QueryService::new(
//!     Arc::new(Retriever::new(Arc::new(index))),
//!     Arc::new(AnswerComposer::new(generator)),
//! );
//! println!("{}", service.answer_query("apartments in Bahir Dar").await);
//! ```

pub mod composer;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod index;
pub mod invoke;
pub mod local;
pub mod mmr;
#[cfg(feature = "ollama")]
pub mod ollama;
pub mod record;
pub mod retriever;
pub mod service;
pub mod vectorstore;

pub use composer::{Answer, AnswerComposer};
pub use config::{RetrievalConfig, RetrievalConfigBuilder};
pub use document::{Document, DocumentMetadata, SearchResult};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use generation::GenerationProvider;
pub use index::{IndexOutcome, VectorIndex};
pub use invoke::CallPolicy;
pub use local::LocalVectorStore;
#[cfg(feature = "ollama")]
pub use ollama::{OllamaConfig, OllamaEmbeddingProvider, OllamaGenerationProvider};
pub use record::{PropertyRecord, PropertyStatus};
pub use retriever::Retriever;
pub use service::QueryService;
pub use vectorstore::{IndexManifest, StoredEntry, VectorStore};
