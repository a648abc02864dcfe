//! Error types for the `ethiohomes-rag` crate.

use thiserror::Error;

/// Errors that can occur while building the index or answering a query.
#[derive(Debug, Error)]
pub enum RagError {
    /// The listing source could not be read or is missing required columns.
    #[error("Load error ({path}): {message}")]
    LoadError {
        /// The source that failed to load.
        path: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The generation capability failed to produce text.
    #[error("Generation error ({provider}): {message}")]
    GenerationError {
        /// The generation provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// A capability call did not finish within its time budget.
    #[error("{operation} timed out after {after_ms}ms")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The elapsed budget in milliseconds.
        after_ms: u64,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An error in the retrieval pipeline orchestration.
    #[error("Pipeline error: {0}")]
    PipelineError(String),
}

impl RagError {
    pub(crate) fn load(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::LoadError { path: path.into(), message: message.into() }
    }

    pub(crate) fn store(backend: &str, message: impl Into<String>) -> Self {
        Self::VectorStoreError { backend: backend.to_string(), message: message.into() }
    }
}

/// A convenience result type for retrieval operations.
pub type Result<T> = std::result::Result<T, RagError>;
