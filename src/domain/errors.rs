//! Domain errors for the retrieval pipeline.

use thiserror::Error;

use crate::domain::models::BackendKind;

/// Errors raised by embedding, vector-store and generation operations.
#[derive(Debug, Error)]
pub enum RagError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("{backend} write failed: {reason}")]
    BackendWrite { backend: BackendKind, reason: String },

    #[error("{backend} search failed: {reason}")]
    BackendSearch { backend: BackendKind, reason: String },

    #[error("{operation} is not supported by the {backend} backend")]
    UnsupportedOperation {
        backend: BackendKind,
        operation: &'static str,
    },

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    #[error("Persistence error: {0}")]
    Persistence(String),
}

pub type RagResult<T> = Result<T, RagError>;

impl RagError {
    /// Shorthand for a write failure on `backend`.
    pub fn write(backend: BackendKind, reason: impl Into<String>) -> Self {
        Self::BackendWrite {
            backend,
            reason: reason.into(),
        }
    }

    /// Shorthand for a search failure on `backend`.
    pub fn search(backend: BackendKind, reason: impl Into<String>) -> Self {
        Self::BackendSearch {
            backend,
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for RagError {
    fn from(err: std::io::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_backend() {
        let err = RagError::write(BackendKind::Qdrant, "connection refused");
        assert_eq!(err.to_string(), "qdrant write failed: connection refused");

        let err = RagError::UnsupportedOperation {
            backend: BackendKind::Pinecone,
            operation: "get_all",
        };
        assert_eq!(
            err.to_string(),
            "get_all is not supported by the pinecone backend"
        );
    }
}
