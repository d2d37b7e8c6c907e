//! Ragforge - retrieval-augmented generation over pluggable vector stores
//!
//! Documents are split into passages, embedded, and written to one of several
//! vector-store backends (an in-process flat index or a networked service).
//! Queries are embedded, matched against the stored passages, and the results
//! are handed to a language model to compose an answer or a chart descriptor.

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

pub use domain::errors::{RagError, RagResult};
pub use domain::models::{
    BackendConfig, BackendKind, CollectionName, Config, EmbeddingMatrix, QueryRequest,
    QueryResponse, SearchHit,
};
pub use domain::ports::{EmbeddingModel, GenerationClient, VectorStore};
pub use services::{EmbeddingProvider, IndexService, RetrievalPipeline, VectorIndex};
