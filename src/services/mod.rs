//! Application services orchestrating embedding, storage and generation.

pub mod embedding_service;
pub mod index_service;
pub mod ingestion;
pub mod retrieval_pipeline;
pub mod vector_index;

pub use embedding_service::EmbeddingProvider;
pub use index_service::{IndexService, IngestReport};
pub use retrieval_pipeline::{format_context, RetrievalPipeline};
pub use vector_index::{AddReport, SecondaryEmbedding, VectorIndex};
