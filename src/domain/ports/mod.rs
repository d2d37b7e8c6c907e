//! Ports (interfaces) for the hexagonal architecture.

pub mod embedding;
pub mod generation;
pub mod vector_store;

pub use embedding::{EmbeddingModel, RawEmbedding};
pub use generation::{ChartExtractor, GenerationClient};
pub use vector_store::{check_batch, check_query, PersistOutcome, VectorStore};
