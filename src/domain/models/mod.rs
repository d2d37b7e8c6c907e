//! Domain models.

pub mod backend;
pub mod collection;
pub mod config;
pub mod embedding;
pub mod query;
pub mod record;

pub use backend::{
    default_backend_options, parse_overrides, BackendConfig, BackendKind, BackendOptions,
    DeploymentMode, FaissConfig, IndexTarget, MilvusConfig, PineconeConfig, QdrantConfig,
    WeaviateConfig,
};
pub use collection::{index_path_for, CollectionName};
pub use config::{
    Config, EmbeddingConfig, EndpointConfig, GenerationConfig, HttpConfig, LoggingConfig,
    RetrievalConfig,
};
pub use embedding::{align_to_dimension, EmbeddingMatrix, EmbeddingVector};
pub use query::{
    ChartArtifact, PromptTemplate, QueryAnswer, QueryRequest, QueryResponse, TaskType,
    BULK_QUERY, NO_RELEVANT_INFORMATION,
};
pub use record::{Metadata, MetadataValue, Record, RecordId, SearchHit};
