//! Vector-store adapters, one per backend, behind the `VectorStore` port.

pub mod factory;
pub mod flat_index;
pub mod milvus;
pub mod pinecone;
pub mod qdrant;
mod remote;
pub mod weaviate;

pub use factory::VectorStoreFactory;
pub use flat_index::{id_map_path, FlatIndexStore};
pub use milvus::MilvusStore;
pub use pinecone::PineconeStore;
pub use qdrant::QdrantStore;
pub use weaviate::WeaviateStore;
