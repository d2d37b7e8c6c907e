//! Adapters implementing the domain ports.

pub mod charts;
pub mod embeddings;
pub mod generation;
pub mod vector_stores;
