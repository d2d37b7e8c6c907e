//! Helpers shared by the networked backends.

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::domain::errors::RagError;
use crate::domain::models::{BackendKind, EmbeddingMatrix, Metadata, Record, RecordId};
use crate::infrastructure::http::HttpError;

/// Payload key holding the retrievable text.
pub const TEXT_KEY: &str = "text";

/// Page size for full scans.
pub const SCAN_PAGE_SIZE: usize = 256;

/// Zip a validated batch into records with fresh UUID keys.
pub fn assemble_records(
    vectors: &EmbeddingMatrix,
    texts: &[String],
    metadata: Option<&[Metadata]>,
) -> Vec<Record> {
    vectors
        .rows()
        .zip(texts)
        .enumerate()
        .map(|(i, (row, text))| Record {
            id: RecordId::Key(Uuid::new_v4().to_string()),
            vector: row.to_vec(),
            text: text.clone(),
            metadata: metadata.map(|m| m[i].clone()).unwrap_or_default(),
        })
        .collect()
}

/// Split a stored payload back into its text and scalar metadata.
pub fn split_payload(mut payload: Map<String, Value>) -> (String, Metadata) {
    let text = match payload.remove(TEXT_KEY) {
        Some(Value::String(text)) => text,
        Some(other) => other.to_string(),
        None => String::new(),
    };
    let metadata = payload
        .into_iter()
        .filter_map(|(key, value)| serde_json::from_value(value).ok().map(|v| (key, v)))
        .collect();
    (text, metadata)
}

pub fn write_error(kind: BackendKind, err: &HttpError) -> RagError {
    RagError::write(kind, err.to_string())
}

pub fn search_error(kind: BackendKind, err: &HttpError) -> RagError {
    RagError::search(kind, err.to_string())
}

/// Response body that did not have the expected shape.
pub fn decode_error(kind: BackendKind, what: &str, err: impl std::fmt::Display) -> RagError {
    RagError::search(kind, format!("unexpected {what} response: {err}"))
}
