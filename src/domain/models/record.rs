//! Stored records and search results.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Scalar metadata value attached to a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Open mapping of string keys to scalar values.
pub type Metadata = BTreeMap<String, MetadataValue>;

/// Backend-assigned record identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    /// Position in the local flat index.
    Sequential(u64),
    /// Key assigned by (or generated for) a remote service.
    Key(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequential(n) => write!(f, "{n}"),
            Self::Key(key) => f.write_str(key),
        }
    }
}

/// One stored entry: identifier, vector, retrievable text and metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub vector: Vec<f32>,
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Record {
    /// Payload stored next to the vector in remote services: the text under
    /// `text` plus every metadata entry.
    pub fn payload(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut payload = serde_json::Map::new();
        for (key, value) in &self.metadata {
            if let Ok(value) = serde_json::to_value(value) {
                payload.insert(key.clone(), value);
            }
        }
        payload.insert(
            "text".to_string(),
            serde_json::Value::String(self.text.clone()),
        );
        payload
    }
}

/// One search result, best match first in any returned sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub text: String,
    /// Backend-native score: L2 distance for the local index and for
    /// services configured with Euclidean distance (lower is closer).
    pub score: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

impl SearchHit {
    pub fn new(text: impl Into<String>, score: Option<f32>) -> Self {
        Self {
            text: text.into(),
            score,
            id: None,
            metadata: Metadata::new(),
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: RecordId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}
