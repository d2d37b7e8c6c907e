//! Collection identity derived from storage paths.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::errors::{RagError, RagResult};

/// Stable name under which a document's vectors are grouped in a backend.
///
/// The name is the file's base name with its final extension stripped, so
/// the same path always yields the same name across runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionName(String);

impl CollectionName {
    pub fn from_path(path: impl AsRef<Path>) -> RagResult<Self> {
        let path = path.as_ref();
        path.file_stem()
            .and_then(|stem| stem.to_str())
            .filter(|stem| !stem.is_empty())
            .map(|stem| Self(stem.to_string()))
            .ok_or_else(|| {
                RagError::Configuration(format!(
                    "Cannot derive a collection name from '{}'",
                    path.display()
                ))
            })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Index file for an uploaded document: `{data_dir}/vector_db_{stem}.index`.
///
/// Spaces in the document name become underscores. Only the base name of
/// `filename` is used, so directory components cannot escape `data_dir`.
pub fn index_path_for(data_dir: &Path, filename: &str) -> PathBuf {
    let base = Path::new(filename)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(filename)
        .replace(' ', "_");
    let stem = Path::new(&base)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(&base)
        .to_string();
    data_dir.join(format!("vector_db_{stem}.index"))
}
