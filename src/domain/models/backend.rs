//! Vector-store backend identities and their typed configuration.
//!
//! Options arrive as loose key/value maps (static defaults plus caller
//! overrides). [`BackendConfig::from_options`] turns the merged map into one
//! typed variant per backend and validates it before any adapter is built.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::errors::{RagError, RagResult};

/// Loose option map for one backend, as found in configuration.
pub type BackendOptions = BTreeMap<String, Value>;

/// Supported vector-store backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-process flat L2 index persisted to local files.
    Faiss,
    Milvus,
    Pinecone,
    Qdrant,
    Weaviate,
}

impl BackendKind {
    pub const ALL: [Self; 5] = [
        Self::Faiss,
        Self::Milvus,
        Self::Pinecone,
        Self::Qdrant,
        Self::Weaviate,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Faiss => "faiss",
            Self::Milvus => "milvus",
            Self::Pinecone => "pinecone",
            Self::Qdrant => "qdrant",
            Self::Weaviate => "weaviate",
        }
    }

    /// Option key that carries the collection identity, if the backend has one.
    pub const fn naming_key(self) -> Option<&'static str> {
        match self {
            Self::Milvus | Self::Qdrant => Some("collection_name"),
            Self::Pinecone => Some("index_name"),
            Self::Faiss | Self::Weaviate => None,
        }
    }

    /// Environment variable consulted when `api_key` is absent from config.
    pub const fn credential_env(self) -> Option<&'static str> {
        match self {
            Self::Pinecone => Some("PINECONE_API_KEY"),
            Self::Qdrant => Some("QDRANT_API_KEY"),
            Self::Faiss | Self::Milvus | Self::Weaviate => None,
        }
    }

    /// Option names this backend accepts.
    pub const fn option_names(self) -> &'static [&'static str] {
        match self {
            Self::Faiss => &["use_gpu"],
            Self::Milvus => &["host", "port", "collection_name"],
            Self::Pinecone => &[
                "api_key",
                "environment",
                "index_name",
                "namespace",
                "controller_url",
            ],
            Self::Qdrant => &["mode", "host", "port", "collection_name", "api_key"],
            Self::Weaviate => &["mode", "host", "class_name"],
        }
    }

    /// Whether vectors live in local files rather than a managed service.
    pub const fn is_local(self) -> bool {
        matches!(self, Self::Faiss)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| RagError::Configuration(format!("Unsupported database type: {s}")))
    }
}

/// Built-in defaults for every backend, keyed by backend type name.
pub fn default_backend_options() -> BTreeMap<String, BackendOptions> {
    fn options(pairs: &[(&str, Value)]) -> BackendOptions {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    let mut defaults = BTreeMap::new();
    defaults.insert(
        BackendKind::Faiss.to_string(),
        options(&[("use_gpu", Value::Bool(false))]),
    );
    defaults.insert(
        BackendKind::Milvus.to_string(),
        options(&[
            ("host", "localhost".into()),
            ("port", 19530.into()),
            ("collection_name", "default_collection".into()),
        ]),
    );
    defaults.insert(
        BackendKind::Pinecone.to_string(),
        options(&[
            ("environment", "us-east-1".into()),
            ("index_name", "default-index".into()),
            ("namespace", "default-namespace".into()),
        ]),
    );
    defaults.insert(
        BackendKind::Qdrant.to_string(),
        options(&[
            ("mode", "local".into()),
            ("host", "localhost".into()),
            ("port", 6333.into()),
            ("collection_name", "default_collection".into()),
        ]),
    );
    defaults.insert(
        BackendKind::Weaviate.to_string(),
        options(&[
            ("mode", "local".into()),
            ("host", "localhost:8080".into()),
            ("class_name", "Document".into()),
        ]),
    );
    defaults
}

/// Parse caller overrides supplied as a JSON object string.
pub fn parse_overrides(raw: &str) -> RagResult<BackendOptions> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| RagError::Configuration(format!("Invalid JSON for db_config: {e}")))?;
    match value {
        Value::Object(map) => Ok(map.into_iter().collect()),
        other => Err(RagError::Configuration(format!(
            "db_config must be a JSON object, got {other}"
        ))),
    }
}

/// Where a remote service is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentMode {
    /// Self-hosted over plain http.
    Local,
    /// Managed service over https.
    Cloud,
}

impl DeploymentMode {
    pub const fn scheme(self) -> &'static str {
        match self {
            Self::Local => "http",
            Self::Cloud => "https",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaissConfig {
    #[serde(default)]
    pub use_gpu: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilvusConfig {
    pub host: String,
    pub port: u16,
    pub collection_name: String,
}

impl MilvusConfig {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PineconeConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    pub environment: String,
    pub index_name: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Control-plane endpoint; the public API when unset.
    #[serde(default)]
    pub controller_url: Option<String>,
}

fn default_namespace() -> String {
    "default-namespace".to_string()
}

impl PineconeConfig {
    pub fn controller_url(&self) -> &str {
        self.controller_url
            .as_deref()
            .unwrap_or("https://api.pinecone.io")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QdrantConfig {
    pub mode: DeploymentMode,
    pub host: String,
    pub port: u16,
    pub collection_name: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl QdrantConfig {
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.mode.scheme(), self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaviateConfig {
    pub mode: DeploymentMode,
    /// Host with optional port, e.g. `localhost:8080`.
    pub host: String,
    pub class_name: String,
}

impl WeaviateConfig {
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.mode.scheme(), self.host)
    }
}

/// Validated configuration for exactly one backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum BackendConfig {
    Faiss(FaissConfig),
    Milvus(MilvusConfig),
    Pinecone(PineconeConfig),
    Qdrant(QdrantConfig),
    Weaviate(WeaviateConfig),
}

impl BackendConfig {
    /// Build and validate the typed configuration for `kind` from merged options.
    ///
    /// Unknown option names are rejected, required credentials are resolved
    /// from the environment when absent, and empty names or ports fail here
    /// rather than on first use.
    pub fn from_options(kind: BackendKind, options: &BackendOptions) -> RagResult<Self> {
        let allowed = kind.option_names();
        if let Some(unknown) = options.keys().find(|k| !allowed.contains(&k.as_str())) {
            return Err(RagError::Configuration(format!(
                "Unknown option '{unknown}' for {kind} (expected one of: {})",
                allowed.join(", ")
            )));
        }

        // `api_key: null` in YAML means "not configured".
        let object: Map<String, Value> = options
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let value = Value::Object(object);
        let invalid = |e: serde_json::Error| {
            RagError::Configuration(format!("Invalid {kind} configuration: {e}"))
        };

        let mut config = match kind {
            BackendKind::Faiss => Self::Faiss(serde_json::from_value(value).map_err(invalid)?),
            BackendKind::Milvus => Self::Milvus(serde_json::from_value(value).map_err(invalid)?),
            BackendKind::Pinecone => {
                Self::Pinecone(serde_json::from_value(value).map_err(invalid)?)
            }
            BackendKind::Qdrant => Self::Qdrant(serde_json::from_value(value).map_err(invalid)?),
            BackendKind::Weaviate => {
                Self::Weaviate(serde_json::from_value(value).map_err(invalid)?)
            }
        };
        config.resolve_credentials()?;
        config.validate()?;
        Ok(config)
    }

    pub const fn kind(&self) -> BackendKind {
        match self {
            Self::Faiss(_) => BackendKind::Faiss,
            Self::Milvus(_) => BackendKind::Milvus,
            Self::Pinecone(_) => BackendKind::Pinecone,
            Self::Qdrant(_) => BackendKind::Qdrant,
            Self::Weaviate(_) => BackendKind::Weaviate,
        }
    }

    fn resolve_credentials(&mut self) -> RagResult<()> {
        let kind = self.kind();
        let slot = match self {
            Self::Pinecone(c) => &mut c.api_key,
            Self::Qdrant(c) => &mut c.api_key,
            Self::Faiss(_) | Self::Milvus(_) | Self::Weaviate(_) => return Ok(()),
        };
        if slot.as_deref().is_some_and(|k| !k.trim().is_empty()) {
            return Ok(());
        }
        let env_var = kind.credential_env().unwrap_or("API_KEY");
        match std::env::var(env_var) {
            Ok(key) if !key.trim().is_empty() => {
                *slot = Some(key);
                Ok(())
            }
            _ => Err(RagError::Configuration(format!(
                "{kind} API key must be provided via config or the {env_var} environment variable"
            ))),
        }
    }

    fn validate(&self) -> RagResult<()> {
        let kind = self.kind();
        let require = |field: &str, value: &str| {
            if value.trim().is_empty() {
                Err(RagError::Configuration(format!(
                    "{kind} option '{field}' cannot be empty"
                )))
            } else {
                Ok(())
            }
        };
        let require_port = |port: u16| {
            if port == 0 {
                Err(RagError::Configuration(format!("{kind} port cannot be 0")))
            } else {
                Ok(())
            }
        };

        match self {
            Self::Faiss(_) => Ok(()),
            Self::Milvus(c) => {
                require("host", &c.host)?;
                require_port(c.port)?;
                require("collection_name", &c.collection_name)
            }
            Self::Pinecone(c) => {
                require("environment", &c.environment)?;
                require("index_name", &c.index_name)?;
                require("namespace", &c.namespace)
            }
            Self::Qdrant(c) => {
                require("host", &c.host)?;
                require_port(c.port)?;
                require("collection_name", &c.collection_name)
            }
            Self::Weaviate(c) => {
                require("host", &c.host)?;
                require("class_name", &c.class_name)
            }
        }
    }
}

/// Which backend to open, plus caller overrides layered over the defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexTarget {
    /// Backend type name, e.g. `faiss` or `qdrant`.
    pub backend: String,
    #[serde(default)]
    pub overrides: BackendOptions,
}

impl IndexTarget {
    pub fn new(backend: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            overrides: BackendOptions::new(),
        }
    }

    #[must_use]
    pub fn with_overrides(mut self, overrides: BackendOptions) -> Self {
        self.overrides = overrides;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn defaults_for(kind: BackendKind) -> BackendOptions {
        default_backend_options()
            .remove(kind.as_str())
            .expect("defaults exist for every backend")
    }

    #[test]
    fn test_kind_parse_is_case_insensitive() {
        assert_eq!("Qdrant".parse::<BackendKind>().unwrap(), BackendKind::Qdrant);
        assert_eq!(" faiss ".parse::<BackendKind>().unwrap(), BackendKind::Faiss);
    }

    #[test]
    fn test_unknown_kind_is_configuration_error() {
        let err = "chroma".parse::<BackendKind>().unwrap_err();
        assert!(matches!(err, RagError::Configuration(msg) if msg.contains("chroma")));
    }

    #[test]
    fn test_defaults_cover_every_backend() {
        let defaults = default_backend_options();
        for kind in BackendKind::ALL {
            assert!(defaults.contains_key(kind.as_str()), "missing {kind}");
        }
    }

    #[test]
    fn test_milvus_defaults_are_valid() {
        let config =
            BackendConfig::from_options(BackendKind::Milvus, &defaults_for(BackendKind::Milvus))
                .unwrap();
        match config {
            BackendConfig::Milvus(c) => {
                assert_eq!(c.port, 19530);
                assert_eq!(c.base_url(), "http://localhost:19530");
            }
            other => panic!("unexpected config {other:?}"),
        }
    }

    #[test]
    fn test_unknown_option_rejected() {
        let mut options = defaults_for(BackendKind::Weaviate);
        options.insert("colour".to_string(), json!("blue"));
        let err = BackendConfig::from_options(BackendKind::Weaviate, &options).unwrap_err();
        assert!(matches!(err, RagError::Configuration(msg) if msg.contains("colour")));
    }

    #[test]
    fn test_wrong_type_rejected() {
        let mut options = defaults_for(BackendKind::Milvus);
        options.insert("port".to_string(), json!("not-a-port"));
        assert!(matches!(
            BackendConfig::from_options(BackendKind::Milvus, &options),
            Err(RagError::Configuration(_))
        ));
    }

    #[test]
    fn test_qdrant_key_from_config() {
        let mut options = defaults_for(BackendKind::Qdrant);
        options.insert("api_key".to_string(), json!("from-config"));
        temp_env::with_var_unset("QDRANT_API_KEY", || {
            let config = BackendConfig::from_options(BackendKind::Qdrant, &options).unwrap();
            match config {
                BackendConfig::Qdrant(c) => {
                    assert_eq!(c.api_key.as_deref(), Some("from-config"));
                    assert_eq!(c.base_url(), "http://localhost:6333");
                }
                other => panic!("unexpected config {other:?}"),
            }
        });
    }

    #[test]
    fn test_pinecone_key_from_env() {
        let options = defaults_for(BackendKind::Pinecone);
        temp_env::with_var("PINECONE_API_KEY", Some("from-env"), || {
            let config = BackendConfig::from_options(BackendKind::Pinecone, &options).unwrap();
            match config {
                BackendConfig::Pinecone(c) => assert_eq!(c.api_key.as_deref(), Some("from-env")),
                other => panic!("unexpected config {other:?}"),
            }
        });
    }

    #[test]
    fn test_missing_credential_is_configuration_error() {
        let mut options = defaults_for(BackendKind::Pinecone);
        options.insert("api_key".to_string(), Value::Null);
        temp_env::with_var_unset("PINECONE_API_KEY", || {
            let err = BackendConfig::from_options(BackendKind::Pinecone, &options).unwrap_err();
            assert!(matches!(err, RagError::Configuration(msg) if msg.contains("PINECONE_API_KEY")));
        });
    }

    #[test]
    fn test_parse_overrides() {
        let parsed = parse_overrides(r#"{"host": "db.internal", "port": 7000}"#).unwrap();
        assert_eq!(parsed.get("host"), Some(&json!("db.internal")));

        assert!(matches!(
            parse_overrides("{not json"),
            Err(RagError::Configuration(_))
        ));
        assert!(matches!(
            parse_overrides("[1, 2]"),
            Err(RagError::Configuration(_))
        ));
    }
}
