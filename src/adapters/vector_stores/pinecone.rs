//! Pinecone backend: control plane for the index, data plane for vectors.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::info;

use super::remote::{assemble_records, decode_error, search_error, split_payload, write_error};
use crate::domain::errors::{RagError, RagResult};
use crate::domain::models::{BackendKind, EmbeddingMatrix, Metadata, PineconeConfig, RecordId, SearchHit};
use crate::domain::ports::{check_batch, check_query, VectorStore};
use crate::infrastructure::http::{send_with_retry, trim_base, HttpContext};

const KIND: BackendKind = BackendKind::Pinecone;

/// Map a collection name onto Pinecone's index alphabet (lowercase, digits, `-`).
pub fn normalize_index_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' | '-' => c,
            'A'..='Z' => c.to_ascii_lowercase(),
            _ => '-',
        })
        .collect()
}

pub struct PineconeStore {
    host: String,
    index_name: String,
    namespace: String,
    api_key: String,
    dimension: usize,
    http: HttpContext,
}

#[derive(Debug, Deserialize)]
struct IndexDescription {
    host: String,
    #[serde(default)]
    dimension: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<Match>,
}

#[derive(Debug, Deserialize)]
struct Match {
    id: String,
    #[serde(default)]
    score: Option<f32>,
    #[serde(default)]
    metadata: Option<Map<String, Value>>,
}

fn with_scheme(host: &str) -> String {
    if host.starts_with("http://") || host.starts_with("https://") {
        trim_base(host).to_string()
    } else {
        format!("https://{}", trim_base(host))
    }
}

impl PineconeStore {
    /// Resolve (or create) the index and its data-plane host.
    pub async fn connect(config: &PineconeConfig, dimension: usize, http: HttpContext) -> RagResult<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            RagError::Configuration("pinecone API key is not configured".to_string())
        })?;
        let index_name = normalize_index_name(&config.index_name);
        let controller = trim_base(config.controller_url()).to_string();

        let describe_url = format!("{controller}/indexes/{index_name}");
        let description = match send_with_retry(&http.retry, || {
            http.client.get(&describe_url).header("Api-Key", &api_key)
        })
        .await
        {
            Ok(response) => response
                .json::<IndexDescription>()
                .await
                .map_err(|e| decode_error(KIND, "index description", e))?,
            Err(err) if err.is_not_found() => {
                let body = json!({
                    "name": index_name,
                    "dimension": dimension,
                    "metric": "euclidean",
                    "spec": {"serverless": {"cloud": "aws", "region": config.environment}},
                });
                let create_url = format!("{controller}/indexes");
                let response = send_with_retry(&http.retry, || {
                    http.client
                        .post(&create_url)
                        .header("Api-Key", &api_key)
                        .json(&body)
                })
                .await
                .map_err(|e| write_error(KIND, &e))?;
                info!(index = %index_name, dimension, "pinecone index created");
                response
                    .json::<IndexDescription>()
                    .await
                    .map_err(|e| decode_error(KIND, "index creation", e))?
            }
            Err(err) => return Err(write_error(KIND, &err)),
        };

        if let Some(existing) = description.dimension {
            if existing != dimension {
                return Err(RagError::Configuration(format!(
                    "pinecone index '{index_name}' holds {existing}-dimensional vectors, expected {dimension}"
                )));
            }
        }

        Ok(Self {
            host: with_scheme(&description.host),
            index_name,
            namespace: config.namespace.clone(),
            api_key,
            dimension,
            http,
        })
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    fn post(&self, path: &str, body: &Value) -> reqwest::RequestBuilder {
        self.http
            .client
            .post(format!("{}{path}", self.host))
            .header("Api-Key", &self.api_key)
            .json(body)
    }
}

#[async_trait]
impl VectorStore for PineconeStore {
    fn kind(&self) -> BackendKind {
        KIND
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn add(
        &self,
        vectors: &EmbeddingMatrix,
        texts: &[String],
        metadata: Option<&[Metadata]>,
    ) -> RagResult<Vec<RecordId>> {
        check_batch(KIND, self.dimension, vectors, texts, metadata)?;
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let records = assemble_records(vectors, texts, metadata);
        let items: Vec<Value> = records
            .iter()
            .map(|r| json!({"id": r.id, "values": r.vector, "metadata": r.payload()}))
            .collect();
        let body = json!({"vectors": items, "namespace": self.namespace});

        send_with_retry(&self.http.retry, || self.post("/vectors/upsert", &body))
            .await
            .map_err(|e| write_error(KIND, &e))?;
        Ok(records.into_iter().map(|r| r.id).collect())
    }

    async fn search(&self, query: &[f32], top_k: usize) -> RagResult<Vec<SearchHit>> {
        check_query(KIND, self.dimension, query)?;
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let body = json!({
            "vector": query,
            "topK": top_k,
            "includeMetadata": true,
            "namespace": self.namespace,
        });
        let response = send_with_retry(&self.http.retry, || self.post("/query", &body))
            .await
            .map_err(|e| search_error(KIND, &e))?;
        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|e| decode_error(KIND, "query", e))?;

        Ok(parsed
            .matches
            .into_iter()
            .map(|m| {
                let (text, metadata) = split_payload(m.metadata.unwrap_or_default());
                SearchHit::new(text, m.score)
                    .with_id(RecordId::Key(m.id))
                    .with_metadata(metadata)
            })
            .collect())
    }
}
