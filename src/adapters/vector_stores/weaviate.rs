//! Weaviate backend: REST for schema and writes, GraphQL for search.

use std::fmt::Write as _;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::info;

use super::remote::{
    assemble_records, decode_error, search_error, split_payload, write_error, SCAN_PAGE_SIZE,
    TEXT_KEY,
};
use crate::domain::errors::{RagError, RagResult};
use crate::domain::models::{BackendKind, EmbeddingMatrix, Metadata, RecordId, SearchHit, WeaviateConfig};
use crate::domain::ports::{check_batch, check_query, VectorStore};
use crate::infrastructure::http::{send_with_retry, HttpContext};

const KIND: BackendKind = BackendKind::Weaviate;

pub struct WeaviateStore {
    base_url: String,
    class_name: String,
    dimension: usize,
    http: HttpContext,
}

#[derive(Debug, Deserialize)]
struct BatchItem {
    #[serde(default)]
    result: Option<BatchResult>,
}

#[derive(Debug, Deserialize)]
struct BatchResult {
    #[serde(default)]
    errors: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct GraphQlReply {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ObjectPage {
    #[serde(default)]
    objects: Vec<StoredObject>,
}

#[derive(Debug, Deserialize)]
struct StoredObject {
    id: String,
    #[serde(default)]
    properties: Map<String, Value>,
}

/// GraphQL `nearVector` query returning text plus id and distance.
fn near_vector_query(class_name: &str, vector: &[f32], limit: usize) -> String {
    let mut literal = String::from("[");
    for (i, value) in vector.iter().enumerate() {
        if i > 0 {
            literal.push(',');
        }
        let _ = write!(literal, "{value}");
    }
    literal.push(']');
    format!(
        "{{ Get {{ {class_name}(nearVector: {{vector: {literal}}}, limit: {limit}) \
         {{ {TEXT_KEY} _additional {{ id distance }} }} }} }}"
    )
}

impl WeaviateStore {
    /// Connect and register the class with an external vectorizer when missing.
    pub async fn connect(config: &WeaviateConfig, dimension: usize, http: HttpContext) -> RagResult<Self> {
        let store = Self {
            base_url: config.base_url(),
            class_name: config.class_name.clone(),
            dimension,
            http,
        };

        let schema_url = format!("{}/v1/schema/{}", store.base_url, store.class_name);
        match send_with_retry(&store.http.retry, || store.http.client.get(&schema_url)).await {
            Ok(_) => {}
            Err(err) if err.is_not_found() => {
                let body = json!({
                    "class": store.class_name,
                    "vectorizer": "none",
                    "vectorIndexConfig": {"distance": "l2-squared"},
                    "properties": [{"name": TEXT_KEY, "dataType": ["text"]}],
                });
                let url = format!("{}/v1/schema", store.base_url);
                send_with_retry(&store.http.retry, || store.http.client.post(&url).json(&body))
                    .await
                    .map_err(|e| write_error(KIND, &e))?;
                info!(class = %store.class_name, "weaviate class created");
            }
            Err(err) => return Err(write_error(KIND, &err)),
        }
        Ok(store)
    }
}

#[async_trait]
impl VectorStore for WeaviateStore {
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
        let objects: Vec<Value> = records
            .iter()
            .map(|r| {
                json!({
                    "class": self.class_name,
                    "id": r.id,
                    "properties": r.payload(),
                    "vector": r.vector,
                })
            })
            .collect();
        let url = format!("{}/v1/batch/objects", self.base_url);
        let body = json!({ "objects": objects });

        let response = send_with_retry(&self.http.retry, || self.http.client.post(&url).json(&body))
            .await
            .map_err(|e| write_error(KIND, &e))?;
        let items: Vec<BatchItem> = response
            .json()
            .await
            .map_err(|e| RagError::write(KIND, format!("unexpected batch response: {e}")))?;

        // Batch requests succeed as a whole; failures are reported per object.
        if let Some(errors) = items
            .iter()
            .find_map(|item| item.result.as_ref().and_then(|r| r.errors.clone()))
        {
            return Err(RagError::write(KIND, format!("batch object rejected: {errors}")));
        }
        Ok(records.into_iter().map(|r| r.id).collect())
    }

    #[allow(clippy::cast_possible_truncation)]
    async fn search(&self, query: &[f32], top_k: usize) -> RagResult<Vec<SearchHit>> {
        check_query(KIND, self.dimension, query)?;
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let url = format!("{}/v1/graphql", self.base_url);
        let body = json!({"query": near_vector_query(&self.class_name, query, top_k)});
        let response = send_with_retry(&self.http.retry, || self.http.client.post(&url).json(&body))
            .await
            .map_err(|e| search_error(KIND, &e))?;
        let reply: GraphQlReply = response
            .json()
            .await
            .map_err(|e| decode_error(KIND, "graphql", e))?;

        if let Some(errors) = reply.errors.filter(|e| !e.is_empty()) {
            let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
            return Err(RagError::search(KIND, messages.join("; ")));
        }

        let results = reply
            .data
            .as_ref()
            .and_then(|d| d.pointer(&format!("/Get/{}", self.class_name)))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        Ok(results
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(mut fields) => {
                    let additional = fields.remove("_additional").unwrap_or(Value::Null);
                    let score = additional
                        .get("distance")
                        .and_then(Value::as_f64)
                        .map(|d| d as f32);
                    let id = additional
                        .get("id")
                        .and_then(Value::as_str)
                        .map(|id| RecordId::Key(id.to_string()));
                    let (text, metadata) = split_payload(fields);
                    let hit = SearchHit::new(text, score).with_metadata(metadata);
                    Some(match id {
                        Some(id) => hit.with_id(id),
                        None => hit,
                    })
                }
                _ => None,
            })
            .collect())
    }

    async fn get_all(&self) -> RagResult<Vec<String>> {
        let url = format!("{}/v1/objects", self.base_url);
        let limit = SCAN_PAGE_SIZE.to_string();
        let mut texts = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let response = send_with_retry(&self.http.retry, || {
                let mut request = self
                    .http
                    .client
                    .get(&url)
                    .query(&[("class", self.class_name.as_str()), ("limit", limit.as_str())]);
                if let Some(cursor) = after.as_deref() {
                    request = request.query(&[("after", cursor)]);
                }
                request
            })
            .await
            .map_err(|e| search_error(KIND, &e))?;
            let page: ObjectPage = response
                .json()
                .await
                .map_err(|e| decode_error(KIND, "objects", e))?;

            let fetched = page.objects.len();
            after = page.objects.last().map(|o| o.id.clone());
            texts.extend(
                page.objects
                    .into_iter()
                    .map(|o| split_payload(o.properties).0),
            );
            if fetched < SCAN_PAGE_SIZE {
                break;
            }
        }
        Ok(texts)
    }
}
