//! Milvus backend over the v2 RESTful API.
//!
//! Milvus answers most failures with HTTP 200 and a non-zero `code` in the
//! body, so every response passes through [`MilvusStore::call`].

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::info;

use super::remote::{decode_error, split_payload, SCAN_PAGE_SIZE, TEXT_KEY};
use crate::domain::errors::{RagError, RagResult};
use crate::domain::models::{BackendKind, EmbeddingMatrix, Metadata, MilvusConfig, RecordId, SearchHit};
use crate::domain::ports::{check_batch, check_query, VectorStore};
use crate::infrastructure::http::{send_with_retry, HttpContext};

const KIND: BackendKind = BackendKind::Milvus;
const VECTOR_FIELD: &str = "vector";
const ID_FIELD: &str = "id";

pub struct MilvusStore {
    base_url: String,
    collection: String,
    dimension: usize,
    http: HttpContext,
}

#[derive(Debug, Deserialize)]
struct Reply {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Deserialize)]
struct HasCollection {
    has: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertResult {
    #[serde(default)]
    insert_ids: Vec<Value>,
}

/// Which error variant a failed call maps to.
#[derive(Clone, Copy)]
enum Side {
    Write,
    Read,
}

fn entity_id(value: Value) -> RecordId {
    match value {
        Value::Number(n) => n
            .as_u64()
            .map_or_else(|| RecordId::Key(n.to_string()), RecordId::Sequential),
        Value::String(s) => RecordId::Key(s),
        other => RecordId::Key(other.to_string()),
    }
}

/// Entity fields other than the id, vector and distance become the payload.
fn entity_payload(mut entity: Map<String, Value>) -> (Option<Value>, Option<f32>, Map<String, Value>) {
    let id = entity.remove(ID_FIELD);
    #[allow(clippy::cast_possible_truncation)]
    let distance = entity
        .remove("distance")
        .and_then(|d| d.as_f64())
        .map(|d| d as f32);
    entity.remove(VECTOR_FIELD);
    (id, distance, entity)
}

impl MilvusStore {
    /// Connect and create the collection when it does not exist yet.
    pub async fn connect(config: &MilvusConfig, dimension: usize, http: HttpContext) -> RagResult<Self> {
        let store = Self {
            base_url: config.base_url(),
            collection: config.collection_name.clone(),
            dimension,
            http,
        };

        let has: HasCollection = store
            .call(
                "collections/has",
                &json!({"collectionName": store.collection}),
                Side::Write,
            )
            .await?;
        if !has.has {
            let _: Value = store
                .call(
                    "collections/create",
                    &json!({
                        "collectionName": store.collection,
                        "dimension": dimension,
                        "metricType": "L2",
                        "primaryFieldName": ID_FIELD,
                        "vectorFieldName": VECTOR_FIELD,
                        "idType": "Int64",
                        "autoId": true,
                    }),
                    Side::Write,
                )
                .await?;
            info!(collection = %store.collection, dimension, "milvus collection created");
        }
        Ok(store)
    }

    async fn call<T: DeserializeOwned>(&self, endpoint: &str, body: &Value, side: Side) -> RagResult<T> {
        let url = format!("{}/v2/vectordb/{endpoint}", self.base_url);
        let fail = |reason: String| match side {
            Side::Write => RagError::write(KIND, reason),
            Side::Read => RagError::search(KIND, reason),
        };

        let response = send_with_retry(&self.http.retry, || self.http.client.post(&url).json(body))
            .await
            .map_err(|e| fail(e.to_string()))?;
        let reply: Reply = response
            .json()
            .await
            .map_err(|e| decode_error(KIND, endpoint, e))?;
        if reply.code != 0 {
            return Err(fail(format!(
                "{endpoint} returned code {}: {}",
                reply.code,
                reply.message.unwrap_or_default()
            )));
        }
        serde_json::from_value(reply.data).map_err(|e| decode_error(KIND, endpoint, e))
    }
}

#[async_trait]
impl VectorStore for MilvusStore {
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

        let rows: Vec<Value> = vectors
            .rows()
            .zip(texts)
            .enumerate()
            .map(|(i, (row, text))| {
                let mut entity = Map::new();
                if let Some(meta) = metadata.map(|m| &m[i]) {
                    for (key, value) in meta {
                        if let Ok(value) = serde_json::to_value(value) {
                            entity.insert(key.clone(), value);
                        }
                    }
                }
                entity.insert(TEXT_KEY.to_string(), Value::String(text.clone()));
                entity.insert(VECTOR_FIELD.to_string(), json!(row));
                Value::Object(entity)
            })
            .collect();
        let body = json!({"collectionName": self.collection, "data": rows});

        let inserted: InsertResult = self.call("entities/insert", &body, Side::Write).await?;
        Ok(inserted.insert_ids.into_iter().map(entity_id).collect())
    }

    async fn search(&self, query: &[f32], top_k: usize) -> RagResult<Vec<SearchHit>> {
        check_query(KIND, self.dimension, query)?;
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let body = json!({
            "collectionName": self.collection,
            "data": [query],
            "annsField": VECTOR_FIELD,
            "limit": top_k,
            "outputFields": ["*"],
        });
        let entities: Vec<Map<String, Value>> =
            self.call("entities/search", &body, Side::Read).await?;

        Ok(entities
            .into_iter()
            .map(|entity| {
                let (id, distance, payload) = entity_payload(entity);
                let (text, metadata) = split_payload(payload);
                let hit = SearchHit::new(text, distance).with_metadata(metadata);
                match id {
                    Some(id) => hit.with_id(entity_id(id)),
                    None => hit,
                }
            })
            .collect())
    }

    async fn get_all(&self) -> RagResult<Vec<String>> {
        let mut texts = Vec::new();
        let mut offset = 0usize;
        loop {
            let body = json!({
                "collectionName": self.collection,
                "filter": format!("{ID_FIELD} >= 0"),
                "outputFields": [TEXT_KEY],
                "limit": SCAN_PAGE_SIZE,
                "offset": offset,
            });
            let page: Vec<Map<String, Value>> =
                self.call("entities/query", &body, Side::Read).await?;
            let fetched = page.len();
            texts.extend(page.into_iter().map(|entity| split_payload(entity).0));
            if fetched < SCAN_PAGE_SIZE {
                break;
            }
            offset += fetched;
        }
        Ok(texts)
    }
}
