//! Qdrant backend over its REST API.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use super::remote::{
    assemble_records, decode_error, search_error, split_payload, write_error, SCAN_PAGE_SIZE,
};
use crate::domain::errors::{RagError, RagResult};
use crate::domain::models::{
    BackendKind, EmbeddingMatrix, Metadata, QdrantConfig, RecordId, SearchHit,
};
use crate::domain::ports::{check_batch, check_query, VectorStore};
use crate::infrastructure::http::{send_with_retry, HttpContext};

const KIND: BackendKind = BackendKind::Qdrant;

/// Points in one named Qdrant collection, compared by Euclidean distance.
pub struct QdrantStore {
    base_url: String,
    collection: String,
    api_key: Option<String>,
    dimension: usize,
    http: HttpContext,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct ScoredPoint {
    id: Value,
    score: f32,
    #[serde(default)]
    payload: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct ScrollPage {
    points: Vec<ScrolledPoint>,
    #[serde(default)]
    next_page_offset: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ScrolledPoint {
    #[serde(default)]
    payload: Option<Map<String, Value>>,
}

fn point_id(id: Value) -> RecordId {
    match id {
        Value::Number(n) => n.as_u64().map_or_else(|| RecordId::Key(n.to_string()), RecordId::Sequential),
        Value::String(s) => RecordId::Key(s),
        other => RecordId::Key(other.to_string()),
    }
}

impl QdrantStore {
    /// Connect and make sure the collection exists with `dimension`-wide vectors.
    pub async fn connect(config: &QdrantConfig, dimension: usize, http: HttpContext) -> RagResult<Self> {
        let store = Self {
            base_url: config.base_url(),
            collection: config.collection_name.clone(),
            api_key: config.api_key.clone(),
            dimension,
            http,
        };
        store.ensure_collection().await?;
        Ok(store)
    }

    fn url(&self, suffix: &str) -> String {
        format!("{}/collections/{}{suffix}", self.base_url, self.collection)
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let builder = self.http.client.request(method, url);
        match &self.api_key {
            Some(key) => builder.header("api-key", key),
            None => builder,
        }
    }

    async fn ensure_collection(&self) -> RagResult<()> {
        let url = self.url("");
        match send_with_retry(&self.http.retry, || self.request(reqwest::Method::GET, &url)).await {
            Ok(response) => {
                let info: Value = response
                    .json()
                    .await
                    .map_err(|e| decode_error(KIND, "collection info", e))?;
                let size = info
                    .pointer("/result/config/params/vectors/size")
                    .and_then(Value::as_u64);
                if let Some(size) = size {
                    if size != self.dimension as u64 {
                        return Err(RagError::Configuration(format!(
                            "qdrant collection '{}' holds {size}-dimensional vectors, expected {}",
                            self.collection, self.dimension
                        )));
                    }
                }
                debug!(collection = %self.collection, "qdrant collection exists");
                Ok(())
            }
            Err(err) if err.is_not_found() => {
                let body = json!({"vectors": {"size": self.dimension, "distance": "Euclid"}});
                send_with_retry(&self.http.retry, || {
                    self.request(reqwest::Method::PUT, &url).json(&body)
                })
                .await
                .map_err(|e| write_error(KIND, &e))?;
                info!(collection = %self.collection, dimension = self.dimension, "qdrant collection created");
                Ok(())
            }
            Err(err) => Err(write_error(KIND, &err)),
        }
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
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
        let points: Vec<Value> = records
            .iter()
            .map(|r| json!({"id": r.id, "vector": r.vector, "payload": r.payload()}))
            .collect();
        let body = json!({ "points": points });
        let url = self.url("/points?wait=true");

        send_with_retry(&self.http.retry, || {
            self.request(reqwest::Method::PUT, &url).json(&body)
        })
        .await
        .map_err(|e| write_error(KIND, &e))?;

        Ok(records.into_iter().map(|r| r.id).collect())
    }

    async fn search(&self, query: &[f32], top_k: usize) -> RagResult<Vec<SearchHit>> {
        check_query(KIND, self.dimension, query)?;
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let body = json!({"vector": query, "limit": top_k, "with_payload": true});
        let url = self.url("/points/search");
        let response = send_with_retry(&self.http.retry, || {
            self.request(reqwest::Method::POST, &url).json(&body)
        })
        .await
        .map_err(|e| search_error(KIND, &e))?;

        let envelope: Envelope<Vec<ScoredPoint>> = response
            .json()
            .await
            .map_err(|e| decode_error(KIND, "search", e))?;

        Ok(envelope
            .result
            .into_iter()
            .map(|point| {
                let (text, metadata) = split_payload(point.payload.unwrap_or_default());
                SearchHit::new(text, Some(point.score))
                    .with_id(point_id(point.id))
                    .with_metadata(metadata)
            })
            .collect())
    }

    async fn get_all(&self) -> RagResult<Vec<String>> {
        let url = self.url("/points/scroll");
        let mut texts = Vec::new();
        let mut offset: Option<Value> = None;

        loop {
            let mut body = json!({
                "limit": SCAN_PAGE_SIZE,
                "with_payload": true,
                "with_vector": false,
            });
            if let Some(ref next) = offset {
                body["offset"] = next.clone();
            }
            let response = send_with_retry(&self.http.retry, || {
                self.request(reqwest::Method::POST, &url).json(&body)
            })
            .await
            .map_err(|e| search_error(KIND, &e))?;
            let page: Envelope<ScrollPage> = response
                .json()
                .await
                .map_err(|e| decode_error(KIND, "scroll", e))?;

            texts.extend(
                page.result
                    .points
                    .into_iter()
                    .map(|p| split_payload(p.payload.unwrap_or_default()).0),
            );
            match page.result.next_page_offset {
                Some(next) if !next.is_null() => offset = Some(next),
                _ => break,
            }
        }
        Ok(texts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::DeploymentMode;
    use mockito::Matcher;

    fn config(server: &mockito::Server) -> QdrantConfig {
        let address = server.host_with_port();
        let (host, port) = address.rsplit_once(':').unwrap();
        QdrantConfig {
            mode: DeploymentMode::Local,
            host: host.to_string(),
            port: port.parse().unwrap(),
            collection_name: "vector_db_report".to_string(),
            api_key: Some("qd-key".to_string()),
        }
    }

    fn http() -> HttpContext {
        HttpContext::without_retries(reqwest::Client::new())
    }

    #[tokio::test]
    async fn test_creates_missing_collection() {
        let mut server = mockito::Server::new_async().await;
        let probe = server
            .mock("GET", "/collections/vector_db_report")
            .match_header("api-key", "qd-key")
            .with_status(404)
            .create_async()
            .await;
        let create = server
            .mock("PUT", "/collections/vector_db_report")
            .match_body(Matcher::PartialJson(
                json!({"vectors": {"size": 3, "distance": "Euclid"}}),
            ))
            .with_status(200)
            .with_body(r#"{"result": true}"#)
            .create_async()
            .await;

        QdrantStore::connect(&config(&server), 3, http()).await.unwrap();
        probe.assert_async().await;
        create.assert_async().await;
    }

    #[tokio::test]
    async fn test_existing_collection_with_other_dimension() {
        let mut server = mockito::Server::new_async().await;
        let _probe = server
            .mock("GET", "/collections/vector_db_report")
            .with_status(200)
            .with_body(r#"{"result":{"config":{"params":{"vectors":{"size":8,"distance":"Euclid"}}}}}"#)
            .create_async()
            .await;

        let err = QdrantStore::connect(&config(&server), 3, http()).await.err().unwrap();
        assert!(matches!(err, RagError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_scroll_follows_pages() {
        let mut server = mockito::Server::new_async().await;
        let _probe = server
            .mock("GET", "/collections/vector_db_report")
            .with_status(200)
            .with_body(r#"{"result":{}}"#)
            .create_async()
            .await;
        let first = server
            .mock("POST", "/collections/vector_db_report/points/scroll")
            .match_body(Matcher::Json(json!({"limit": 256, "with_payload": true, "with_vector": false})))
            .with_status(200)
            .with_body(r#"{"result":{"points":[{"id":1,"payload":{"text":"a"}}],"next_page_offset":2}}"#)
            .create_async()
            .await;
        let second = server
            .mock("POST", "/collections/vector_db_report/points/scroll")
            .match_body(Matcher::PartialJson(json!({"offset": 2})))
            .with_status(200)
            .with_body(r#"{"result":{"points":[{"id":2,"payload":{"text":"b"}}],"next_page_offset":null}}"#)
            .create_async()
            .await;

        let store = QdrantStore::connect(&config(&server), 3, http()).await.unwrap();
        assert_eq!(store.get_all().await.unwrap(), vec!["a", "b"]);
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn test_search_error_is_backend_search() {
        let mut server = mockito::Server::new_async().await;
        let _probe = server
            .mock("GET", "/collections/vector_db_report")
            .with_status(200)
            .with_body(r#"{"result":{}}"#)
            .create_async()
            .await;
        let _search = server
            .mock("POST", "/collections/vector_db_report/points/search")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let store = QdrantStore::connect(&config(&server), 3, http()).await.unwrap();
        let err = store.search(&[0.0, 0.0, 0.0], 2).await.unwrap_err();
        assert!(matches!(err, RagError::BackendSearch { .. }));
    }
}
