//! Query-time orchestration: retrieve, format context, generate.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::domain::errors::{RagError, RagResult};
use crate::domain::models::{
    IndexTarget, PromptTemplate, QueryAnswer, QueryRequest, QueryResponse, SearchHit, TaskType,
};
use crate::domain::ports::{ChartExtractor, GenerationClient};
use crate::services::embedding_service::EmbeddingProvider;
use crate::services::index_service::IndexService;
use crate::services::vector_index::VectorIndex;

/// One line per hit, annotated with its score to two decimals when present.
pub fn format_context(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|hit| match hit.score {
            Some(score) => format!("{} (score: {score:.2})", hit.text),
            None => hit.text.clone(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub struct RetrievalPipeline {
    index_service: Arc<IndexService>,
    generator: Arc<dyn GenerationClient>,
    charts: Arc<dyn ChartExtractor>,
}

impl RetrievalPipeline {
    pub fn new(
        index_service: Arc<IndexService>,
        generator: Arc<dyn GenerationClient>,
        charts: Arc<dyn ChartExtractor>,
    ) -> Self {
        Self {
            index_service,
            generator,
            charts,
        }
    }

    /// Open the collection named by the request and answer its query.
    #[instrument(skip(self, provider, request), fields(file = %request.db_filename, backend = %request.target.backend))]
    pub async fn query(
        &self,
        provider: &EmbeddingProvider,
        request: &QueryRequest,
    ) -> RagResult<QueryResponse> {
        let index = self
            .index_service
            .open_for_query(provider, &request.target, &request.db_filename)
            .await?;
        self.answer(
            &index,
            &request.query,
            request.top_k,
            &request.model,
            &request.provider,
        )
        .await
    }

    /// Answer `query` against an already opened index.
    ///
    /// `"*"` returns every stored passage concatenated, with no generation.
    /// Any other query is a similarity search; when it finds nothing the
    /// generator is not called. Backend search failures are recorded on the
    /// response and treated as an empty result.
    pub async fn answer(
        &self,
        index: &VectorIndex,
        query: &str,
        top_k: usize,
        model: &str,
        provider: &str,
    ) -> RagResult<QueryResponse> {
        let task = TaskType::detect(query);

        if task == TaskType::BulkRetrieval {
            let texts = index.get_all().await?;
            let answer = if texts.is_empty() {
                QueryAnswer::no_relevant_information()
            } else {
                QueryAnswer::Bulk {
                    text: texts.concat(),
                }
            };
            return Ok(QueryResponse {
                task,
                template: None,
                answer,
                retrieved: texts.len(),
                search_error: None,
            });
        }

        let template = task.template();
        let (hits, search_error) = match index.search(query, top_k).await {
            Ok(hits) => (hits, None),
            Err(err @ RagError::BackendSearch { .. }) => {
                warn!(error = %err, "search failed; answering as if nothing matched");
                (Vec::new(), Some(err.to_string()))
            }
            Err(err) => return Err(err),
        };

        if hits.is_empty() {
            info!("no relevant passages, skipping generation");
            return Ok(QueryResponse {
                task,
                template,
                answer: QueryAnswer::no_relevant_information(),
                retrieved: 0,
                search_error,
            });
        }

        let context = format_context(&hits);
        let prompt_template = template.unwrap_or(PromptTemplate::Query);
        let generated = self
            .generator
            .generate(&prompt_template.render(query, &context), model, provider)
            .await?;

        let answer = if task == TaskType::Chart {
            match self.charts.extract(&generated).await {
                Some(chart) => QueryAnswer::Chart { chart },
                None => QueryAnswer::Text { text: generated },
            }
        } else {
            QueryAnswer::Text { text: generated }
        };

        Ok(QueryResponse {
            task,
            template,
            answer,
            retrieved: hits.len(),
            search_error: None,
        })
    }

    /// Summarize every passage of the collection behind `filename`.
    #[instrument(skip(self, provider, target))]
    pub async fn summarize(
        &self,
        provider: &EmbeddingProvider,
        target: &IndexTarget,
        filename: &str,
        model: &str,
        generation_provider: &str,
    ) -> RagResult<QueryResponse> {
        let index = self
            .index_service
            .open_for_query(provider, target, filename)
            .await?;
        let texts = index.get_all().await?;
        let template = PromptTemplate::Summarization;

        if texts.is_empty() {
            return Ok(QueryResponse {
                task: TaskType::Summarization,
                template: Some(template),
                answer: QueryAnswer::no_relevant_information(),
                retrieved: 0,
                search_error: None,
            });
        }

        let prompt = template.render("", &texts.concat());
        let summary = self
            .generator
            .generate(&prompt, model, generation_provider)
            .await?;
        Ok(QueryResponse {
            task: TaskType::Summarization,
            template: Some(template),
            answer: QueryAnswer::Text { text: summary },
            retrieved: texts.len(),
            search_error: None,
        })
    }
}
