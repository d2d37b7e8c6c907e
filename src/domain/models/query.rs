//! Query requests, prompt templates and pipeline responses.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::backend::IndexTarget;

/// Query value that requests every stored passage instead of a search.
pub const BULK_QUERY: &str = "*";

/// Answer returned when retrieval finds nothing; no generation call is made.
pub const NO_RELEVANT_INFORMATION: &str = "No relevant information found.";

/// What the pipeline is being asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Query,
    Chart,
    Summarization,
    /// `"*"` queries: raw concatenation of all passages, no generation.
    BulkRetrieval,
}

impl TaskType {
    /// Classify a free-text query. Mentions of "graph" or "chart" in any
    /// case request a chart.
    pub fn detect(query: &str) -> Self {
        if query == BULK_QUERY {
            return Self::BulkRetrieval;
        }
        let lowered = query.to_lowercase();
        if lowered.contains("graph") || lowered.contains("chart") {
            Self::Chart
        } else {
            Self::Query
        }
    }

    pub const fn template(self) -> Option<PromptTemplate> {
        match self {
            Self::Query => Some(PromptTemplate::Query),
            Self::Chart => Some(PromptTemplate::Chart),
            Self::Summarization => Some(PromptTemplate::Summarization),
            Self::BulkRetrieval => None,
        }
    }
}

/// Prompt handed to the generation collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptTemplate {
    Query,
    Chart,
    Summarization,
}

const CHART_INSTRUCTIONS: &str = r#"Respond only with a JSON object describing the chart, in this shape:
{
  "chartType": "bar" | "line" | "pie" | "scatter",
  "chartLabel": "title of the chart",
  "data": [
    {"category": "label or x value", "series": [{"name": "series name", "value": 0}]}
  ]
}
Use "x" instead of "category" and "y" instead of "value" for line and scatter charts.
Provide the JSON in a clean, consistent format without additional text or explanations."#;

impl PromptTemplate {
    /// Stable identifier reported in responses.
    pub const fn id(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Chart => "chart",
            Self::Summarization => "summarization",
        }
    }

    pub fn render(self, query: &str, context: &str) -> String {
        match self {
            Self::Query => format!("User's query: {query}\nRelevant context:\n{context}"),
            Self::Chart => format!(
                "User's query: {query}\nRelevant information:\n{context}\n\n{CHART_INSTRUCTIONS}"
            ),
            Self::Summarization => format!("Summarize the following text:\n\n{context}"),
        }
    }
}

impl fmt::Display for PromptTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// A question about one ingested document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Name of the document as it was ingested (e.g. `report.pdf`).
    pub db_filename: String,
    pub query: String,
    pub top_k: usize,
    /// Generation model identifier.
    pub model: String,
    /// Generation provider identifier (`openai`, `groq`, `ollama`).
    pub provider: String,
    pub target: IndexTarget,
}

/// Chart descriptor produced from a chart-task answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartArtifact {
    pub chart_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub image_path: String,
}

/// Final answer of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryAnswer {
    /// Generated text, returned verbatim.
    Text { text: String },
    Chart { chart: ChartArtifact },
    /// Retrieval found nothing, so generation was skipped.
    NoRelevantInformation { message: String },
    /// Concatenated passages from a bulk query.
    Bulk { text: String },
}

impl QueryAnswer {
    pub fn no_relevant_information() -> Self {
        Self::NoRelevantInformation {
            message: NO_RELEVANT_INFORMATION.to_string(),
        }
    }

    /// Human-readable rendering of the answer.
    pub fn display_text(&self) -> String {
        match self {
            Self::Text { text } | Self::Bulk { text } => text.clone(),
            Self::NoRelevantInformation { message } => message.clone(),
            Self::Chart { chart } => format!(
                "Chart ({}) written to {}",
                chart.chart_type, chart.image_path
            ),
        }
    }
}

/// Result of a query or summarization, with routing details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub task: TaskType,
    /// Template sent to the generator, if generation happened or was planned.
    pub template: Option<PromptTemplate>,
    pub answer: QueryAnswer,
    /// Number of passages that formed the context.
    pub retrieved: usize,
    /// Search failure that was downgraded to an empty result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_task() {
        assert_eq!(TaskType::detect("What was revenue?"), TaskType::Query);
        assert_eq!(TaskType::detect("Draw a CHART of sales"), TaskType::Chart);
        assert_eq!(TaskType::detect("bar graph please"), TaskType::Chart);
        assert_eq!(TaskType::detect("Photographs"), TaskType::Chart);
        assert_eq!(TaskType::detect("*"), TaskType::BulkRetrieval);
    }

    #[test]
    fn test_template_ids() {
        assert_eq!(TaskType::Chart.template().map(PromptTemplate::id), Some("chart"));
        assert_eq!(TaskType::Query.template().map(PromptTemplate::id), Some("query"));
        assert_eq!(TaskType::BulkRetrieval.template(), None);
    }

    #[test]
    fn test_render_query_template() {
        let prompt = PromptTemplate::Query.render("why?", "because (score: 0.10)");
        assert_eq!(
            prompt,
            "User's query: why?\nRelevant context:\nbecause (score: 0.10)"
        );
    }

    #[test]
    fn test_render_chart_template_mentions_shape() {
        let prompt = PromptTemplate::Chart.render("chart sales", "q1 10");
        assert!(prompt.starts_with("User's query: chart sales\nRelevant information:\nq1 10\n"));
        assert!(prompt.contains("\"chartType\""));
    }

    #[test]
    fn test_answer_serializes_with_kind_tag() {
        let json = serde_json::to_value(QueryAnswer::no_relevant_information()).unwrap();
        assert_eq!(json["kind"], "no_relevant_information");
        assert_eq!(json["message"], NO_RELEVANT_INFORMATION);
    }
}
