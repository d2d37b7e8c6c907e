//! Chart descriptors extracted from JSON chart answers.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::models::ChartArtifact;
use crate::domain::ports::ChartExtractor;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct ChartSpec {
    chart_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    chart_label: Option<String>,
    #[serde(default)]
    data: Vec<Value>,
}

/// Outermost `{...}` span of `answer`, if any.
fn json_span(answer: &str) -> Option<&str> {
    let start = answer.find('{')?;
    let end = answer.rfind('}')?;
    (end > start).then(|| &answer[start..=end])
}

/// Writes each chart found in an answer to `{output_dir}/chart_{uuid}.json`.
pub struct JsonChartExtractor {
    output_dir: PathBuf,
}

impl JsonChartExtractor {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    fn parse(answer: &str) -> Option<ChartSpec> {
        let span = json_span(answer)?;
        match serde_json::from_str::<ChartSpec>(span) {
            Ok(spec) if !spec.data.is_empty() => Some(spec),
            Ok(_) => {
                warn!("chart answer has no data points");
                None
            }
            Err(e) => {
                warn!(error = %e, "chart answer is not valid chart JSON");
                None
            }
        }
    }
}

#[async_trait]
impl ChartExtractor for JsonChartExtractor {
    async fn extract(&self, answer: &str) -> Option<ChartArtifact> {
        let spec = Self::parse(answer)?;
        let path = self.output_dir.join(format!("chart_{}.json", Uuid::new_v4()));

        let body = match serde_json::to_vec_pretty(&spec) {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "could not serialize chart descriptor");
                return None;
            }
        };
        if let Err(e) = tokio::fs::create_dir_all(&self.output_dir).await {
            warn!(error = %e, dir = %self.output_dir.display(), "could not create charts directory");
            return None;
        }
        if let Err(e) = tokio::fs::write(&path, body).await {
            warn!(error = %e, path = %path.display(), "could not write chart descriptor");
            return None;
        }
        info!(path = %path.display(), chart_type = %spec.chart_type, "chart descriptor written");

        Some(ChartArtifact {
            chart_type: spec.chart_type,
            label: spec.chart_label,
            image_path: path.display().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const ANSWER: &str = r#"Here you go:
```json
{"chartType": "bar", "chartLabel": "Sales", "data": [{"category": "Q1", "series": [{"name": "2024", "value": 10}]}]}
```"#;

    #[test]
    fn test_json_span() {
        assert_eq!(json_span("x {\"a\": {}} y"), Some("{\"a\": {}}"));
        assert_eq!(json_span("no json"), None);
        assert_eq!(json_span("} backwards {"), None);
    }

    #[tokio::test]
    async fn test_extract_writes_descriptor() {
        let dir = TempDir::new().unwrap();
        let extractor = JsonChartExtractor::new(dir.path().join("charts"));

        let chart = extractor.extract(ANSWER).await.unwrap();
        assert_eq!(chart.chart_type, "bar");
        assert_eq!(chart.label.as_deref(), Some("Sales"));
        assert!(chart.image_path.ends_with(".json"));

        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(&chart.image_path).unwrap()).unwrap();
        assert_eq!(written["chartType"], "bar");
        assert_eq!(written["data"][0]["category"], "Q1");
    }

    #[tokio::test]
    async fn test_plain_text_yields_nothing() {
        let dir = TempDir::new().unwrap();
        let extractor = JsonChartExtractor::new(dir.path());
        assert!(extractor.extract("Revenue grew 10%.").await.is_none());
        assert!(extractor
            .extract(r#"{"chartType": "pie", "data": []}"#)
            .await
            .is_none());
    }
}
