//! `ragforge query`: answer a question about an ingested document.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use super::{AppContext, TargetArgs};
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{QueryAnswer, QueryRequest, QueryResponse};

#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Document name as it was ingested, e.g. report.txt
    pub filename: String,

    /// Question, or "*" for every stored passage
    pub query: String,

    /// Passages retrieved as context (defaults to retrieval.top_k)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Generation model (defaults to generation.model)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Generation provider: openai, groq or ollama (defaults to generation.provider)
    #[arg(short, long)]
    pub provider: Option<String>,

    #[command(flatten)]
    pub target: TargetArgs,
}

#[derive(Debug, Serialize)]
pub struct AnswerOutput {
    #[serde(flatten)]
    pub response: QueryResponse,
}

impl CommandOutput for AnswerOutput {
    fn to_human(&self) -> String {
        let mut text = self.response.answer.display_text();
        if let Some(error) = &self.response.search_error {
            text.push_str(&format!("\n\n(search error: {error})"));
        }
        if let QueryAnswer::Chart { chart } = &self.response.answer {
            if let Some(label) = &chart.label {
                text.push_str(&format!("\nTitle: {label}"));
            }
        }
        text
    }
}

pub async fn execute(args: QueryArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    let generation = &ctx.config.generation;
    let request = QueryRequest {
        db_filename: args.filename,
        query: args.query,
        top_k: args.top_k.unwrap_or(ctx.config.retrieval.top_k),
        model: args.model.unwrap_or_else(|| generation.model.clone()),
        provider: args.provider.unwrap_or_else(|| generation.provider.clone()),
        target: args.target.to_target(&ctx.config)?,
    };

    let provider = ctx.embedding_provider().await?;
    let response = ctx
        .pipeline
        .query(&provider, &request)
        .await
        .context("Query failed")?;
    output(&AnswerOutput { response }, json_mode);
    Ok(())
}
