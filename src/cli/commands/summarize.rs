//! `ragforge summarize`: summarize every passage of a document.

use anyhow::{Context, Result};
use clap::Args;

use super::query::AnswerOutput;
use super::{AppContext, TargetArgs};
use crate::cli::output::output;

#[derive(Args, Debug)]
pub struct SummarizeArgs {
    /// Document name as it was ingested
    pub filename: String,

    /// Generation model (defaults to generation.model)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Generation provider (defaults to generation.provider)
    #[arg(short, long)]
    pub provider: Option<String>,

    #[command(flatten)]
    pub target: TargetArgs,
}

pub async fn execute(args: SummarizeArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    let generation = &ctx.config.generation;
    let target = args.target.to_target(&ctx.config)?;
    let model = args.model.unwrap_or_else(|| generation.model.clone());
    let gen_provider = args
        .provider
        .unwrap_or_else(|| generation.provider.clone());

    let provider = ctx.embedding_provider().await?;
    let response = ctx
        .pipeline
        .summarize(&provider, &target, &args.filename, &model, &gen_provider)
        .await
        .context("Summarization failed")?;
    output(&AnswerOutput { response }, json_mode);
    Ok(())
}
