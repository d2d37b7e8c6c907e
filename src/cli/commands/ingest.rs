//! `ragforge ingest`: split a document into passages and index them.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use serde::Serialize;

use super::{AppContext, TargetArgs};
use crate::cli::output::progress::create_spinner;
use crate::cli::output::{output, CommandOutput};
use crate::domain::ports::PersistOutcome;
use crate::services::ingestion::{read_passages, read_secondary_embeddings};
use crate::services::IngestReport;

#[derive(Args, Debug)]
pub struct IngestArgs {
    /// Plain-text or markdown document to ingest
    pub file: PathBuf,

    #[command(flatten)]
    pub target: TargetArgs,

    /// JSON file of image embeddings: [{"label": ..., "vector": [...]}]
    #[arg(long)]
    pub images: Option<PathBuf>,

    /// Texts embedded per request (defaults to retrieval.batch_size)
    #[arg(long)]
    pub batch_size: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct IngestOutput {
    pub file: String,
    #[serde(flatten)]
    pub report: IngestReport,
}

impl CommandOutput for IngestOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![format!(
            "Ingested {} into {} collection '{}'",
            self.file, self.report.backend, self.report.collection
        )];
        lines.push(format!("  passages added:   {}", self.report.added));
        if self.report.skipped > 0 {
            lines.push(format!("  passages skipped: {}", self.report.skipped));
        }
        if self.report.secondary_added > 0 {
            lines.push(format!("  images added:     {}", self.report.secondary_added));
        }
        lines.push(match &self.report.persistence {
            PersistOutcome::Saved { index_path, .. } => {
                format!("  saved to:         {}", index_path.display())
            }
            PersistOutcome::Restored { .. } | PersistOutcome::BackendManaged => {
                "  persistence:      managed by backend".to_string()
            }
        });
        lines.join("\n")
    }
}

pub async fn execute(args: IngestArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    let target = args.target.to_target(&ctx.config)?;
    let filename = args
        .file
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .with_context(|| format!("Invalid document path: {}", args.file.display()))?;

    let passages = read_passages(&args.file)
        .await
        .context("Failed to read document")?;
    let secondary = match &args.images {
        Some(path) => read_secondary_embeddings(path)
            .await
            .context("Failed to read image embeddings")?,
        None => Vec::new(),
    };
    if passages.is_empty() && secondary.is_empty() {
        bail!("{} contains no text to ingest", args.file.display());
    }

    let provider = ctx.embedding_provider().await?;
    let spinner = create_spinner(
        format!("Embedding {} passages from {filename}", passages.len()),
        json_mode,
    );
    let batch_size = args.batch_size.unwrap_or(ctx.config.retrieval.batch_size);
    let result = ctx
        .index_service
        .ingest(&provider, &target, &filename, &passages, &secondary, batch_size)
        .await;
    spinner.finish_and_clear();

    let report = result.context("Ingestion failed")?;
    output(
        &IngestOutput {
            file: filename,
            report,
        },
        json_mode,
    );
    Ok(())
}
