//! CLI type definitions

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::cli::commands::ingest::IngestArgs;
use crate::cli::commands::init::InitArgs;
use crate::cli::commands::query::QueryArgs;
use crate::cli::commands::summarize::SummarizeArgs;

#[derive(Parser, Debug)]
#[command(name = "ragforge")]
#[command(about = "Ragforge - retrieval-augmented generation over pluggable vector stores", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (replaces .ragforge/config.yaml and local.yaml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a default configuration file
    Init(InitArgs),

    /// Split a document into passages and add them to its collection
    Ingest(IngestArgs),

    /// Answer a question from a document's passages
    Query(QueryArgs),

    /// Summarize all passages of a document
    Summarize(SummarizeArgs),

    /// List supported vector store backends
    Backends,
}
