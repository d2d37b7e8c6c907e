//! Ragforge CLI entry point.

use std::path::Path;

use anyhow::Result;
use clap::Parser;

use ragforge::cli::commands::{backends, ingest, init, query, summarize, AppContext};
use ragforge::cli::{Cli, Commands};
use ragforge::domain::models::Config;
use ragforge::infrastructure::config::ConfigLoader;
use ragforge::infrastructure::logging::{LogConfig, LoggerImpl};

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

async fn run(cli: Cli) -> Result<()> {
    let Cli {
        command,
        json,
        config,
    } = cli;

    // init must work before any configuration exists
    let command = match command {
        Commands::Init(args) => return init::execute(args, json).await,
        other => other,
    };

    let config = load_config(config.as_deref())?;
    let _logger = LoggerImpl::init(&LogConfig::from(&config.logging))?;

    match command {
        Commands::Init(_) => Ok(()),
        Commands::Backends => backends::execute(&config, json),
        Commands::Ingest(args) => {
            let ctx = AppContext::build(config)?;
            ingest::execute(args, &ctx, json).await
        }
        Commands::Query(args) => {
            let ctx = AppContext::build(config)?;
            query::execute(args, &ctx, json).await
        }
        Commands::Summarize(args) => {
            let ctx = AppContext::build(config)?;
            summarize::execute(args, &ctx, json).await
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json = cli.json;

    if let Err(err) = run(cli).await {
        ragforge::cli::handle_error(err, json);
    }
}
