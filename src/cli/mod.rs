//! Command-line interface.

pub mod commands;
pub mod output;
pub mod types;

pub use types::{Cli, Commands};

use crate::infrastructure::logging::SecretScrubber;

/// One-line, scrubbed description of `err` and its causes.
pub fn error_message(err: &anyhow::Error) -> String {
    SecretScrubber::global().scrub_message(&format!("{err:#}"))
}

/// Report `err` to the user and exit with status 1.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    let message = error_message(&err);
    if json_mode {
        println!("{}", serde_json::json!({ "error": message }));
    } else {
        eprintln!("Error: {message}");
    }
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use clap::Parser;

    #[test]
    fn test_error_message_joins_causes_and_scrubs() {
        let err = Err::<(), _>(anyhow::anyhow!(
            "HTTP 401: invalid key sk-abcdefghijklmnopqrstuvwx"
        ))
        .context("Query failed")
        .unwrap_err();
        let message = error_message(&err);
        assert!(message.starts_with("Query failed: HTTP 401"));
        assert!(!message.contains("sk-abcdefghijklmnopqrstuvwx"));
        assert!(!message.contains('\n'));
    }

    #[test]
    fn test_parse_query_with_overrides() {
        let cli = Cli::try_parse_from([
            "ragforge",
            "--json",
            "query",
            "report.txt",
            "show me a chart of sales",
            "-k",
            "5",
            "--backend",
            "qdrant",
            "--db-config",
            r#"{"host":"qdrant.internal"}"#,
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Query(args) => {
                assert_eq!(args.filename, "report.txt");
                assert_eq!(args.top_k, Some(5));
                assert_eq!(args.target.backend.as_deref(), Some("qdrant"));
                assert!(args.target.db_config.is_some());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_ingest_with_global_flag_after_subcommand() {
        let cli = Cli::try_parse_from([
            "ragforge",
            "ingest",
            "notes.md",
            "--images",
            "images.json",
            "--config",
            "custom.yaml",
        ])
        .unwrap();
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("custom.yaml")));
        assert!(matches!(cli.command, Commands::Ingest(ref args) if args.images.is_some()));
    }

    #[test]
    fn test_query_requires_text() {
        assert!(Cli::try_parse_from(["ragforge", "query", "report.txt"]).is_err());
    }
}
