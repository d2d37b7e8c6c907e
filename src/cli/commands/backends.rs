//! `ragforge backends`: list supported vector stores and their defaults.

use anyhow::Result;
use serde::Serialize;

use crate::cli::output::table::{format_backends_table, BackendRow};
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{BackendKind, Config};

#[derive(Debug, Serialize)]
pub struct BackendsOutput {
    pub default_backend: String,
    pub backends: Vec<BackendRow>,
}

impl BackendsOutput {
    pub fn from_config(config: &Config) -> Self {
        let backends = BackendKind::ALL
            .into_iter()
            .map(|kind| BackendRow {
                backend: kind.to_string(),
                storage: if kind.is_local() { "local file" } else { "remote service" }.to_string(),
                naming_key: kind.naming_key().map(str::to_string),
                credential_env: kind.credential_env().map(str::to_string),
                defaults: config
                    .vector_databases
                    .get(kind.as_str())
                    .and_then(|options| serde_json::to_value(options).ok())
                    .unwrap_or_default(),
            })
            .collect();
        Self {
            default_backend: config.retrieval.backend.clone(),
            backends,
        }
    }
}

impl CommandOutput for BackendsOutput {
    fn to_human(&self) -> String {
        format!(
            "{}\nDefault backend: {}",
            format_backends_table(&self.backends),
            self.default_backend
        )
    }
}

pub fn execute(config: &Config, json_mode: bool) -> Result<()> {
    output(&BackendsOutput::from_config(config), json_mode);
    Ok(())
}
