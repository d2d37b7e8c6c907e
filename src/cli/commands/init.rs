//! `ragforge init`: write a default configuration and data directories.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use tokio::fs;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;

const CONFIG_DIR: &str = ".ragforge";
const CONFIG_FILE: &str = "config.yaml";

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing configuration file
    #[arg(long, short)]
    pub force: bool,

    /// Target directory (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

#[derive(Debug, serde::Serialize)]
pub struct InitOutput {
    pub success: bool,
    pub message: String,
    pub config_path: PathBuf,
    pub directories_created: Vec<String>,
}

impl CommandOutput for InitOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![self.message.clone()];
        if !self.directories_created.is_empty() {
            lines.push("\nCreated directories:".to_string());
            for dir in &self.directories_created {
                lines.push(format!("  - {dir}"));
            }
        }
        lines.join("\n")
    }
}

/// Default configuration rendered as YAML.
pub fn default_config_yaml() -> Result<String> {
    serde_yaml::to_string(&Config::default()).context("Failed to render default configuration")
}

fn relative_to(dir: &Path, root: &Path) -> String {
    dir.strip_prefix(root)
        .unwrap_or(dir)
        .to_string_lossy()
        .to_string()
}

pub async fn execute(args: InitArgs, json_mode: bool) -> Result<()> {
    let root = if args.path.is_absolute() {
        args.path.clone()
    } else {
        std::env::current_dir()
            .context("Failed to get current directory")?
            .join(&args.path)
    };
    let config_path = root.join(CONFIG_DIR).join(CONFIG_FILE);

    if fs::try_exists(&config_path).await.unwrap_or(false) && !args.force {
        output(
            &InitOutput {
                success: false,
                message: "Configuration already exists. Use --force to overwrite.".to_string(),
                config_path,
                directories_created: vec![],
            },
            json_mode,
        );
        return Ok(());
    }

    let defaults = Config::default();
    let mut directories_created = vec![];
    for dir in [
        root.join(CONFIG_DIR),
        root.join(&defaults.data_dir),
        root.join(&defaults.charts_dir),
    ] {
        if !fs::try_exists(&dir).await.unwrap_or(false) {
            fs::create_dir_all(&dir)
                .await
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            directories_created.push(relative_to(&dir, &root));
        }
    }

    fs::write(&config_path, default_config_yaml()?)
        .await
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    output(
        &InitOutput {
            success: true,
            message: format!("Wrote default configuration to {}", config_path.display()),
            config_path,
            directories_created,
        },
        json_mode,
    );
    Ok(())
}
