use std::path::PathBuf;

use crate::domain::models::LoggingConfig;

/// Resolved subscriber settings, built from the `logging` config section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Default filter level; `RUST_LOG` still wins.
    pub level: String,
    pub format: LogFormat,
    /// When set, JSON logs are also written to rotated files here.
    pub log_dir: Option<PathBuf>,
    pub enable_stderr: bool,
    pub rotation: RotationPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    /// Unrecognized names fall back to `Pretty`; the loader has already
    /// rejected them.
    fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RotationPolicy {
    #[default]
    Daily,
    Hourly,
    Never,
}

impl RotationPolicy {
    fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "hourly" => Self::Hourly,
            "never" => Self::Never,
            _ => Self::Daily,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::from(&LoggingConfig::default())
    }
}

impl From<&LoggingConfig> for LogConfig {
    fn from(config: &LoggingConfig) -> Self {
        Self {
            level: config.level.clone(),
            format: LogFormat::from_name(&config.format),
            log_dir: config.log_dir.as_deref().map(PathBuf::from),
            enable_stderr: true,
            rotation: RotationPolicy::from_name(&config.rotation),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_domain_config() {
        let domain = LoggingConfig {
            level: "debug".to_string(),
            format: "json".to_string(),
            log_dir: Some("/var/log/ragforge".to_string()),
            rotation: "hourly".to_string(),
        };
        let config = LogConfig::from(&domain);
        assert_eq!(config.level, "debug");
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.rotation, RotationPolicy::Hourly);
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/ragforge")));
    }

    #[test]
    fn test_defaults_log_to_stderr_only() {
        let config = LogConfig::default();
        assert!(config.enable_stderr);
        assert!(config.log_dir.is_none());
        assert_eq!(config.rotation, RotationPolicy::Daily);
    }
}
