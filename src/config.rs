//! Configuration for slurmscope
//!
//! Settings come from an optional TOML file at
//! `~/.config/slurmscope/config.toml`, overridden field-by-field by CLI
//! flags. The log pattern template itself is compiled (and validated) by
//! `slurmscope-logs` after loading.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Default log path template: one directory per job name.
pub const DEFAULT_LOG_PATTERN: &str = "{name}/job.{stream}.{id}";

/// Default discovery refresh window in seconds.
pub const DEFAULT_REFRESH_SECS: u64 = 20;

/// On-disk config file shape. Every field optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    pub log_root: Option<PathBuf>,
    pub log_pattern: Option<String>,
    pub user: Option<String>,
    pub refresh_secs: Option<u64>,
}

impl FileConfig {
    fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).context("invalid config file")
    }
}

/// Fully resolved application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory for Slurm log files
    pub log_root: PathBuf,
    /// Log path template relative to the root
    pub log_pattern: String,
    /// Slurm user whose jobs to show
    pub user: String,
    /// Seconds between discovery refreshes
    pub refresh_secs: u64,
}

/// Per-invocation overrides, from CLI flags.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub log_root: Option<PathBuf>,
    pub log_pattern: Option<String>,
    pub user: Option<String>,
    pub refresh_secs: Option<u64>,
}

impl Config {
    /// Load the config file (if any) and apply CLI overrides on top.
    pub fn load(overrides: Overrides) -> Result<Self> {
        let file = match std::fs::read_to_string(config_path()) {
            Ok(text) => FileConfig::parse(&text)?,
            Err(_) => FileConfig::default(),
        };
        Ok(Self::resolve(file, overrides))
    }

    fn resolve(file: FileConfig, overrides: Overrides) -> Self {
        Self {
            log_root: overrides
                .log_root
                .or(file.log_root)
                .unwrap_or_else(default_log_root),
            log_pattern: overrides
                .log_pattern
                .or(file.log_pattern)
                .unwrap_or_else(|| DEFAULT_LOG_PATTERN.to_string()),
            user: overrides
                .user
                .or(file.user)
                .unwrap_or_else(|| std::env::var("USER").unwrap_or_default()),
            refresh_secs: overrides
                .refresh_secs
                .or(file.refresh_secs)
                .unwrap_or(DEFAULT_REFRESH_SECS),
        }
    }
}

fn default_log_root() -> PathBuf {
    home_dir().join("slurm-logs")
}

fn config_path() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
        .join("slurmscope")
        .join("config.toml")
}

fn home_dir() -> PathBuf {
    PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_config_parse() {
        let file = FileConfig::parse(
            r#"
log_root = "/scratch/logs"
log_pattern = "slurm-{id}.{stream}"
refresh_secs = 5
"#,
        )
        .unwrap();
        assert_eq!(file.log_root, Some(PathBuf::from("/scratch/logs")));
        assert_eq!(file.log_pattern.as_deref(), Some("slurm-{id}.{stream}"));
        assert_eq!(file.user, None);
        assert_eq!(file.refresh_secs, Some(5));
    }

    #[test]
    fn test_file_config_rejects_garbage() {
        assert!(FileConfig::parse("log_root = [1, 2]").is_err());
    }

    #[test]
    fn test_overrides_win_over_file() {
        let file = FileConfig {
            log_root: Some(PathBuf::from("/from-file")),
            log_pattern: Some("file-{id}.{stream}".to_string()),
            user: Some("filer".to_string()),
            refresh_secs: Some(5),
        };
        let overrides = Overrides {
            log_root: Some(PathBuf::from("/from-flag")),
            refresh_secs: Some(60),
            ..Default::default()
        };

        let config = Config::resolve(file, overrides);
        assert_eq!(config.log_root, PathBuf::from("/from-flag"));
        assert_eq!(config.log_pattern, "file-{id}.{stream}");
        assert_eq!(config.user, "filer");
        assert_eq!(config.refresh_secs, 60);
    }

    #[test]
    fn test_defaults_fill_gaps() {
        let config = Config::resolve(FileConfig::default(), Overrides::default());
        assert!(config.log_root.ends_with("slurm-logs"));
        assert_eq!(config.log_pattern, DEFAULT_LOG_PATTERN);
        assert_eq!(config.refresh_secs, DEFAULT_REFRESH_SECS);
    }
}
