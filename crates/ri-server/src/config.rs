use std::path::{Path, PathBuf};

use ri_indexer::IndexConfig;
use ri_query::QueryConfig;
use serde::Deserialize;

use crate::error::ServerError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Configuration of the backend process.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Directory holding `.ri/symbols.db`; the working directory when unset.
    pub storage_root: Option<PathBuf>,
    /// Default filter directive; `RUST_LOG` overrides it.
    pub log_level: String,
    pub log_format: LogFormat,
    /// Directory whose changes are fed to the indexer while serving.
    pub watch_root: Option<PathBuf>,
    pub index: IndexConfig,
    pub query: QueryConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            storage_root: None,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            watch_root: None,
            index: IndexConfig::default(),
            query: QueryConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Read a JSON configuration file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ServerError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("cannot read {}: {e}", path.display())))?;
        serde_json::from_str(&text)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))
    }

    pub fn storage_root(&self) -> Result<PathBuf, ServerError> {
        match &self.storage_root {
            Some(root) => Ok(root.clone()),
            None => Ok(std::env::current_dir()?),
        }
    }
}

#[cfg(test)]
mod tests {
    use ri_indexer::LaunchPolicy;

    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ri.json");
        std::fs::write(
            &path,
            r#"{"log_format": "json", "index": {"hardware_concurrency": 2, "launch_policy": "deferred"}}"#,
        )
        .unwrap();

        let config = ServerConfig::load(&path).unwrap();
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.index.hardware_concurrency, Some(2));
        assert_eq!(config.index.launch_policy, LaunchPolicy::Deferred);
        assert_eq!(config.index.watcher_debounce_ms, 300);
        assert!(config.query.processing_slots.is_none());
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ri.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(ServerConfig::load(&path), Err(ServerError::Config(_))));
    }
}
