#![deny(unsafe_code)]

//! Configuration loading and validation for breachhound.
//!
//! Loads TOML configuration files and validates them against expected schemas.
//! Provides the [`AppConfig`] type as the central configuration structure.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Top-level application configuration.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Service configuration.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Corpus (breach-file directory) configuration.
    #[serde(default)]
    pub corpus: CorpusConfig,

    /// Search quota configuration.
    #[serde(default)]
    pub quota: QuotaConfig,

    /// Persistent store locations.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Keep-alive HTTP endpoint configuration.
    #[serde(default)]
    pub keepalive: KeepaliveConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.quota.free_search_limit == 0 {
            return Err(ConfigError::Validation(
                "quota.free_search_limit must be at least 1".to_string(),
            ));
        }
        if self.corpus.extensions.is_empty() {
            return Err(ConfigError::Validation(
                "corpus.extensions must list at least one extension".to_string(),
            ));
        }
        for ext in &self.corpus.extensions {
            if !ext.starts_with('.') {
                return Err(ConfigError::Validation(format!(
                    "corpus extension '{ext}' must start with a dot"
                )));
            }
        }
        Ok(())
    }
}

/// Configuration for the bot service itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Command prefix recognised in message bodies.
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,

    /// Owner id granted an admin key on first run, if not already an admin.
    #[serde(default)]
    pub bootstrap_admin: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            command_prefix: default_command_prefix(),
            bootstrap_admin: None,
        }
    }
}

fn default_command_prefix() -> String {
    "/".to_string()
}

/// Configuration for the breach-file corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// Root directory of the corpus. Created on demand if absent.
    #[serde(default = "default_corpus_root")]
    pub root: PathBuf,

    /// File-extension allow-list for the scanner.
    #[serde(default = "default_corpus_extensions")]
    pub extensions: Vec<String>,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            root: default_corpus_root(),
            extensions: default_corpus_extensions(),
        }
    }
}

fn default_corpus_root() -> PathBuf {
    PathBuf::from("data/breaches")
}

fn default_corpus_extensions() -> Vec<String> {
    vec![".txt".to_string()]
}

/// Search quota configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Number of searches granted to users without an active API key.
    #[serde(default = "default_free_search_limit")]
    pub free_search_limit: u64,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            free_search_limit: default_free_search_limit(),
        }
    }
}

fn default_free_search_limit() -> u64 {
    10
}

/// Locations of the persistent JSON stores and report artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the per-entity store files.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory report artifacts are written to.
    #[serde(default = "default_reports_dir")]
    pub reports_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            reports_dir: default_reports_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data/stores")
}

fn default_reports_dir() -> PathBuf {
    PathBuf::from("data/reports")
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "debug", "trace").
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Keep-alive HTTP endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeepaliveConfig {
    /// Whether the keep-alive endpoint is served.
    #[serde(default)]
    pub enabled: bool,

    /// Address the endpoint binds to.
    #[serde(default = "default_keepalive_addr")]
    pub listen_addr: String,

    /// Port the endpoint binds to.
    #[serde(default = "default_keepalive_port")]
    pub listen_port: u16,
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: default_keepalive_addr(),
            listen_port: default_keepalive_port(),
        }
    }
}

fn default_keepalive_addr() -> String {
    "127.0.0.1".to_string()
}

fn default_keepalive_port() -> u16 {
    8080
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.quota.free_search_limit, 10);
        assert_eq!(config.corpus.extensions, vec![".txt".to_string()]);
        assert_eq!(config.service.command_prefix, "/");
        assert!(!config.keepalive.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("breachhound.toml");
        std::fs::write(
            &path,
            r#"
            [corpus]
            root = "corpus"

            [quota]
            free_search_limit = 5

            [keepalive]
            enabled = true
            listen_port = 9000
            "#,
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.corpus.root, PathBuf::from("corpus"));
        assert_eq!(config.quota.free_search_limit, 5);
        assert!(config.keepalive.enabled);
        assert_eq!(config.keepalive.listen_port, 9000);
        // Unspecified sections fall back to defaults
        assert_eq!(config.storage.data_dir, PathBuf::from("data/stores"));
    }

    #[test]
    fn test_load_missing_file() {
        let result = AppConfig::load(Path::new("/nonexistent/breachhound.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "this is not [valid toml").unwrap();

        let result = AppConfig::load(&path);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_validate_rejects_zero_quota() {
        let mut config = AppConfig::default();
        config.quota.free_search_limit = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_extension() {
        let mut config = AppConfig::default();
        config.corpus.extensions = vec!["txt".to_string()];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_roundtrip_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(
            parsed.quota.free_search_limit,
            config.quota.free_search_limit
        );
    }
}
