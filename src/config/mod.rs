//! Service Configuration
//!
//! Provides the service configuration loaded from a TOML file, with
//! environment overrides applied on top.
//!
//! ## Loading Order
//!
//! 1. Explicit path (`--config` flag or `ZIGGY_CONFIG` environment variable)
//! 2. `ziggy.toml` in the current working directory
//! 3. Built-in defaults
//!
//! After the file is resolved, `COHERE_API_KEY` and `PORT` from the process
//! environment take precedence over file values.
//!
//! ```ignore
//! let config = AppConfig::load(args.config.as_deref())?;
//! ```

pub mod defaults;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "ZIGGY_CONFIG";

/// Environment variable carrying the Cohere API key.
pub const API_KEY_ENV: &str = "COHERE_API_KEY";

/// Environment variable carrying the HTTP port.
pub const PORT_ENV: &str = "PORT";

/// Config file looked up in the working directory.
const LOCAL_CONFIG_FILE: &str = "ziggy.toml";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),
    #[error("failed to parse config file {0}: {1}")]
    Parse(PathBuf, #[source] toml::de::Error),
    #[error("invalid {var} value {value:?}: expected a port number")]
    InvalidPort { var: &'static str, value: String },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub cohere: CohereConfig,

    #[serde(default)]
    pub knowledge: KnowledgeConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Substituted for `{{ title }}` in the index page
    pub page_title: String,
    /// Maximum request body in bytes; unset accepts bodies of any size
    pub body_limit_bytes: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: defaults::SERVER_HOST.to_string(),
            port: defaults::SERVER_PORT,
            page_title: defaults::PAGE_TITLE.to_string(),
            body_limit_bytes: None,
        }
    }
}

impl ServerConfig {
    /// `host:port` string for binding the listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Cohere provider settings
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CohereConfig {
    /// Usually supplied through `COHERE_API_KEY` rather than the file
    pub api_key: Option<String>,
    pub base_url: String,
    pub embed_model: String,
    pub chat_model: String,
    pub temperature: Option<f32>,
    pub timeout_secs: u64,
}

impl Default for CohereConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: defaults::COHERE_BASE_URL.to_string(),
            embed_model: defaults::EMBED_MODEL.to_string(),
            chat_model: defaults::CHAT_MODEL.to_string(),
            temperature: None,
            timeout_secs: defaults::COHERE_TIMEOUT_SECS,
        }
    }
}

// Never print the key.
impl std::fmt::Debug for CohereConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CohereConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("embed_model", &self.embed_model)
            .field("chat_model", &self.chat_model)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Knowledge base settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    pub db_path: PathBuf,
    pub top_k: usize,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(defaults::KNOWLEDGE_DB_PATH),
            top_k: defaults::KNOWLEDGE_TOP_K,
        }
    }
}

impl AppConfig {
    /// Load configuration using the standard search order, then apply
    /// process environment overrides and validate.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::load_file(explicit)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn load_file(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        // An explicitly named file must exist.
        if let Some(path) = explicit {
            let config = Self::load_from_file(path)?;
            info!(path = %path.display(), "Loaded config");
            return Ok(config);
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!(path = %local.display(), "Loaded config");
                    return Ok(config);
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG_FILE);
                }
            }
        }

        info!("No config file found, using built-in defaults");
        Ok(Self::default())
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
    }

    /// Apply environment overrides using `lookup` to read variables.
    ///
    /// Empty values are treated as unset.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get(API_KEY_ENV) {
            self.cohere.api_key = Some(key.trim().to_string());
        }

        if let Some(port) = get(PORT_ENV) {
            self.server.port = port.trim().parse().map_err(|_| ConfigError::InvalidPort {
                var: PORT_ENV,
                value: port.clone(),
            })?;
        }

        Ok(())
    }

    /// Reject values the services cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.knowledge.top_k == 0 {
            return Err(ConfigError::Invalid("knowledge.top_k must be at least 1".into()));
        }
        if self.knowledge.db_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("knowledge.db_path must not be empty".into()));
        }
        if self.cohere.embed_model.trim().is_empty() || self.cohere.chat_model.trim().is_empty() {
            return Err(ConfigError::Invalid("cohere model names must not be empty".into()));
        }
        if self.cohere.timeout_secs == 0 {
            return Err(ConfigError::Invalid("cohere.timeout_secs must be at least 1".into()));
        }
        if self.server.body_limit_bytes == Some(0) {
            return Err(ConfigError::Invalid("server.body_limit_bytes must be at least 1".into()));
        }
        if let Some(t) = self.cohere.temperature {
            if !(0.0..=5.0).contains(&t) {
                return Err(ConfigError::Invalid(format!(
                    "cohere.temperature {t} outside 0.0..=5.0"
                )));
            }
        }
        Ok(())
    }

    /// Whether a Cohere API key is configured
    pub fn has_api_key(&self) -> bool {
        self.cohere.api_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.bind_addr(), "0.0.0.0:8080");
        assert_eq!(config.knowledge.db_path, PathBuf::from("content/db"));
        assert_eq!(config.knowledge.top_k, 3);
        assert_eq!(config.cohere.embed_model, "embed-english-light-v2.0");
        assert!(!config.has_api_key());
        assert!(config.server.body_limit_bytes.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [server]
            page_title = "Quantum Helper"

            [knowledge]
            top_k = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.server.page_title, "Quantum Helper");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.knowledge.top_k, 5);
        assert_eq!(config.knowledge.db_path, PathBuf::from("content/db"));
        assert_eq!(config.cohere.chat_model, "command-r");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[("COHERE_API_KEY", "secret"), ("PORT", "9000")]))
            .unwrap();

        assert_eq!(config.cohere.api_key.as_deref(), Some("secret"));
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_empty_env_values_ignored() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[("COHERE_API_KEY", "  "), ("PORT", "")]))
            .unwrap();

        assert!(config.cohere.api_key.is_none());
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_invalid_port_rejected() {
        let mut config = AppConfig::default();
        let err = config.apply_env(env(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPort { .. }));
    }

    #[test]
    fn test_validate_rejects_zero_top_k() {
        let mut config = AppConfig::default();
        config.knowledge.top_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_body_limit_is_opt_in() {
        let config: AppConfig = toml::from_str("[server]\nbody_limit_bytes = 1048576\n").unwrap();
        assert_eq!(config.server.body_limit_bytes, Some(1_048_576));
        assert!(config.validate().is_ok());

        let mut zero = AppConfig::default();
        zero.server.body_limit_bytes = Some(0);
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_temperature() {
        let mut config = AppConfig::default();
        config.cohere.temperature = Some(9.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ziggy.toml");
        std::fs::write(&path, "[cohere]\nchat_model = \"command-r-plus\"\n").unwrap();

        let config = AppConfig::load_from_file(&path).unwrap();
        assert_eq!(config.cohere.chat_model, "command-r-plus");
    }

    #[test]
    fn test_load_from_missing_file_errors() {
        let err = AppConfig::load_from_file(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(..)));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let mut config = CohereConfig::default();
        config.api_key = Some("super-secret".into());
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
