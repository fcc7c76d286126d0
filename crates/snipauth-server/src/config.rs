//! Server configuration: listen address, storage backend, collaborator
//! service endpoints and logging.
//!
//! Sources are layered, later ones winning: built-in defaults, an optional
//! YAML file, then `SNIPAUTH_*` environment variables (`__` separates
//! nesting levels, so `SNIPAUTH_SERVICES__TIMEOUT_MS=2000` sets
//! `services.timeout_ms`).
//!
//! ```ignore
//! use snipauth_server::config::ServerConfig;
//!
//! let config = ServerConfig::load("snipauth.yaml")?;
//! let from_env_only = ServerConfig::from_env()?;
//! ```

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Prefix for environment overrides, e.g. `SNIPAUTH_SERVER__PORT`.
pub const ENV_PREFIX: &str = "SNIPAUTH";

/// Server configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ServerConfig {
    /// Server settings
    #[serde(default)]
    pub server: ServerSettings,

    /// Storage settings
    #[serde(default)]
    pub storage: StorageSettings,

    /// Collaborator service endpoints
    #[serde(default)]
    pub services: ServiceSettings,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Server network settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ServerSettings {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30
}

/// Storage backend settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct StorageSettings {
    /// Storage backend type. Only "memory" is available.
    #[serde(default = "default_storage_backend")]
    pub backend: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
        }
    }
}

fn default_storage_backend() -> String {
    "memory".to_string()
}

/// Base URLs and timeouts for the resource and execution services.
///
/// ```yaml
/// services:
///   resource_base_url: http://snippet-manager:8080
///   execution_base_url: http://snippet-runner:8080
///   timeout_ms: 5000
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ServiceSettings {
    /// Resource-metadata service base URL.
    ///
    /// Environment variable: `SNIPAUTH_SERVICES__RESOURCE_BASE_URL`
    #[serde(default = "default_resource_base_url")]
    pub resource_base_url: String,

    /// Execution service base URL.
    ///
    /// Environment variable: `SNIPAUTH_SERVICES__EXECUTION_BASE_URL`
    #[serde(default = "default_execution_base_url")]
    pub execution_base_url: String,

    /// Per-request timeout for outbound calls, in milliseconds.
    #[serde(default = "default_service_timeout")]
    pub timeout_ms: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            resource_base_url: default_resource_base_url(),
            execution_base_url: default_execution_base_url(),
            timeout_ms: default_service_timeout(),
        }
    }
}

fn default_resource_base_url() -> String {
    "http://snippet-manager:8080".to_string()
}

fn default_execution_base_url() -> String {
    "http://snippet-runner:8080".to_string()
}

fn default_service_timeout() -> u64 {
    5000
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingSettings {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Use JSON format (true for production, false for development)
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

impl ServerConfig {
    /// Load configuration from a YAML file with environment variable overrides.
    ///
    /// Environment variables are prefixed with `SNIPAUTH_` and use `__` as
    /// separator, so `SNIPAUTH_SERVER__PORT=9090` overrides `server.port`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigLoadError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let config = Config::builder()
            .add_source(Config::try_from(&ServerConfig::default())?)
            .add_source(File::from(path).format(FileFormat::Yaml))
            .add_source(env_source())
            .build()?;

        let server_config: ServerConfig = config.try_deserialize()?;
        server_config.validate()?;

        Ok(server_config)
    }

    /// Load configuration from environment variables only.
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        let config = Config::builder()
            .add_source(Config::try_from(&ServerConfig::default())?)
            .add_source(env_source())
            .build()?;

        let server_config: ServerConfig = config.try_deserialize()?;
        server_config.validate()?;

        Ok(server_config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.server.port == 0 {
            return Err(invalid("server.port must be greater than 0"));
        }

        if self.server.request_timeout_secs == 0 {
            return Err(invalid("server.request_timeout_secs must be greater than 0"));
        }

        let valid_backends = ["memory"];
        if !valid_backends.contains(&self.storage.backend.as_str()) {
            return Err(invalid(format!(
                "storage.backend must be one of: {:?}, got: {}",
                valid_backends, self.storage.backend
            )));
        }

        for (field, url) in [
            ("services.resource_base_url", &self.services.resource_base_url),
            ("services.execution_base_url", &self.services.execution_base_url),
        ] {
            if url.trim().is_empty() {
                return Err(invalid(format!("{field} must not be empty")));
            }
        }

        if self.services.timeout_ms == 0 {
            return Err(invalid("services.timeout_ms must be greater than 0"));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(invalid(format!(
                "logging.level must be one of: {:?}, got: {}",
                valid_levels, self.logging.level
            )));
        }

        Ok(())
    }
}

fn env_source() -> Environment {
    // SNIPAUTH_SERVICES__TIMEOUT_MS -> services.timeout_ms
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
}

fn invalid(message: impl Into<String>) -> ConfigLoadError {
    ConfigLoadError::Invalid {
        message: message.into(),
    }
}
