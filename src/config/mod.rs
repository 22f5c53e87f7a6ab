//! Configuration module for Apigate
//!
//! Handles loading and parsing of YAML configuration files with support for
//! environment variable expansion, environment overrides and validation.
//!
//! Signing secrets are validated here so that a missing or predictable secret
//! is reported at startup rather than on the first token request.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

/// Minimum length, in bytes, of each HMAC signing secret
pub const MIN_SIGNING_SECRET_LEN: usize = 32;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Config {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        ConfigLoader::load(path)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.socket_addr()?;

        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "server.max_body_bytes must be greater than zero".into(),
            ));
        }

        validate_secret("jwt.signing_secret", &self.jwt.signing_secret)?;
        validate_secret("jwt.admin.signing_secret", &self.jwt.admin.signing_secret)?;

        if self.jwt.signing_secret == self.jwt.admin.signing_secret {
            return Err(ConfigError::ValidationError(
                "jwt.signing_secret and jwt.admin.signing_secret must differ".into(),
            ));
        }

        if self.metrics.enabled && self.metrics.port == 0 {
            return Err(ConfigError::ValidationError(
                "metrics.port must be set when metrics are enabled".into(),
            ));
        }

        Ok(())
    }
}

/// Check a signing secret without echoing its value.
fn validate_secret(field: &str, secret: &str) -> Result<(), ConfigError> {
    if secret.trim().is_empty() {
        return Err(ConfigError::ValidationError(format!(
            "{} is required",
            field
        )));
    }

    if secret.contains("${") {
        return Err(ConfigError::ValidationError(format!(
            "{} references an environment variable that is not set",
            field
        )));
    }

    if secret.len() < MIN_SIGNING_SECRET_LEN {
        return Err(ConfigError::ValidationError(format!(
            "{} must be at least {} bytes",
            field, MIN_SIGNING_SECRET_LEN
        )));
    }

    Ok(())
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub address: String,
    /// Largest accepted request body. Default: 64 KiB
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl ServerConfig {
    /// Parse the configured listen address
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.address.parse().map_err(|e| {
            ConfigError::ValidationError(format!(
                "Invalid server address '{}': {}",
                self.address, e
            ))
        })
    }
}

fn default_max_body_bytes() -> usize {
    65536
}

/// JWT signing configuration
///
/// `signing_secret` signs tokens for service accounts (external audience),
/// `admin.signing_secret` signs tokens for internal users.
#[derive(Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    #[serde(default)]
    pub signing_secret: String,
    #[serde(default)]
    pub admin: AdminJwtConfig,
}

/// Signing configuration for the internal (admin) audience
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AdminJwtConfig {
    #[serde(default)]
    pub signing_secret: String,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("signing_secret", &"<redacted>")
            .field("admin", &self.admin)
            .finish()
    }
}

impl std::fmt::Debug for AdminJwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminJwtConfig")
            .field("signing_secret", &"<redacted>")
            .finish()
    }
}

/// Credential store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// YAML file holding service accounts and internal users
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("principals.yaml")
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            port: default_metrics_port(),
        }
    }
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_metrics_port() -> u16 {
    9090
}
