//! Configuration loader with environment variable expansion and overrides

use super::{Config, ConfigError};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable overriding `server.address`
pub const ENV_SERVER_ADDRESS: &str = "SERVER_ADDRESS";
/// Environment variable overriding `jwt.signing_secret`
pub const ENV_JWT_SIGNING_SECRET: &str = "JWT_SIGNING_SECRET";
/// Environment variable overriding `jwt.admin.signing_secret`
pub const ENV_ADMIN_JWT_SIGNING_SECRET: &str = "ADMIN_JWT_SIGNING_SECRET";
/// Environment variable overriding `store.path`
pub const ENV_STORE_PATH: &str = "STORE_PATH";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a file
    ///
    /// `${VAR}` and `${VAR:-default}` placeholders are expanded first, then
    /// environment overrides are applied, then the result is validated.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parse, override and validate configuration from YAML text
    pub fn from_yaml_str(content: &str) -> Result<Config, ConfigError> {
        let expanded = Self::expand_env_vars(content);
        let mut config: Config = serde_yaml::from_str(&expanded)?;
        Self::apply_env_overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// Overlay non-empty environment variables on top of file values
    pub fn apply_env_overrides(config: &mut Config) {
        if let Some(address) = non_empty_env(ENV_SERVER_ADDRESS) {
            debug!(variable = ENV_SERVER_ADDRESS, "Applying environment override");
            config.server.address = address;
        }

        if let Some(secret) = non_empty_env(ENV_JWT_SIGNING_SECRET) {
            debug!(variable = ENV_JWT_SIGNING_SECRET, "Applying environment override");
            config.jwt.signing_secret = secret;
        }

        if let Some(secret) = non_empty_env(ENV_ADMIN_JWT_SIGNING_SECRET) {
            debug!(
                variable = ENV_ADMIN_JWT_SIGNING_SECRET,
                "Applying environment override"
            );
            config.jwt.admin.signing_secret = secret;
        }

        if let Some(path) = non_empty_env(ENV_STORE_PATH) {
            debug!(variable = ENV_STORE_PATH, "Applying environment override");
            config.store.path = PathBuf::from(path);
        }
    }

    /// Expand environment variables in the format `${VAR_NAME}` or
    /// `${VAR_NAME:-default}`
    ///
    /// A placeholder whose variable is unset and has no default is kept
    /// verbatim so that validation can report it.
    fn expand_env_vars(content: &str) -> String {
        let re = match regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]*))?\}") {
            Ok(re) => re,
            Err(_) => return content.to_string(),
        };

        re.replace_all(content, |caps: &regex_lite::Captures<'_>| {
            let placeholder = caps.get(0).map_or("", |m| m.as_str());
            let var_name = caps.get(1).map_or("", |m| m.as_str());

            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => caps
                    .get(2)
                    .map(|default| default.as_str().to_string())
                    .unwrap_or_else(|| placeholder.to_string()),
            }
        })
        .into_owned()
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
