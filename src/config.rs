//! Configuration management for launchnet

use crate::builder::SPN_ADDRESS_PREFIX;
use crate::error::NetworkError;
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "launchnet.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub registry: RegistryConfig,
    pub account: AccountConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    #[serde(default = "default_registry_url")]
    pub url: String,
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountConfig {
    #[serde(default = "default_account_name")]
    pub name: String,
    /// Keyring directory; `~/.launchnet/keys` when unset
    #[serde(default)]
    pub keyring_dir: Option<String>,
    #[serde(default = "default_address_prefix")]
    pub address_prefix: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: default_registry_url(),
            listen: default_listen(),
            database: default_database(),
            timeout_secs: default_timeout(),
        }
    }
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            name: default_account_name(),
            keyring_dir: None,
            address_prefix: default_address_prefix(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl RegistryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, NetworkError> {
        self.listen
            .parse()
            .map_err(|e| NetworkError::Config(format!("registry.listen '{}': {}", self.listen, e)))
    }
}

impl AccountConfig {
    /// Keyring directory with a leading `~/` expanded.
    pub fn keyring_path(&self) -> PathBuf {
        match &self.keyring_dir {
            Some(dir) => expand_home(dir),
            None => crate::account::Keyring::default_dir(),
        }
    }
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

fn default_registry_url() -> String {
    "http://127.0.0.1:4500".to_string()
}

fn default_listen() -> String {
    "127.0.0.1:4500".to_string()
}

fn default_database() -> String {
    "./data/registry.db".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_account_name() -> String {
    "alice".to_string()
}

fn default_address_prefix() -> String {
    SPN_ADDRESS_PREFIX.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Loads `path`, or `launchnet.toml` in the working directory when `None`.
/// A missing file yields the defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config, NetworkError> {
    let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
    let config_str = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };
    let config: Config = if config_str.trim().is_empty() {
        Config::default()
    } else {
        toml::from_str(&config_str)?
    };

    // Validate critical values
    if config.registry.database.is_empty() {
        return Err(NetworkError::Config("registry.database must be set".to_string()));
    }
    if config.account.name.is_empty() {
        return Err(NetworkError::Config("account.name must be set".to_string()));
    }
    if config.account.address_prefix.is_empty() {
        return Err(NetworkError::Config("account.address_prefix must be set".to_string()));
    }

    Ok(config)
}
