//! Local chain node handle
//!
//! Wraps a chain home directory and the command runner used to talk to the
//! node binary. Only initialized nodes answer account lookups.

use crate::error::NetworkError;
use crate::genesis::genesis_path;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Account record as printed by the node's key commands
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChainAccount {
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub pubkey: String,
}

/// Commands a local chain node exposes
pub trait ChainCommands: Send + Sync {
    fn show_account(&self, name: &str) -> Result<ChainAccount, NetworkError>;
}

/// Runs the chain binary as a subprocess
#[derive(Debug, Clone)]
pub struct BinaryCommands {
    pub binary: PathBuf,
    pub home: PathBuf,
    pub keyring_backend: String,
}

impl BinaryCommands {
    pub fn new(binary: impl Into<PathBuf>, home: impl Into<PathBuf>) -> Self {
        BinaryCommands {
            binary: binary.into(),
            home: home.into(),
            keyring_backend: "test".to_string(),
        }
    }

    pub fn with_keyring_backend(mut self, backend: impl Into<String>) -> Self {
        self.keyring_backend = backend.into();
        self
    }
}

impl ChainCommands for BinaryCommands {
    fn show_account(&self, name: &str) -> Result<ChainAccount, NetworkError> {
        debug!("{} keys show {}", self.binary.display(), name);
        let output = Command::new(&self.binary)
            .arg("keys")
            .arg("show")
            .arg(name)
            .arg("--output")
            .arg("json")
            .arg("--keyring-backend")
            .arg(&self.keyring_backend)
            .arg("--home")
            .arg(&self.home)
            .output()
            .map_err(|e| {
                NetworkError::Command(format!("Failed to run {}: {}", self.binary.display(), e))
            })?;

        if !output.status.success() {
            return Err(NetworkError::Command(format!(
                "{} keys show {} exited with {}: {}",
                self.binary.display(),
                name,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        serde_json::from_slice(&output.stdout).map_err(|e| {
            NetworkError::Command(format!("Unexpected keys show output: {}", e))
        })
    }
}

pub struct Blockchain {
    home: PathBuf,
    is_initialized: bool,
    commands: Box<dyn ChainCommands>,
}

impl Blockchain {
    pub fn new(home: impl Into<PathBuf>, is_initialized: bool, commands: Box<dyn ChainCommands>) -> Self {
        Blockchain {
            home: home.into(),
            is_initialized,
            commands,
        }
    }

    /// Opens a chain home; the node counts as initialized once its genesis file exists.
    pub fn open(home: impl Into<PathBuf>, commands: Box<dyn ChainCommands>) -> Self {
        let home = home.into();
        let is_initialized = genesis_path(&home).exists();
        Self::new(home, is_initialized, commands)
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn is_initialized(&self) -> bool {
        self.is_initialized
    }

    fn commands(&self) -> Result<&dyn ChainCommands, NetworkError> {
        if !self.is_initialized {
            return Err(NetworkError::ChainNotInitialized);
        }
        Ok(self.commands.as_ref())
    }

    /// Address of the named account on the local node
    pub fn get_account_address(&self, account_name: &str) -> Result<String, NetworkError> {
        let account = self.commands()?.show_account(account_name)?;
        Ok(account.address)
    }
}
