//! Signer identities and the file keyring that stores them
//!
//! Every account lives in `<keyring_dir>/<name>.json`. The builder signs all
//! transactions with a single [`Account`] loaded from here.

use crate::crypto::KeyPair;
use crate::error::NetworkError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

const MAX_NAME_LENGTH: usize = 64;

/// Named key pair used to sign transactions
#[derive(Debug, Clone)]
pub struct Account {
    pub name: String,
    pub keypair: KeyPair,
}

impl Account {
    pub fn new(name: impl Into<String>, keypair: KeyPair) -> Self {
        Account {
            name: name.into(),
            keypair,
        }
    }

    pub fn generate(name: impl Into<String>) -> Result<Self, NetworkError> {
        Ok(Self::new(name, KeyPair::generate()?))
    }

    pub fn address(&self, prefix: &str) -> String {
        self.keypair.address(prefix)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct KeyFile {
    name: String,
    secret_key_hex: String,
    created: String,
}

/// Directory of JSON key files
#[derive(Debug, Clone)]
pub struct Keyring {
    dir: PathBuf,
}

impl Keyring {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, NetworkError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            NetworkError::Keyring(format!("Failed to create keyring dir {}: {}", dir.display(), e))
        })?;
        Ok(Keyring { dir })
    }

    /// `~/.launchnet/keys`, falling back to `./.launchnet/keys` without a home directory.
    pub fn default_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".launchnet")
            .join("keys")
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn key_path(&self, name: &str) -> Result<PathBuf, NetworkError> {
        validate_name(name)?;
        Ok(self.dir.join(format!("{}.json", name)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.key_path(name).map(|p| p.exists()).unwrap_or(false)
    }

    /// Generates a fresh account. Never overwrites an existing key file.
    pub fn create(&self, name: &str) -> Result<Account, NetworkError> {
        let account = Account::generate(name)?;
        self.store(&account)?;
        Ok(account)
    }

    /// Imports an account from a hex-encoded secret key.
    pub fn import(&self, name: &str, secret_key_hex: &str) -> Result<Account, NetworkError> {
        let bytes = hex::decode(secret_key_hex.trim())
            .map_err(|e| NetworkError::Keyring(format!("Invalid secret key hex: {}", e)))?;
        let account = Account::new(name, KeyPair::from_secret_bytes(&bytes)?);
        self.store(&account)?;
        Ok(account)
    }

    pub fn get(&self, name: &str) -> Result<Account, NetworkError> {
        let path = self.key_path(name)?;
        let content = fs::read_to_string(&path).map_err(|e| {
            NetworkError::Keyring(format!("No key named {} at {}: {}", name, path.display(), e))
        })?;
        let file: KeyFile = serde_json::from_str(&content)
            .map_err(|e| NetworkError::Keyring(format!("Corrupt key file {}: {}", path.display(), e)))?;
        let bytes = hex::decode(&file.secret_key_hex)
            .map_err(|e| NetworkError::Keyring(format!("Corrupt secret key for {}: {}", name, e)))?;
        Ok(Account::new(file.name, KeyPair::from_secret_bytes(&bytes)?))
    }

    pub fn list(&self) -> Result<Vec<String>, NetworkError> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn store(&self, account: &Account) -> Result<(), NetworkError> {
        let path = self.key_path(&account.name)?;
        if path.exists() {
            return Err(NetworkError::Keyring(format!(
                "Key {} already exists at {}",
                account.name,
                path.display()
            )));
        }
        let file = KeyFile {
            name: account.name.clone(),
            secret_key_hex: account.keypair.secret_key_hex(),
            created: chrono::Utc::now().to_rfc3339(),
        };
        let json = serde_json::to_string_pretty(&file)?;

        // atomic replace
        let tmp = path.with_extension("json.tmp");
        {
            let mut out = fs::File::create(&tmp)?;
            out.write_all(json.as_bytes())?;
            out.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<(), NetworkError> {
    if name.is_empty() || name.len() > MAX_NAME_LENGTH {
        return Err(NetworkError::Keyring(format!(
            "Key name must be 1-{} characters",
            MAX_NAME_LENGTH
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(NetworkError::Keyring(format!(
            "Key name {} may only contain letters, digits, '-' and '_'",
            name
        )));
    }
    Ok(())
}
