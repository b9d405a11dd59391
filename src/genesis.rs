//! Local genesis file access
//!
//! Only the parts of `genesis.json` the join flow needs are modelled: the
//! chain id and the addresses listed under `app_state.auth.accounts`.

use crate::error::NetworkError;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Location of the genesis file inside a chain home
pub fn genesis_path(chain_home: &Path) -> PathBuf {
    chain_home.join("config").join("genesis.json")
}

#[derive(Debug, Deserialize)]
struct RawGenesis {
    #[serde(default)]
    chain_id: String,
    #[serde(default)]
    app_state: AppState,
}

#[derive(Debug, Default, Deserialize)]
struct AppState {
    #[serde(default)]
    auth: AuthState,
}

#[derive(Debug, Default, Deserialize)]
struct AuthState {
    #[serde(default)]
    accounts: Vec<AuthAccount>,
}

#[derive(Debug, Deserialize)]
struct AuthAccount {
    #[serde(default)]
    address: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Genesis {
    pub chain_id: String,
    pub accounts: Vec<String>,
}

impl Genesis {
    pub fn parse(bytes: &[u8]) -> Result<Self, NetworkError> {
        let raw: RawGenesis = serde_json::from_slice(bytes)
            .map_err(|e| NetworkError::Genesis(format!("Failed to parse genesis: {}", e)))?;
        let accounts = raw
            .app_state
            .auth
            .accounts
            .into_iter()
            .map(|acc| acc.address)
            .filter(|addr| !addr.is_empty())
            .collect();
        Ok(Genesis {
            chain_id: raw.chain_id,
            accounts,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self, NetworkError> {
        let bytes = fs::read(path).map_err(|e| {
            NetworkError::Genesis(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&bytes)
    }

    pub fn from_home(chain_home: &Path) -> Result<Self, NetworkError> {
        Self::from_path(&genesis_path(chain_home))
    }

    pub fn has_account(&self, address: &str) -> bool {
        self.accounts.iter().any(|acc| acc == address)
    }
}

/// Reports whether `address` is already a genesis account of the chain at `chain_home`.
pub fn check_genesis_address(chain_home: &Path, address: &str) -> Result<bool, NetworkError> {
    Ok(Genesis::from_home(chain_home)?.has_account(address))
}
