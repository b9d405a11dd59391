//! Gentx parsing
//!
//! A gentx is the signed `MsgCreateValidator` transaction a validator
//! contributes to genesis. The join flow ships it verbatim; the operator
//! binary reads the consensus key, self-delegation and peer out of it.

use crate::coin::Coin;
use crate::error::NetworkError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct RawGentx {
    body: RawBody,
}

#[derive(Debug, Deserialize)]
struct RawBody {
    messages: Vec<RawCreateValidator>,
    #[serde(default)]
    memo: String,
}

#[derive(Debug, Deserialize)]
struct RawCreateValidator {
    pubkey: RawPubKey,
    value: Coin,
}

#[derive(Debug, Deserialize)]
struct RawPubKey {
    key: String,
}

/// Values extracted from a gentx file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GentxInfo {
    pub pub_key: Vec<u8>,
    pub self_delegation: Coin,
    /// `node_id@host:port` taken from the memo
    pub memo: String,
}

impl GentxInfo {
    pub fn parse(bytes: &[u8]) -> Result<Self, NetworkError> {
        let raw: RawGentx = serde_json::from_slice(bytes)
            .map_err(|e| NetworkError::InvalidMessage(format!("Failed to parse gentx: {}", e)))?;
        let msg = raw
            .body
            .messages
            .into_iter()
            .next()
            .ok_or_else(|| NetworkError::InvalidMessage("gentx carries no message".to_string()))?;
        let pub_key = STANDARD
            .decode(msg.pubkey.key.as_bytes())
            .map_err(|e| NetworkError::InvalidMessage(format!("Invalid gentx pubkey: {}", e)))?;
        Ok(GentxInfo {
            pub_key,
            self_delegation: msg.value,
            memo: raw.body.memo,
        })
    }

    /// Reads a gentx file, returning its raw bytes with the parsed info.
    pub fn from_path(path: &Path) -> Result<(Vec<u8>, Self), NetworkError> {
        let bytes = fs::read(path)?;
        let info = Self::parse(&bytes)?;
        Ok((bytes, info))
    }
}
