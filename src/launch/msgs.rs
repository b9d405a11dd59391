/// Request messages and the transaction envelope that carries them
use super::types::{base64_bytes, LaunchId};
use crate::coin::{Coin, Coins};
use crate::crypto::{self, KeyPair};
use crate::error::NetworkError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Maximum number of messages in one transaction
pub const MAX_TX_MESSAGES: usize = 64;

/// Maximum gentx size in bytes
pub const MAX_GENTX_SIZE: usize = 100_000;

/// Proposes adding an account with liquid coins to a launch's genesis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgRequestAddAccount {
    pub address: String,
    pub launch_id: LaunchId,
    pub coins: Coins,
}

impl MsgRequestAddAccount {
    pub fn new(address: impl Into<String>, launch_id: LaunchId, coins: Coins) -> Self {
        MsgRequestAddAccount {
            address: address.into(),
            launch_id,
            coins,
        }
    }
}

/// Proposes adding a genesis validator to a launch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgRequestAddValidator {
    pub val_address: String,
    pub launch_id: LaunchId,
    #[serde(with = "base64_bytes")]
    pub gen_tx: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub cons_pub_key: Vec<u8>,
    pub self_delegation: Coin,
    pub peer: String,
}

impl MsgRequestAddValidator {
    pub fn new(
        val_address: impl Into<String>,
        launch_id: LaunchId,
        gen_tx: Vec<u8>,
        cons_pub_key: Vec<u8>,
        self_delegation: Coin,
        peer: impl Into<String>,
    ) -> Self {
        MsgRequestAddValidator {
            val_address: val_address.into(),
            launch_id,
            gen_tx,
            cons_pub_key,
            self_delegation,
            peer: peer.into(),
        }
    }
}

/// A message the registry accepts in a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Msg {
    RequestAddAccount(MsgRequestAddAccount),
    RequestAddValidator(MsgRequestAddValidator),
}

impl Msg {
    /// Address that must sign the message
    pub fn signer(&self) -> &str {
        match self {
            Msg::RequestAddAccount(msg) => &msg.address,
            Msg::RequestAddValidator(msg) => &msg.val_address,
        }
    }

    pub fn launch_id(&self) -> LaunchId {
        match self {
            Msg::RequestAddAccount(msg) => msg.launch_id,
            Msg::RequestAddValidator(msg) => msg.launch_id,
        }
    }

    /// Stateless checks, run by the registry before anything touches storage.
    pub fn validate_basic(&self, address_prefix: &str) -> Result<(), NetworkError> {
        crypto::validate_address(address_prefix, self.signer())
            .map_err(|e| NetworkError::InvalidMessage(e.to_string()))?;
        match self {
            Msg::RequestAddAccount(msg) => {
                if msg.coins.is_empty() {
                    return Err(NetworkError::InvalidMessage(
                        "account request carries no coins".to_string(),
                    ));
                }
                msg.coins
                    .validate()
                    .map_err(|e| NetworkError::InvalidMessage(e.to_string()))
            }
            Msg::RequestAddValidator(msg) => {
                if msg.gen_tx.is_empty() {
                    return Err(NetworkError::InvalidMessage("empty gentx".to_string()));
                }
                if msg.gen_tx.len() > MAX_GENTX_SIZE {
                    return Err(NetworkError::InvalidMessage(format!(
                        "gentx too large: {} bytes (max: {})",
                        msg.gen_tx.len(),
                        MAX_GENTX_SIZE
                    )));
                }
                if msg.cons_pub_key.is_empty() {
                    return Err(NetworkError::InvalidMessage(
                        "empty consensus public key".to_string(),
                    ));
                }
                msg.self_delegation
                    .validate()
                    .map_err(|e| NetworkError::InvalidMessage(e.to_string()))?;
                if !msg.self_delegation.is_positive() {
                    return Err(NetworkError::InvalidMessage(
                        "self delegation must be positive".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }
}

/// Ordered messages submitted together
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxBody {
    pub messages: Vec<Msg>,
    #[serde(default)]
    pub memo: String,
}

impl TxBody {
    pub fn new(messages: Vec<Msg>) -> Result<Self, NetworkError> {
        if messages.is_empty() {
            return Err(NetworkError::InvalidMessage(
                "a transaction needs at least one message".to_string(),
            ));
        }
        if messages.len() > MAX_TX_MESSAGES {
            return Err(NetworkError::InvalidMessage(format!(
                "too many messages: {} (max: {})",
                messages.len(),
                MAX_TX_MESSAGES
            )));
        }
        Ok(TxBody {
            messages,
            memo: String::new(),
        })
    }

    /// Bytes covered by the signature
    pub fn sign_bytes(&self) -> Result<Vec<u8>, NetworkError> {
        Ok(bincode::serialize(self)?)
    }
}

/// Transaction body with the signer's public key and signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTx {
    pub body: TxBody,
    #[serde(with = "base64_bytes")]
    pub public_key: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub signature: Vec<u8>,
}

impl SignedTx {
    pub fn sign(body: TxBody, keypair: &KeyPair) -> Result<Self, NetworkError> {
        let signature = keypair.sign(&body.sign_bytes()?)?;
        Ok(SignedTx {
            body,
            public_key: keypair.public_key_bytes().to_vec(),
            signature: signature.to_vec(),
        })
    }

    pub fn verify(&self) -> Result<(), NetworkError> {
        crypto::verify_signature(&self.public_key, &self.body.sign_bytes()?, &self.signature)
    }

    /// Address of the key that signed the transaction
    pub fn signer_address(&self, prefix: &str) -> String {
        crypto::address_from_public_key(prefix, &self.public_key)
    }

    /// Uppercase hex SHA-256 over signature and sign bytes
    pub fn hash(&self) -> Result<String, NetworkError> {
        let mut hasher = Sha256::new();
        hasher.update(&self.signature);
        hasher.update(self.body.sign_bytes()?);
        Ok(hex::encode_upper(hasher.finalize()))
    }
}

/// Registry answer to a committed transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxResponse {
    pub height: u64,
    pub txhash: String,
    pub code: u32,
    pub raw_log: String,
    pub request_ids: Vec<u64>,
    pub timestamp: String,
}
