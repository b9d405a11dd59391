//! Error types for launchnet

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NetworkError {
    /// A point lookup found no record. Callers checking existence treat this as "absent".
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("validator already exist: {0}")]
    ValidatorExists(String),
    #[error("the blockchain must be initialized to show an account")]
    ChainNotInitialized,
    #[error("Command failed: {0}")]
    Command(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Invalid message: {0}")]
    InvalidMessage(String),
    #[error("Invalid coin: {0}")]
    InvalidCoin(String),
    #[error("Genesis error: {0}")]
    Genesis(String),
    #[error("Transaction rejected (code {code}): {log}")]
    TxRejected { code: u32, log: String },
    #[error("Cryptographic error: {0}")]
    Crypto(String),
    #[error("Keyring error: {0}")]
    Keyring(String),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for NetworkError {
    fn from(err: std::io::Error) -> Self {
        NetworkError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for NetworkError {
    fn from(err: serde_json::Error) -> Self {
        NetworkError::Serialization(err.to_string())
    }
}

impl From<Box<bincode::ErrorKind>> for NetworkError {
    fn from(err: Box<bincode::ErrorKind>) -> Self {
        NetworkError::Serialization(err.to_string())
    }
}

impl From<rusqlite::Error> for NetworkError {
    fn from(err: rusqlite::Error) -> Self {
        NetworkError::Database(err.to_string())
    }
}

impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> Self {
        NetworkError::Transport(err.to_string())
    }
}

impl From<toml::de::Error> for NetworkError {
    fn from(err: toml::de::Error) -> Self {
        NetworkError::Config(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, NetworkError>;
