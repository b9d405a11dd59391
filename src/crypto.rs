//! Signing keys and account addresses
//!
//! Transactions are signed with secp256k1 over the SHA-256 of their sign
//! bytes. An account address is `<prefix>1<hex(sha256(pubkey)[..20])>`.

use crate::error::NetworkError;
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use secp256k1::{
    constants::{COMPACT_SIGNATURE_SIZE, PUBLIC_KEY_SIZE, SECRET_KEY_SIZE},
    ecdsa::Signature,
    All, Message, PublicKey, Secp256k1, SecretKey,
};
use sha2::{Digest, Sha256};

static SECP: Lazy<Secp256k1<All>> = Lazy::new(Secp256k1::new);

/// Number of hash bytes kept in an account address
pub const ADDRESS_LENGTH: usize = 20;

/// Separator between the human-readable prefix and the address payload
pub const PREFIX_SEPARATOR: char = '1';

pub fn address_from_public_key(prefix: &str, public_key_bytes: &[u8]) -> String {
    let digest = Sha256::digest(public_key_bytes);
    format!(
        "{}{}{}",
        prefix,
        PREFIX_SEPARATOR,
        hex::encode(&digest[..ADDRESS_LENGTH])
    )
}

/// Checks that `address` is well formed and carries `prefix`.
pub fn validate_address(prefix: &str, address: &str) -> Result<(), NetworkError> {
    let payload = address
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix(PREFIX_SEPARATOR))
        .ok_or_else(|| {
            NetworkError::Crypto(format!(
                "Address {} does not carry prefix {}{}",
                address, prefix, PREFIX_SEPARATOR
            ))
        })?;
    let bytes = hex::decode(payload)
        .map_err(|e| NetworkError::Crypto(format!("Invalid hex address: {}", e)))?;
    if bytes.len() != ADDRESS_LENGTH {
        return Err(NetworkError::Crypto(format!(
            "Address payload is {} bytes, expected {}",
            bytes.len(),
            ADDRESS_LENGTH
        )));
    }
    Ok(())
}

fn sign_digest(payload: &[u8]) -> Result<Message, NetworkError> {
    Message::from_digest_slice(&Sha256::digest(payload))
        .map_err(|e| NetworkError::Crypto(format!("Bad sign digest: {}", e)))
}

/// Signing identity of an account
#[derive(Debug, Clone)]
pub struct KeyPair {
    secret_key: SecretKey,
    public_key: PublicKey,
}

impl KeyPair {
    pub fn generate() -> Result<Self, NetworkError> {
        Ok(Self::from_secret_key(SecretKey::new(&mut OsRng)))
    }

    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        KeyPair {
            public_key: PublicKey::from_secret_key(&SECP, &secret_key),
            secret_key,
        }
    }

    /// Restores a key pair from the 32 raw bytes of a secret key.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, NetworkError> {
        if bytes.len() != SECRET_KEY_SIZE {
            return Err(NetworkError::Crypto(format!(
                "Secret key is {} bytes, expected {}",
                bytes.len(),
                SECRET_KEY_SIZE
            )));
        }
        SecretKey::from_slice(bytes)
            .map(Self::from_secret_key)
            .map_err(|e| NetworkError::Crypto(format!("Invalid secret key: {}", e)))
    }

    pub fn secret_key_hex(&self) -> String {
        hex::encode(self.secret_key.secret_bytes())
    }

    pub fn address(&self, prefix: &str) -> String {
        address_from_public_key(prefix, &self.public_key_bytes())
    }

    /// Compressed SEC1 encoding
    pub fn public_key_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.public_key.serialize()
    }

    /// Compact signature over `sha256(payload)`
    pub fn sign(&self, payload: &[u8]) -> Result<[u8; COMPACT_SIGNATURE_SIZE], NetworkError> {
        let digest = sign_digest(payload)?;
        Ok(SECP.sign_ecdsa(&digest, &self.secret_key).serialize_compact())
    }
}

/// Checks a compact signature over `sha256(payload)` against a compressed public key.
pub fn verify_signature(public_key: &[u8], payload: &[u8], signature: &[u8]) -> Result<(), NetworkError> {
    if public_key.len() != PUBLIC_KEY_SIZE {
        return Err(NetworkError::Crypto(format!(
            "Public key is {} bytes, expected {}",
            public_key.len(),
            PUBLIC_KEY_SIZE
        )));
    }
    if signature.len() != COMPACT_SIGNATURE_SIZE {
        return Err(NetworkError::Crypto(format!(
            "Signature is {} bytes, expected {}",
            signature.len(),
            COMPACT_SIGNATURE_SIZE
        )));
    }

    let public_key = PublicKey::from_slice(public_key)
        .map_err(|e| NetworkError::Crypto(format!("Invalid public key: {}", e)))?;
    let signature = Signature::from_compact(signature)
        .map_err(|e| NetworkError::Crypto(format!("Invalid signature: {}", e)))?;

    SECP.verify_ecdsa(&sign_digest(payload)?, &signature, &public_key)
        .map_err(|_| NetworkError::Crypto("Signature verification failed".to_string()))
}
