//! Blocking HTTP client for a served launch registry
//!
//! Implements [`LaunchQuery`] and [`Broadcaster`] against the routes in
//! [`crate::api`]. Do not call from inside an async runtime.

use crate::error::NetworkError;
use crate::launch::{
    Broadcaster, GenesisAccount, GenesisValidator, LaunchId, LaunchQuery, Request, SignedTx,
    TxResponse, VestingAccount,
};
use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Error body returned by the registry API
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default)]
    pub code: u32,
}

pub struct RegistryClient {
    base_url: String,
    http: Client,
}

impl RegistryClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, NetworkError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NetworkError::Transport(format!("Failed to build HTTP client: {}", e)))?;
        Ok(RegistryClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, NetworkError> {
        let url = self.url(path);
        debug!("GET {}", url);
        let response = self.http.get(&url).send()?;
        decode(response)
    }
}

/// Turns an API response into a value or the matching crate error.
fn decode<T: DeserializeOwned>(response: Response) -> Result<T, NetworkError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<T>()
            .map_err(|e| NetworkError::Serialization(format!("Unexpected response body: {}", e)));
    }

    let body = response.text().unwrap_or_default();
    let parsed: Option<ErrorBody> = serde_json::from_str(&body).ok();
    let message = parsed
        .as_ref()
        .map(|b| b.error.clone())
        .unwrap_or_else(|| body.clone());

    match status {
        StatusCode::NOT_FOUND => Err(NetworkError::NotFound(message)),
        StatusCode::BAD_REQUEST => match parsed {
            Some(b) if b.code != 0 => Err(NetworkError::TxRejected {
                code: b.code,
                log: b.error,
            }),
            _ => Err(NetworkError::InvalidMessage(message)),
        },
        other => Err(NetworkError::Transport(format!("{}: {}", other, message))),
    }
}

impl LaunchQuery for RegistryClient {
    fn genesis_account(&self, launch_id: LaunchId, address: &str) -> Result<GenesisAccount, NetworkError> {
        self.get(&format!("/launch/{}/genesis_account/{}", launch_id, address))
    }

    fn vesting_account(&self, launch_id: LaunchId, address: &str) -> Result<VestingAccount, NetworkError> {
        self.get(&format!("/launch/{}/vesting_account/{}", launch_id, address))
    }

    fn genesis_validator(&self, launch_id: LaunchId, address: &str) -> Result<GenesisValidator, NetworkError> {
        self.get(&format!("/launch/{}/genesis_validator/{}", launch_id, address))
    }

    fn request_all(&self, launch_id: LaunchId) -> Result<Vec<Request>, NetworkError> {
        self.get(&format!("/launch/{}/requests", launch_id))
    }
}

impl Broadcaster for RegistryClient {
    fn broadcast_tx(&self, tx: &SignedTx) -> Result<TxResponse, NetworkError> {
        let url = self.url("/txs");
        debug!("POST {}", url);
        let response = self.http.post(&url).json(tx).send()?;
        decode(response)
    }
}
