//! Registry ledger: answers launch queries and accepts signed transactions.
//!
//! Transactions are all-or-nothing. Every check runs before the store is
//! touched and the resulting requests are committed in one store batch.
//! Checks and commits of concurrent callers are serialized by `write_lock`,
//! so two racing transactions can never both add the same account or
//! validator.

use super::{NewRequest, RegistryStore};
use crate::builder::SPN_ADDRESS_PREFIX;
use crate::error::NetworkError;
use crate::launch::{
    Broadcaster, GenesisAccount, GenesisValidator, LaunchId, LaunchQuery, Msg, Request,
    RequestContent, SignedTx, TxResponse, VestingAccount,
};
use parking_lot::Mutex;
use std::collections::HashSet;
use tracing::{info, warn};

/// Signature missing, invalid, or not matching a message's creator
pub const CODE_UNAUTHORIZED: u32 = 4;
/// Message failed stateless validation
pub const CODE_INVALID_REQUEST: u32 = 18;
/// Account or validator already finalized or pending
pub const CODE_CONFLICT: u32 = 36;

pub struct Ledger {
    store: Box<dyn RegistryStore>,
    address_prefix: String,
    /// Held from the first duplicate check until the batch is stored
    write_lock: Mutex<()>,
}

impl Ledger {
    pub fn new(store: Box<dyn RegistryStore>) -> Self {
        Ledger {
            store,
            address_prefix: SPN_ADDRESS_PREFIX.to_string(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn with_address_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.address_prefix = prefix.into();
        self
    }

    pub fn address_prefix(&self) -> &str {
        &self.address_prefix
    }

    pub fn height(&self) -> Result<u64, NetworkError> {
        self.store.height()
    }

    /// Coordinator approval: finalizes a pending request.
    pub fn approve(&self, launch_id: LaunchId, request_id: u64) -> Result<Request, NetworkError> {
        let request = {
            let _guard = self.write_lock.lock();
            self.store.approve_request(launch_id, request_id)?
        };
        info!(
            launch_id,
            request_id,
            kind = request.content.kind(),
            address = request.content.address(),
            "request approved"
        );
        Ok(request)
    }

    /// Appends a request without a signed transaction. Used for coordinator
    /// seeding (vesting accounts, removals) that has no message type.
    pub fn submit_request(&self, creator: &str, launch_id: LaunchId, content: RequestContent) -> Result<u64, NetworkError> {
        let _guard = self.write_lock.lock();
        let committed = self.store.commit_requests(
            creator,
            vec![NewRequest { launch_id, content }],
            chrono::Utc::now().timestamp(),
        )?;
        committed
            .request_ids
            .first()
            .copied()
            .ok_or_else(|| NetworkError::Database("store assigned no request id".to_string()))
    }

    fn account_known(&self, launch_id: LaunchId, address: &str, pending: &[Request]) -> Result<bool, NetworkError> {
        Ok(self.store.genesis_account(launch_id, address)?.is_some()
            || self.store.vesting_account(launch_id, address)?.is_some()
            || pending.iter().any(|r| r.content.adds_account(address)))
    }

    fn validator_known(&self, launch_id: LaunchId, address: &str, pending: &[Request]) -> Result<bool, NetworkError> {
        Ok(self.store.genesis_validator(launch_id, address)?.is_some()
            || pending.iter().any(|r| {
                r.content
                    .genesis_validator()
                    .map(|val| val.address == address)
                    .unwrap_or(false)
            }))
    }

    /// Runs every check of a transaction and returns the requests it would append.
    fn check_tx(&self, tx: &SignedTx) -> Result<Vec<NewRequest>, NetworkError> {
        if tx.body.messages.is_empty() {
            return Err(reject(CODE_INVALID_REQUEST, "transaction carries no messages"));
        }
        tx.verify()
            .map_err(|e| reject(CODE_UNAUTHORIZED, &e.to_string()))?;

        let signer = tx.signer_address(&self.address_prefix);
        let mut seen_accounts: HashSet<(LaunchId, String)> = HashSet::new();
        let mut seen_validators: HashSet<(LaunchId, String)> = HashSet::new();
        let mut batch = Vec::with_capacity(tx.body.messages.len());

        for msg in &tx.body.messages {
            if msg.signer() != signer {
                return Err(reject(
                    CODE_UNAUTHORIZED,
                    &format!("message creator {} is not the signer {}", msg.signer(), signer),
                ));
            }
            msg.validate_basic(&self.address_prefix)
                .map_err(|e| reject(CODE_INVALID_REQUEST, &e.to_string()))?;

            let launch_id = msg.launch_id();
            let pending = self.store.requests(launch_id)?;
            let content = match msg {
                Msg::RequestAddAccount(m) => {
                    let key = (launch_id, m.address.clone());
                    if seen_accounts.contains(&key) || self.account_known(launch_id, &m.address, &pending)? {
                        return Err(reject(
                            CODE_CONFLICT,
                            &format!("account {} already exists for launch {}", m.address, launch_id),
                        ));
                    }
                    seen_accounts.insert(key);
                    RequestContent::GenesisAccount(GenesisAccount {
                        launch_id,
                        address: m.address.clone(),
                        coins: m.coins.clone(),
                    })
                }
                Msg::RequestAddValidator(m) => {
                    let key = (launch_id, m.val_address.clone());
                    if seen_validators.contains(&key) || self.validator_known(launch_id, &m.val_address, &pending)? {
                        return Err(reject(
                            CODE_CONFLICT,
                            &format!("validator {} already exists for launch {}", m.val_address, launch_id),
                        ));
                    }
                    seen_validators.insert(key);
                    RequestContent::GenesisValidator(GenesisValidator {
                        launch_id,
                        address: m.val_address.clone(),
                        gen_tx: m.gen_tx.clone(),
                        cons_pub_key: m.cons_pub_key.clone(),
                        self_delegation: m.self_delegation.clone(),
                        peer: m.peer.clone(),
                    })
                }
            };
            batch.push(NewRequest { launch_id, content });
        }
        Ok(batch)
    }
}

fn reject(code: u32, log: &str) -> NetworkError {
    NetworkError::TxRejected {
        code,
        log: log.to_string(),
    }
}

fn not_found(kind: &str, launch_id: LaunchId, address: &str) -> NetworkError {
    NetworkError::NotFound(format!("{} {} for launch {}", kind, address, launch_id))
}

impl LaunchQuery for Ledger {
    fn genesis_account(&self, launch_id: LaunchId, address: &str) -> Result<GenesisAccount, NetworkError> {
        self.store
            .genesis_account(launch_id, address)?
            .ok_or_else(|| not_found("genesis account", launch_id, address))
    }

    fn vesting_account(&self, launch_id: LaunchId, address: &str) -> Result<VestingAccount, NetworkError> {
        self.store
            .vesting_account(launch_id, address)?
            .ok_or_else(|| not_found("vesting account", launch_id, address))
    }

    fn genesis_validator(&self, launch_id: LaunchId, address: &str) -> Result<GenesisValidator, NetworkError> {
        self.store
            .genesis_validator(launch_id, address)?
            .ok_or_else(|| not_found("genesis validator", launch_id, address))
    }

    fn request_all(&self, launch_id: LaunchId) -> Result<Vec<Request>, NetworkError> {
        self.store.requests(launch_id)
    }
}

impl Broadcaster for Ledger {
    fn broadcast_tx(&self, tx: &SignedTx) -> Result<TxResponse, NetworkError> {
        let guard = self.write_lock.lock();
        let batch = match self.check_tx(tx) {
            Ok(batch) => batch,
            Err(e) => {
                warn!("rejected transaction: {}", e);
                return Err(e);
            }
        };

        let txhash = tx.hash()?;
        let signer = tx.signer_address(&self.address_prefix);
        let now = chrono::Utc::now();
        let count = batch.len();
        let committed = self.store.commit_requests(&signer, batch, now.timestamp())?;
        drop(guard);

        info!(
            height = committed.height,
            %txhash,
            %signer,
            requests = count,
            "transaction committed"
        );

        Ok(TxResponse {
            height: committed.height,
            txhash,
            code: 0,
            raw_log: format!("{} request(s) submitted", count),
            request_ids: committed.request_ids,
            timestamp: now.to_rfc3339(),
        })
    }
}
