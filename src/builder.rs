//! Join flow: existence checks, request construction and broadcast
//!
//! ```text
//! join ─► account request (optional) ─► validator request ─► sign ─► broadcast ─► JSON
//! ```
//!
//! An account request that would duplicate a known account is skipped and
//! reported through the event sink. A validator request that would duplicate a
//! known validator fails the whole join before anything is broadcast.

use crate::account::Account;
use crate::coin::{Coin, Coins};
use crate::error::NetworkError;
use crate::events::{Event, EventSink};
use crate::genesis::check_genesis_address;
use crate::launch::{
    found, Broadcaster, LaunchId, LaunchQuery, Msg, MsgRequestAddAccount, MsgRequestAddValidator,
    Request, SignedTx, TxBody, TxResponse,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Address prefix of accounts on the launch registry
pub const SPN_ADDRESS_PREFIX: &str = "spn";

/// Everything a validator candidate supplies to join a launch
#[derive(Debug, Clone)]
pub struct JoinRequest {
    pub launch_id: LaunchId,
    pub chain_home: PathBuf,
    pub peer: String,
    pub val_address: String,
    pub custom_gentx: bool,
    pub gentx: Vec<u8>,
    pub cons_pub_key: Vec<u8>,
    pub self_delegation: Coin,
    pub amount: Coin,
}

pub struct Builder {
    account: Account,
    address_prefix: String,
    query: Arc<dyn LaunchQuery>,
    broadcaster: Arc<dyn Broadcaster>,
    ev: Arc<dyn EventSink>,
}

impl Builder {
    pub fn new(
        account: Account,
        query: Arc<dyn LaunchQuery>,
        broadcaster: Arc<dyn Broadcaster>,
        ev: Arc<dyn EventSink>,
    ) -> Self {
        Builder {
            account,
            address_prefix: SPN_ADDRESS_PREFIX.to_string(),
            query,
            broadcaster,
            ev,
        }
    }

    pub fn with_address_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.address_prefix = prefix.into();
        self
    }

    /// Registry address of the signing account
    pub fn address(&self) -> String {
        self.account.address(&self.address_prefix)
    }

    /// Builds the account and validator requests for a launch and broadcasts
    /// them as one transaction. Returns the registry response as JSON.
    pub fn join(&self, req: &JoinRequest) -> Result<String, NetworkError> {
        let mut messages = Vec::with_capacity(2);

        if let Some(account_msg) = self.create_account_request_msg(
            &req.chain_home,
            req.custom_gentx,
            req.launch_id,
            req.amount.clone(),
        )? {
            messages.push(account_msg);
        }

        let validator_msg = self.create_validator_request_msg(
            req.launch_id,
            &req.peer,
            &req.val_address,
            req.gentx.clone(),
            req.cons_pub_key.clone(),
            req.self_delegation.clone(),
        )?;
        messages.push(validator_msg);

        self.ev.send(Event::ongoing("Broadcasting transactions"));
        let response = self.broadcast(messages)?;

        let out = serde_json::to_string(&response)?;
        self.ev.send(Event::done("Transactions broadcasted"));

        Ok(out)
    }

    /// Signs `messages` as a single transaction and submits it.
    pub fn broadcast(&self, messages: Vec<Msg>) -> Result<TxResponse, NetworkError> {
        let body = TxBody::new(messages)?;
        let tx = SignedTx::sign(body, &self.account.keypair)?;
        debug!(
            signer = %self.account.name,
            messages = tx.body.messages.len(),
            "broadcasting transaction"
        );
        self.broadcaster.broadcast_tx(&tx)
    }

    /// Builds the add-validator request, failing when the validator is already
    /// known to the registry.
    pub fn create_validator_request_msg(
        &self,
        launch_id: LaunchId,
        peer: &str,
        val_address: &str,
        gentx: Vec<u8>,
        cons_pub_key: Vec<u8>,
        self_delegation: Coin,
    ) -> Result<Msg, NetworkError> {
        if self.check_validator_exist(launch_id, val_address)? {
            return Err(NetworkError::ValidatorExists(val_address.to_string()));
        }

        Ok(Msg::RequestAddValidator(MsgRequestAddValidator::new(
            val_address,
            launch_id,
            gentx,
            cons_pub_key,
            self_delegation,
            peer,
        )))
    }

    /// Builds the add-account request for the signing account, or `None` when
    /// the account is already in local genesis or known to the registry.
    /// A custom gentx always gets an account request.
    pub fn create_account_request_msg(
        &self,
        chain_home: &Path,
        custom_gentx: bool,
        launch_id: LaunchId,
        amount: Coin,
    ) -> Result<Option<Msg>, NetworkError> {
        let address = self.address();
        self.ev
            .send(Event::ongoing(format!("Verifying account already exists {}", address)));

        let should_create = if custom_gentx {
            true
        } else {
            let exist = check_genesis_address(chain_home, &address)?
                || self.check_account_exist(launch_id, &address)?;
            !exist
        };

        if !should_create {
            self.ev.send(Event::done("Account message not created"));
            return Ok(None);
        }

        self.ev.send(Event::done("Account message created"));
        Ok(Some(Msg::RequestAddAccount(MsgRequestAddAccount::new(
            address,
            launch_id,
            Coins::new([amount])?,
        ))))
    }

    /// True if the account is finalized (genesis or vesting) or pending approval.
    pub fn check_account_exist(&self, launch_id: LaunchId, address: &str) -> Result<bool, NetworkError> {
        if self.has_account(launch_id, address)? {
            return Ok(true);
        }
        let requests = self.fetch_requests(launch_id)?;
        Ok(requests.iter().any(|r| r.content.adds_account(address)))
    }

    /// True if the validator is finalized or pending approval.
    pub fn check_validator_exist(&self, launch_id: LaunchId, address: &str) -> Result<bool, NetworkError> {
        if self.has_validator(launch_id, address)? {
            return Ok(true);
        }
        let requests = self.fetch_requests(launch_id)?;
        Ok(requests.iter().any(|r| {
            r.content
                .genesis_validator()
                .map(|val| val.address == address)
                .unwrap_or(false)
        }))
    }

    fn has_validator(&self, launch_id: LaunchId, address: &str) -> Result<bool, NetworkError> {
        found(self.query.genesis_validator(launch_id, address))
    }

    fn has_account(&self, launch_id: LaunchId, address: &str) -> Result<bool, NetworkError> {
        if found(self.query.vesting_account(launch_id, address))? {
            return Ok(true);
        }
        found(self.query.genesis_account(launch_id, address))
    }

    fn fetch_requests(&self, launch_id: LaunchId) -> Result<Vec<Request>, NetworkError> {
        let requests = self.query.request_all(launch_id)?;
        debug!(launch_id, pending = requests.len(), "fetched launch requests");
        Ok(requests)
    }
}
