//! In-memory registry store, used by tests and ephemeral runs.

use super::{request_not_found, Committed, NewRequest, RegistryStore};
use crate::error::NetworkError;
use crate::launch::{GenesisAccount, GenesisValidator, LaunchId, Request, RequestContent, VestingAccount};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

#[derive(Debug, Default)]
struct State {
    genesis_accounts: HashMap<(LaunchId, String), GenesisAccount>,
    vesting_accounts: HashMap<(LaunchId, String), VestingAccount>,
    genesis_validators: HashMap<(LaunchId, String), GenesisValidator>,
    requests: BTreeMap<(LaunchId, u64), Request>,
    next_request_id: HashMap<LaunchId, u64>,
    height: u64,
}

impl State {
    fn apply(&mut self, launch_id: LaunchId, content: &RequestContent) {
        match content {
            RequestContent::GenesisAccount(acc) => {
                self.genesis_accounts
                    .insert((launch_id, acc.address.clone()), acc.clone());
            }
            RequestContent::VestingAccount(acc) => {
                self.vesting_accounts
                    .insert((launch_id, acc.address.clone()), acc.clone());
            }
            RequestContent::GenesisValidator(val) => {
                self.genesis_validators
                    .insert((launch_id, val.address.clone()), val.clone());
            }
            RequestContent::AccountRemoval { address } => {
                let key = (launch_id, address.clone());
                self.genesis_accounts.remove(&key);
                self.vesting_accounts.remove(&key);
            }
            RequestContent::ValidatorRemoval { address } => {
                self.genesis_validators.remove(&(launch_id, address.clone()));
            }
        }
    }
}

/// Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RegistryStore for InMemoryStore {
    fn genesis_account(&self, launch_id: LaunchId, address: &str) -> Result<Option<GenesisAccount>, NetworkError> {
        Ok(self
            .state
            .read()
            .genesis_accounts
            .get(&(launch_id, address.to_string()))
            .cloned())
    }

    fn vesting_account(&self, launch_id: LaunchId, address: &str) -> Result<Option<VestingAccount>, NetworkError> {
        Ok(self
            .state
            .read()
            .vesting_accounts
            .get(&(launch_id, address.to_string()))
            .cloned())
    }

    fn genesis_validator(&self, launch_id: LaunchId, address: &str) -> Result<Option<GenesisValidator>, NetworkError> {
        Ok(self
            .state
            .read()
            .genesis_validators
            .get(&(launch_id, address.to_string()))
            .cloned())
    }

    fn requests(&self, launch_id: LaunchId) -> Result<Vec<Request>, NetworkError> {
        Ok(self
            .state
            .read()
            .requests
            .range((launch_id, 0)..=(launch_id, u64::MAX))
            .map(|(_, req)| req.clone())
            .collect())
    }

    fn commit_requests(&self, creator: &str, batch: Vec<NewRequest>, created_at: i64) -> Result<Committed, NetworkError> {
        // single write guard for the whole batch
        let mut state = self.state.write();
        let mut request_ids = Vec::with_capacity(batch.len());
        for new in batch {
            let next = state.next_request_id.entry(new.launch_id).or_insert(1);
            let request_id = *next;
            *next += 1;
            state.requests.insert(
                (new.launch_id, request_id),
                Request {
                    launch_id: new.launch_id,
                    request_id,
                    creator: creator.to_string(),
                    created_at,
                    content: new.content,
                },
            );
            request_ids.push(request_id);
        }
        state.height += 1;
        Ok(Committed {
            height: state.height,
            request_ids,
        })
    }

    fn approve_request(&self, launch_id: LaunchId, request_id: u64) -> Result<Request, NetworkError> {
        let mut state = self.state.write();
        let request = state
            .requests
            .remove(&(launch_id, request_id))
            .ok_or_else(|| request_not_found(launch_id, request_id))?;
        state.apply(launch_id, &request.content);
        state.height += 1;
        Ok(request)
    }

    fn height(&self) -> Result<u64, NetworkError> {
        Ok(self.state.read().height)
    }
}
