// Launch registry: storage backends plus the ledger that validates and
// commits transactions on top of them.

pub mod ledger;
pub mod memory;
pub mod sqlite;

pub use ledger::*;
pub use memory::InMemoryStore;
pub use sqlite::Database;

use crate::error::NetworkError;
use crate::launch::{GenesisAccount, GenesisValidator, LaunchId, Request, RequestContent, VestingAccount};

/// Request about to be appended to a launch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRequest {
    pub launch_id: LaunchId,
    pub content: RequestContent,
}

/// Result of appending a batch of requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Committed {
    pub height: u64,
    pub request_ids: Vec<u64>,
}

/// Abstraction for registry storage backends. Batch operations must be
/// atomic: either every request of a batch is stored or none is.
pub trait RegistryStore: Send + Sync {
    fn genesis_account(&self, launch_id: LaunchId, address: &str) -> Result<Option<GenesisAccount>, NetworkError>;
    fn vesting_account(&self, launch_id: LaunchId, address: &str) -> Result<Option<VestingAccount>, NetworkError>;
    fn genesis_validator(&self, launch_id: LaunchId, address: &str) -> Result<Option<GenesisValidator>, NetworkError>;
    /// Pending requests of a launch ordered by request id
    fn requests(&self, launch_id: LaunchId) -> Result<Vec<Request>, NetworkError>;
    /// Appends requests under fresh per-launch ids and bumps the height once.
    fn commit_requests(&self, creator: &str, batch: Vec<NewRequest>, created_at: i64) -> Result<Committed, NetworkError>;
    /// Removes a pending request and applies its content to the finalized records.
    fn approve_request(&self, launch_id: LaunchId, request_id: u64) -> Result<Request, NetworkError>;
    fn height(&self) -> Result<u64, NetworkError>;
}

pub(crate) fn request_not_found(launch_id: LaunchId, request_id: u64) -> NetworkError {
    NetworkError::NotFound(format!("request {} of launch {}", request_id, launch_id))
}
