//! Launch registry data model and the two remote capabilities the join flow
//! consumes: point/list queries and transaction broadcast.

pub mod msgs;
pub mod types;

pub use msgs::*;
pub use types::*;

use crate::error::NetworkError;

/// Read side of the launch registry.
///
/// Point lookups return [`NetworkError::NotFound`] when no record exists;
/// every other error is a query or transport failure.
pub trait LaunchQuery: Send + Sync {
    fn genesis_account(&self, launch_id: LaunchId, address: &str) -> Result<GenesisAccount, NetworkError>;
    fn vesting_account(&self, launch_id: LaunchId, address: &str) -> Result<VestingAccount, NetworkError>;
    fn genesis_validator(&self, launch_id: LaunchId, address: &str) -> Result<GenesisValidator, NetworkError>;
    /// All pending requests of a launch, ordered by request id
    fn request_all(&self, launch_id: LaunchId) -> Result<Vec<Request>, NetworkError>;
}

/// Write side of the launch registry: submits one signed transaction.
pub trait Broadcaster: Send + Sync {
    fn broadcast_tx(&self, tx: &SignedTx) -> Result<TxResponse, NetworkError>;
}

/// Maps a point-lookup result to presence, keeping real failures as errors.
pub(crate) fn found<T>(result: Result<T, NetworkError>) -> Result<bool, NetworkError> {
    match result {
        Ok(_) => Ok(true),
        Err(NetworkError::NotFound(_)) => Ok(false),
        Err(e) => Err(e),
    }
}
