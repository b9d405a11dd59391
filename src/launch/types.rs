/// Launch registry records: finalized genesis entries and pending requests
use crate::coin::{Coin, Coins};
use serde::{Deserialize, Serialize};

/// Numeric identifier of a chain launch on the registry
pub type LaunchId = u64;

/// Account finalized into a launch's genesis with liquid coins
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisAccount {
    pub launch_id: LaunchId,
    pub address: String,
    pub coins: Coins,
}

/// Delayed vesting schedule: `vesting` unlocks at `end_time`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayedVesting {
    pub total_balance: Coins,
    pub vesting: Coins,
    pub end_time: i64,
}

/// Account finalized into a launch's genesis with vesting coins
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VestingAccount {
    pub launch_id: LaunchId,
    pub address: String,
    pub vesting: DelayedVesting,
}

/// Validator finalized into a launch's genesis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisValidator {
    pub launch_id: LaunchId,
    pub address: String,
    #[serde(with = "base64_bytes")]
    pub gen_tx: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub cons_pub_key: Vec<u8>,
    pub self_delegation: Coin,
    pub peer: String,
}

/// Content of a request waiting for coordinator approval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestContent {
    GenesisAccount(GenesisAccount),
    VestingAccount(VestingAccount),
    GenesisValidator(GenesisValidator),
    AccountRemoval { address: String },
    ValidatorRemoval { address: String },
}

impl RequestContent {
    /// Address the request is about
    pub fn address(&self) -> &str {
        match self {
            RequestContent::GenesisAccount(acc) => &acc.address,
            RequestContent::VestingAccount(acc) => &acc.address,
            RequestContent::GenesisValidator(val) => &val.address,
            RequestContent::AccountRemoval { address } => address,
            RequestContent::ValidatorRemoval { address } => address,
        }
    }

    /// Short label used in listings
    pub fn kind(&self) -> &'static str {
        match self {
            RequestContent::GenesisAccount(_) => "genesis-account",
            RequestContent::VestingAccount(_) => "vesting-account",
            RequestContent::GenesisValidator(_) => "genesis-validator",
            RequestContent::AccountRemoval { .. } => "account-removal",
            RequestContent::ValidatorRemoval { .. } => "validator-removal",
        }
    }

    /// Returns the validator entry when the request adds a genesis validator
    pub fn genesis_validator(&self) -> Option<&GenesisValidator> {
        match self {
            RequestContent::GenesisValidator(val) => Some(val),
            _ => None,
        }
    }

    /// True when the request would add `address` as a genesis or vesting account
    pub fn adds_account(&self, address: &str) -> bool {
        match self {
            RequestContent::GenesisAccount(acc) => acc.address == address,
            RequestContent::VestingAccount(acc) => acc.address == address,
            _ => false,
        }
    }
}

/// Pending request as stored by the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub launch_id: LaunchId,
    pub request_id: u64,
    pub creator: String,
    pub created_at: i64,
    pub content: RequestContent,
}

/// Byte fields are base64 strings in JSON.
pub(crate) mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        STANDARD.decode(raw.as_bytes()).map_err(de::Error::custom)
    }
}
