//! Coin amounts as used by the launch registry
//!
//! A [`Coin`] is a denomination plus an unsigned amount and parses from the
//! usual `"1000stake"` notation. [`Coins`] is a normalized set: sorted by
//! denomination, zero amounts dropped, duplicate denominations rejected.

use crate::error::NetworkError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const MIN_DENOM_LENGTH: usize = 3;
const MAX_DENOM_LENGTH: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    #[serde(with = "amount_string")]
    pub amount: u128,
}

impl Coin {
    pub fn new(amount: u128, denom: impl Into<String>) -> Result<Self, NetworkError> {
        let denom = denom.into();
        validate_denom(&denom)?;
        Ok(Coin { denom, amount })
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }

    pub fn is_positive(&self) -> bool {
        self.amount > 0
    }

    pub fn validate(&self) -> Result<(), NetworkError> {
        validate_denom(&self.denom)
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

impl FromStr for Coin {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| NetworkError::InvalidCoin(format!("missing denom in '{}'", s)))?;
        if split == 0 {
            return Err(NetworkError::InvalidCoin(format!("missing amount in '{}'", s)));
        }
        let (amount, denom) = s.split_at(split);
        let amount = amount
            .parse::<u128>()
            .map_err(|e| NetworkError::InvalidCoin(format!("bad amount in '{}': {}", s, e)))?;
        Coin::new(amount, denom)
    }
}

fn validate_denom(denom: &str) -> Result<(), NetworkError> {
    if denom.len() < MIN_DENOM_LENGTH || denom.len() > MAX_DENOM_LENGTH {
        return Err(NetworkError::InvalidCoin(format!(
            "denom '{}' must be {}-{} characters",
            denom, MIN_DENOM_LENGTH, MAX_DENOM_LENGTH
        )));
    }
    let mut chars = denom.chars();
    let first_ok = chars.next().map(|c| c.is_ascii_alphabetic()).unwrap_or(false);
    let rest_ok = chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | ':' | '.' | '_' | '-'));
    if !first_ok || !rest_ok {
        return Err(NetworkError::InvalidCoin(format!("invalid denom '{}'", denom)));
    }
    Ok(())
}

/// Sorted, zero-free, duplicate-free list of coins
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Coins(Vec<Coin>);

impl Coins {
    pub fn new(coins: impl IntoIterator<Item = Coin>) -> Result<Self, NetworkError> {
        let mut coins: Vec<Coin> = coins.into_iter().filter(|c| !c.is_zero()).collect();
        coins.sort_by(|a, b| a.denom.cmp(&b.denom));
        if let Some(dup) = coins.windows(2).find(|w| w[0].denom == w[1].denom) {
            return Err(NetworkError::InvalidCoin(format!("duplicate denomination {}", dup[0].denom)));
        }
        Ok(Coins(coins))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Coin> {
        self.0.iter()
    }

    pub fn amount_of(&self, denom: &str) -> u128 {
        self.0
            .iter()
            .find(|c| c.denom == denom)
            .map(|c| c.amount)
            .unwrap_or(0)
    }

    /// Re-checks normalization, for values that arrived through deserialization.
    pub fn validate(&self) -> Result<(), NetworkError> {
        for coin in &self.0 {
            coin.validate()?;
            if coin.is_zero() {
                return Err(NetworkError::InvalidCoin(format!("zero amount for {}", coin.denom)));
            }
        }
        if self.0.windows(2).any(|w| w[0].denom >= w[1].denom) {
            return Err(NetworkError::InvalidCoin("coins are not sorted or contain duplicates".to_string()));
        }
        Ok(())
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|c| c.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}

impl FromStr for Coins {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Ok(Coins::default());
        }
        let coins = s
            .split(',')
            .map(Coin::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        Coins::new(coins)
    }
}

/// Amounts travel as decimal strings in JSON.
mod amount_string {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(amount: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&amount.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse::<u128>().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_coin() {
        let coin: Coin = "95000000stake".parse().unwrap();
        assert_eq!(coin.amount, 95_000_000);
        assert_eq!(coin.denom, "stake");
        assert_eq!(coin.to_string(), "95000000stake");
    }

    #[test]
    fn test_parse_coin_rejects_garbage() {
        assert!("stake".parse::<Coin>().is_err());
        assert!("100".parse::<Coin>().is_err());
        assert!("100st".parse::<Coin>().is_err());
        assert!("-5stake".parse::<Coin>().is_err());
    }

    #[test]
    fn test_coins_are_normalized() {
        let coins: Coins = "5token,0foo,10stake".parse().unwrap();
        assert_eq!(coins.len(), 2);
        assert_eq!(coins.to_string(), "10stake,5token");
        assert_eq!(coins.amount_of("token"), 5);
        assert_eq!(coins.amount_of("foo"), 0);
        assert!(coins.validate().is_ok());
    }

    #[test]
    fn test_coins_reject_duplicates() {
        let result = "5stake,6stake".parse::<Coins>();
        assert!(matches!(result, Err(NetworkError::InvalidCoin(_))));
    }

    #[test]
    fn test_coin_json_amount_is_string() {
        let coin = Coin::new(1000, "stake").unwrap();
        let json = serde_json::to_value(&coin).unwrap();
        assert_eq!(json["amount"], "1000");
        assert_eq!(json["denom"], "stake");
        let back: Coin = serde_json::from_value(json).unwrap();
        assert_eq!(back, coin);
    }
}
