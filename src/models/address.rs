use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Invalid address {value:?}: expected 0x followed by 40 hex characters")]
pub struct AddressError {
    value: String,
}

/// EVM account address.
///
/// Stored lowercase so that checksummed and non-checksummed spellings of the
/// same account compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Address(String);

fn address_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^0x[0-9a-fA-F]{40}$").expect("valid address regex"))
}

impl Address {
    pub fn parse(value: impl AsRef<str>) -> Result<Self, AddressError> {
        let value = value.as_ref().trim();
        if address_pattern().is_match(value) {
            Ok(Self(value.to_lowercase()))
        } else {
            Err(AddressError {
                value: value.to_string(),
            })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Address::parse(raw).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHECKSUMMED: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

    #[test]
    fn test_parse_normalizes_case() {
        let mixed = Address::parse(CHECKSUMMED).unwrap();
        let lower = Address::parse(CHECKSUMMED.to_lowercase()).unwrap();
        assert_eq!(mixed, lower);
        assert_eq!(mixed.as_str(), "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed");
    }

    #[test]
    fn test_parse_rejects_malformed_values() {
        assert!(Address::parse("").is_err());
        assert!(Address::parse("5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed").is_err());
        assert!(Address::parse("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAe").is_err());
        assert!(Address::parse("0xZZAeb6053F3E94C9b9A09f33669435E7Ef1BeAed").is_err());
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: Address = serde_json::from_str(&format!("\"{CHECKSUMMED}\"")).unwrap();
        assert_eq!(ok, Address::parse(CHECKSUMMED).unwrap());
        assert!(serde_json::from_str::<Address>("\"0x1234\"").is_err());
    }
}
