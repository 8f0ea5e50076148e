//! 32-byte account addresses
//!
//! Displayed and serialized as Base58. Key-controlled identities are x-only
//! secp256k1 public keys; derived addresses are guaranteed not to be.

use secp256k1::XOnlyPublicKey;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Address parsing errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("Invalid base58 encoding: {0}")]
    InvalidEncoding(String),
    #[error("Invalid address length: expected 32 bytes, got {0}")]
    InvalidLength(usize),
}

/// A ledger account address
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; 32]);

impl Address {
    /// Address length in bytes
    pub const LEN: usize = 32;

    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0
    }

    /// Whether the bytes decode to a valid x-only secp256k1 public key
    pub fn is_on_curve(&self) -> bool {
        XOnlyPublicKey::from_slice(&self.0).is_ok()
    }

    /// Shortened form for log lines and tables
    pub fn short(&self) -> String {
        let full = self.to_string();
        if full.len() <= 12 {
            full
        } else {
            format!("{}..{}", &full[..6], &full[full.len() - 4..])
        }
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for Address {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| AddressError::InvalidEncoding(e.to_string()))?;
        let array: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| AddressError::InvalidLength(bytes.len()))?;
        Ok(Self(array))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_parse() {
        let address = Address::new([42u8; 32]);
        let parsed: Address = address.to_string().parse().unwrap();
        assert_eq!(address, parsed);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(matches!(
            "0OIl".parse::<Address>(),
            Err(AddressError::InvalidEncoding(_))
        ));
        assert_eq!(
            bs58::encode([1u8; 5]).into_string().parse::<Address>(),
            Err(AddressError::InvalidLength(5))
        );
    }

    #[test]
    fn test_serde_as_map_key() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(Address::new([3u8; 32]), 10u64);

        let json = serde_json::to_string(&map).unwrap();
        let back: std::collections::BTreeMap<Address, u64> = serde_json::from_str(&json).unwrap();
        assert_eq!(map, back);
    }
}
