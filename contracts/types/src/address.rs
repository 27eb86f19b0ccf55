//! Account identifiers

use core::fmt;
use core::str::FromStr;

use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Error parsing an [`Address`] from text
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
#[error("address must be 20 hex-encoded bytes with an optional 0x prefix")]
pub struct AddressParseError;

/// A 20-byte account identifier understood by the token collaborator
///
/// Serialized as a `0x`-prefixed hex string in configuration files; the
/// prefix is optional when parsing. On the wire it is the 20 raw bytes.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Encode, Decode)]
pub struct Address([u8; Address::LEN]);

impl Address {
    /// Length in bytes
    pub const LEN: usize = 20;

    /// The zero address. Never a valid withdrawal recipient.
    pub const ZERO: Address = Address([0u8; Address::LEN]);

    /// Wrap raw bytes
    pub const fn new(bytes: [u8; Address::LEN]) -> Self {
        Self(bytes)
    }

    /// Deterministic address derived from a human readable label
    ///
    /// Useful for deployments and fixtures where accounts are named
    /// ("pool", "omni-bridge", "alice") rather than generated by a wallet.
    pub fn from_label(label: &str) -> Self {
        let digest = Sha256::digest(label.as_bytes());
        let mut bytes = [0u8; Address::LEN];
        bytes.copy_from_slice(&digest[..Address::LEN]);
        Self(bytes)
    }

    /// Parse from a byte slice of exactly [`Address::LEN`] bytes
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; Address::LEN]>::try_from(bytes).ok().map(Self)
    }

    /// Raw bytes
    pub const fn as_bytes(&self) -> &[u8; Address::LEN] {
        &self.0
    }

    /// Whether this is [`Address::ZERO`]
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes = [0u8; Address::LEN];
        hex::decode_to_slice(digits, &mut bytes).map_err(|_| AddressParseError)?;
        Ok(Self(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_parse_agree() {
        let addr = Address::from_label("alice");
        let text = addr.to_string();
        assert!(text.starts_with("0x"));
        assert_eq!(text.parse::<Address>(), Ok(addr));
        assert_eq!(
            "DeaD00000000000000000000000000000000BEEf".parse::<Address>().map(|a| a.as_bytes()[0]),
            Ok(0xde)
        );
    }

    #[test]
    fn labels_are_distinct_and_not_zero() {
        assert_ne!(Address::from_label("pool"), Address::from_label("bridge"));
        assert!(!Address::from_label("pool").is_zero());
        assert!(Address::ZERO.is_zero());
        assert_eq!("0x12".parse::<Address>(), Err(AddressParseError));
    }

    #[test]
    fn serde_uses_hex_strings() {
        let addr = Address::new([0xab; Address::LEN]);
        let json = serde_json::to_string(&addr).expect("serialize");
        assert_eq!(json, format!("\"0x{}\"", "ab".repeat(Address::LEN)));
        let back: Address = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, addr);
        let bare: Address =
            serde_json::from_str(&format!("\"{}\"", "ab".repeat(Address::LEN))).expect("bare");
        assert_eq!(bare, addr);
        assert!(serde_json::from_str::<Address>("\"0xab\"").is_err());
    }
}
