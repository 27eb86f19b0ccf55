//! Note keypairs
//!
//! A keypair owns notes through its BN254 public key and receives them through
//! its X25519 encryption key. Public-only keypairs (parsed from an address)
//! can be sent notes but cannot spend or decrypt them.

use std::fmt;

use ark_bn254::Fr;
use contract_types::{FIELD_SIZE, fr_from_bytes, fr_to_bytes};
use pool_utils::{derive_public_key, random_field};
use x25519_dalek::{PublicKey, StaticSecret};

use crate::encryption::derive_encryption_secret;
use crate::error::Error;

/// Length of a decoded keypair address: note public key then encryption key
pub const ADDRESS_LEN: usize = FIELD_SIZE + 32;

/// Spending and viewing keys of a pool user
#[derive(Clone)]
pub struct Keypair {
    private_key: Option<Fr>,
    public_key: Fr,
    encryption_secret: Option<StaticSecret>,
    encryption_public: PublicKey,
}

impl Keypair {
    /// Fresh random keypair
    pub fn generate() -> Result<Self, Error> {
        Self::from_private_key(random_field()?)
    }

    /// Keypair for a known note private key
    pub fn from_private_key(private_key: Fr) -> Result<Self, Error> {
        let public_key = derive_public_key(private_key)?;
        let encryption_secret = derive_encryption_secret(&private_key);
        let encryption_public = PublicKey::from(&encryption_secret);
        Ok(Self {
            private_key: Some(private_key),
            public_key,
            encryption_secret: Some(encryption_secret),
            encryption_public,
        })
    }

    /// Public-only keypair from an address produced by [`Keypair::address`]
    pub fn from_address(address: &str) -> Result<Self, Error> {
        let stripped = address.strip_prefix("0x").unwrap_or(address);
        let bytes = hex::decode(stripped).map_err(|e| Error::InvalidAddress(e.to_string()))?;
        if bytes.len() != ADDRESS_LEN {
            return Err(Error::InvalidAddress(format!(
                "expected {ADDRESS_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        let (public_key, encryption) = bytes.split_at(FIELD_SIZE);
        let public_key =
            fr_from_bytes(public_key).map_err(|e| Error::InvalidAddress(e.to_string()))?;
        let encryption: [u8; 32] = encryption
            .try_into()
            .map_err(|_| Error::InvalidAddress("bad encryption key".to_string()))?;
        Ok(Self {
            private_key: None,
            public_key,
            encryption_secret: None,
            encryption_public: PublicKey::from(encryption),
        })
    }

    /// Shareable address: `0x` + hex(public key || encryption public key)
    pub fn address(&self) -> String {
        let mut bytes = Vec::with_capacity(ADDRESS_LEN);
        bytes.extend_from_slice(&fr_to_bytes(&self.public_key));
        bytes.extend_from_slice(self.encryption_public.as_bytes());
        format!("0x{}", hex::encode(bytes))
    }

    /// Note public key
    pub fn public_key(&self) -> Fr {
        self.public_key
    }

    /// Note private key, `None` for public-only keypairs
    pub fn private_key(&self) -> Option<Fr> {
        self.private_key
    }

    /// X25519 key outputs are encrypted to
    pub fn encryption_public_key(&self) -> &PublicKey {
        &self.encryption_public
    }

    pub(crate) fn encryption_secret(&self) -> Option<&StaticSecret> {
        self.encryption_secret.as_ref()
    }

    /// Whether this keypair can spend and decrypt
    pub fn can_spend(&self) -> bool {
        self.private_key.is_some()
    }
}

impl PartialEq for Keypair {
    fn eq(&self, other: &Self) -> bool {
        self.public_key == other.public_key && self.encryption_public == other.encryption_public
    }
}

impl Eq for Keypair {}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("address", &self.address())
            .field("can_spend", &self.can_spend())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_round_trips_public_part() {
        let keypair = Keypair::generate().expect("keypair");
        let address = keypair.address();
        assert!(address.starts_with("0x"));
        assert_eq!(address.len(), 2 + ADDRESS_LEN * 2);

        let public = Keypair::from_address(&address).expect("parse");
        assert_eq!(public, keypair);
        assert!(!public.can_spend());
        assert_eq!(public.private_key(), None);
        assert_eq!(public.address(), address);
    }

    #[test]
    fn public_key_is_poseidon_of_private_key() {
        let keypair = Keypair::from_private_key(Fr::from(5u64)).expect("keypair");
        assert_eq!(Ok(keypair.public_key()), derive_public_key(Fr::from(5u64)));
        assert_eq!(keypair, Keypair::from_private_key(Fr::from(5u64)).expect("keypair"));
    }

    #[test]
    fn malformed_addresses_are_rejected() {
        assert!(matches!(Keypair::from_address("0xzz"), Err(Error::InvalidAddress(_))));
        assert!(matches!(Keypair::from_address("0x1234"), Err(Error::InvalidAddress(_))));
        let non_canonical = format!("0x{}", "ff".repeat(ADDRESS_LEN));
        assert!(matches!(Keypair::from_address(&non_canonical), Err(Error::InvalidAddress(_))));
    }
}
