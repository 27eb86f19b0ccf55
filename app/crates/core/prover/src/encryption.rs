//! Note encryption.
//!
//! Outputs are published encrypted to their owner so the recipient can find
//! and spend them. Each keypair carries an X25519 encryption key derived from
//! its note private key with SHA-256 under a fixed domain, so one secret
//! recovers both spending and viewing ability.
//!
//! # Key Architecture
//!
//! ```text
//! Note private key (BN254 scalar)
//!        │
//!        ├── Poseidon → Note public key. Used for note ownership proofs in ZK circuits.
//!        │
//!        └── SHA-256("shielded-pool/encryption-key/v1" || key) → X25519 secret.
//!                   Used for encrypting/decrypting note data.
//! ```

use ark_bn254::Fr;
use contract_types::fr_to_bytes;
use crypto_secretbox::aead::Aead;
use crypto_secretbox::{KeyInit, Nonce, XSalsa20Poly1305};
use pool_utils::random_bytes;
use sha2::{Digest, Sha256};
use x25519_dalek::{PublicKey, StaticSecret};

use crate::error::Error;

const ENCRYPTION_KEY_DOMAIN: &[u8] = b"shielded-pool/encryption-key/v1";

/// Ephemeral public key length
pub const EPHEMERAL_KEY_LEN: usize = 32;

/// XSalsa20 nonce length
pub const NONCE_LEN: usize = 24;

/// Poly1305 tag length
pub const TAG_LEN: usize = 16;

/// Note plaintext: `[amount (16 bytes BE)] [blinding (32 bytes BE)]`
pub const PLAINTEXT_LEN: usize = 48;

/// Size of an encrypted note output
pub const ENCRYPTED_LEN: usize = EPHEMERAL_KEY_LEN + NONCE_LEN + PLAINTEXT_LEN + TAG_LEN;

/// Derive the X25519 encryption secret of a note private key
///
/// # Derivation
/// ```text
/// SHA-256(domain || private key (32 bytes BE)) → X25519 secret
/// ```
pub fn derive_encryption_secret(private_key: &Fr) -> StaticSecret {
    let mut hasher = Sha256::new();
    hasher.update(ENCRYPTION_KEY_DOMAIN);
    hasher.update(fr_to_bytes(private_key));
    let seed: [u8; 32] = hasher.finalize().into();
    StaticSecret::from(seed)
}

/// Encrypt note data using X25519-XSalsa20-Poly1305 (NaCl library standard)
///
/// When sending a note to someone, we encrypt the sensitive data (amount and
/// blinding) with their X25519 public key. Only they can decrypt it.
///
/// # Output Format
/// ```text
/// [ephemeral_pubkey (32)] [nonce (24)] [ciphertext (48) + tag (16)]
/// Total: 120 bytes
/// ```
///
/// # Arguments
/// * `recipient` - Recipient's X25519 encryption public key
/// * `plaintext` - Note data
pub fn encrypt_note_data(recipient: &PublicKey, plaintext: &[u8]) -> Result<Vec<u8>, Error> {
    let ephemeral_secret = StaticSecret::from(random_bytes::<32>()?);
    let ephemeral_public = PublicKey::from(&ephemeral_secret);

    // ECDH: derive shared secret
    let shared_secret = ephemeral_secret.diffie_hellman(recipient);
    let cipher = XSalsa20Poly1305::new(shared_secret.as_bytes().into());

    let nonce_bytes = random_bytes::<NONCE_LEN>()?;
    let ciphertext = cipher
        .encrypt(&Nonce::from(nonce_bytes), plaintext)
        .map_err(|_| Error::EncryptionFailed)?;

    // Pack: [ephemeral_pubkey (32)] [nonce (24)] [ciphertext + tag]
    let mut result = Vec::with_capacity(EPHEMERAL_KEY_LEN + NONCE_LEN + ciphertext.len());
    result.extend_from_slice(ephemeral_public.as_bytes());
    result.extend_from_slice(&nonce_bytes);
    result.extend_from_slice(&ciphertext);
    Ok(result)
}

/// Decrypt note data using X25519-XSalsa20-Poly1305.
///
/// When scanning for notes addressed to us, we try to decrypt each encrypted
/// output. Any format or authentication failure means the output is not for
/// us and yields [`Error::NotAddressedToMe`].
pub fn decrypt_note_data(secret: &StaticSecret, encrypted_data: &[u8]) -> Result<Vec<u8>, Error> {
    if encrypted_data.len() < EPHEMERAL_KEY_LEN + NONCE_LEN + TAG_LEN {
        return Err(Error::NotAddressedToMe);
    }
    let (ephemeral, rest) = encrypted_data.split_at(EPHEMERAL_KEY_LEN);
    let (nonce_bytes, ciphertext_with_tag) = rest.split_at(NONCE_LEN);

    let ephemeral: [u8; EPHEMERAL_KEY_LEN] =
        ephemeral.try_into().map_err(|_| Error::NotAddressedToMe)?;
    let nonce: [u8; NONCE_LEN] = nonce_bytes.try_into().map_err(|_| Error::NotAddressedToMe)?;

    let shared_secret = secret.diffie_hellman(&PublicKey::from(ephemeral));
    let cipher = XSalsa20Poly1305::new(shared_secret.as_bytes().into());
    cipher
        .decrypt(&Nonce::from(nonce), ciphertext_with_tag)
        .map_err(|_| Error::NotAddressedToMe)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encryption_secret_is_deterministic() {
        let a = derive_encryption_secret(&Fr::from(42u64));
        let b = derive_encryption_secret(&Fr::from(42u64));
        let c = derive_encryption_secret(&Fr::from(43u64));
        assert_eq!(a.to_bytes(), b.to_bytes());
        assert_ne!(a.to_bytes(), c.to_bytes());
    }

    #[test]
    fn only_the_recipient_decrypts() {
        let recipient = derive_encryption_secret(&Fr::from(1u64));
        let other = derive_encryption_secret(&Fr::from(2u64));
        let plaintext = [7u8; PLAINTEXT_LEN];

        let encrypted = encrypt_note_data(&PublicKey::from(&recipient), &plaintext).expect("encrypt");
        assert_eq!(encrypted.len(), ENCRYPTED_LEN);
        assert_eq!(decrypt_note_data(&recipient, &encrypted), Ok(plaintext.to_vec()));
        assert_eq!(decrypt_note_data(&other, &encrypted), Err(Error::NotAddressedToMe));

        let mut tampered = encrypted.clone();
        tampered[ENCRYPTED_LEN - 1] ^= 1;
        assert_eq!(decrypt_note_data(&recipient, &tampered), Err(Error::NotAddressedToMe));
        assert_eq!(decrypt_note_data(&recipient, &encrypted[..40]), Err(Error::NotAddressedToMe));
    }

    #[test]
    fn encryptions_are_randomized() {
        let recipient = PublicKey::from(&derive_encryption_secret(&Fr::from(1u64)));
        let a = encrypt_note_data(&recipient, b"same").expect("encrypt");
        let b = encrypt_note_data(&recipient, b"same").expect("encrypt");
        assert_ne!(a, b);
    }
}
