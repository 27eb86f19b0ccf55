//! Notes (UTXOs)
//!
//! A note is a private record of value. The pool only ever sees its
//! commitment; spending it reveals a nullifier bound to its leaf position.

use ark_bn254::Fr;
use contract_types::{fr_from_bytes, fr_to_bytes};
use pool_utils::{commitment, nullifier, random_field, sign};

use crate::encryption::{PLAINTEXT_LEN, decrypt_note_data, encrypt_note_data};
use crate::error::Error;
use crate::keypair::Keypair;

/// A note owned by a keypair
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Note {
    amount: u128,
    keypair: Keypair,
    blinding: Fr,
    index: Option<u64>,
    commitment: Fr,
}

impl Note {
    /// Note with a fresh random blinding
    pub fn new(amount: u128, keypair: Keypair) -> Result<Self, Error> {
        Self::with_blinding(amount, keypair, random_field()?)
    }

    /// Note with a caller-chosen blinding
    pub fn with_blinding(amount: u128, keypair: Keypair, blinding: Fr) -> Result<Self, Error> {
        let commitment = commitment(Fr::from(amount), keypair.public_key(), blinding)?;
        Ok(Self {
            amount,
            keypair,
            blinding,
            index: None,
            commitment,
        })
    }

    /// Zero-amount note under a fresh random keypair
    pub fn padding() -> Result<Self, Error> {
        Self::new(0, Keypair::generate()?)
    }

    /// Same note at a known leaf position
    pub fn at_index(mut self, index: u64) -> Self {
        self.index = Some(index);
        self
    }

    /// Amount in token base units
    pub fn amount(&self) -> u128 {
        self.amount
    }

    /// Owner
    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }

    /// Blinding factor
    pub fn blinding(&self) -> Fr {
        self.blinding
    }

    /// Leaf position, once known
    pub fn index(&self) -> Option<u64> {
        self.index
    }

    /// `H(amount, publicKey, blinding)`
    pub fn commitment(&self) -> Fr {
        self.commitment
    }

    /// Nullifier at the note's leaf position
    pub fn nullifier(&self) -> Result<Fr, Error> {
        self.nullifier_at(self.index.ok_or(Error::NoteNotInserted)?)
    }

    /// Nullifier the note would have at `leaf_index`
    ///
    /// `H(commitment, index, H(privateKey, commitment, index))`
    pub fn nullifier_at(&self, leaf_index: u64) -> Result<Fr, Error> {
        let private_key = self.keypair.private_key().ok_or(Error::MissingPrivateKey)?;
        let path_index = Fr::from(leaf_index);
        let signature = sign(private_key, self.commitment, path_index)?;
        Ok(nullifier(self.commitment, path_index, signature)?)
    }

    /// Encrypt amount and blinding to the owner
    pub fn encrypt(&self) -> Result<Vec<u8>, Error> {
        let mut plaintext = [0u8; PLAINTEXT_LEN];
        plaintext[..16].copy_from_slice(&self.amount.to_be_bytes());
        plaintext[16..].copy_from_slice(&fr_to_bytes(&self.blinding));
        encrypt_note_data(self.keypair.encryption_public_key(), &plaintext)
    }

    /// Recover a note encrypted to `keypair`
    ///
    /// The leaf index is unknown until matched against a published commitment.
    pub fn decrypt(encrypted_output: &[u8], keypair: &Keypair) -> Result<Self, Error> {
        let secret = keypair.encryption_secret().ok_or(Error::MissingPrivateKey)?;
        let plaintext = decrypt_note_data(secret, encrypted_output)?;
        if plaintext.len() != PLAINTEXT_LEN {
            return Err(Error::NotAddressedToMe);
        }
        let (amount, blinding) = plaintext.split_at(16);
        let amount: [u8; 16] = amount.try_into().map_err(|_| Error::NotAddressedToMe)?;
        let blinding = fr_from_bytes(blinding).map_err(|_| Error::NotAddressedToMe)?;
        Self::with_blinding(u128::from_be_bytes(amount), keypair.clone(), blinding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pool_utils::derive_public_key;

    #[test]
    fn commitment_binds_amount_owner_and_blinding() {
        let keypair = Keypair::from_private_key(Fr::from(3u64)).expect("keypair");
        let note = Note::with_blinding(10, keypair.clone(), Fr::from(4u64)).expect("note");
        let pk = derive_public_key(Fr::from(3u64)).expect("pk");
        assert_eq!(Ok(note.commitment()), commitment(Fr::from(10u64), pk, Fr::from(4u64)));

        let other = Note::with_blinding(11, keypair, Fr::from(4u64)).expect("note");
        assert_ne!(note.commitment(), other.commitment());
    }

    #[test]
    fn nullifier_needs_index_and_private_key() {
        let keypair = Keypair::generate().expect("keypair");
        let note = Note::new(5, keypair.clone()).expect("note");
        assert_eq!(note.nullifier(), Err(Error::NoteNotInserted));

        let placed = note.clone().at_index(3);
        let n = placed.nullifier().expect("nullifier");
        assert_eq!(placed.nullifier(), Ok(n));
        assert_ne!(note.nullifier_at(4), Ok(n));

        let public = Keypair::from_address(&keypair.address()).expect("public");
        let foreign = Note::with_blinding(5, public, note.blinding()).expect("note").at_index(3);
        assert_eq!(foreign.commitment(), note.commitment());
        assert_eq!(foreign.nullifier(), Err(Error::MissingPrivateKey));
    }

    #[test]
    fn decrypt_recovers_the_note() {
        let keypair = Keypair::generate().expect("keypair");
        let note = Note::new(123_456_789, keypair.clone()).expect("note");
        let encrypted = note.encrypt().expect("encrypt");

        let recovered = Note::decrypt(&encrypted, &keypair).expect("decrypt");
        assert_eq!(recovered, note);

        let stranger = Keypair::generate().expect("keypair");
        assert_eq!(Note::decrypt(&encrypted, &stranger), Err(Error::NotAddressedToMe));
        let public = Keypair::from_address(&keypair.address()).expect("public");
        assert_eq!(Note::decrypt(&encrypted, &public), Err(Error::MissingPrivateKey));
    }

    #[test]
    fn blindings_are_fresh() {
        let keypair = Keypair::generate().expect("keypair");
        let a = Note::new(1, keypair.clone()).expect("note");
        let b = Note::new(1, keypair).expect("note");
        assert_ne!(a.blinding(), b.blinding());
        assert_ne!(a.commitment(), b.commitment());
    }
}
