//! Note scanner
//!
//! Follows the pool's events for one keypair: decrypts every published
//! output, keeps those that open to their commitment and tracks which of
//! them have been nullified since.

use std::collections::HashSet;

use ark_bn254::Fr;
use contract_types::PoolEvent;

use crate::error::Error;
use crate::keypair::Keypair;
use crate::note::Note;

/// Incremental view of the notes owned by a keypair
#[derive(Clone, Debug)]
pub struct NoteScanner {
    keypair: Keypair,
    notes: Vec<Note>,
    spent: HashSet<Fr>,
    cursor: usize,
}

impl NoteScanner {
    /// Scanner for `keypair`, which must hold a private key
    pub fn new(keypair: Keypair) -> Result<Self, Error> {
        if !keypair.can_spend() {
            return Err(Error::MissingPrivateKey);
        }
        Ok(Self {
            keypair,
            notes: Vec::new(),
            spent: HashSet::new(),
            cursor: 0,
        })
    }

    /// Process the full event log, skipping the events already seen
    ///
    /// Returns the number of notes found in the new events.
    pub fn sync(&mut self, events: &[PoolEvent]) -> usize {
        let fresh = events.get(self.cursor..).unwrap_or_default();
        let found = self.scan(fresh);
        self.cursor = events.len();
        found
    }

    /// Process a batch of events
    ///
    /// Returns the number of notes found.
    pub fn scan(&mut self, events: &[PoolEvent]) -> usize {
        let mut found = 0;
        for tx in events.iter().filter_map(PoolEvent::as_transaction) {
            self.spent.extend(tx.nullifiers.iter().copied());
            for output in &tx.commitments {
                let Ok(note) = Note::decrypt(&output.encrypted_output, &self.keypair) else {
                    continue;
                };
                if note.commitment() != output.commitment {
                    log::warn!("decrypted output at {} does not match its commitment", output.index);
                    continue;
                }
                self.notes.push(note.at_index(output.index));
                found += 1;
            }
        }
        found
    }

    /// Every note found so far, including zero-amount and spent ones
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    /// Non-zero notes whose nullifier has not been published
    pub fn unspent(&self) -> Result<Vec<Note>, Error> {
        let mut unspent = Vec::new();
        for note in self.notes.iter().filter(|n| n.amount() > 0) {
            if !self.spent.contains(&note.nullifier()?) {
                unspent.push(note.clone());
            }
        }
        Ok(unspent)
    }

    /// Sum of [`NoteScanner::unspent`]
    pub fn balance(&self) -> Result<u128, Error> {
        self.unspent()?
            .iter()
            .try_fold(0u128, |acc, note| acc.checked_add(note.amount()))
            .ok_or(Error::InvalidAmount)
    }
}
