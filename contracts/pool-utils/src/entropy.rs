//! Process-wide randomness
//!
//! A single ChaCha20 generator seeded from the operating system the first
//! time it is used. Blinding factors, private keys, ephemeral encryption keys
//! and nonces are all drawn from it, so no two draws share output.

use std::sync::{Mutex, OnceLock};

use ark_bn254::Fr;
use ark_std::UniformRand;
use rand_chacha::ChaCha20Rng;
use rand_chacha::rand_core::{RngCore, SeedableRng};
use thiserror::Error;

/// The randomness source could not be used
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum EntropyError {
    /// The operating system refused to provide a seed
    #[error("operating system randomness unavailable: {0}")]
    Unavailable(String),
    /// A thread panicked while holding the generator
    #[error("randomness source poisoned")]
    Poisoned,
}

static RNG: OnceLock<Result<Mutex<ChaCha20Rng>, getrandom::Error>> = OnceLock::new();

fn seeded() -> Result<Mutex<ChaCha20Rng>, getrandom::Error> {
    let mut seed = [0u8; 32];
    getrandom::getrandom(&mut seed)?;
    log::debug!("seeded process randomness from the operating system");
    Ok(Mutex::new(ChaCha20Rng::from_seed(seed)))
}

/// Run `f` with exclusive access to the process generator
pub fn with_rng<T>(f: impl FnOnce(&mut ChaCha20Rng) -> T) -> Result<T, EntropyError> {
    let rng = RNG
        .get_or_init(seeded)
        .as_ref()
        .map_err(|e| EntropyError::Unavailable(e.to_string()))?;
    let mut guard = rng.lock().map_err(|_| EntropyError::Poisoned)?;
    Ok(f(&mut guard))
}

/// `N` fresh random bytes
pub fn random_bytes<const N: usize>() -> Result<[u8; N], EntropyError> {
    with_rng(|rng| {
        let mut out = [0u8; N];
        rng.fill_bytes(&mut out);
        out
    })
}

/// Uniformly random field element
pub fn random_field() -> Result<Fr, EntropyError> {
    with_rng(|rng| Fr::rand(rng))
}
