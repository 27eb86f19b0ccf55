//! Pool configuration
//!
//! [`PoolConfig`] is fixed for the lifetime of a pool instance and only
//! changes through [`crate::Pool::upgrade`], which builds a new instance.
//! [`Limits`] are set at initialization and may be changed by governance.

use contract_types::Address;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::merkle_with_history::{MAX_LEVELS, ROOT_HISTORY_SIZE};

/// Decimals of the pool token
pub const TOKEN_DECIMALS: u32 = 18;

/// Environment variable holding the minimum withdrawal, in token units
pub const MIN_WITHDRAWAL_VAR: &str = "MINIMUM_WITHDRAWAL_AMOUNT";

/// Environment variable holding the maximum deposit, in token units
pub const MAX_DEPOSIT_VAR: &str = "MAXIMUM_DEPOSIT_AMOUNT";

const DEFAULT_MIN_WITHDRAWAL: &str = "0.05";
const DEFAULT_MAX_DEPOSIT: &str = "1";

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// JSON could not be parsed into a config
    #[error("invalid config json: {0}")]
    Json(#[from] serde_json::Error),
    /// Tree height outside `1..=32`
    #[error("levels must be in 1..={MAX_LEVELS}, got {0}")]
    WrongLevels(u32),
    /// Root history must hold at least one root
    #[error("root history size must be positive")]
    EmptyRootHistory,
    /// A required collaborator address is zero
    #[error("{0} address is not set")]
    MissingAddress(&'static str),
    /// A decimal amount could not be parsed
    #[error("invalid amount for {name}: {value:?}")]
    InvalidAmount {
        /// Setting being parsed
        name: &'static str,
        /// Offending input
        value: String,
    },
}

fn default_version() -> u32 {
    1
}

fn default_root_history_size() -> u32 {
    ROOT_HISTORY_SIZE
}

/// Versioned pool configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Implementation version; upgrades must increase it
    #[serde(default = "default_version")]
    pub version: u32,
    /// Height of the commitment tree
    pub levels: u32,
    /// Number of recent roots accepted in proofs
    #[serde(default = "default_root_history_size")]
    pub root_history_size: u32,
    /// Token held by the pool
    pub token: Address,
    /// Token bridge delivering bridged deposits and carrying L1 withdrawals
    pub omni_bridge: Address,
    /// Arbitrary message bridge relaying governance calls
    pub amb: Address,
    /// Unwrapper contract receiving L1 withdrawals on the settlement chain
    pub l1_unwrapper: Address,
    /// Governance account on the settlement chain
    pub governance: Address,
    /// Chain id governance calls must originate from
    pub l1_chain_id: u64,
    /// Receives tokens of bridged deposits that could not be applied
    pub multisig: Address,
}

impl PoolConfig {
    /// Parse and validate a JSON config
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check structural constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.levels == 0 || self.levels > MAX_LEVELS {
            return Err(ConfigError::WrongLevels(self.levels));
        }
        if self.root_history_size == 0 {
            return Err(ConfigError::EmptyRootHistory);
        }
        let required = [
            ("token", &self.token),
            ("omni bridge", &self.omni_bridge),
            ("amb", &self.amb),
            ("governance", &self.governance),
            ("multisig", &self.multisig),
        ];
        for (name, address) in required {
            if address.is_zero() {
                return Err(ConfigError::MissingAddress(name));
            }
        }
        Ok(())
    }
}

/// Deposit and withdrawal limits, in token base units
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    /// Smallest withdrawal accepted
    pub min_withdraw: u128,
    /// Largest deposit accepted
    pub max_deposit: u128,
}

impl Limits {
    /// Read limits from `MINIMUM_WITHDRAWAL_AMOUNT` and `MAXIMUM_DEPOSIT_AMOUNT`
    ///
    /// Values are decimal token amounts (`"0.05"`); unset variables fall back
    /// to `0.05` and `1`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`Limits::from_env`] with a custom variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |name: &'static str, default: &str| {
            let value = lookup(name).unwrap_or_else(|| default.to_string());
            parse_units(value.trim(), TOKEN_DECIMALS).ok_or(ConfigError::InvalidAmount { name, value })
        };
        Ok(Self {
            min_withdraw: read(MIN_WITHDRAWAL_VAR, DEFAULT_MIN_WITHDRAWAL)?,
            max_deposit: read(MAX_DEPOSIT_VAR, DEFAULT_MAX_DEPOSIT)?,
        })
    }
}

/// Parse a decimal amount into base units with `decimals` fractional digits
///
/// Returns `None` for empty input, signs, non-digits, too many fractional
/// digits or overflow.
pub fn parse_units(value: &str, decimals: u32) -> Option<u128> {
    let (whole, fraction) = match value.split_once('.') {
        Some((w, f)) => (w, f),
        None => (value, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(whole) || !all_digits(fraction) {
        return None;
    }
    let missing = decimals.checked_sub(u32::try_from(fraction.len()).ok()?)?;
    let scale = 10u128.checked_pow(decimals)?;
    let whole_units = if whole.is_empty() { 0 } else { whole.parse::<u128>().ok()? };
    let fraction_units = if fraction.is_empty() {
        0
    } else {
        let padding = 10u128.checked_pow(missing)?;
        fraction.parse::<u128>().ok()?.checked_mul(padding)?
    };
    whole_units.checked_mul(scale)?.checked_add(fraction_units)
}
