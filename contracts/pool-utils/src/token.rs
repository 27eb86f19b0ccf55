//! Token collaborator
//!
//! The pool moves real value only through this interface. Callers are
//! identified explicitly (`from`, `spender`) because the pool runs in-process
//! rather than inside a chain runtime that tracks the message sender.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use contract_types::Address;
use thiserror::Error;

/// Token transfer failures
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum TokenError {
    /// Sender balance is lower than the amount
    #[error("insufficient balance: have {available}, need {required}")]
    InsufficientBalance {
        /// Current balance of the sender
        available: u128,
        /// Amount requested
        required: u128,
    },
    /// Spender allowance is lower than the amount
    #[error("insufficient allowance: have {available}, need {required}")]
    InsufficientAllowance {
        /// Current allowance of the spender
        available: u128,
        /// Amount requested
        required: u128,
    },
    /// Recipient balance would overflow
    #[error("balance overflow")]
    Overflow,
}

/// Fungible token used for deposits and withdrawals
///
/// Implementations are expected to be atomic: a failed call leaves every
/// balance and allowance unchanged.
pub trait Token: Send + Sync {
    /// Address identifying the token itself
    fn address(&self) -> Address;

    /// Balance held by `account`
    fn balance_of(&self, account: &Address) -> u128;

    /// Amount `spender` may still move out of `owner`
    fn allowance(&self, owner: &Address, spender: &Address) -> u128;

    /// Set the allowance of `spender` over the funds of `owner`
    fn approve(&self, owner: &Address, spender: &Address, amount: u128);

    /// Move `amount` from `from` to `to`, authorized by `from`
    fn transfer(&self, from: &Address, to: &Address, amount: u128) -> Result<(), TokenError>;

    /// Move `amount` from `from` to `to`, authorized by an allowance granted to `spender`
    fn transfer_from(
        &self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<(), TokenError>;
}

#[derive(Debug, Default)]
struct Ledger {
    balances: HashMap<Address, u128>,
    allowances: HashMap<(Address, Address), u128>,
}

impl Ledger {
    fn balance(&self, account: &Address) -> u128 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    fn move_funds(&mut self, from: &Address, to: &Address, amount: u128) -> Result<(), TokenError> {
        let available = self.balance(from);
        let debited = available
            .checked_sub(amount)
            .ok_or(TokenError::InsufficientBalance {
                available,
                required: amount,
            })?;
        if from == to {
            return Ok(());
        }
        let credited = self
            .balance(to)
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        self.balances.insert(*from, debited);
        self.balances.insert(*to, credited);
        Ok(())
    }
}

/// In-memory token ledger
///
/// Stands in for the token contract in tests and local deployments.
#[derive(Debug)]
pub struct MemoryToken {
    address: Address,
    ledger: Mutex<Ledger>,
}

impl MemoryToken {
    /// Empty ledger for the token at `address`
    pub fn new(address: Address) -> Self {
        Self {
            address,
            ledger: Mutex::new(Ledger::default()),
        }
    }

    /// Create `amount` new tokens for `to`
    pub fn mint(&self, to: &Address, amount: u128) -> Result<(), TokenError> {
        let mut ledger = self.ledger();
        let credited = ledger
            .balance(to)
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        ledger.balances.insert(*to, credited);
        Ok(())
    }

    // The ledger is updated with plain map writes after all checks, so a
    // poisoned lock still guards consistent data.
    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Token for MemoryToken {
    fn address(&self) -> Address {
        self.address
    }

    fn balance_of(&self, account: &Address) -> u128 {
        self.ledger().balance(account)
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> u128 {
        self.ledger()
            .allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or(0)
    }

    fn approve(&self, owner: &Address, spender: &Address, amount: u128) {
        self.ledger().allowances.insert((*owner, *spender), amount);
    }

    fn transfer(&self, from: &Address, to: &Address, amount: u128) -> Result<(), TokenError> {
        self.ledger().move_funds(from, to, amount)
    }

    fn transfer_from(
        &self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        let mut ledger = self.ledger();
        let key = (*from, *spender);
        let available = ledger.allowances.get(&key).copied().unwrap_or(0);
        let remaining = available
            .checked_sub(amount)
            .ok_or(TokenError::InsufficientAllowance {
                available,
                required: amount,
            })?;
        ledger.move_funds(from, to, amount)?;
        ledger.allowances.insert(key, remaining);
        Ok(())
    }
}
