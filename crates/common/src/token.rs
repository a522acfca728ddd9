//! # Token Collaborator
//!
//! The staking ledger never owns token balances. It pulls stake in, pushes
//! withdrawals out and pays rewards from the reward vault through the
//! [`TokenLedger`] trait. Any fungible-balance backend can sit behind it.
//!
//! ## Contract
//!
//! | Method | Semantics |
//! |--------|-----------|
//! | `transfer(from, to, amount)` | move `amount` owned by `from`; `from` is the caller |
//! | `transfer_from(spender, from, to, amount)` | pull with a prior `approve(from, spender)` |
//! | `balance_of(who)` | current balance, 0 for unknown accounts |
//!
//! A rejected transfer returns [`TokenError`] and must leave balances and
//! allowances untouched.
//!
//! [`InMemoryToken`] is the reference backend used by tests and by the
//! replay CLI. An allowance of `u128::MAX` is treated as unlimited and is
//! never decremented.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::types::Address;

// ════════════════════════════════════════════════════════════════════════════
// ERRORS
// ════════════════════════════════════════════════════════════════════════════

/// Rejection reported by the token collaborator.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenError {
    #[error("insufficient balance for {account}: have {available}, need {required}")]
    InsufficientBalance {
        account: Address,
        available: u128,
        required: u128,
    },
    #[error("insufficient allowance from {owner} to {spender}: have {available}, need {required}")]
    InsufficientAllowance {
        owner: Address,
        spender: Address,
        available: u128,
        required: u128,
    },
    #[error("balance overflow for {0}")]
    Overflow(Address),
}

// ════════════════════════════════════════════════════════════════════════════
// TRAIT
// ════════════════════════════════════════════════════════════════════════════

/// Fungible-balance ledger consumed by the staking core.
pub trait TokenLedger {
    /// Move `amount` from `from` (the caller) to `to`.
    fn transfer(&mut self, from: &Address, to: &Address, amount: u128) -> Result<(), TokenError>;

    /// Move `amount` from `from` to `to` on behalf of `spender`, consuming
    /// allowance previously granted by `from`.
    fn transfer_from(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<(), TokenError>;

    fn balance_of(&self, who: &Address) -> u128;
}

// ════════════════════════════════════════════════════════════════════════════
// IN-MEMORY BACKEND
// ════════════════════════════════════════════════════════════════════════════

/// Fully in-memory token ledger. Deterministic, no I/O.
#[derive(Debug, Clone, Default)]
pub struct InMemoryToken {
    balances: HashMap<Address, u128>,
    /// (owner, spender) -> allowance
    allowances: HashMap<(Address, Address), u128>,
}

impl InMemoryToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `amount` to `to` out of thin air (test and replay setup only).
    pub fn mint(&mut self, to: &Address, amount: u128) -> Result<(), TokenError> {
        let bal = self.balances.entry(*to).or_insert(0);
        *bal = bal.checked_add(amount).ok_or(TokenError::Overflow(*to))?;
        Ok(())
    }

    /// Grant `spender` the right to pull up to `amount` from `owner`.
    /// `u128::MAX` means unlimited.
    pub fn approve(&mut self, owner: &Address, spender: &Address, amount: u128) {
        self.allowances.insert((*owner, *spender), amount);
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> u128 {
        self.allowances.get(&(*owner, *spender)).copied().unwrap_or(0)
    }

    fn check_balance(&self, from: &Address, amount: u128) -> Result<(), TokenError> {
        let available = self.balance_of(from);
        if available < amount {
            return Err(TokenError::InsufficientBalance {
                account: *from,
                available,
                required: amount,
            });
        }
        Ok(())
    }

    fn move_balance(&mut self, from: &Address, to: &Address, amount: u128) -> Result<(), TokenError> {
        self.check_balance(from, amount)?;
        if from == to {
            return Ok(());
        }
        let to_balance = self.balance_of(to);
        let new_to = to_balance.checked_add(amount).ok_or(TokenError::Overflow(*to))?;

        let from_balance = self.balance_of(from);
        self.balances.insert(*from, from_balance - amount);
        self.balances.insert(*to, new_to);
        Ok(())
    }
}

impl TokenLedger for InMemoryToken {
    fn transfer(&mut self, from: &Address, to: &Address, amount: u128) -> Result<(), TokenError> {
        self.move_balance(from, to, amount)?;
        debug!(%from, %to, amount, "token transfer");
        Ok(())
    }

    fn transfer_from(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        let allowance = self.allowance(from, spender);
        if allowance < amount {
            return Err(TokenError::InsufficientAllowance {
                owner: *from,
                spender: *spender,
                available: allowance,
                required: amount,
            });
        }
        self.move_balance(from, to, amount)?;
        if allowance != u128::MAX {
            self.allowances.insert((*from, *spender), allowance - amount);
        }
        debug!(%spender, %from, %to, amount, "token transfer_from");
        Ok(())
    }

    fn balance_of(&self, who: &Address) -> u128 {
        self.balances.get(who).copied().unwrap_or(0)
    }
}
