//! In-memory token balance book.
//!
//! The host chain's token contracts are a boundary collaborator; the core
//! only consumes `transfer` / `transfer_from` / `balance_of` semantics.
//! [`TokenLedger`] models exactly that surface: one balance book covering
//! every token the network touches, including the native pseudo-token and
//! the network token itself. Mint and burn authority is enforced by the
//! components that call them, not by the ledger.
//!
//! The ledger is `Clone`; the flash-loan path snapshots it wholesale and
//! restores the snapshot on failure, which is what makes that operation
//! all-or-nothing.

use std::collections::BTreeMap;

use alloy_primitives::U256;

use crate::domain::{Address, Token};
use crate::error::{NetworkError, Result};

/// Balance book for all tokens known to the network.
#[derive(Debug, Clone, Default)]
pub struct TokenLedger {
    balances: BTreeMap<(Token, Address), U256>,
    supplies: BTreeMap<Token, U256>,
}

impl TokenLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `account`'s balance of `token`.
    #[must_use]
    pub fn balance_of(&self, token: Token, account: Address) -> U256 {
        self.balances
            .get(&(token, account))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    /// Returns the total minted supply of `token`.
    #[must_use]
    pub fn total_supply(&self, token: Token) -> U256 {
        self.supplies.get(&token).copied().unwrap_or(U256::ZERO)
    }

    /// Moves `amount` of `token` from `from` to `to`.
    ///
    /// A zero amount is a no-op. Self-transfers are allowed.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::InsufficientBalance`] if `from` holds less
    /// than `amount`.
    pub fn transfer(&mut self, token: Token, from: Address, to: Address, amount: U256) -> Result<()> {
        if amount.is_zero() || from == to {
            if self.balance_of(token, from) < amount {
                return Err(NetworkError::InsufficientBalance);
            }
            return Ok(());
        }
        let from_balance = self.balance_of(token, from);
        if from_balance < amount {
            return Err(NetworkError::InsufficientBalance);
        }
        self.balances.insert((token, from), from_balance - amount);
        let to_balance = self.balance_of(token, to);
        self.balances.insert((token, to), to_balance + amount);
        Ok(())
    }

    /// Mints `amount` of `token` to `account`.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::Overflow`] if the total supply would
    /// exceed 256 bits.
    pub fn mint(&mut self, token: Token, account: Address, amount: U256) -> Result<()> {
        let supply = self.total_supply(token);
        let new_supply = supply
            .checked_add(amount)
            .ok_or(NetworkError::Overflow("token supply"))?;
        self.supplies.insert(token, new_supply);
        let balance = self.balance_of(token, account);
        self.balances.insert((token, account), balance + amount);
        Ok(())
    }

    /// Burns `amount` of `token` from `account`.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::InsufficientBalance`] if `account` holds
    /// less than `amount`.
    pub fn burn(&mut self, token: Token, account: Address, amount: U256) -> Result<()> {
        let balance = self.balance_of(token, account);
        if balance < amount {
            return Err(NetworkError::InsufficientBalance);
        }
        self.balances.insert((token, account), balance - amount);
        let supply = self.total_supply(token);
        self.supplies.insert(token, supply - amount);
        Ok(())
    }
}
