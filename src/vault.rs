//! Typed asset custodians.
//!
//! All three vault variants — the master vault backing trading, the
//! external protection reserve, and the governance-level network-token
//! vault — share one contract: anyone may deposit, only an asset manager
//! may withdraw, and a paused vault rejects withdrawals while still
//! accepting deposits. A vault's identity on the ledger is its address;
//! its funds are ordinary ledger balances under that address.

use alloy_primitives::U256;

use crate::access::{AccessControl, Role};
use crate::domain::{Address, Token};
use crate::error::{NetworkError, Result};
use crate::ledger::TokenLedger;

/// A pausable, role-gated token custodian.
#[derive(Debug, Clone)]
pub struct Vault {
    address: Address,
    access: AccessControl,
    paused: bool,
}

impl Vault {
    /// Creates a vault identified by `address`, with `admin` holding the
    /// admin role.
    #[must_use]
    pub fn new(address: Address, admin: Address) -> Self {
        Self {
            address,
            access: AccessControl::new(admin),
            paused: false,
        }
    }

    /// Returns the vault's ledger address.
    #[must_use]
    pub const fn address(&self) -> Address {
        self.address
    }

    /// Returns `true` while withdrawals are suspended.
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    /// Returns the vault's balance of `token`.
    #[must_use]
    pub fn balance(&self, ledger: &TokenLedger, token: Token) -> U256 {
        ledger.balance_of(token, self.address)
    }

    /// Moves `amount` of `token` from `from` into the vault.
    ///
    /// Deposits are permitted even while paused. For the native token the
    /// host chain carries the value with the call; on the ledger both
    /// cases are the same balance move.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::InsufficientBalance`] if `from` holds less
    /// than `amount`.
    pub fn deposit(
        &self,
        ledger: &mut TokenLedger,
        token: Token,
        from: Address,
        amount: U256,
    ) -> Result<()> {
        ledger.transfer(token, from, self.address, amount)
    }

    /// Moves `amount` of `token` from the vault to `recipient`.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::Paused`] while the vault is paused.
    /// - [`NetworkError::AccessDenied`] unless `caller` holds
    ///   [`Role::AssetManager`].
    /// - [`NetworkError::InsufficientBalance`] if the vault holds less
    ///   than `amount`.
    pub fn withdraw(
        &self,
        caller: Address,
        ledger: &mut TokenLedger,
        token: Token,
        recipient: Address,
        amount: U256,
    ) -> Result<()> {
        if self.paused {
            return Err(NetworkError::Paused);
        }
        self.access.require(Role::AssetManager, caller)?;
        ledger.transfer(token, self.address, recipient, amount)
    }

    /// Suspends withdrawals.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::AccessDenied`] unless `caller` is an admin.
    pub fn pause(&mut self, caller: Address) -> Result<()> {
        self.access.require(Role::Admin, caller)?;
        self.paused = true;
        Ok(())
    }

    /// Resumes withdrawals.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::AccessDenied`] unless `caller` is an admin.
    pub fn unpause(&mut self, caller: Address) -> Result<()> {
        self.access.require(Role::Admin, caller)?;
        self.paused = false;
        Ok(())
    }

    /// Grants a role on this vault.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::AccessDenied`] unless `caller` is an admin.
    pub fn grant_role(&mut self, caller: Address, role: Role, account: Address) -> Result<()> {
        self.access.grant(caller, role, account)
    }
}
