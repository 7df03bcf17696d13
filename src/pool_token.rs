//! Pool-share token registry.
//!
//! Every pool — each base-token pool and the network-token master pool —
//! issues exactly one share token. Shares are minted and burned only by
//! the owning component; holders move them freely, which is how the
//! pending-withdrawals component takes custody of them. The ratio of a
//! pool token's total supply to its pool's staked balance is the
//! provider's unit of account.

use std::collections::BTreeMap;

use alloy_primitives::U256;

use crate::domain::{Address, Token};
use crate::error::{NetworkError, Result};

/// Identifier of one pool-share token inside the registry.
///
/// Identity is stable across pool migrations: moving a pool to a newer
/// collection re-points the owner, never the id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PoolTokenId(u32);

impl PoolTokenId {
    /// Returns the raw id.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl core::fmt::Display for PoolTokenId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "pool-token#{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct PoolTokenState {
    reserve_token: Token,
    owner: Address,
    supply: U256,
    balances: BTreeMap<Address, U256>,
}

/// Registry of all pool-share tokens.
#[derive(Debug, Clone, Default)]
pub struct PoolTokenRegistry {
    tokens: BTreeMap<PoolTokenId, PoolTokenState>,
    next_id: u32,
}

impl PoolTokenRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fresh share token for `reserve_token`, owned by `owner`.
    pub fn create(&mut self, owner: Address, reserve_token: Token) -> PoolTokenId {
        let id = PoolTokenId(self.next_id);
        self.next_id += 1;
        self.tokens.insert(
            id,
            PoolTokenState {
                reserve_token,
                owner,
                supply: U256::ZERO,
                balances: BTreeMap::new(),
            },
        );
        id
    }

    fn state(&self, id: PoolTokenId) -> Result<&PoolTokenState> {
        self.tokens.get(&id).ok_or(NetworkError::DoesNotExist)
    }

    fn state_mut(&mut self, id: PoolTokenId) -> Result<&mut PoolTokenState> {
        self.tokens.get_mut(&id).ok_or(NetworkError::DoesNotExist)
    }

    /// Returns the reserve token this share token redeems into.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::DoesNotExist`] for an unknown id.
    pub fn reserve_token(&self, id: PoolTokenId) -> Result<Token> {
        Ok(self.state(id)?.reserve_token)
    }

    /// Returns the component currently allowed to mint and burn.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::DoesNotExist`] for an unknown id.
    pub fn owner(&self, id: PoolTokenId) -> Result<Address> {
        Ok(self.state(id)?.owner)
    }

    /// Returns the outstanding share supply.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::DoesNotExist`] for an unknown id.
    pub fn total_supply(&self, id: PoolTokenId) -> Result<U256> {
        Ok(self.state(id)?.supply)
    }

    /// Returns `account`'s share balance; zero for unknown ids.
    #[must_use]
    pub fn balance_of(&self, id: PoolTokenId, account: Address) -> U256 {
        self.tokens
            .get(&id)
            .and_then(|s| s.balances.get(&account))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    /// Mints `amount` shares to `to`. Only the owner may mint.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::DoesNotExist`] for an unknown id.
    /// - [`NetworkError::AccessDenied`] if `caller` is not the owner.
    /// - [`NetworkError::Overflow`] if the supply would exceed 256 bits.
    pub fn mint(
        &mut self,
        caller: Address,
        id: PoolTokenId,
        to: Address,
        amount: U256,
    ) -> Result<()> {
        let state = self.state_mut(id)?;
        if state.owner != caller {
            return Err(NetworkError::AccessDenied);
        }
        state.supply = state
            .supply
            .checked_add(amount)
            .ok_or(NetworkError::Overflow("pool token supply"))?;
        let balance = state.balances.entry(to).or_insert(U256::ZERO);
        *balance += amount;
        Ok(())
    }

    /// Burns `amount` shares from `from`. Only the owner may burn.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::DoesNotExist`] for an unknown id.
    /// - [`NetworkError::AccessDenied`] if `caller` is not the owner.
    /// - [`NetworkError::InsufficientBalance`] if `from` holds less than
    ///   `amount`.
    pub fn burn(
        &mut self,
        caller: Address,
        id: PoolTokenId,
        from: Address,
        amount: U256,
    ) -> Result<()> {
        let state = self.state_mut(id)?;
        if state.owner != caller {
            return Err(NetworkError::AccessDenied);
        }
        let balance = state.balances.get(&from).copied().unwrap_or(U256::ZERO);
        if balance < amount {
            return Err(NetworkError::InsufficientBalance);
        }
        state.balances.insert(from, balance - amount);
        state.supply -= amount;
        Ok(())
    }

    /// Moves `amount` shares between holders.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::DoesNotExist`] for an unknown id.
    /// - [`NetworkError::InsufficientBalance`] if `from` holds less than
    ///   `amount`.
    pub fn transfer(
        &mut self,
        id: PoolTokenId,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<()> {
        let state = self.state_mut(id)?;
        let from_balance = state.balances.get(&from).copied().unwrap_or(U256::ZERO);
        if from_balance < amount {
            return Err(NetworkError::InsufficientBalance);
        }
        if from == to || amount.is_zero() {
            return Ok(());
        }
        state.balances.insert(from, from_balance - amount);
        let to_balance = state.balances.get(&to).copied().unwrap_or(U256::ZERO);
        state.balances.insert(to, to_balance + amount);
        Ok(())
    }

    /// Re-points mint/burn authority, as part of a pool migration.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::DoesNotExist`] for an unknown id.
    /// - [`NetworkError::AccessDenied`] if `caller` is not the current
    ///   owner.
    pub fn transfer_ownership(
        &mut self,
        caller: Address,
        id: PoolTokenId,
        new_owner: Address,
    ) -> Result<()> {
        let state = self.state_mut(id)?;
        if state.owner != caller {
            return Err(NetworkError::AccessDenied);
        }
        state.owner = new_owner;
        Ok(())
    }
}
