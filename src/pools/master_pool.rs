//! The network-token-side accountant.
//!
//! Where every base token gets its own pool in a collection, the network
//! token has exactly one pool, owned here. The master pool mints NT into
//! base pools' trading liquidity against per-pool funding limits, takes
//! NT trading fees into its staked balance, and serves NT deposits and
//! withdrawals symmetrically to the base-token flow — with a governance
//! token minted 1:1 alongside the NT pool token as the voting wrapper.
//!
//! Funding mints protocol-held pool tokens so that the share rate is
//! unaffected by funding; renouncing burns them back pro rata.

use std::collections::BTreeMap;

use alloy_primitives::U256;

use crate::access::{AccessControl, Role};
use crate::domain::{Address, PpmRate, Rounding, Token};
use crate::error::{NetworkError, Result};
use crate::ledger::TokenLedger;
use crate::math::mul_div_floor;
use crate::pool_token::{PoolTokenId, PoolTokenRegistry};
use crate::settings::NetworkSettings;

/// NT-side pool state and funding ledger.
#[derive(Debug, Clone)]
pub struct MasterPool {
    address: Address,
    access: AccessControl,
    nt_token: Token,
    gov_token: Token,
    pool_token: PoolTokenId,
    nt_staked_balance: U256,
    minted_per_pool: BTreeMap<Token, U256>,
}

impl MasterPool {
    /// Creates the master pool. `pool_token` must be owned by `address`
    /// in the registry.
    #[must_use]
    pub fn new(
        address: Address,
        admin: Address,
        nt_token: Token,
        gov_token: Token,
        pool_token: PoolTokenId,
    ) -> Self {
        Self {
            address,
            access: AccessControl::new(admin),
            nt_token,
            gov_token,
            pool_token,
            nt_staked_balance: U256::ZERO,
            minted_per_pool: BTreeMap::new(),
        }
    }

    /// The master pool's component address.
    #[must_use]
    pub const fn address(&self) -> Address {
        self.address
    }

    /// The network token.
    #[must_use]
    pub const fn nt_token(&self) -> Token {
        self.nt_token
    }

    /// The governance (voting wrapper) token.
    #[must_use]
    pub const fn gov_token(&self) -> Token {
        self.gov_token
    }

    /// The NT pool-share token.
    #[must_use]
    pub const fn pool_token(&self) -> PoolTokenId {
        self.pool_token
    }

    /// NT owed to NT liquidity providers plus funding, fees included.
    #[must_use]
    pub const fn nt_staked_balance(&self) -> U256 {
        self.nt_staked_balance
    }

    /// NT minted so far into `token`'s trading liquidity.
    #[must_use]
    pub fn minted_for(&self, token: Token) -> U256 {
        self.minted_per_pool.get(&token).copied().unwrap_or(U256::ZERO)
    }

    /// Funding still available to `token` under its limit.
    #[must_use]
    pub fn available_funding(&self, settings: &NetworkSettings, token: Token) -> U256 {
        settings
            .funding_limit(token)
            .saturating_sub(self.minted_for(token))
    }

    /// Grants a role on the master pool.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::AccessDenied`] unless `caller` is an admin.
    pub fn grant_role(&mut self, caller: Address, role: Role, account: Address) -> Result<()> {
        self.access.grant(caller, role, account)
    }

    // -- funding ---------------------------------------------------------------

    /// Mints `amount` NT into the master vault for `token`'s trading
    /// liquidity and records it against the funding limit.
    ///
    /// Protocol-held pool tokens are minted at the current share rate so
    /// existing NT providers are not diluted or enriched by funding.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::AccessDenied`] unless `caller` holds
    ///   [`Role::NetworkTokenManager`].
    /// - [`NetworkError::NetworkLiquidityDisabled`] if `amount` exceeds
    ///   the remaining funding headroom.
    #[allow(clippy::too_many_arguments)]
    pub fn request_liquidity(
        &mut self,
        caller: Address,
        settings: &NetworkSettings,
        registry: &mut PoolTokenRegistry,
        ledger: &mut TokenLedger,
        vault_address: Address,
        token: Token,
        amount: U256,
    ) -> Result<()> {
        self.access.require(Role::NetworkTokenManager, caller)?;
        if amount.is_zero() {
            return Err(NetworkError::ZeroValue);
        }
        if amount > self.available_funding(settings, token) {
            return Err(NetworkError::NetworkLiquidityDisabled);
        }

        let supply = registry.total_supply(self.pool_token)?;
        let shares = if supply.is_zero() || self.nt_staked_balance.is_zero() {
            amount
        } else {
            mul_div_floor(amount, supply, self.nt_staked_balance)?
        };

        ledger.mint(self.nt_token, vault_address, amount)?;
        registry.mint(self.address, self.pool_token, self.address, shares)?;
        self.nt_staked_balance = self
            .nt_staked_balance
            .checked_add(amount)
            .ok_or(NetworkError::Overflow("nt staked balance"))?;
        let minted = self.minted_per_pool.entry(token).or_insert(U256::ZERO);
        *minted += amount;
        Ok(())
    }

    /// Burns `amount` NT out of the master vault and releases `token`'s
    /// funding, burning the matching protocol-held pool tokens.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::AccessDenied`] unless `caller` holds
    ///   [`Role::NetworkTokenManager`].
    /// - [`NetworkError::InsufficientBalance`] if the vault holds less NT
    ///   than `amount`.
    pub fn renounce_liquidity(
        &mut self,
        caller: Address,
        registry: &mut PoolTokenRegistry,
        ledger: &mut TokenLedger,
        vault_address: Address,
        token: Token,
        amount: U256,
    ) -> Result<()> {
        self.access.require(Role::NetworkTokenManager, caller)?;
        if amount.is_zero() {
            return Ok(());
        }

        let supply = registry.total_supply(self.pool_token)?;
        let shares = if self.nt_staked_balance.is_zero() {
            U256::ZERO
        } else {
            mul_div_floor(amount, supply, self.nt_staked_balance)?
                .min(registry.balance_of(self.pool_token, self.address))
        };

        ledger.burn(self.nt_token, vault_address, amount)?;
        if !shares.is_zero() {
            registry.burn(self.address, self.pool_token, self.address, shares)?;
        }
        self.nt_staked_balance = self.nt_staked_balance.saturating_sub(amount);
        let minted = self.minted_for(token).saturating_sub(amount);
        if minted.is_zero() {
            self.minted_per_pool.remove(&token);
        } else {
            self.minted_per_pool.insert(token, minted);
        }
        Ok(())
    }

    /// Credits an NT-denominated trading or flash-loan fee to the staked
    /// balance.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::AccessDenied`] unless `caller` holds
    ///   [`Role::NetworkTokenManager`].
    /// - [`NetworkError::Overflow`] on staked-balance overflow.
    pub fn collect_fee(&mut self, caller: Address, amount: U256) -> Result<()> {
        self.access.require(Role::NetworkTokenManager, caller)?;
        self.nt_staked_balance = self
            .nt_staked_balance
            .checked_add(amount)
            .ok_or(NetworkError::Overflow("nt staked balance"))?;
        Ok(())
    }

    /// Mints NT straight to `recipient`, outside the staked balance.
    ///
    /// This is the impermanent-loss compensation path: the minted NT is
    /// protocol-issued, not drawn from NT providers.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::AccessDenied`] unless `caller` holds
    ///   [`Role::NetworkTokenManager`].
    /// - [`NetworkError::Overflow`] on supply overflow.
    pub fn mint_nt_to(
        &mut self,
        caller: Address,
        ledger: &mut TokenLedger,
        recipient: Address,
        amount: U256,
    ) -> Result<()> {
        self.access.require(Role::NetworkTokenManager, caller)?;
        ledger.mint(self.nt_token, recipient, amount)
    }

    // -- provider flow ----------------------------------------------------------

    /// Deposits `amount` NT for `provider`: burns the NT, mints pool
    /// tokens at the current share rate and the governance token 1:1
    /// with them.
    ///
    /// Returns the pool-token amount minted.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::AccessDenied`] unless `caller` holds
    ///   [`Role::NetworkTokenManager`].
    /// - [`NetworkError::ZeroValue`] for a zero amount.
    /// - [`NetworkError::InsufficientBalance`] if the provider holds less
    ///   NT than `amount`.
    pub fn deposit(
        &mut self,
        caller: Address,
        registry: &mut PoolTokenRegistry,
        ledger: &mut TokenLedger,
        provider: Address,
        amount: U256,
    ) -> Result<U256> {
        self.access.require(Role::NetworkTokenManager, caller)?;
        if amount.is_zero() {
            return Err(NetworkError::ZeroValue);
        }

        let supply = registry.total_supply(self.pool_token)?;
        let shares = if supply.is_zero() || self.nt_staked_balance.is_zero() {
            amount
        } else {
            mul_div_floor(amount, supply, self.nt_staked_balance)?
        };
        if shares.is_zero() {
            return Err(NetworkError::ZeroValue);
        }

        ledger.burn(self.nt_token, provider, amount)?;
        registry.mint(self.address, self.pool_token, provider, shares)?;
        ledger.mint(self.gov_token, provider, shares)?;
        self.nt_staked_balance = self
            .nt_staked_balance
            .checked_add(amount)
            .ok_or(NetworkError::Overflow("nt staked balance"))?;
        Ok(shares)
    }

    /// Withdraws against `pool_token_amount` shares held at `burn_from`
    /// (the pending-withdrawals custody): burns the shares, burns the
    /// matching governance tokens from the provider, and mints the NT
    /// payout net of the withdrawal fee.
    ///
    /// Returns the NT amount minted to the provider.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::AccessDenied`] unless `caller` holds
    ///   [`Role::NetworkTokenManager`].
    /// - [`NetworkError::ZeroValue`] for a zero amount.
    /// - [`NetworkError::InsufficientBalance`] if custody or the
    ///   provider's governance balance cannot cover the burn.
    #[allow(clippy::too_many_arguments)]
    pub fn withdraw(
        &mut self,
        caller: Address,
        registry: &mut PoolTokenRegistry,
        ledger: &mut TokenLedger,
        provider: Address,
        burn_from: Address,
        pool_token_amount: U256,
        withdrawal_fee: PpmRate,
    ) -> Result<U256> {
        self.access.require(Role::NetworkTokenManager, caller)?;
        if pool_token_amount.is_zero() {
            return Err(NetworkError::ZeroValue);
        }

        let supply = registry.total_supply(self.pool_token)?;
        if supply.is_zero() {
            return Err(NetworkError::DoesNotExist);
        }
        let owed = mul_div_floor(self.nt_staked_balance, pool_token_amount, supply)?;
        let payout = withdrawal_fee.apply_complement(owed, Rounding::Down)?;

        // All balance checks up front so a failure commits nothing.
        if registry.balance_of(self.pool_token, burn_from) < pool_token_amount
            || ledger.balance_of(self.gov_token, provider) < pool_token_amount
        {
            return Err(NetworkError::InsufficientBalance);
        }

        registry.burn(self.address, self.pool_token, burn_from, pool_token_amount)?;
        ledger.burn(self.gov_token, provider, pool_token_amount)?;
        ledger.mint(self.nt_token, provider, payout)?;
        self.nt_staked_balance -= owed;
        Ok(payout)
    }
}
