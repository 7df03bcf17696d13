//! Global administrative settings.
//!
//! A validated key-value store for the network-wide knobs: the base-token
//! whitelist, per-token funding limits, the minimum network-token
//! liquidity below which trading cannot run, the reference-rate deviation
//! bound, and the withdrawal and flash-loan fees. Every setter is
//! admin-gated, validates its domain, and records an update entry with
//! the old and new value.

use std::collections::{BTreeMap, BTreeSet};

use alloy_primitives::U256;

use crate::access::{AccessControl, Role};
use crate::domain::{Address, PpmRate, Token};
use crate::error::{NetworkError, Result};

/// Audit record appended by every accepted setter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingUpdate {
    /// A token entered (`added == true`) or left the whitelist.
    WhitelistUpdated { token: Token, added: bool },
    /// A token's funding limit changed.
    FundingLimitUpdated { token: Token, old: U256, new: U256 },
    /// The minimum network-token liquidity for trading changed.
    MinLiquidityUpdated { old: U256, new: U256 },
    /// The withdrawal fee changed.
    WithdrawalFeeUpdated { old: PpmRate, new: PpmRate },
    /// The flash-loan fee changed.
    FlashLoanFeeUpdated { old: PpmRate, new: PpmRate },
    /// The average-rate deviation bound changed.
    RateDeviationUpdated { old: PpmRate, new: PpmRate },
}

/// The global settings store.
#[derive(Debug, Clone)]
pub struct NetworkSettings {
    access: AccessControl,
    whitelist: BTreeSet<Token>,
    funding_limits: BTreeMap<Token, U256>,
    min_liquidity_for_trading: U256,
    average_rate_max_deviation: PpmRate,
    withdrawal_fee: PpmRate,
    flash_loan_fee: PpmRate,
    updates: Vec<SettingUpdate>,
}

impl NetworkSettings {
    /// Creates the store with `admin` holding the admin role and every
    /// knob at its zero default.
    #[must_use]
    pub fn new(admin: Address) -> Self {
        Self {
            access: AccessControl::new(admin),
            whitelist: BTreeSet::new(),
            funding_limits: BTreeMap::new(),
            min_liquidity_for_trading: U256::ZERO,
            average_rate_max_deviation: PpmRate::ZERO,
            withdrawal_fee: PpmRate::ZERO,
            flash_loan_fee: PpmRate::ZERO,
            updates: Vec::new(),
        }
    }

    // -- whitelist -----------------------------------------------------------

    /// Returns `true` if `token` may back a pool.
    #[must_use]
    pub fn is_token_whitelisted(&self, token: Token) -> bool {
        self.whitelist.contains(&token)
    }

    /// Adds `token` to the whitelist.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::AccessDenied`] if `caller` is not an admin.
    /// - [`NetworkError::AlreadyExists`] if the token is already listed.
    pub fn add_token_to_whitelist(&mut self, caller: Address, token: Token) -> Result<()> {
        self.access.require(Role::Admin, caller)?;
        if !self.whitelist.insert(token) {
            return Err(NetworkError::AlreadyExists);
        }
        self.updates
            .push(SettingUpdate::WhitelistUpdated { token, added: true });
        Ok(())
    }

    /// Removes `token` from the whitelist. The funding limit, if any,
    /// stays recorded.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::AccessDenied`] if `caller` is not an admin.
    /// - [`NetworkError::DoesNotExist`] if the token is not listed.
    pub fn remove_token_from_whitelist(&mut self, caller: Address, token: Token) -> Result<()> {
        self.access.require(Role::Admin, caller)?;
        if !self.whitelist.remove(&token) {
            return Err(NetworkError::DoesNotExist);
        }
        self.updates
            .push(SettingUpdate::WhitelistUpdated { token, added: false });
        Ok(())
    }

    // -- funding limits --------------------------------------------------------

    /// Returns the maximum network token ever mintable into `token`'s
    /// pool. Unset tokens have a zero limit.
    #[must_use]
    pub fn funding_limit(&self, token: Token) -> U256 {
        self.funding_limits.get(&token).copied().unwrap_or(U256::ZERO)
    }

    /// Sets `token`'s funding limit.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::AccessDenied`] if `caller` is not an admin.
    /// - [`NetworkError::NotWhitelisted`] if the token is not listed.
    pub fn set_funding_limit(&mut self, caller: Address, token: Token, limit: U256) -> Result<()> {
        self.access.require(Role::Admin, caller)?;
        if !self.is_token_whitelisted(token) {
            return Err(NetworkError::NotWhitelisted);
        }
        let old = self.funding_limit(token);
        self.funding_limits.insert(token, limit);
        self.updates.push(SettingUpdate::FundingLimitUpdated {
            token,
            old,
            new: limit,
        });
        Ok(())
    }

    /// Legacy name for [`funding_limit`](Self::funding_limit): both
    /// options observe the same per-token limit.
    #[must_use]
    pub fn pool_minting_limit(&self, token: Token) -> U256 {
        self.funding_limit(token)
    }

    /// Legacy name for [`set_funding_limit`](Self::set_funding_limit).
    ///
    /// # Errors
    ///
    /// Same as [`set_funding_limit`](Self::set_funding_limit).
    pub fn set_pool_minting_limit(
        &mut self,
        caller: Address,
        token: Token,
        limit: U256,
    ) -> Result<()> {
        self.set_funding_limit(caller, token, limit)
    }

    // -- scalar knobs ----------------------------------------------------------

    /// Returns the network-token liquidity floor for trading.
    #[must_use]
    pub fn min_liquidity_for_trading(&self) -> U256 {
        self.min_liquidity_for_trading
    }

    /// Sets the network-token liquidity floor for trading.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::AccessDenied`] if `caller` is not an admin.
    pub fn set_min_liquidity_for_trading(&mut self, caller: Address, amount: U256) -> Result<()> {
        self.access.require(Role::Admin, caller)?;
        let old = self.min_liquidity_for_trading;
        self.min_liquidity_for_trading = amount;
        self.updates
            .push(SettingUpdate::MinLiquidityUpdated { old, new: amount });
        Ok(())
    }

    /// Returns the maximum allowed |spot − average| / average deviation.
    #[must_use]
    pub fn average_rate_max_deviation(&self) -> PpmRate {
        self.average_rate_max_deviation
    }

    /// Sets the deviation bound. The [`PpmRate`] type already enforces
    /// the ≤ 100% domain.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::AccessDenied`] if `caller` is not an admin.
    pub fn set_average_rate_max_deviation(
        &mut self,
        caller: Address,
        deviation: PpmRate,
    ) -> Result<()> {
        self.access.require(Role::Admin, caller)?;
        let old = self.average_rate_max_deviation;
        self.average_rate_max_deviation = deviation;
        self.updates
            .push(SettingUpdate::RateDeviationUpdated { old, new: deviation });
        Ok(())
    }

    /// Returns the fee charged on every withdrawal.
    #[must_use]
    pub fn withdrawal_fee(&self) -> PpmRate {
        self.withdrawal_fee
    }

    /// Sets the withdrawal fee.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::AccessDenied`] if `caller` is not an admin.
    pub fn set_withdrawal_fee(&mut self, caller: Address, fee: PpmRate) -> Result<()> {
        self.access.require(Role::Admin, caller)?;
        let old = self.withdrawal_fee;
        self.withdrawal_fee = fee;
        self.updates
            .push(SettingUpdate::WithdrawalFeeUpdated { old, new: fee });
        Ok(())
    }

    /// Returns the fee charged on every flash loan.
    #[must_use]
    pub fn flash_loan_fee(&self) -> PpmRate {
        self.flash_loan_fee
    }

    /// Sets the flash-loan fee.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::AccessDenied`] if `caller` is not an admin.
    pub fn set_flash_loan_fee(&mut self, caller: Address, fee: PpmRate) -> Result<()> {
        self.access.require(Role::Admin, caller)?;
        let old = self.flash_loan_fee;
        self.flash_loan_fee = fee;
        self.updates
            .push(SettingUpdate::FlashLoanFeeUpdated { old, new: fee });
        Ok(())
    }

    /// Returns the audit trail of accepted updates, oldest first.
    #[must_use]
    pub fn updates(&self) -> &[SettingUpdate] {
        &self.updates
    }
}
