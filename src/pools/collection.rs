//! The per-curve pool engine.
//!
//! A collection owns every [`Pool`] record of its pool type and runs the
//! economic operations on them: deposits with network-token top-up,
//! solver-driven withdrawals, constant-product trades with reference-rate
//! protection, trading bootstrap and shutdown, and atomic migration of a
//! pool to a newer collection.
//!
//! The collection never touches base-token custody — the network moves
//! funds through the vaults — but it does drive network-token funding
//! through the master pool, which is why it holds the network-token
//! manager role there.

use std::collections::BTreeMap;

use alloy_primitives::U256;

use crate::access::{AccessControl, Role};
use crate::domain::{Address, Fraction, PpmRate, Token};
use crate::error::{NetworkError, Result};
use crate::ledger::TokenLedger;
use crate::math::{
    calculate_withdrawal, ema_step, mul_div_floor, target_amount_and_fee, within_deviation,
    TradeAmounts, WithdrawalAmounts,
};
use crate::pool_token::{PoolTokenId, PoolTokenRegistry};
use crate::settings::NetworkSettings;
use crate::vault::Vault;

use super::master_pool::MasterPool;
use super::pool::{AverageRate, Pool};

/// Direction of a single hop through one pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeKind {
    /// Base token in, network token out.
    BaseForNetworkToken,
    /// Network token in, base token out.
    NetworkTokenForBase,
}

/// Outcome of a deposit, for event emission and routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepositAmounts {
    /// The pool's share token.
    pub pool_token: PoolTokenId,
    /// Shares minted to the provider.
    pub pool_token_amount: U256,
    /// Post-deposit base trading liquidity.
    pub base_liquidity: u128,
    /// Post-deposit network-token trading liquidity.
    pub nt_liquidity: u128,
    /// Post-deposit staked balance.
    pub staked_balance: U256,
}

/// Outcome of one trade hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeResult {
    /// Net amount owed to the trader, in target-token units.
    pub amount_out: U256,
    /// Fee accrued to the target side's staked balance.
    pub fee: U256,
    /// Post-trade base trading liquidity.
    pub base_liquidity: u128,
    /// Post-trade network-token trading liquidity.
    pub nt_liquidity: u128,
}

/// A registry of pools sharing one curve implementation and version.
#[derive(Debug, Clone)]
pub struct PoolCollection {
    address: Address,
    pool_type: u16,
    version: u16,
    access: AccessControl,
    default_trading_fee: PpmRate,
    pools: BTreeMap<Token, Pool>,
}

impl PoolCollection {
    /// Creates an empty collection.
    #[must_use]
    pub fn new(address: Address, admin: Address, pool_type: u16, version: u16) -> Self {
        Self {
            address,
            pool_type,
            version,
            access: AccessControl::new(admin),
            default_trading_fee: PpmRate::ZERO,
            pools: BTreeMap::new(),
        }
    }

    /// The collection's component address.
    #[must_use]
    pub const fn address(&self) -> Address {
        self.address
    }

    /// The curve family this collection implements.
    #[must_use]
    pub const fn pool_type(&self) -> u16 {
        self.pool_type
    }

    /// Implementation version; migrations only move forward.
    #[must_use]
    pub const fn version(&self) -> u16 {
        self.version
    }

    /// Number of pools owned.
    #[must_use]
    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    /// Fee assigned to newly created pools.
    #[must_use]
    pub const fn default_trading_fee(&self) -> PpmRate {
        self.default_trading_fee
    }

    /// Returns `true` if a pool exists for `token`.
    #[must_use]
    pub fn has_pool(&self, token: Token) -> bool {
        self.pools.contains_key(&token)
    }

    /// Returns the pool for `token`.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::DoesNotExist`] if no pool is defined.
    pub fn pool(&self, token: Token) -> Result<&Pool> {
        self.pools.get(&token).ok_or(NetworkError::DoesNotExist)
    }

    /// Iterates the owned pools.
    pub fn pools(&self) -> impl Iterator<Item = &Pool> {
        self.pools.values()
    }

    /// Grants a role on this collection.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::AccessDenied`] unless `caller` is an admin.
    pub fn grant_role(&mut self, caller: Address, role: Role, account: Address) -> Result<()> {
        self.access.grant(caller, role, account)
    }

    // -- pool administration ---------------------------------------------------

    /// Creates the pool for `token` with a fresh share token.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::AccessDenied`] unless `caller` holds
    ///   [`Role::PoolCollectionManager`].
    /// - [`NetworkError::NotWhitelisted`] if the token is not listed.
    /// - [`NetworkError::AlreadyExists`] if the pool is already defined.
    pub fn create_pool(
        &mut self,
        caller: Address,
        settings: &NetworkSettings,
        registry: &mut PoolTokenRegistry,
        token: Token,
    ) -> Result<PoolTokenId> {
        self.access.require(Role::PoolCollectionManager, caller)?;
        if !settings.is_token_whitelisted(token) {
            return Err(NetworkError::NotWhitelisted);
        }
        if self.pools.contains_key(&token) {
            return Err(NetworkError::AlreadyExists);
        }
        let pool_token = registry.create(self.address, token);
        self.pools
            .insert(token, Pool::new(token, pool_token, self.default_trading_fee));
        Ok(pool_token)
    }

    /// Sets the fee applied to pools created from now on.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::AccessDenied`] unless `caller` is an admin.
    pub fn set_default_trading_fee(&mut self, caller: Address, fee: PpmRate) -> Result<()> {
        self.access.require(Role::Admin, caller)?;
        self.default_trading_fee = fee;
        Ok(())
    }

    /// Sets one pool's trading fee.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::AccessDenied`] unless `caller` is an admin.
    /// - [`NetworkError::DoesNotExist`] if no pool is defined.
    pub fn set_trading_fee(&mut self, caller: Address, token: Token, fee: PpmRate) -> Result<()> {
        self.access.require(Role::Admin, caller)?;
        let pool = self.pool_mut(token)?;
        pool.trading_fee = fee;
        Ok(())
    }

    /// Opens or closes deposits for one pool.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::AccessDenied`] unless `caller` is an admin.
    /// - [`NetworkError::DoesNotExist`] if no pool is defined.
    pub fn enable_depositing(&mut self, caller: Address, token: Token, enabled: bool) -> Result<()> {
        self.access.require(Role::Admin, caller)?;
        let pool = self.pool_mut(token)?;
        pool.depositing_enabled = enabled;
        Ok(())
    }

    /// Sets the ceiling on one pool's staked balance.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::AccessDenied`] unless `caller` is an admin.
    /// - [`NetworkError::DoesNotExist`] if no pool is defined.
    pub fn set_deposit_limit(&mut self, caller: Address, token: Token, limit: U256) -> Result<()> {
        self.access.require(Role::Admin, caller)?;
        let pool = self.pool_mut(token)?;
        pool.deposit_limit = limit;
        Ok(())
    }

    // -- deposit ---------------------------------------------------------------

    /// Deposits `amount` base token for `provider`.
    ///
    /// Mints shares proportional to the staked balance, then — when
    /// trading runs and the spot rate agrees with the reference rate —
    /// tops the network-token side up with freshly funded NT, preserving
    /// the spot rate and capped by the funding limit. A deviating rate
    /// skips the top-up and leaves trading enabled; the surplus stays in
    /// the staked balance only.
    ///
    /// The base tokens themselves are moved into the master vault by the
    /// network before this call.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::AccessDenied`] unless `caller` holds
    ///   [`Role::PoolCollectionManager`].
    /// - [`NetworkError::DoesNotExist`] if no pool is defined.
    /// - [`NetworkError::ZeroValue`] for a zero amount.
    /// - [`NetworkError::DepositingDisabled`] if deposits are off.
    /// - [`NetworkError::DepositLimitExceeded`] if `s + amount` passes
    ///   the limit.
    #[allow(clippy::too_many_arguments)]
    pub fn deposit(
        &mut self,
        caller: Address,
        settings: &NetworkSettings,
        registry: &mut PoolTokenRegistry,
        master_pool: &mut MasterPool,
        ledger: &mut TokenLedger,
        master_vault_address: Address,
        provider: Address,
        token: Token,
        amount: U256,
    ) -> Result<DepositAmounts> {
        self.access.require(Role::PoolCollectionManager, caller)?;
        let collection_address = self.address;
        let max_deviation = settings.average_rate_max_deviation();
        let pool = self
            .pools
            .get_mut(&token)
            .ok_or(NetworkError::DoesNotExist)?;

        if amount.is_zero() {
            return Err(NetworkError::ZeroValue);
        }
        if !pool.depositing_enabled {
            return Err(NetworkError::DepositingDisabled);
        }
        let new_staked = pool
            .staked_balance
            .checked_add(amount)
            .ok_or(NetworkError::Overflow("staked balance"))?;
        if new_staked > pool.deposit_limit {
            return Err(NetworkError::DepositLimitExceeded);
        }

        let supply = registry.total_supply(pool.pool_token)?;
        let pool_token_amount = if pool.staked_balance.is_zero() {
            amount
        } else {
            mul_div_floor(amount, supply, pool.staked_balance)?
        };

        pool.staked_balance = new_staked;
        registry.mint(collection_address, pool.pool_token, provider, pool_token_amount)?;

        // Top up the NT side at the current spot rate, unless the spot
        // rate has drifted outside the deviation bound.
        if pool.trading_enabled
            && within_deviation(pool.spot_rate(), pool.average_rate.rate, max_deviation)
        {
            let b = U256::from(pool.base_trading_liquidity);
            let n = U256::from(pool.nt_trading_liquidity);
            let target = mul_div_floor(amount, n, b)?;
            let delta_n = target.min(master_pool.available_funding(settings, token));
            if !delta_n.is_zero() {
                let delta_b = mul_div_floor(delta_n, b, n)?;
                if !delta_b.is_zero() {
                    master_pool.request_liquidity(
                        collection_address,
                        settings,
                        registry,
                        ledger,
                        master_vault_address,
                        token,
                        delta_n,
                    )?;
                    pool.base_trading_liquidity = to_u128(b + delta_b)?;
                    pool.nt_trading_liquidity = to_u128(n + delta_n)?;
                    pool.refresh_product();
                }
            }
        }

        Ok(DepositAmounts {
            pool_token: pool.pool_token,
            pool_token_amount,
            base_liquidity: pool.base_trading_liquidity,
            nt_liquidity: pool.nt_trading_liquidity,
            staked_balance: pool.staked_balance,
        })
    }

    // -- withdraw ---------------------------------------------------------------

    /// Redeems `pool_token_amount` shares held at `burn_from` (the
    /// pending-withdrawals custody) and rebalances the pool.
    ///
    /// Returns the payout breakdown; the network performs the vault
    /// transfers and the compensation mint. If the rebalance drags the
    /// network-token side under the trading floor, trading shuts down
    /// and the remaining funding is renounced.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::AccessDenied`] unless `caller` holds
    ///   [`Role::PoolCollectionManager`].
    /// - [`NetworkError::DoesNotExist`] if no pool is defined.
    /// - [`NetworkError::ZeroValue`] / [`NetworkError::InsufficientBalance`]
    ///   from the solver or the custody check.
    #[allow(clippy::too_many_arguments)]
    pub fn withdraw(
        &mut self,
        caller: Address,
        settings: &NetworkSettings,
        registry: &mut PoolTokenRegistry,
        master_pool: &mut MasterPool,
        ledger: &mut TokenLedger,
        master_vault: &Vault,
        external_vault: &Vault,
        token: Token,
        pool_token_amount: U256,
        burn_from: Address,
    ) -> Result<WithdrawalAmounts> {
        self.access.require(Role::PoolCollectionManager, caller)?;
        let collection_address = self.address;
        let min_liquidity = settings.min_liquidity_for_trading();
        let withdrawal_fee = settings.withdrawal_fee();

        let pool = self
            .pools
            .get_mut(&token)
            .ok_or(NetworkError::DoesNotExist)?;
        let supply = registry.total_supply(pool.pool_token)?;

        let amounts = calculate_withdrawal(
            pool.base_trading_liquidity,
            pool.nt_trading_liquidity,
            pool.staked_balance,
            supply,
            pool_token_amount,
            master_vault.balance(ledger, token),
            external_vault.balance(ledger, token),
            withdrawal_fee,
        )?;

        // Custody and vault checks up front so nothing commits on failure.
        if registry.balance_of(pool.pool_token, burn_from) < pool_token_amount {
            return Err(NetworkError::InsufficientBalance);
        }
        let nt_token = master_pool.nt_token();
        if ledger.balance_of(nt_token, master_vault.address()) < amounts.nt_to_renounce {
            return Err(NetworkError::InsufficientBalance);
        }

        registry.burn(collection_address, pool.pool_token, burn_from, pool_token_amount)?;
        if !amounts.nt_to_renounce.is_zero() {
            master_pool.renounce_liquidity(
                collection_address,
                registry,
                ledger,
                master_vault.address(),
                token,
                amounts.nt_to_renounce,
            )?;
        }

        pool.staked_balance = amounts.new_staked_balance;
        pool.base_trading_liquidity = amounts.new_base_liquidity;
        pool.nt_trading_liquidity = amounts.new_nt_liquidity;
        pool.refresh_product();

        // Auto-disable when the NT side falls under the trading floor.
        if pool.trading_enabled && U256::from(pool.nt_trading_liquidity) < min_liquidity {
            let residual = U256::from(pool.nt_trading_liquidity);
            if !residual.is_zero() {
                master_pool.renounce_liquidity(
                    collection_address,
                    registry,
                    ledger,
                    master_vault.address(),
                    token,
                    residual,
                )?;
            }
            pool.base_trading_liquidity = 0;
            pool.nt_trading_liquidity = 0;
            pool.trading_enabled = false;
            pool.average_rate = AverageRate::EMPTY;
            pool.refresh_product();
        }

        Ok(amounts)
    }

    // -- trade ------------------------------------------------------------------

    /// Executes one hop through `token`'s pool.
    ///
    /// The reference rate is smoothed once per distinct timestamp before
    /// pricing; the post-trade spot rate must stay within the deviation
    /// bound of the smoothed rate or the whole trade is rejected with
    /// `RateUnstable` and nothing commits.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::AccessDenied`] unless `caller` holds
    ///   [`Role::PoolCollectionManager`].
    /// - [`NetworkError::DoesNotExist`] if no pool is defined.
    /// - [`NetworkError::TradingDisabled`] if trading is off.
    /// - [`NetworkError::ZeroValue`] for a zero input.
    /// - [`NetworkError::ReturnAmountTooLow`] if the output misses
    ///   `min_out`.
    /// - [`NetworkError::RateUnstable`] on a deviation-bound breach.
    #[allow(clippy::too_many_arguments)]
    pub fn trade(
        &mut self,
        caller: Address,
        settings: &NetworkSettings,
        master_pool: &mut MasterPool,
        token: Token,
        kind: TradeKind,
        amount_in: U256,
        min_out: U256,
        now: u32,
    ) -> Result<TradeResult> {
        self.access.require(Role::PoolCollectionManager, caller)?;
        let collection_address = self.address;
        let max_deviation = settings.average_rate_max_deviation();

        let pool = self
            .pools
            .get_mut(&token)
            .ok_or(NetworkError::DoesNotExist)?;
        if !pool.trading_enabled {
            return Err(NetworkError::TradingDisabled);
        }
        if amount_in.is_zero() {
            return Err(NetworkError::ZeroValue);
        }

        let b = pool.base_trading_liquidity;
        let n = pool.nt_trading_liquidity;
        let (x, y) = match kind {
            TradeKind::BaseForNetworkToken => (b, n),
            TradeKind::NetworkTokenForBase => (n, b),
        };

        let amounts = target_amount_and_fee(U256::from(x), U256::from(y), amount_in, pool.trading_fee)?;
        if amounts.amount < min_out {
            return Err(NetworkError::ReturnAmountTooLow);
        }

        // Trial post-state: nothing below mutates until every guard has
        // passed.
        let new_x = to_u128(U256::from(x) + amount_in)?;
        let new_y = to_u128(U256::from(y) - amounts.gross())?;
        let (new_b, new_n) = match kind {
            TradeKind::BaseForNetworkToken => (new_x, new_y),
            TradeKind::NetworkTokenForBase => (new_y, new_x),
        };

        let mut average_rate = pool.average_rate;
        if average_rate.time != now {
            average_rate = AverageRate {
                rate: ema_step(average_rate.rate, pool.spot_rate())?,
                time: now,
            };
        }
        let post_spot =
            Fraction::new(new_n, new_b).map_err(|_| NetworkError::RateUnstable)?;
        if !within_deviation(post_spot, average_rate.rate, max_deviation) {
            return Err(NetworkError::RateUnstable);
        }

        let new_staked = match kind {
            TradeKind::NetworkTokenForBase => pool
                .staked_balance
                .checked_add(amounts.fee)
                .ok_or(NetworkError::Overflow("staked balance"))?,
            TradeKind::BaseForNetworkToken => pool.staked_balance,
        };
        if matches!(kind, TradeKind::BaseForNetworkToken) {
            master_pool.collect_fee(collection_address, amounts.fee)?;
        }

        pool.base_trading_liquidity = new_b;
        pool.nt_trading_liquidity = new_n;
        pool.staked_balance = new_staked;
        pool.average_rate = average_rate;
        pool.refresh_product();

        Ok(TradeResult {
            amount_out: amounts.amount,
            fee: amounts.fee,
            base_liquidity: new_b,
            nt_liquidity: new_n,
        })
    }

    /// Prices a hop without mutating anything.
    ///
    /// # Errors
    ///
    /// Same validation as [`trade`](Self::trade), minus the rate guards.
    pub fn trade_output_estimate(
        &self,
        token: Token,
        kind: TradeKind,
        amount_in: U256,
    ) -> Result<TradeAmounts> {
        let pool = self.pool(token)?;
        if !pool.trading_enabled {
            return Err(NetworkError::TradingDisabled);
        }
        let (x, y) = match kind {
            TradeKind::BaseForNetworkToken => {
                (pool.base_trading_liquidity, pool.nt_trading_liquidity)
            }
            TradeKind::NetworkTokenForBase => {
                (pool.nt_trading_liquidity, pool.base_trading_liquidity)
            }
        };
        target_amount_and_fee(U256::from(x), U256::from(y), amount_in, pool.trading_fee)
    }

    /// Credits a base-token-denominated fee (flash loans) to the pool's
    /// staked balance.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::AccessDenied`] unless `caller` holds
    ///   [`Role::PoolCollectionManager`].
    /// - [`NetworkError::DoesNotExist`] if no pool is defined.
    /// - [`NetworkError::Overflow`] on staked-balance overflow.
    pub fn collect_fee(&mut self, caller: Address, token: Token, amount: U256) -> Result<()> {
        self.access.require(Role::PoolCollectionManager, caller)?;
        let pool = self.pool_mut(token)?;
        pool.staked_balance = pool
            .staked_balance
            .checked_add(amount)
            .ok_or(NetworkError::Overflow("staked balance"))?;
        Ok(())
    }

    // -- trading lifecycle --------------------------------------------------------

    /// Bootstraps trading at the virtual rate `nt_virtual / base_virtual`
    /// (NT per BT), seeding the NT side with exactly the
    /// minimum-liquidity floor.
    ///
    /// Returns the seeded `(base, nt)` trading liquidity.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::AccessDenied`] unless `caller` is an admin.
    /// - [`NetworkError::DoesNotExist`] if no pool is defined.
    /// - [`NetworkError::AlreadyExists`] if trading already runs.
    /// - [`NetworkError::InvalidFraction`] for a degenerate rate.
    /// - [`NetworkError::NetworkLiquidityDisabled`] if the floor, the
    ///   funding limit, the staked balance, or the vault balance cannot
    ///   seed the curve.
    #[allow(clippy::too_many_arguments)]
    pub fn enable_trading(
        &mut self,
        caller: Address,
        settings: &NetworkSettings,
        registry: &mut PoolTokenRegistry,
        master_pool: &mut MasterPool,
        ledger: &mut TokenLedger,
        master_vault: &Vault,
        token: Token,
        nt_virtual: u128,
        base_virtual: u128,
        now: u32,
    ) -> Result<(u128, u128)> {
        self.access.require(Role::Admin, caller)?;
        let collection_address = self.address;

        let pool = self
            .pools
            .get_mut(&token)
            .ok_or(NetworkError::DoesNotExist)?;
        if pool.trading_enabled {
            return Err(NetworkError::AlreadyExists);
        }
        if nt_virtual == 0 || base_virtual == 0 {
            return Err(NetworkError::InvalidFraction("zero virtual balance"));
        }
        let rate = Fraction::new(nt_virtual, base_virtual)?;

        let min_liquidity = settings.min_liquidity_for_trading();
        if min_liquidity.is_zero() {
            return Err(NetworkError::NetworkLiquidityDisabled);
        }
        if master_pool.available_funding(settings, token) < min_liquidity {
            return Err(NetworkError::NetworkLiquidityDisabled);
        }

        let nt_liquidity = to_u128(min_liquidity)?;
        let base_liquidity = to_u128(mul_div_floor(
            min_liquidity,
            U256::from(base_virtual),
            U256::from(nt_virtual),
        )?)?;
        if base_liquidity == 0 {
            return Err(NetworkError::NetworkLiquidityDisabled);
        }
        if U256::from(base_liquidity) > pool.staked_balance
            || U256::from(base_liquidity) > master_vault.balance(ledger, token)
        {
            return Err(NetworkError::NetworkLiquidityDisabled);
        }

        master_pool.request_liquidity(
            collection_address,
            settings,
            registry,
            ledger,
            master_vault.address(),
            token,
            min_liquidity,
        )?;

        pool.base_trading_liquidity = base_liquidity;
        pool.nt_trading_liquidity = nt_liquidity;
        pool.initial_rate = rate.reduced();
        pool.average_rate = AverageRate {
            rate: pool.spot_rate().reduced(),
            time: now,
        };
        pool.trading_enabled = true;
        pool.refresh_product();

        Ok((base_liquidity, nt_liquidity))
    }

    /// Shuts trading down: renounces the funded NT side, clears the
    /// curve, and leaves the staked balance untouched. Depositing stays
    /// as it was.
    ///
    /// Returns the `(base, nt)` liquidity that was cleared.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::AccessDenied`] unless `caller` is an admin.
    /// - [`NetworkError::DoesNotExist`] if no pool is defined.
    /// - [`NetworkError::TradingDisabled`] if trading is already off.
    pub fn disable_trading(
        &mut self,
        caller: Address,
        registry: &mut PoolTokenRegistry,
        master_pool: &mut MasterPool,
        ledger: &mut TokenLedger,
        master_vault_address: Address,
        token: Token,
    ) -> Result<(u128, u128)> {
        self.access.require(Role::Admin, caller)?;
        let collection_address = self.address;

        let pool = self
            .pools
            .get_mut(&token)
            .ok_or(NetworkError::DoesNotExist)?;
        if !pool.trading_enabled {
            return Err(NetworkError::TradingDisabled);
        }

        let cleared = (pool.base_trading_liquidity, pool.nt_trading_liquidity);
        let residual = U256::from(pool.nt_trading_liquidity);
        if !residual.is_zero() {
            master_pool.renounce_liquidity(
                collection_address,
                registry,
                ledger,
                master_vault_address,
                token,
                residual,
            )?;
        }
        pool.base_trading_liquidity = 0;
        pool.nt_trading_liquidity = 0;
        pool.trading_enabled = false;
        pool.average_rate = AverageRate::EMPTY;
        pool.refresh_product();
        Ok(cleared)
    }

    // -- migration ----------------------------------------------------------------

    /// Removes and returns `token`'s pool for migration.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::AccessDenied`] unless `caller` holds
    ///   [`Role::MigrationManager`].
    /// - [`NetworkError::DoesNotExist`] if no pool is defined.
    pub fn migrate_out(&mut self, caller: Address, token: Token) -> Result<Pool> {
        self.access.require(Role::MigrationManager, caller)?;
        self.pools.remove(&token).ok_or(NetworkError::DoesNotExist)
    }

    /// Adopts a migrated pool record verbatim.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::AccessDenied`] unless `caller` holds
    ///   [`Role::MigrationManager`].
    /// - [`NetworkError::AlreadyExists`] if a pool for the same token is
    ///   already defined.
    pub fn migrate_in(&mut self, caller: Address, pool: Pool) -> Result<()> {
        self.access.require(Role::MigrationManager, caller)?;
        let token = pool.base_token();
        if self.pools.contains_key(&token) {
            return Err(NetworkError::AlreadyExists);
        }
        self.pools.insert(token, pool);
        Ok(())
    }

    fn pool_mut(&mut self, token: Token) -> Result<&mut Pool> {
        self.pools.get_mut(&token).ok_or(NetworkError::DoesNotExist)
    }
}

/// Narrows to `u128`, failing on anything wider.
fn to_u128(value: U256) -> Result<u128> {
    let limbs = value.as_limbs();
    if limbs[2] != 0 || limbs[3] != 0 {
        return Err(NetworkError::Overflow("trading liquidity exceeds 128 bits"));
    }
    Ok((u128::from(limbs[1]) << 64) | u128::from(limbs[0]))
}
