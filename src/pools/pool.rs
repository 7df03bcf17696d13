//! The per-base-token pool record.

use alloy_primitives::U256;

use crate::domain::{Fraction, PpmRate, Token};
use crate::pool_token::PoolTokenId;

/// Time-stamped reference rate, smoothed across trades.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AverageRate {
    /// The reference rate, NT per BT.
    pub rate: Fraction,
    /// Timestamp of the last smoothing step.
    pub time: u32,
}

impl AverageRate {
    /// A cleared reference rate.
    pub const EMPTY: Self = Self {
        rate: Fraction::ZERO,
        time: 0,
    };
}

/// Accounting state of one base-token pool.
///
/// A pool tracks three balances that move independently:
///
/// - the *staked balance* `s` — everything owed to liquidity providers,
///   fees included;
/// - the *trading liquidity* `(b, n)` — the slice of value actually on
///   the curve, where `b` is base token and `n` is network token;
/// - the share issuance, delegated to the pool's [`PoolTokenId`].
///
/// `b ≤ s` always; the gap is deposited value that is not (yet) priced
/// into trades. The record is plain data: every state transition goes
/// through the owning collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pool {
    pub(crate) base_token: Token,
    pub(crate) pool_token: PoolTokenId,
    pub(crate) trading_fee: PpmRate,
    pub(crate) trading_enabled: bool,
    pub(crate) depositing_enabled: bool,
    pub(crate) base_trading_liquidity: u128,
    pub(crate) nt_trading_liquidity: u128,
    pub(crate) trading_liquidity_product: U256,
    pub(crate) staked_balance: U256,
    pub(crate) initial_rate: Fraction,
    pub(crate) deposit_limit: U256,
    pub(crate) average_rate: AverageRate,
}

impl Pool {
    /// Creates a fresh pool: depositing on, trading off, no liquidity,
    /// unlimited deposits.
    #[must_use]
    pub fn new(base_token: Token, pool_token: PoolTokenId, trading_fee: PpmRate) -> Self {
        Self {
            base_token,
            pool_token,
            trading_fee,
            trading_enabled: false,
            depositing_enabled: true,
            base_trading_liquidity: 0,
            nt_trading_liquidity: 0,
            trading_liquidity_product: U256::ZERO,
            staked_balance: U256::ZERO,
            initial_rate: Fraction::ZERO,
            deposit_limit: U256::MAX,
            average_rate: AverageRate::EMPTY,
        }
    }

    /// The base token this pool is keyed by.
    #[must_use]
    pub const fn base_token(&self) -> Token {
        self.base_token
    }

    /// The pool's share token.
    #[must_use]
    pub const fn pool_token(&self) -> PoolTokenId {
        self.pool_token
    }

    /// The trading fee applied to every hop through this pool.
    #[must_use]
    pub const fn trading_fee(&self) -> PpmRate {
        self.trading_fee
    }

    /// Whether trades may run.
    #[must_use]
    pub const fn trading_enabled(&self) -> bool {
        self.trading_enabled
    }

    /// Whether deposits may run.
    #[must_use]
    pub const fn depositing_enabled(&self) -> bool {
        self.depositing_enabled
    }

    /// Base-side trading liquidity `b`.
    #[must_use]
    pub const fn base_trading_liquidity(&self) -> u128 {
        self.base_trading_liquidity
    }

    /// Network-token-side trading liquidity `n`.
    #[must_use]
    pub const fn nt_trading_liquidity(&self) -> u128 {
        self.nt_trading_liquidity
    }

    /// Cached `b · n`, used to detect stale average rates cheaply.
    #[must_use]
    pub const fn trading_liquidity_product(&self) -> U256 {
        self.trading_liquidity_product
    }

    /// Staked balance `s`.
    #[must_use]
    pub const fn staked_balance(&self) -> U256 {
        self.staked_balance
    }

    /// Rate that seeded trading, NT per BT.
    #[must_use]
    pub const fn initial_rate(&self) -> Fraction {
        self.initial_rate
    }

    /// Ceiling on the staked balance.
    #[must_use]
    pub const fn deposit_limit(&self) -> U256 {
        self.deposit_limit
    }

    /// The smoothed reference rate.
    #[must_use]
    pub const fn average_rate(&self) -> AverageRate {
        self.average_rate
    }

    /// Current spot rate `n / b`; the zero fraction when the curve is
    /// empty.
    #[must_use]
    pub fn spot_rate(&self) -> Fraction {
        if self.base_trading_liquidity == 0 {
            return Fraction::ZERO;
        }
        Fraction::new(self.nt_trading_liquidity, self.base_trading_liquidity)
            .unwrap_or(Fraction::ZERO)
    }

    /// Recomputes the cached `b · n`.
    pub(crate) fn refresh_product(&mut self) {
        self.trading_liquidity_product =
            U256::from(self.base_trading_liquidity) * U256::from(self.nt_trading_liquidity);
    }
}
