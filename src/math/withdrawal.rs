//! Withdrawal-payout solver.
//!
//! Given a pool's accounting state and a pool-token amount being
//! redeemed, the solver produces the complete payout breakdown: how much
//! base token leaves the master vault, how much the external protection
//! reserve tops up, how much network token is minted to the provider to
//! cover any remaining shortfall, and the post-withdrawal trading
//! liquidity.
//!
//! Intent, in order:
//!
//! 1. Pay the provider their pro-rata share of the staked balance, minus
//!    the withdrawal fee, preferring base token from the vault.
//! 2. If the vault cannot cover it, draw on the external protection
//!    reserve.
//! 3. If still short, mint network token to the provider at the current
//!    spot rate (`n / b`); with trading liquidity empty there is no rate
//!    and no compensation.
//! 4. Scale trading liquidity down proportionally so the pre-withdrawal
//!    price is preserved, clamped so `b ≤ s` keeps holding; the network
//!    token removed this way is renounced back to the master pool.

use alloy_primitives::U256;

use crate::domain::{PpmRate, Rounding};
use crate::error::{NetworkError, Result};

use super::mul_div_floor;

/// Complete payout breakdown computed by [`calculate_withdrawal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WithdrawalAmounts {
    /// Base token paid to the provider from the master vault.
    pub base_from_vault: U256,
    /// Base token paid to the provider from the external protection vault.
    pub base_from_external: U256,
    /// Network token minted to the provider to cover the residual
    /// shortfall.
    pub nt_to_provider: U256,
    /// Withdrawal fee retained by the pool, in base-token units.
    pub base_fee: U256,
    /// Base-side trading liquidity after the withdrawal.
    pub new_base_liquidity: u128,
    /// Network-token trading liquidity after the withdrawal.
    pub new_nt_liquidity: u128,
    /// Staked balance after the withdrawal.
    pub new_staked_balance: U256,
    /// Network token renounced back to the master pool.
    pub nt_to_renounce: U256,
}

/// Solves a withdrawal of `pool_token_amount` shares.
///
/// # Errors
///
/// - [`NetworkError::ZeroValue`] if `pool_token_amount` is zero.
/// - [`NetworkError::InsufficientBalance`] if the amount exceeds the
///   pool-token supply.
/// - [`NetworkError::Overflow`] on 256-bit arithmetic overflow.
#[allow(clippy::too_many_arguments)]
pub fn calculate_withdrawal(
    base_liquidity: u128,
    nt_liquidity: u128,
    staked_balance: U256,
    pool_token_supply: U256,
    pool_token_amount: U256,
    vault_balance: U256,
    external_balance: U256,
    withdrawal_fee: PpmRate,
) -> Result<WithdrawalAmounts> {
    if pool_token_amount.is_zero() {
        return Err(NetworkError::ZeroValue);
    }
    if pool_token_amount > pool_token_supply {
        return Err(NetworkError::InsufficientBalance);
    }

    // Pro-rata share of the staked balance, fee carved out.
    let owed = mul_div_floor(staked_balance, pool_token_amount, pool_token_supply)?;
    let payout = withdrawal_fee.apply_complement(owed, Rounding::Down)?;
    let base_fee = owed - payout;

    // Vault first, external protection second, minted NT last.
    let base_from_vault = payout.min(vault_balance);
    let mut shortfall = payout - base_from_vault;
    let base_from_external = shortfall.min(external_balance);
    shortfall -= base_from_external;

    let b = U256::from(base_liquidity);
    let n = U256::from(nt_liquidity);
    let nt_to_provider = if !shortfall.is_zero() && base_liquidity > 0 && nt_liquidity > 0 {
        mul_div_floor(shortfall, n, b)?
    } else {
        U256::ZERO
    };

    let new_staked_balance = staked_balance - owed;

    // Scale (b, n) down by the redeemed share so the spot rate survives,
    // then clamp to the new staked balance.
    let (new_base_liquidity, new_nt_liquidity, nt_to_renounce) = if base_liquidity > 0 {
        let delta_b = mul_div_floor(b, pool_token_amount, pool_token_supply)?;
        let mut new_b = b - delta_b;
        if new_b > new_staked_balance {
            new_b = new_staked_balance;
        }
        let new_n = mul_div_floor(n, new_b, b)?;
        (
            u256_to_u128(new_b),
            u256_to_u128(new_n),
            n - new_n,
        )
    } else {
        (0, nt_liquidity, U256::ZERO)
    };

    Ok(WithdrawalAmounts {
        base_from_vault,
        base_from_external,
        nt_to_provider,
        base_fee,
        new_base_liquidity,
        new_nt_liquidity,
        new_staked_balance,
        nt_to_renounce,
    })
}

/// Narrows a value already known to fit in 128 bits.
fn u256_to_u128(value: U256) -> u128 {
    let limbs = value.as_limbs();
    (u128::from(limbs[1]) << 64) | u128::from(limbs[0])
}
