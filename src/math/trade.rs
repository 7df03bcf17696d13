//! Constant-product trade pricing.
//!
//! Every hop trades against the reserves `(x, y)` of one pool, where one
//! side is always the network token. The curve is `x · y = k`; the fee is
//! charged on the target amount and accrues to the target side's staked
//! balance, never to trading liquidity:
//!
//! ```text
//! gross      = y · a / (x + a)
//! fee        = gross · fee_ppm / PPM
//! amount_out = gross − fee
//! new_x      = x + a
//! new_y      = y − gross
//! ```

use alloy_primitives::U256;

use crate::domain::{PpmRate, Rounding};
use crate::error::{NetworkError, Result};

use super::mul_div_floor;

/// Outcome of pricing one hop: the net output and the fee carved out of
/// the gross output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeAmounts {
    /// Net amount sent to the trader, in target-token units.
    pub amount: U256,
    /// Fee retained for the target side's staked balance, in target-token
    /// units.
    pub fee: U256,
}

impl TradeAmounts {
    /// Gross curve output: `amount + fee`.
    #[must_use]
    pub fn gross(&self) -> U256 {
        self.amount + self.fee
    }
}

/// Prices a single hop of `amount_in` source tokens against reserves
/// `(source_liquidity, target_liquidity)`.
///
/// # Errors
///
/// - [`NetworkError::ZeroValue`] if `amount_in` is zero.
/// - [`NetworkError::InvalidPool`] if either reserve is zero.
/// - [`NetworkError::Overflow`] if `source + amount_in` exceeds 256 bits.
pub fn target_amount_and_fee(
    source_liquidity: U256,
    target_liquidity: U256,
    amount_in: U256,
    fee: PpmRate,
) -> Result<TradeAmounts> {
    if amount_in.is_zero() {
        return Err(NetworkError::ZeroValue);
    }
    if source_liquidity.is_zero() || target_liquidity.is_zero() {
        return Err(NetworkError::InvalidPool("empty trading liquidity"));
    }

    let denominator = source_liquidity
        .checked_add(amount_in)
        .ok_or(NetworkError::Overflow("source liquidity plus input"))?;
    let gross = mul_div_floor(target_liquidity, amount_in, denominator)?;
    let fee_amount = fee.apply(gross, Rounding::Down)?;

    Ok(TradeAmounts {
        amount: gross - fee_amount,
        fee: fee_amount,
    })
}
