//! Full-precision `a · b / c` on 256-bit integers.
//!
//! The product is computed in 512 bits, so the only failure modes are a
//! zero divisor and a quotient that does not fit back into 256 bits.

use alloy_primitives::{U256, U512};

use crate::domain::Rounding;
use crate::error::{NetworkError, Result};

/// Computes `a · b / c` without intermediate overflow, with explicit
/// rounding.
///
/// # Errors
///
/// - [`NetworkError::DivisionByZero`] if `c` is zero.
/// - [`NetworkError::Overflow`] if the rounded quotient exceeds
///   `2^256 − 1`.
pub fn mul_div(a: U256, b: U256, c: U256, rounding: Rounding) -> Result<U256> {
    if c.is_zero() {
        return Err(NetworkError::DivisionByZero);
    }
    let wide = U512::from(a) * U512::from(b);
    let (mut quotient, remainder) = wide.div_rem(U512::from(c));
    if rounding.is_up() && !remainder.is_zero() {
        quotient += U512::from(1u8);
    }
    narrow(quotient)
}

/// Floor variant of [`mul_div`].
///
/// # Errors
///
/// Same as [`mul_div`].
pub fn mul_div_floor(a: U256, b: U256, c: U256) -> Result<U256> {
    mul_div(a, b, c, Rounding::Down)
}

/// Ceiling variant of [`mul_div`].
///
/// # Errors
///
/// Same as [`mul_div`].
pub fn mul_div_ceil(a: U256, b: U256, c: U256) -> Result<U256> {
    mul_div(a, b, c, Rounding::Up)
}

/// Converts a 512-bit value back to 256 bits.
fn narrow(value: U512) -> Result<U256> {
    let limbs = value.as_limbs();
    if limbs[4] != 0 || limbs[5] != 0 || limbs[6] != 0 || limbs[7] != 0 {
        return Err(NetworkError::Overflow("mul_div result exceeds 256 bits"));
    }
    Ok(U256::from_limbs([limbs[0], limbs[1], limbs[2], limbs[3]]))
}
