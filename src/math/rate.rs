//! Reference-rate arithmetic: deviation bounds and the smoothing step.
//!
//! All comparisons are cross-multiplied in wide integers; no rate is ever
//! materialized by division.

use alloy_primitives::{U256, U512};

use crate::domain::{Fraction, PpmRate, PPM};
use crate::error::Result;

/// Returns `true` if `rate` lies within `max_deviation` of `reference`:
///
/// ```text
/// reference · (PPM − dev) ≤ rate · PPM ≤ reference · (PPM + dev)
/// ```
///
/// A zero reference admits only a zero rate.
#[must_use]
pub fn within_deviation(rate: Fraction, reference: Fraction, max_deviation: PpmRate) -> bool {
    if reference.is_zero() {
        return rate.is_zero();
    }
    if rate.is_zero() {
        return false;
    }

    // x = rate, y = reference, compared as x/y against 1 ± dev/PPM.
    let x = U256::from(rate.num()) * U256::from(reference.den());
    let y = U256::from(reference.num()) * U256::from(rate.den());

    let x_scaled = U512::from(x) * U512::from(PPM);
    let dev = u64::from(max_deviation.get());
    let lower = U512::from(y) * U512::from(u64::from(PPM) - dev);
    let upper = U512::from(y) * U512::from(u64::from(PPM) + dev);

    lower <= x_scaled && x_scaled <= upper
}

/// One smoothing step of the time-weighted reference rate:
/// `new = (4 · average + spot) / 5`, computed exactly and then reduced
/// for storage.
///
/// # Errors
///
/// Propagates fraction-construction failures, which cannot occur for
/// a valid spot rate (its denominator is non-zero by construction).
pub fn ema_step(average: Fraction, spot: Fraction) -> Result<Fraction> {
    // Exact numerator/denominator in 256 bits: components are u128, so
    // 4·na·ds + ns·da needs at most 259 bits — scale first if needed.
    let na = U256::from(average.num());
    let da = U256::from(average.den());
    let ns = U256::from(spot.num());
    let ds = U256::from(spot.den());

    let four = U256::from(4u8);
    let five = U256::from(5u8);

    let term_avg = U512::from(four * na) * U512::from(ds);
    let term_spot = U512::from(ns) * U512::from(da);
    let num = term_avg + term_spot;
    let den = U512::from(five * da) * U512::from(ds);

    let (num, den) = narrow_pair(num, den);
    Ok(Fraction::new(num, den)?.reduced())
}

/// Scales a 512-bit fraction down by a common right shift until both
/// components fit in `u128`, preserving the ratio to within one part in
/// `2^128`.
fn narrow_pair(num: U512, den: U512) -> (u128, u128) {
    let width = |v: U512| 512 - v.leading_zeros();
    let widest = width(num).max(width(den));
    if widest <= 128 {
        return (low_u128(num), low_u128(den).max(1));
    }
    let shift = widest - 128;
    (low_u128(num >> shift), low_u128(den >> shift).max(1))
}

fn low_u128(v: U512) -> u128 {
    let limbs = v.as_limbs();
    (u128::from(limbs[1]) << 64) | u128::from(limbs[0])
}
