//! Parts-per-million rates for fees and deviation bounds.

use core::fmt;

use alloy_primitives::U256;

use super::Rounding;
use crate::error::NetworkError;

/// The PPM unit: one million parts equal 100%.
pub const PPM: u32 = 1_000_000;

/// A rate expressed in parts per million (1 ppm = 0.0001%).
///
/// Construction validates the value against [`PPM`], so a stored
/// `PpmRate` is always a sensible percentage. Used for trading fees,
/// the withdrawal fee, the flash-loan fee, and the average-rate
/// deviation bound.
///
/// # Examples
///
/// ```
/// use nexus_amm::domain::PpmRate;
///
/// let fee = PpmRate::new(10_000)?; // 1%
/// assert_eq!(fee.get(), 10_000);
/// # Ok::<(), nexus_amm::error::NetworkError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct PpmRate(u32);

impl PpmRate {
    /// The zero rate (0%).
    pub const ZERO: Self = Self(0);

    /// The full rate (100%).
    pub const FULL: Self = Self(PPM);

    /// Creates a rate, rejecting values above 100%.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::InvalidFee`] if `value > PPM`.
    pub const fn new(value: u32) -> Result<Self, NetworkError> {
        if value > PPM {
            return Err(NetworkError::InvalidFee("rate exceeds one million ppm"));
        }
        Ok(Self(value))
    }

    /// Returns the raw ppm value.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Returns `true` if the rate is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Computes `amount · rate / PPM` with explicit rounding.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::Overflow`] if the result exceeds 256 bits
    /// (only possible with `Rounding::Up` at the extreme edge).
    pub fn apply(&self, amount: U256, rounding: Rounding) -> Result<U256, NetworkError> {
        crate::math::mul_div(
            amount,
            U256::from(self.0),
            U256::from(PPM),
            rounding,
        )
    }

    /// Computes `amount · (PPM − rate) / PPM` with explicit rounding.
    ///
    /// This is the post-fee remainder of `amount`.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::Overflow`] on 256-bit overflow.
    pub fn apply_complement(&self, amount: U256, rounding: Rounding) -> Result<U256, NetworkError> {
        crate::math::mul_div(
            amount,
            U256::from(PPM - self.0),
            U256::from(PPM),
            rounding,
        )
    }
}

impl fmt::Display for PpmRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ppm", self.0)
    }
}
