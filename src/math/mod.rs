//! The integer math kernel.
//!
//! Everything here is pure: 256-bit fixed-point arithmetic widened to 512
//! bits where products demand it, constant-product trade pricing, the
//! reference-rate smoothing and deviation predicates, and the
//! withdrawal-payout solver. No floating point, no state.

mod mul_div;
mod rate;
mod trade;
mod withdrawal;

pub use mul_div::{mul_div, mul_div_ceil, mul_div_floor};
pub use rate::{ema_step, within_deviation};
pub use trade::{target_amount_and_fee, TradeAmounts};
pub use withdrawal::{calculate_withdrawal, WithdrawalAmounts};
