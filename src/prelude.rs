//! Convenience re-exports for common types and traits.
//!
//! The prelude provides a single import to bring all commonly used items
//! into scope:
//!
//! ```rust
//! use nexus_amm::prelude::*;
//! ```

// Re-export domain types
pub use crate::domain::{Address, Fraction, PpmRate, Rounding, Token, PPM};

// Re-export seam traits
pub use crate::traits::{Clock, FlashLoanRecipient, ManualClock};

// Re-export math utilities
pub use crate::math::{
    calculate_withdrawal, ema_step, mul_div, mul_div_ceil, mul_div_floor, target_amount_and_fee,
    within_deviation, TradeAmounts, WithdrawalAmounts,
};

// Re-export components
pub use crate::access::{AccessControl, Role};
pub use crate::ledger::TokenLedger;
pub use crate::pending_withdrawals::{PendingWithdrawals, WithdrawalRequest};
pub use crate::pool_token::{PoolTokenId, PoolTokenRegistry};
pub use crate::pools::{
    AverageRate, DepositAmounts, MasterPool, Pool, PoolCollection, TradeKind, TradeResult,
};
pub use crate::settings::{NetworkSettings, SettingUpdate};
pub use crate::upgrader::PoolCollectionUpgrader;
pub use crate::vault::Vault;

// Re-export the facade
pub use crate::network::{ContextBuilder, Event, FeeKind, Network, Permit};

// Re-export error types
pub use crate::error::{NetworkError, Result};
