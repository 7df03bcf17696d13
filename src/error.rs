//! Unified error types for the liquidity network core.
//!
//! All fallible operations across the crate return [`NetworkError`] as
//! their error type. Every public operation either commits all of its
//! state changes or commits nothing; errors always mean the operation was
//! rejected as a whole.
//!
//! # Error Code Ranges
//!
//! | Range | Category | Description |
//! |-------|----------|-------------|
//! | 1000–1999 | Validation | Invalid inputs, rejected before any state read |
//! | 2000–2999 | State & authorization | Component state or role violations |
//! | 3000–3999 | Arithmetic | Overflow, division by zero |
//! | 4000–4999 | Invariant guard | Trial post-state violated a protocol bound |

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, NetworkError>;

// ---------------------------------------------------------------------------
// NetworkError
// ---------------------------------------------------------------------------

/// Unified error enum for the liquidity network.
///
/// Variants are grouped by numeric error-code ranges so that callers can
/// pattern-match on categories or inspect individual codes for logging.
/// Validation errors fire before any mutation; guard errors are computed
/// from a trial post-state and reject the whole operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    // ----- 1000–1999: Validation errors ------------------------------------
    /// A zero or otherwise malformed address was provided (code 1000).
    #[error("invalid address: {0}")]
    InvalidAddress(&'static str),

    /// A token is not usable in the requested position (code 1001).
    #[error("invalid token: {0}")]
    InvalidToken(&'static str),

    /// The referenced pool does not satisfy the operation's requirements (code 1002).
    #[error("invalid pool: {0}")]
    InvalidPool(&'static str),

    /// An unknown pool type was referenced (code 1003).
    #[error("invalid pool type")]
    InvalidType,

    /// The referenced pool collection is unknown or unsuitable (code 1004).
    #[error("invalid pool collection: {0}")]
    InvalidPoolCollection(&'static str),

    /// A zero amount was provided where a positive one is required (code 1005).
    #[error("zero value")]
    ZeroValue,

    /// A fraction has a zero denominator or zero numerator where positive
    /// is required (code 1006).
    #[error("invalid fraction: {0}")]
    InvalidFraction(&'static str),

    /// A parts-per-million rate exceeds 100% (code 1007).
    #[error("invalid fee: {0}")]
    InvalidFee(&'static str),

    /// The operation deadline has already passed (code 1008).
    #[error("deadline expired")]
    DeadlineExpired,

    /// The attached native value does not match the token amount (code 1009).
    #[error("native value mismatch")]
    EthAmountMismatch,

    /// Permit-signed approvals are not supported for this token (code 1010).
    #[error("permit unsupported for this token")]
    PermitUnsupported,

    // ----- 2000–2999: State & authorization errors -------------------------
    /// The entity already exists (code 2000).
    #[error("already exists")]
    AlreadyExists,

    /// The referenced entity does not exist (code 2001).
    #[error("does not exist")]
    DoesNotExist,

    /// The container still holds entries and cannot be removed (code 2002).
    #[error("not empty")]
    NotEmpty,

    /// The token has not been whitelisted (code 2003).
    #[error("token not whitelisted")]
    NotWhitelisted,

    /// Depositing is disabled for this pool (code 2004).
    #[error("depositing disabled")]
    DepositingDisabled,

    /// Trading is disabled for this pool (code 2005).
    #[error("trading disabled")]
    TradingDisabled,

    /// Network-token liquidity cannot seed or sustain trading (code 2006).
    #[error("network liquidity disabled")]
    NetworkLiquidityDisabled,

    /// The withdrawal request is outside its ready window or not owned by
    /// the caller (code 2007).
    #[error("withdrawal not allowed")]
    WithdrawalNotAllowed,

    /// The caller does not hold the required role (code 2008).
    #[error("access denied")]
    AccessDenied,

    /// The vault is paused and rejects withdrawals (code 2009).
    #[error("paused")]
    Paused,

    /// A ledger balance is too low for the requested transfer (code 2010).
    #[error("insufficient balance")]
    InsufficientBalance,

    // ----- 3000–3999: Arithmetic errors ------------------------------------
    /// An arithmetic operation exceeded 2^256 − 1 (code 3000).
    #[error("arithmetic overflow: {0}")]
    Overflow(&'static str),

    /// Division by zero was attempted (code 3001).
    #[error("division by zero")]
    DivisionByZero,

    // ----- 4000–4999: Invariant-guard errors -------------------------------
    /// The deposit would push the staked balance over the pool's limit (code 4000).
    #[error("deposit limit exceeded")]
    DepositLimitExceeded,

    /// The trade output fell short of the caller's minimum (code 4001).
    #[error("return amount too low")]
    ReturnAmountTooLow,

    /// The post-trade spot rate deviates too far from the average rate (code 4002).
    #[error("rate unstable")]
    RateUnstable,

    /// The flash-loan recipient returned less than amount + fee (code 4003).
    #[error("insufficient flash loan return")]
    InsufficientFlashLoanReturn,

    /// A nested call re-entered the network mid-operation (code 4004).
    #[error("reentrant call")]
    Reentrant,
}

impl NetworkError {
    /// Returns the numeric error code for this variant.
    ///
    /// Codes are organized into ranges:
    /// - 1000–1999 for validation errors
    /// - 2000–2999 for state and authorization errors
    /// - 3000–3999 for arithmetic errors
    /// - 4000–4999 for invariant-guard errors
    #[must_use]
    pub const fn error_code(&self) -> u16 {
        match self {
            // Validation (1000–1999)
            Self::InvalidAddress(_) => 1000,
            Self::InvalidToken(_) => 1001,
            Self::InvalidPool(_) => 1002,
            Self::InvalidType => 1003,
            Self::InvalidPoolCollection(_) => 1004,
            Self::ZeroValue => 1005,
            Self::InvalidFraction(_) => 1006,
            Self::InvalidFee(_) => 1007,
            Self::DeadlineExpired => 1008,
            Self::EthAmountMismatch => 1009,
            Self::PermitUnsupported => 1010,

            // State & authorization (2000–2999)
            Self::AlreadyExists => 2000,
            Self::DoesNotExist => 2001,
            Self::NotEmpty => 2002,
            Self::NotWhitelisted => 2003,
            Self::DepositingDisabled => 2004,
            Self::TradingDisabled => 2005,
            Self::NetworkLiquidityDisabled => 2006,
            Self::WithdrawalNotAllowed => 2007,
            Self::AccessDenied => 2008,
            Self::Paused => 2009,
            Self::InsufficientBalance => 2010,

            // Arithmetic (3000–3999)
            Self::Overflow(_) => 3000,
            Self::DivisionByZero => 3001,

            // Invariant guard (4000–4999)
            Self::DepositLimitExceeded => 4000,
            Self::ReturnAmountTooLow => 4001,
            Self::RateUnstable => 4002,
            Self::InsufficientFlashLoanReturn => 4003,
            Self::Reentrant => 4004,
        }
    }

    /// Returns `true` if this is a validation error (1000–1999).
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        self.error_code() >= 1000 && self.error_code() < 2000
    }

    /// Returns `true` if this is a state or authorization error (2000–2999).
    #[must_use]
    pub const fn is_state(&self) -> bool {
        self.error_code() >= 2000 && self.error_code() < 3000
    }

    /// Returns `true` if this is an arithmetic error (3000–3999).
    #[must_use]
    pub const fn is_arithmetic(&self) -> bool {
        self.error_code() >= 3000 && self.error_code() < 4000
    }

    /// Returns `true` if this is an invariant-guard error (4000–4999).
    #[must_use]
    pub const fn is_guard(&self) -> bool {
        self.error_code() >= 4000 && self.error_code() < 5000
    }
}
