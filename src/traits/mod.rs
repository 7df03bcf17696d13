//! Seam abstractions between the core and its collaborators.
//!
//! The core is a closed, strictly serialized state machine; its only two
//! injected behaviours are the time source ([`Clock`]) and the
//! flash-loan borrower callback ([`FlashLoanRecipient`]).

mod clock;
mod flash_loan;

pub use clock::{Clock, ManualClock};
pub use flash_loan::FlashLoanRecipient;
