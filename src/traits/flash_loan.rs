//! Flash-loan borrower callback.

use alloy_primitives::U256;

use crate::domain::{Address, Token};
use crate::error::Result;
use crate::network::Network;

/// Receiver side of the flash-loan protocol.
///
/// The network transfers the borrowed amount to the recipient's address,
/// then invokes [`on_flash_loan`](Self::on_flash_loan). Before returning,
/// the callback must move `amount + fee` of `token` back into the master
/// vault; the network verifies the vault balance afterwards and rejects
/// the whole operation with `InsufficientFlashLoanReturn` on a short
/// return.
///
/// The callback receives the network itself, which is how a hostile
/// borrower would attempt to re-enter `deposit`/`trade`/`withdraw`
/// mid-loan; the reentrancy guard denies every such call.
pub trait FlashLoanRecipient {
    /// The ledger address the borrowed funds are transferred to.
    fn address(&self) -> Address;

    /// Called once per flash loan, after the funds have been transferred.
    ///
    /// `sender` is the account that initiated the loan; `data` is an
    /// opaque payload forwarded verbatim from the initiator.
    ///
    /// # Errors
    ///
    /// Any error aborts the loan; the network restores all balances.
    fn on_flash_loan(
        &mut self,
        network: &mut Network,
        sender: Address,
        token: Token,
        amount: U256,
        fee: U256,
        data: &[u8],
    ) -> Result<()>;
}
