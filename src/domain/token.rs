//! Token handle used across the network.

use core::fmt;

use super::Address;

/// A token as seen by the network: an [`Address`] plus the knowledge of
/// whether it is the native chain token.
///
/// The network token (NT) and the governance token are ordinary `Token`
/// values; which addresses play those roles is decided at network
/// construction. `Token` never interprets decimals — all amounts are raw
/// smallest units.
///
/// # Examples
///
/// ```
/// use nexus_amm::domain::{Address, Token};
///
/// let tkn = Token::new(Address::from_bytes([7u8; 32]));
/// assert!(!tkn.is_native());
/// assert!(Token::native().is_native());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token(Address);

impl Token {
    /// Creates a token handle from its address.
    #[must_use]
    pub const fn new(address: Address) -> Self {
        Self(address)
    }

    /// Returns the native-chain pseudo-token.
    #[must_use]
    pub const fn native() -> Self {
        Self(Address::NATIVE)
    }

    /// Returns the token's address.
    #[must_use]
    pub const fn address(&self) -> Address {
        self.0
    }

    /// Returns `true` if this token is the native-chain sentinel.
    #[must_use]
    pub fn is_native(&self) -> bool {
        self.0.is_native()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_native() {
            write!(f, "native")
        } else {
            write!(f, "{}", self.0)
        }
    }
}
