//! Operation context ids.
//!
//! Every externally visible operation hashes its sender, the current
//! time, an operation tag, and its parameters into one 32-byte id that
//! every event of that operation carries.

use alloy_primitives::{keccak256, B256, U256};

use crate::domain::{Address, Token};

/// Incremental builder for a context id.
///
/// Parameters are appended as fixed-width big-endian bytes, so two
/// operations differing in any parameter hash differently.
#[derive(Debug, Clone, Default)]
pub struct ContextBuilder {
    bytes: Vec<u8>,
}

impl ContextBuilder {
    /// Starts a context for `sender` at `time` running `op`.
    #[must_use]
    pub fn new(sender: Address, time: u32, op: &str) -> Self {
        let mut builder = Self { bytes: Vec::with_capacity(64) };
        builder.bytes.extend_from_slice(&sender.as_bytes());
        builder.bytes.extend_from_slice(&time.to_be_bytes());
        builder.bytes.extend_from_slice(op.as_bytes());
        builder
    }

    /// Appends an address parameter.
    #[must_use]
    pub fn address(mut self, value: Address) -> Self {
        self.bytes.extend_from_slice(&value.as_bytes());
        self
    }

    /// Appends a token parameter.
    #[must_use]
    pub fn token(self, value: Token) -> Self {
        self.address(value.address())
    }

    /// Appends a 256-bit amount parameter.
    #[must_use]
    pub fn amount(mut self, value: U256) -> Self {
        self.bytes.extend_from_slice(&value.to_be_bytes::<32>());
        self
    }

    /// Appends a 64-bit parameter.
    #[must_use]
    pub fn id(mut self, value: u64) -> Self {
        self.bytes.extend_from_slice(&value.to_be_bytes());
        self
    }

    /// Hashes the accumulated bytes into the context id.
    #[must_use]
    pub fn finish(self) -> B256 {
        keccak256(&self.bytes)
    }
}
