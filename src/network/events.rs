//! Typed event log.
//!
//! Every externally visible operation emits its events after all of its
//! state mutations, each carrying the operation's context id so off-chain
//! consumers can join the effects of one operation across components.

use alloy_primitives::{B256, U256};

use crate::domain::{Address, Token};

/// What kind of fee a [`Event::FeesCollected`] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeKind {
    /// Trading fee accrued by a hop.
    Trading,
    /// Flash-loan fee.
    FlashLoan,
}

/// One emitted event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A pool was created in a collection.
    PoolAdded {
        context_id: B256,
        pool_type: u16,
        token: Token,
    },
    /// A pool was removed from the network.
    PoolRemoved {
        context_id: B256,
        pool_type: u16,
        token: Token,
    },
    /// A provider deposited base token.
    BaseTokenDeposited {
        context_id: B256,
        token: Token,
        provider: Address,
        amount: U256,
        pool_token_amount: U256,
    },
    /// A provider deposited network token.
    NetworkTokenDeposited {
        context_id: B256,
        provider: Address,
        amount: U256,
        pool_token_amount: U256,
        gov_token_amount: U256,
    },
    /// A provider completed a base-token withdrawal.
    BaseTokenWithdrawn {
        context_id: B256,
        token: Token,
        provider: Address,
        base_amount: U256,
        external_protection_amount: U256,
        nt_amount: U256,
        withdrawal_fee: U256,
    },
    /// A provider completed a network-token withdrawal.
    NetworkTokenWithdrawn {
        context_id: B256,
        provider: Address,
        nt_amount: U256,
        pool_token_amount: U256,
    },
    /// A trade completed end to end.
    TokensTraded {
        context_id: B256,
        trader: Address,
        source_token: Token,
        target_token: Token,
        source_amount: U256,
        target_amount: U256,
    },
    /// A fee accrued to a staked balance.
    FeesCollected {
        context_id: B256,
        token: Token,
        kind: FeeKind,
        amount: U256,
    },
    /// A pool's staked balance or share supply changed.
    TotalLiquidityUpdated {
        context_id: B256,
        token: Token,
        staked_balance: U256,
        pool_token_supply: U256,
    },
    /// A pool's trading liquidity changed.
    TradingLiquidityUpdated {
        context_id: B256,
        token: Token,
        base_liquidity: u128,
        nt_liquidity: u128,
    },
    /// A flash loan ran to completion.
    FlashLoanCompleted {
        context_id: B256,
        token: Token,
        borrower: Address,
        amount: U256,
        fee: U256,
    },
    /// A collection was registered.
    PoolCollectionAdded {
        context_id: B256,
        pool_type: u16,
        collection: Address,
    },
    /// A collection was deregistered.
    PoolCollectionRemoved {
        context_id: B256,
        pool_type: u16,
        collection: Address,
    },
    /// The latest collection for a pool type changed.
    LatestPoolCollectionReplaced {
        context_id: B256,
        pool_type: u16,
        previous: Option<Address>,
        latest: Option<Address>,
    },
}

impl Event {
    /// The context id shared by every event of one operation.
    #[must_use]
    pub const fn context_id(&self) -> B256 {
        match self {
            Self::PoolAdded { context_id, .. }
            | Self::PoolRemoved { context_id, .. }
            | Self::BaseTokenDeposited { context_id, .. }
            | Self::NetworkTokenDeposited { context_id, .. }
            | Self::BaseTokenWithdrawn { context_id, .. }
            | Self::NetworkTokenWithdrawn { context_id, .. }
            | Self::TokensTraded { context_id, .. }
            | Self::FeesCollected { context_id, .. }
            | Self::TotalLiquidityUpdated { context_id, .. }
            | Self::TradingLiquidityUpdated { context_id, .. }
            | Self::FlashLoanCompleted { context_id, .. }
            | Self::PoolCollectionAdded { context_id, .. }
            | Self::PoolCollectionRemoved { context_id, .. }
            | Self::LatestPoolCollectionReplaced { context_id, .. } => *context_id,
        }
    }
}
