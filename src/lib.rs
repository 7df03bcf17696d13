//! # Nexus AMM
//!
//! Core of a single-sided-exposure AMM liquidity network: pools pair one
//! protocol-designated *network token* (NT) against arbitrary *base
//! tokens* (BT), and a central [`Network`](network::Network) facade
//! orchestrates deposits, time-locked withdrawals with impermanent-loss
//! compensation, bonding-curve trades with stable-rate protection, flash
//! loans, and atomic pool migration between collection versions.
//!
//! # Quick Start
//!
//! ```rust
//! use std::rc::Rc;
//!
//! use alloy_primitives::U256;
//! use nexus_amm::domain::{Address, Token};
//! use nexus_amm::network::Network;
//! use nexus_amm::pools::PoolCollection;
//! use nexus_amm::traits::ManualClock;
//!
//! let admin = Address::from_bytes([1u8; 32]);
//! let provider = Address::from_bytes([5u8; 32]);
//! let nt = Token::new(Address::from_bytes([0xA0; 32]));
//! let gov = Token::new(Address::from_bytes([0xA1; 32]));
//! let base = Token::new(Address::from_bytes([0xB0; 32]));
//!
//! let clock = Rc::new(ManualClock::new(0));
//! let mut network = Network::new(admin, nt, gov, Box::new(clock));
//!
//! // 1. Register a pool collection and whitelist the base token.
//! let collection = PoolCollection::new(Address::from_bytes([50u8; 32]), admin, 1, 1);
//! network.add_pool_collection(admin, collection)?;
//! network.settings_mut().add_token_to_whitelist(admin, base)?;
//!
//! // 2. Create the pool and fund the provider.
//! network.create_pool(admin, 1, base)?;
//! network.ledger_mut().mint(base, provider, U256::from(10_000u64))?;
//!
//! // 3. Deposit: shares are minted one-to-one into an empty pool.
//! let shares = network.deposit(provider, base, U256::from(10_000u64), U256::ZERO)?;
//! assert_eq!(shares, U256::from(10_000u64));
//! # Ok::<(), nexus_amm::error::NetworkError>(())
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐
//! │   Network     │  entry point: routing, reentrancy guard, events
//! └──────┬───────┘
//!        │ orchestrates
//!        ▼
//! ┌──────────────┐   ┌────────────┐   ┌────────────────────┐
//! │ PoolCollection│   │ MasterPool │   │ PendingWithdrawals │
//! │  (BT pools)   │◀─▶│ (NT side)  │   │  (two-phase exits) │
//! └──────┬───────┘   └──────┬─────┘   └────────────────────┘
//!        │ accounting        │ funding
//!        ▼                   ▼
//! ┌──────────────────────────────────┐
//! │ Vaults · PoolTokenRegistry · Ledger │
//! └──────────────────────────────────┘
//! ```
//!
//! # Module Guide
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`domain`] | Validated value types: [`Address`](domain::Address), [`Token`](domain::Token), [`Fraction`](domain::Fraction), [`PpmRate`](domain::PpmRate) |
//! | [`math`] | 256-bit `mul_div`, trade pricing, rate smoothing, the withdrawal solver |
//! | [`traits`] | Injected seams: [`Clock`](traits::Clock), [`FlashLoanRecipient`](traits::FlashLoanRecipient) |
//! | [`pools`] | [`PoolCollection`](pools::PoolCollection), [`MasterPool`](pools::MasterPool), the [`Pool`](pools::Pool) record |
//! | [`network`] | The [`Network`](network::Network) facade, events, context ids |
//! | [`settings`] | Global admin knobs |
//! | [`vault`] | Pausable role-gated custodians |
//! | [`pending_withdrawals`] | Two-phase withdrawal lifecycle |
//! | [`upgrader`] | Atomic pool migration between collections |
//! | [`error`] | [`NetworkError`](error::NetworkError) unified error enum |
//! | [`prelude`] | Convenience re-exports |

pub mod access;
pub mod domain;
pub mod error;
pub mod ledger;
pub mod math;
pub mod network;
pub mod pending_withdrawals;
pub mod pool_token;
pub mod pools;
pub mod prelude;
pub mod settings;
pub mod traits;
pub mod upgrader;
pub mod vault;
