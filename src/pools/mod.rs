//! Pool engines: the per-base-token collection and the network-token
//! master pool.
//!
//! [`PoolCollection`] owns one [`Pool`] record per base token and runs
//! the economic operations on them; [`MasterPool`] is the network-token
//! accountant every collection leans on for funding. Both are driven
//! exclusively through the network facade in production.

mod collection;
mod master_pool;
mod pool;

#[cfg(test)]
mod proptest_properties;

pub use collection::{DepositAmounts, PoolCollection, TradeKind, TradeResult};
pub use master_pool::MasterPool;
pub use pool::{AverageRate, Pool};
