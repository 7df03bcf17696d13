//! Two-phase withdrawal lifecycle.
//!
//! A provider who wants out first locks their pool tokens here
//! (`init_withdrawal`), waits out the lock duration, and then has a
//! bounded window to complete. Completion hands the locked pool tokens
//! to the network for burning; cancellation at any non-terminal point
//! returns them. A request that outlives its window simply goes stale:
//! it can still be cancelled and re-initiated, never completed.
//!
//! ```text
//! Initiated ──lock_duration──▶ Ready ──window──▶ Expired
//!     │                          │                  │
//!     └── cancel ◀───────────────┴── cancel ◀───────┘
//! ```

use std::collections::{BTreeMap, BTreeSet};

use alloy_primitives::U256;

use crate::access::{AccessControl, Role};
use crate::domain::Address;
use crate::error::{NetworkError, Result};
use crate::pool_token::{PoolTokenId, PoolTokenRegistry};

/// Default lock: seven days.
pub const DEFAULT_LOCK_DURATION: u32 = 7 * 24 * 60 * 60;

/// Default completion window: three days.
pub const DEFAULT_WITHDRAWAL_WINDOW: u32 = 3 * 24 * 60 * 60;

/// One pending request. Pool tokens it covers sit in this component's
/// custody until completion or cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawalRequest {
    /// Request id, unique for the lifetime of the component.
    pub id: u64,
    /// The provider who locked the pool tokens.
    pub provider: Address,
    /// The share token being redeemed.
    pub pool_token: PoolTokenId,
    /// Locked share amount.
    pub pool_token_amount: U256,
    /// Timestamp of initiation.
    pub created_at: u32,
}

/// The two-phase withdrawal book.
#[derive(Debug, Clone)]
pub struct PendingWithdrawals {
    address: Address,
    access: AccessControl,
    requests: BTreeMap<u64, WithdrawalRequest>,
    by_provider: BTreeMap<Address, BTreeSet<u64>>,
    lock_duration: u32,
    withdrawal_window_duration: u32,
    next_id: u64,
}

impl PendingWithdrawals {
    /// Creates the book with default durations. `address` is the custody
    /// identity holding locked pool tokens.
    #[must_use]
    pub fn new(address: Address, admin: Address) -> Self {
        Self {
            address,
            access: AccessControl::new(admin),
            requests: BTreeMap::new(),
            by_provider: BTreeMap::new(),
            lock_duration: DEFAULT_LOCK_DURATION,
            withdrawal_window_duration: DEFAULT_WITHDRAWAL_WINDOW,
            next_id: 0,
        }
    }

    /// Returns the custody address.
    #[must_use]
    pub const fn address(&self) -> Address {
        self.address
    }

    /// Returns the current lock duration in seconds.
    #[must_use]
    pub const fn lock_duration(&self) -> u32 {
        self.lock_duration
    }

    /// Returns the current completion window in seconds.
    #[must_use]
    pub const fn withdrawal_window_duration(&self) -> u32 {
        self.withdrawal_window_duration
    }

    /// Sets the lock duration.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::AccessDenied`] unless `caller` is an admin.
    pub fn set_lock_duration(&mut self, caller: Address, seconds: u32) -> Result<()> {
        self.access.require(Role::Admin, caller)?;
        self.lock_duration = seconds;
        Ok(())
    }

    /// Sets the completion window.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::AccessDenied`] unless `caller` is an admin.
    pub fn set_withdrawal_window_duration(&mut self, caller: Address, seconds: u32) -> Result<()> {
        self.access.require(Role::Admin, caller)?;
        self.withdrawal_window_duration = seconds;
        Ok(())
    }

    /// Locks `amount` of `pool_token` and opens a request.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::ZeroValue`] for a zero amount.
    /// - [`NetworkError::InsufficientBalance`] if the provider holds
    ///   fewer shares.
    pub fn init_withdrawal(
        &mut self,
        registry: &mut PoolTokenRegistry,
        provider: Address,
        pool_token: PoolTokenId,
        amount: U256,
        now: u32,
    ) -> Result<u64> {
        if amount.is_zero() {
            return Err(NetworkError::ZeroValue);
        }
        registry.transfer(pool_token, provider, self.address, amount)?;

        let id = self.next_id;
        self.next_id += 1;
        self.requests.insert(
            id,
            WithdrawalRequest {
                id,
                provider,
                pool_token,
                pool_token_amount: amount,
                created_at: now,
            },
        );
        self.by_provider.entry(provider).or_default().insert(id);
        Ok(id)
    }

    /// Completes a request inside its ready window and removes it.
    ///
    /// The locked pool tokens remain in custody; the caller (the network)
    /// burns them from the custody address as part of the payout.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::DoesNotExist`] for an unknown id.
    /// - [`NetworkError::WithdrawalNotAllowed`] if `provider` does not
    ///   own the request, the lock has not elapsed, or the window has
    ///   passed.
    pub fn complete_withdrawal(
        &mut self,
        id: u64,
        provider: Address,
        now: u32,
    ) -> Result<WithdrawalRequest> {
        let request = *self.requests.get(&id).ok_or(NetworkError::DoesNotExist)?;
        if request.provider != provider || !self.in_ready_window(&request, now) {
            return Err(NetworkError::WithdrawalNotAllowed);
        }
        self.remove(id, provider);
        Ok(request)
    }

    /// Cancels a request in any non-terminal state, returning the locked
    /// pool tokens to the provider.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::DoesNotExist`] for an unknown id.
    /// - [`NetworkError::WithdrawalNotAllowed`] if `provider` does not
    ///   own the request.
    pub fn cancel_withdrawal(
        &mut self,
        registry: &mut PoolTokenRegistry,
        id: u64,
        provider: Address,
    ) -> Result<()> {
        let request = *self.requests.get(&id).ok_or(NetworkError::DoesNotExist)?;
        if request.provider != provider {
            return Err(NetworkError::WithdrawalNotAllowed);
        }
        registry.transfer(
            request.pool_token,
            self.address,
            provider,
            request.pool_token_amount,
        )?;
        self.remove(id, provider);
        Ok(())
    }

    /// Returns a stored request.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::DoesNotExist`] for an unknown id.
    pub fn withdrawal_request(&self, id: u64) -> Result<WithdrawalRequest> {
        self.requests.get(&id).copied().ok_or(NetworkError::DoesNotExist)
    }

    /// Returns all open request ids for `provider`, ascending.
    #[must_use]
    pub fn withdrawal_request_ids(&self, provider: Address) -> Vec<u64> {
        self.by_provider
            .get(&provider)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Returns `true` if the request would complete at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::DoesNotExist`] for an unknown id.
    pub fn is_ready(&self, id: u64, now: u32) -> Result<bool> {
        let request = self.requests.get(&id).ok_or(NetworkError::DoesNotExist)?;
        Ok(self.in_ready_window(request, now))
    }

    fn in_ready_window(&self, request: &WithdrawalRequest, now: u32) -> bool {
        let ready_at = request.created_at.saturating_add(self.lock_duration);
        let expires_at = ready_at.saturating_add(self.withdrawal_window_duration);
        now >= ready_at && now < expires_at
    }

    fn remove(&mut self, id: u64, provider: Address) {
        self.requests.remove(&id);
        if let Some(ids) = self.by_provider.get_mut(&provider) {
            ids.remove(&id);
            if ids.is_empty() {
                self.by_provider.remove(&provider);
            }
        }
    }
}
