//! Flat role-based access control.
//!
//! Each gated component carries its own [`AccessControl`]: a flat set of
//! capability grants with no hierarchy. Role checks run before any state
//! read that depends on the role, and grants are persistent.

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::Address;
use crate::error::{NetworkError, Result};

/// The protocol's capability set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    /// May grant and revoke all other roles and call admin operations.
    Admin,
    /// May withdraw assets from a vault.
    AssetManager,
    /// May mint and burn network token through the master pool.
    NetworkTokenManager,
    /// May invoke pool-collection mutations on behalf of the network.
    PoolCollectionManager,
    /// May migrate pools between collections.
    MigrationManager,
    /// May mint pool tokens and the governance token.
    Minter,
}

/// Per-component grant table.
///
/// Constructed with an initial admin; every later grant or revoke must be
/// signed off by an address holding [`Role::Admin`] on this component.
#[derive(Debug, Clone, Default)]
pub struct AccessControl {
    grants: BTreeMap<Role, BTreeSet<Address>>,
}

impl AccessControl {
    /// Creates a grant table with `admin` holding [`Role::Admin`].
    #[must_use]
    pub fn new(admin: Address) -> Self {
        let mut grants: BTreeMap<Role, BTreeSet<Address>> = BTreeMap::new();
        grants.entry(Role::Admin).or_default().insert(admin);
        Self { grants }
    }

    /// Returns `true` if `account` holds `role`.
    #[must_use]
    pub fn has_role(&self, role: Role, account: Address) -> bool {
        self.grants
            .get(&role)
            .is_some_and(|members| members.contains(&account))
    }

    /// Fails with `AccessDenied` unless `account` holds `role`.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::AccessDenied`] if the role is missing.
    pub fn require(&self, role: Role, account: Address) -> Result<()> {
        if self.has_role(role, account) {
            Ok(())
        } else {
            Err(NetworkError::AccessDenied)
        }
    }

    /// Grants `role` to `account`. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::AccessDenied`] if `caller` is not an admin.
    pub fn grant(&mut self, caller: Address, role: Role, account: Address) -> Result<()> {
        self.require(Role::Admin, caller)?;
        self.grants.entry(role).or_default().insert(account);
        Ok(())
    }

    /// Revokes `role` from `account`. Succeeds even if the grant was
    /// absent.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::AccessDenied`] if `caller` is not an admin.
    pub fn revoke(&mut self, caller: Address, role: Role, account: Address) -> Result<()> {
        self.require(Role::Admin, caller)?;
        if let Some(members) = self.grants.get_mut(&role) {
            members.remove(&account);
        }
        Ok(())
    }
}
