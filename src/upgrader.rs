//! Atomic pool migration between collection versions.
//!
//! The upgrader moves one pool's entire record from the collection that
//! owns it to the newest registered collection of the same pool type,
//! re-pointing the pool token's mint authority on the way. Everything is
//! validated up front so the move either happens completely or not at
//! all; liquidity-provider balances and the pool-token identity are
//! untouched.

use crate::access::{AccessControl, Role};
use crate::domain::{Address, Token};
use crate::error::{NetworkError, Result};
use crate::pool_token::PoolTokenRegistry;
use crate::pools::PoolCollection;

/// The migration driver. Holds no pool state of its own; it needs the
/// migration-manager role on every collection it moves pools between.
#[derive(Debug, Clone)]
pub struct PoolCollectionUpgrader {
    address: Address,
    access: AccessControl,
}

impl PoolCollectionUpgrader {
    /// Creates the upgrader.
    #[must_use]
    pub fn new(address: Address, admin: Address) -> Self {
        Self {
            address,
            access: AccessControl::new(admin),
        }
    }

    /// The upgrader's component address.
    #[must_use]
    pub const fn address(&self) -> Address {
        self.address
    }

    /// Grants a role on the upgrader.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::AccessDenied`] unless `caller` is an admin.
    pub fn grant_role(&mut self, caller: Address, role: Role, account: Address) -> Result<()> {
        self.access.grant(caller, role, account)
    }

    /// Moves `token`'s pool to the newest same-type collection.
    ///
    /// Returns the index of the destination collection within
    /// `collections`.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::AccessDenied`] unless `caller` holds
    ///   [`Role::MigrationManager`] here.
    /// - [`NetworkError::InvalidPool`] if no collection owns the pool.
    /// - [`NetworkError::InvalidPoolCollection`] if no strictly newer
    ///   collection of the same type exists, or the destination already
    ///   defines the pool.
    pub fn upgrade_pool(
        &self,
        caller: Address,
        collections: &mut [PoolCollection],
        registry: &mut PoolTokenRegistry,
        token: Token,
    ) -> Result<usize> {
        self.access.require(Role::MigrationManager, caller)?;

        let source_index = collections
            .iter()
            .position(|c| c.has_pool(token))
            .ok_or(NetworkError::InvalidPool("not owned by any collection"))?;
        let source_type = collections[source_index].pool_type();
        let source_version = collections[source_index].version();

        // Newest strictly-newer collection of the same type; collections
        // of other types are ignored.
        let dest_index = collections
            .iter()
            .enumerate()
            .filter(|(i, c)| {
                *i != source_index
                    && c.pool_type() == source_type
                    && c.version() > source_version
            })
            .max_by_key(|(_, c)| c.version())
            .map(|(i, _)| i)
            .ok_or(NetworkError::InvalidPoolCollection("no newer collection"))?;

        if collections[dest_index].has_pool(token) {
            return Err(NetworkError::InvalidPoolCollection(
                "destination already defines the pool",
            ));
        }

        let source_address = collections[source_index].address();
        let dest_address = collections[dest_index].address();

        let pool = collections[source_index].migrate_out(self.address, token)?;
        registry.transfer_ownership(source_address, pool.pool_token(), dest_address)?;
        collections[dest_index].migrate_in(self.address, pool)?;
        Ok(dest_index)
    }
}
