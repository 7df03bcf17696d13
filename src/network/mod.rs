//! The network facade.
//!
//! [`Network`] is the single entry point of the protocol. It owns every
//! component — ledger, settings, vaults, pool-token registry, master
//! pool, collections, pending withdrawals, upgrader — and orchestrates
//! them: routing operations to the right component, guarding against
//! reentrancy, hashing a context id per operation, and emitting events
//! after all state mutations.
//!
//! Operations are atomic: validation happens before mutation, guard
//! failures are computed from trial post-state, and the two paths that
//! must mutate before they can verify (multi-hop trades and flash
//! loans) snapshot the affected state and restore it on failure.

mod context;
mod events;

pub use context::ContextBuilder;
pub use events::{Event, FeeKind};

use alloy_primitives::{keccak256, U256};

use crate::access::{AccessControl, Role};
use crate::domain::{Address, Token};
use crate::error::{NetworkError, Result};
use crate::ledger::TokenLedger;
use crate::pending_withdrawals::PendingWithdrawals;
use crate::pool_token::{PoolTokenId, PoolTokenRegistry};
use crate::pools::{MasterPool, Pool, PoolCollection, TradeKind, TradeResult};
use crate::settings::NetworkSettings;
use crate::traits::{Clock, FlashLoanRecipient};
use crate::upgrader::PoolCollectionUpgrader;
use crate::vault::Vault;

/// A signature-bearing approval forwarded with `*_permitted` calls.
///
/// The signature itself is verified by the host token contract; the core
/// validates only what it owns — the deadline and the token's
/// eligibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permit {
    /// Latest timestamp at which the approval is valid.
    pub deadline: u32,
    /// Recovery id.
    pub v: u8,
    /// Signature half `r`.
    pub r: [u8; 32],
    /// Signature half `s`.
    pub s: [u8; 32],
}

/// The liquidity network.
pub struct Network {
    address: Address,
    access: AccessControl,
    nt_token: Token,
    gov_token: Token,
    clock: Box<dyn Clock>,
    ledger: TokenLedger,
    registry: PoolTokenRegistry,
    settings: NetworkSettings,
    master_vault: Vault,
    external_protection_vault: Vault,
    governance_vault: Vault,
    master_pool: MasterPool,
    pending: PendingWithdrawals,
    upgrader: PoolCollectionUpgrader,
    collections: Vec<PoolCollection>,
    latest_by_type: std::collections::BTreeMap<u16, Address>,
    events: Vec<Event>,
    entered: bool,
}

fn component_address(label: &str) -> Address {
    Address::from_bytes(keccak256(label.as_bytes()).0)
}

impl Network {
    /// Wires the network and all of its components, with `admin` holding
    /// the admin role everywhere.
    ///
    /// Component addresses are derived deterministically from labels;
    /// the network grants itself the operating roles it needs on each
    /// component.
    #[must_use]
    pub fn new(admin: Address, nt_token: Token, gov_token: Token, clock: Box<dyn Clock>) -> Self {
        let address = component_address("network");
        let master_vault_address = component_address("master-vault");
        let external_vault_address = component_address("external-protection-vault");
        let governance_vault_address = component_address("governance-vault");
        let master_pool_address = component_address("master-pool");
        let pending_address = component_address("pending-withdrawals");
        let upgrader_address = component_address("pool-collection-upgrader");

        let mut registry = PoolTokenRegistry::new();
        let master_pool_token = registry.create(master_pool_address, nt_token);

        let mut master_vault = Vault::new(master_vault_address, admin);
        let mut external_protection_vault = Vault::new(external_vault_address, admin);
        let mut governance_vault = Vault::new(governance_vault_address, admin);
        let mut master_pool = MasterPool::new(
            master_pool_address,
            admin,
            nt_token,
            gov_token,
            master_pool_token,
        );
        let mut upgrader = PoolCollectionUpgrader::new(upgrader_address, admin);

        // The network holds the operating roles on its components.
        let wired = master_vault
            .grant_role(admin, Role::AssetManager, address)
            .and_then(|()| external_protection_vault.grant_role(admin, Role::AssetManager, address))
            .and_then(|()| governance_vault.grant_role(admin, Role::AssetManager, address))
            .and_then(|()| master_pool.grant_role(admin, Role::NetworkTokenManager, address))
            .and_then(|()| upgrader.grant_role(admin, Role::MigrationManager, address));
        debug_assert!(wired.is_ok());

        Self {
            address,
            access: AccessControl::new(admin),
            nt_token,
            gov_token,
            clock,
            ledger: TokenLedger::new(),
            registry,
            settings: NetworkSettings::new(admin),
            master_vault,
            external_protection_vault,
            governance_vault,
            master_pool,
            pending: PendingWithdrawals::new(pending_address, admin),
            upgrader,
            collections: Vec::new(),
            latest_by_type: std::collections::BTreeMap::new(),
            events: Vec::new(),
            entered: false,
        }
    }

    // -- accessors ---------------------------------------------------------------

    /// The network's own component address.
    #[must_use]
    pub const fn address(&self) -> Address {
        self.address
    }

    /// The network token.
    #[must_use]
    pub const fn nt_token(&self) -> Token {
        self.nt_token
    }

    /// The governance token.
    #[must_use]
    pub const fn gov_token(&self) -> Token {
        self.gov_token
    }

    /// Current time from the injected clock.
    #[must_use]
    pub fn now(&self) -> u32 {
        self.clock.now()
    }

    /// Emitted events, oldest first.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// The global settings store.
    #[must_use]
    pub const fn settings(&self) -> &NetworkSettings {
        &self.settings
    }

    /// Mutable settings access for admin calls.
    pub fn settings_mut(&mut self) -> &mut NetworkSettings {
        &mut self.settings
    }

    /// The pending-withdrawals book.
    #[must_use]
    pub const fn pending_withdrawals(&self) -> &PendingWithdrawals {
        &self.pending
    }

    /// Mutable pending-withdrawals access for duration administration.
    pub fn pending_withdrawals_mut(&mut self) -> &mut PendingWithdrawals {
        &mut self.pending
    }

    /// The master vault.
    #[must_use]
    pub const fn master_vault(&self) -> &Vault {
        &self.master_vault
    }

    /// Mutable master-vault access for pause administration.
    pub fn master_vault_mut(&mut self) -> &mut Vault {
        &mut self.master_vault
    }

    /// The external protection vault.
    #[must_use]
    pub const fn external_protection_vault(&self) -> &Vault {
        &self.external_protection_vault
    }

    /// Mutable external-protection-vault access.
    pub fn external_protection_vault_mut(&mut self) -> &mut Vault {
        &mut self.external_protection_vault
    }

    /// The governance-level network-token vault. Same contract as the
    /// other vaults; holds treasury NT outside the trading flow.
    #[must_use]
    pub const fn governance_vault(&self) -> &Vault {
        &self.governance_vault
    }

    /// Mutable governance-vault access.
    pub fn governance_vault_mut(&mut self) -> &mut Vault {
        &mut self.governance_vault
    }

    /// The master pool.
    #[must_use]
    pub const fn master_pool(&self) -> &MasterPool {
        &self.master_pool
    }

    /// The pool-token registry.
    #[must_use]
    pub const fn registry(&self) -> &PoolTokenRegistry {
        &self.registry
    }

    /// The token ledger.
    #[must_use]
    pub const fn ledger(&self) -> &TokenLedger {
        &self.ledger
    }

    /// Mutable ledger access: test seeding and flash-loan repayment.
    pub fn ledger_mut(&mut self) -> &mut TokenLedger {
        &mut self.ledger
    }

    /// The latest collection address registered for `pool_type`.
    #[must_use]
    pub fn latest_pool_collection(&self, pool_type: u16) -> Option<Address> {
        self.latest_by_type.get(&pool_type).copied()
    }

    /// The collection currently owning `token`'s pool.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::DoesNotExist`] if no collection owns it.
    pub fn collection_of(&self, token: Token) -> Result<&PoolCollection> {
        let index = self.collection_index_for(token)?;
        Ok(&self.collections[index])
    }

    /// The pool record for `token`, wherever it lives.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::DoesNotExist`] if no collection owns it.
    pub fn pool(&self, token: Token) -> Result<&Pool> {
        self.collection_of(token)?.pool(token)
    }

    // -- collection management -----------------------------------------------------

    /// Registers a collection and wires the cross-component roles.
    ///
    /// `caller` must be the network admin and the admin of the incoming
    /// collection. A strictly newer version than the current latest of
    /// its type takes over as latest.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::AccessDenied`] on a missing admin role.
    /// - [`NetworkError::AlreadyExists`] on a duplicate address.
    pub fn add_pool_collection(
        &mut self,
        caller: Address,
        mut collection: PoolCollection,
    ) -> Result<()> {
        self.access.require(Role::Admin, caller)?;
        if self
            .collections
            .iter()
            .any(|c| c.address() == collection.address())
        {
            return Err(NetworkError::AlreadyExists);
        }

        collection.grant_role(caller, Role::PoolCollectionManager, self.address)?;
        collection.grant_role(caller, Role::MigrationManager, self.upgrader.address())?;
        self.master_pool
            .grant_role(caller, Role::NetworkTokenManager, collection.address())?;

        let pool_type = collection.pool_type();
        let version = collection.version();
        let collection_address = collection.address();
        let context_id = self.context(caller, "add_pool_collection")
            .address(collection_address)
            .finish();

        self.collections.push(collection);
        self.events.push(Event::PoolCollectionAdded {
            context_id,
            pool_type,
            collection: collection_address,
        });

        let previous = self.latest_pool_collection(pool_type);
        let newer = match previous {
            None => true,
            Some(latest) => self
                .collections
                .iter()
                .find(|c| c.address() == latest)
                .map_or(true, |latest| version > latest.version()),
        };
        if newer {
            self.latest_by_type.insert(pool_type, collection_address);
            self.events.push(Event::LatestPoolCollectionReplaced {
                context_id,
                pool_type,
                previous,
                latest: Some(collection_address),
            });
        }
        Ok(())
    }

    /// Deregisters an empty collection and re-elects the latest among
    /// the remaining collections of the same type.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::AccessDenied`] unless `caller` is the admin.
    /// - [`NetworkError::DoesNotExist`] for an unknown address.
    /// - [`NetworkError::NotEmpty`] while the collection still owns
    ///   pools.
    pub fn remove_pool_collection(
        &mut self,
        caller: Address,
        collection_address: Address,
    ) -> Result<()> {
        self.access.require(Role::Admin, caller)?;
        let index = self
            .collections
            .iter()
            .position(|c| c.address() == collection_address)
            .ok_or(NetworkError::DoesNotExist)?;
        if self.collections[index].pool_count() != 0 {
            return Err(NetworkError::NotEmpty);
        }

        let pool_type = self.collections[index].pool_type();
        let context_id = self
            .context(caller, "remove_pool_collection")
            .address(collection_address)
            .finish();
        self.collections.remove(index);
        self.events.push(Event::PoolCollectionRemoved {
            context_id,
            pool_type,
            collection: collection_address,
        });

        if self.latest_pool_collection(pool_type) == Some(collection_address) {
            let latest = self
                .collections
                .iter()
                .filter(|c| c.pool_type() == pool_type)
                .max_by_key(|c| c.version())
                .map(PoolCollection::address);
            match latest {
                Some(address) => {
                    self.latest_by_type.insert(pool_type, address);
                }
                None => {
                    self.latest_by_type.remove(&pool_type);
                }
            }
            self.events.push(Event::LatestPoolCollectionReplaced {
                context_id,
                pool_type,
                previous: Some(collection_address),
                latest,
            });
        }
        Ok(())
    }

    /// Creates a pool for `token` in the latest collection of
    /// `pool_type`.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::AccessDenied`] unless `caller` is the admin.
    /// - [`NetworkError::InvalidToken`] for the network or governance
    ///   token.
    /// - [`NetworkError::InvalidType`] when no collection of the type is
    ///   registered.
    /// - Collection-level failures (`NotWhitelisted`, `AlreadyExists`).
    pub fn create_pool(&mut self, caller: Address, pool_type: u16, token: Token) -> Result<PoolTokenId> {
        self.access.require(Role::Admin, caller)?;
        if token == self.nt_token || token == self.gov_token {
            return Err(NetworkError::InvalidToken(
                "protocol tokens cannot back a pool",
            ));
        }
        let latest = self
            .latest_pool_collection(pool_type)
            .ok_or(NetworkError::InvalidType)?;
        let index = self
            .collections
            .iter()
            .position(|c| c.address() == latest)
            .ok_or(NetworkError::InvalidType)?;

        let pool_token =
            self.collections[index].create_pool(self.address, &self.settings, &mut self.registry, token)?;
        let context_id = self.context(caller, "create_pool").token(token).finish();
        self.events.push(Event::PoolAdded {
            context_id,
            pool_type,
            token,
        });
        Ok(pool_token)
    }

    /// Moves each listed pool to the newest collection of its type,
    /// silently skipping pools that are unknown or already current.
    ///
    /// Returns the tokens that actually moved.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::AccessDenied`] unless `caller` is the admin.
    /// - Non-skippable failures (role misconfiguration) propagate.
    pub fn upgrade_pools(&mut self, caller: Address, tokens: &[Token]) -> Result<Vec<Token>> {
        self.access.require(Role::Admin, caller)?;
        let mut upgraded = Vec::new();
        for &token in tokens {
            match self.upgrader.upgrade_pool(
                self.address,
                &mut self.collections,
                &mut self.registry,
                token,
            ) {
                Ok(_) => upgraded.push(token),
                Err(NetworkError::InvalidPool(_) | NetworkError::InvalidPoolCollection(_)) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(upgraded)
    }

    // -- trading lifecycle administration -------------------------------------------

    /// Bootstraps trading for `token` at the given virtual rate.
    ///
    /// # Errors
    ///
    /// See [`PoolCollection::enable_trading`]; `caller` must be the
    /// collection admin.
    pub fn enable_trading(
        &mut self,
        caller: Address,
        token: Token,
        nt_virtual: u128,
        base_virtual: u128,
    ) -> Result<(u128, u128)> {
        let now = self.clock.now();
        let index = self.collection_index_for(token)?;
        let (base_liquidity, nt_liquidity) = self.collections[index].enable_trading(
            caller,
            &self.settings,
            &mut self.registry,
            &mut self.master_pool,
            &mut self.ledger,
            &self.master_vault,
            token,
            nt_virtual,
            base_virtual,
            now,
        )?;
        let context_id = self.context(caller, "enable_trading").token(token).finish();
        self.events.push(Event::TradingLiquidityUpdated {
            context_id,
            token,
            base_liquidity,
            nt_liquidity,
        });
        Ok((base_liquidity, nt_liquidity))
    }

    /// Shuts trading down for `token`.
    ///
    /// # Errors
    ///
    /// See [`PoolCollection::disable_trading`]; `caller` must be the
    /// collection admin.
    pub fn disable_trading(&mut self, caller: Address, token: Token) -> Result<()> {
        let index = self.collection_index_for(token)?;
        self.collections[index].disable_trading(
            caller,
            &mut self.registry,
            &mut self.master_pool,
            &mut self.ledger,
            self.master_vault.address(),
            token,
        )?;
        let context_id = self.context(caller, "disable_trading").token(token).finish();
        self.events.push(Event::TradingLiquidityUpdated {
            context_id,
            token,
            base_liquidity: 0,
            nt_liquidity: 0,
        });
        Ok(())
    }

    /// Sets `token`'s trading fee.
    ///
    /// # Errors
    ///
    /// See [`PoolCollection::set_trading_fee`].
    pub fn set_trading_fee(
        &mut self,
        caller: Address,
        token: Token,
        fee: crate::domain::PpmRate,
    ) -> Result<()> {
        let index = self.collection_index_for(token)?;
        self.collections[index].set_trading_fee(caller, token, fee)
    }

    /// Sets `token`'s deposit limit.
    ///
    /// # Errors
    ///
    /// See [`PoolCollection::set_deposit_limit`].
    pub fn set_deposit_limit(&mut self, caller: Address, token: Token, limit: U256) -> Result<()> {
        let index = self.collection_index_for(token)?;
        self.collections[index].set_deposit_limit(caller, token, limit)
    }

    /// Opens or closes deposits for `token`.
    ///
    /// # Errors
    ///
    /// See [`PoolCollection::enable_depositing`].
    pub fn enable_depositing(&mut self, caller: Address, token: Token, enabled: bool) -> Result<()> {
        let index = self.collection_index_for(token)?;
        self.collections[index].enable_depositing(caller, token, enabled)
    }

    // -- deposits ---------------------------------------------------------------------

    /// Deposits for the sender themselves. See [`deposit_for`](Self::deposit_for).
    ///
    /// # Errors
    ///
    /// Same as [`deposit_for`](Self::deposit_for).
    pub fn deposit(
        &mut self,
        sender: Address,
        token: Token,
        amount: U256,
        value: U256,
    ) -> Result<U256> {
        self.deposit_for(sender, sender, token, amount, value)
    }

    /// Deposits `amount` of `token` from `sender` on behalf of
    /// `provider`, returning the pool-token amount minted.
    ///
    /// `value` is the attached native value: it must equal `amount` for
    /// the native token and be zero otherwise.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::Reentrant`] inside another operation.
    /// - [`NetworkError::InvalidAddress`] for a zero provider.
    /// - [`NetworkError::ZeroValue`] / [`NetworkError::EthAmountMismatch`]
    ///   on bad inputs.
    /// - [`NetworkError::InsufficientBalance`] if the sender cannot fund
    ///   the deposit.
    /// - Pool-level failures (`DoesNotExist`, `DepositingDisabled`,
    ///   `DepositLimitExceeded`).
    pub fn deposit_for(
        &mut self,
        sender: Address,
        provider: Address,
        token: Token,
        amount: U256,
        value: U256,
    ) -> Result<U256> {
        self.non_reentrant(|net| {
            if provider.is_zero() {
                return Err(NetworkError::InvalidAddress("zero provider"));
            }
            if amount.is_zero() {
                return Err(NetworkError::ZeroValue);
            }
            check_value(token, amount, value)?;
            if net.ledger.balance_of(token, sender) < amount {
                return Err(NetworkError::InsufficientBalance);
            }

            let now = net.clock.now();
            let context_id = ContextBuilder::new(sender, now, "deposit")
                .address(provider)
                .token(token)
                .amount(amount)
                .finish();

            if token == net.nt_token {
                let shares = net.master_pool.deposit(
                    net.address,
                    &mut net.registry,
                    &mut net.ledger,
                    provider,
                    amount,
                )?;
                net.events.push(Event::NetworkTokenDeposited {
                    context_id,
                    provider,
                    amount,
                    pool_token_amount: shares,
                    gov_token_amount: shares,
                });
                return Ok(shares);
            }

            let index = net.collection_index_for(token)?;
            let result = net.collections[index].deposit(
                net.address,
                &net.settings,
                &mut net.registry,
                &mut net.master_pool,
                &mut net.ledger,
                net.master_vault.address(),
                provider,
                token,
                amount,
            )?;
            net.ledger
                .transfer(token, sender, net.master_vault.address(), amount)?;

            let supply = net.registry.total_supply(result.pool_token)?;
            net.events.push(Event::BaseTokenDeposited {
                context_id,
                token,
                provider,
                amount,
                pool_token_amount: result.pool_token_amount,
            });
            net.events.push(Event::TotalLiquidityUpdated {
                context_id,
                token,
                staked_balance: result.staked_balance,
                pool_token_supply: supply,
            });
            net.events.push(Event::TradingLiquidityUpdated {
                context_id,
                token,
                base_liquidity: result.base_liquidity,
                nt_liquidity: result.nt_liquidity,
            });
            Ok(result.pool_token_amount)
        })
    }

    /// Permit-backed variant of [`deposit`](Self::deposit).
    ///
    /// # Errors
    ///
    /// Additionally [`NetworkError::PermitUnsupported`] for the native
    /// and network tokens and [`NetworkError::DeadlineExpired`] past the
    /// permit deadline.
    pub fn deposit_permitted(
        &mut self,
        sender: Address,
        token: Token,
        amount: U256,
        permit: Permit,
    ) -> Result<U256> {
        self.deposit_for_permitted(sender, sender, token, amount, permit)
    }

    /// Permit-backed variant of [`deposit_for`](Self::deposit_for).
    ///
    /// # Errors
    ///
    /// See [`deposit_permitted`](Self::deposit_permitted).
    pub fn deposit_for_permitted(
        &mut self,
        sender: Address,
        provider: Address,
        token: Token,
        amount: U256,
        permit: Permit,
    ) -> Result<U256> {
        self.check_permit(token, permit)?;
        self.deposit_for(sender, provider, token, amount, U256::ZERO)
    }

    // -- withdrawals -------------------------------------------------------------------

    /// Opens a two-phase withdrawal for `amount` of `pool_token`.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::Reentrant`] inside another operation.
    /// - Book-level failures (`ZeroValue`, `InsufficientBalance`).
    pub fn init_withdrawal(
        &mut self,
        provider: Address,
        pool_token: PoolTokenId,
        amount: U256,
    ) -> Result<u64> {
        self.non_reentrant(|net| {
            let now = net.clock.now();
            net.pending
                .init_withdrawal(&mut net.registry, provider, pool_token, amount, now)
        })
    }

    /// Cancels a pending withdrawal, returning the locked pool tokens.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::Reentrant`] inside another operation.
    /// - Book-level failures (`DoesNotExist`, `WithdrawalNotAllowed`).
    pub fn cancel_withdrawal(&mut self, provider: Address, id: u64) -> Result<()> {
        self.non_reentrant(|net| {
            net.pending
                .cancel_withdrawal(&mut net.registry, id, provider)
        })
    }

    /// Completes a ready withdrawal: burns the locked pool tokens, pays
    /// the provider from the vaults, and mints NT compensation for any
    /// shortfall. Returns the reserve-token amount paid out.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::Reentrant`] inside another operation.
    /// - [`NetworkError::WithdrawalNotAllowed`] outside the ready
    ///   window.
    /// - [`NetworkError::Paused`] while a needed vault is paused.
    pub fn withdraw(&mut self, provider: Address, id: u64) -> Result<U256> {
        self.non_reentrant(|net| {
            if net.master_vault.is_paused() || net.external_protection_vault.is_paused() {
                return Err(NetworkError::Paused);
            }
            let now = net.clock.now();
            let request = net.pending.complete_withdrawal(id, provider, now)?;
            let reserve = net.registry.reserve_token(request.pool_token)?;
            let context_id = ContextBuilder::new(provider, now, "withdraw")
                .id(id)
                .token(reserve)
                .amount(request.pool_token_amount)
                .finish();

            if reserve == net.nt_token {
                let paid = net.master_pool.withdraw(
                    net.address,
                    &mut net.registry,
                    &mut net.ledger,
                    provider,
                    net.pending.address(),
                    request.pool_token_amount,
                    net.settings.withdrawal_fee(),
                )?;
                net.events.push(Event::NetworkTokenWithdrawn {
                    context_id,
                    provider,
                    nt_amount: paid,
                    pool_token_amount: request.pool_token_amount,
                });
                return Ok(paid);
            }

            let index = net.collection_index_for(reserve)?;
            let amounts = net.collections[index].withdraw(
                net.address,
                &net.settings,
                &mut net.registry,
                &mut net.master_pool,
                &mut net.ledger,
                &net.master_vault,
                &net.external_protection_vault,
                reserve,
                request.pool_token_amount,
                net.pending.address(),
            )?;

            if !amounts.base_from_vault.is_zero() {
                net.master_vault.withdraw(
                    net.address,
                    &mut net.ledger,
                    reserve,
                    provider,
                    amounts.base_from_vault,
                )?;
            }
            if !amounts.base_from_external.is_zero() {
                net.external_protection_vault.withdraw(
                    net.address,
                    &mut net.ledger,
                    reserve,
                    provider,
                    amounts.base_from_external,
                )?;
            }
            if !amounts.nt_to_provider.is_zero() {
                net.master_pool.mint_nt_to(
                    net.address,
                    &mut net.ledger,
                    provider,
                    amounts.nt_to_provider,
                )?;
            }

            let pool = net.collections[index].pool(reserve)?;
            let supply = net.registry.total_supply(pool.pool_token())?;
            net.events.push(Event::BaseTokenWithdrawn {
                context_id,
                token: reserve,
                provider,
                base_amount: amounts.base_from_vault + amounts.base_from_external,
                external_protection_amount: amounts.base_from_external,
                nt_amount: amounts.nt_to_provider,
                withdrawal_fee: amounts.base_fee,
            });
            net.events.push(Event::TotalLiquidityUpdated {
                context_id,
                token: reserve,
                staked_balance: pool.staked_balance(),
                pool_token_supply: supply,
            });
            net.events.push(Event::TradingLiquidityUpdated {
                context_id,
                token: reserve,
                base_liquidity: pool.base_trading_liquidity(),
                nt_liquidity: pool.nt_trading_liquidity(),
            });
            Ok(amounts.base_from_vault + amounts.base_from_external)
        })
    }

    // -- trading -----------------------------------------------------------------------

    /// Trades `amount_in` of `source_token` for `target_token`, routing
    /// through the network token. Returns the target amount paid out.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::Reentrant`] inside another operation.
    /// - [`NetworkError::InvalidToken`] for a same-token trade.
    /// - [`NetworkError::DeadlineExpired`] past `deadline`.
    /// - [`NetworkError::EthAmountMismatch`] on a bad native value.
    /// - Hop-level failures (`TradingDisabled`, `ReturnAmountTooLow`,
    ///   `RateUnstable`); the whole trade rolls back.
    #[allow(clippy::too_many_arguments)]
    pub fn trade(
        &mut self,
        trader: Address,
        source_token: Token,
        target_token: Token,
        amount_in: U256,
        min_return: U256,
        deadline: u32,
        value: U256,
    ) -> Result<U256> {
        self.non_reentrant(|net| {
            if trader.is_zero() {
                return Err(NetworkError::InvalidAddress("zero trader"));
            }
            if source_token == target_token {
                return Err(NetworkError::InvalidToken("same-token trade"));
            }
            if amount_in.is_zero() {
                return Err(NetworkError::ZeroValue);
            }
            let now = net.clock.now();
            if now > deadline {
                return Err(NetworkError::DeadlineExpired);
            }
            check_value(source_token, amount_in, value)?;
            if net.ledger.balance_of(source_token, trader) < amount_in {
                return Err(NetworkError::InsufficientBalance);
            }

            // Hops mutate collections and the master pool before the
            // last one can fail; snapshot both so a late failure
            // commits nothing.
            let collections_snapshot = net.collections.clone();
            let master_snapshot = net.master_pool.clone();
            let hops =
                match net.execute_hops(source_token, target_token, amount_in, min_return, now) {
                    Ok(hops) => hops,
                    Err(err) => {
                        net.collections = collections_snapshot;
                        net.master_pool = master_snapshot;
                        return Err(err);
                    }
                };
            let amount_out = hops
                .last()
                .map(|(_, _, result)| result.amount_out)
                .ok_or(NetworkError::InvalidPool("empty trade route"))?;

            net.ledger
                .transfer(source_token, trader, net.master_vault.address(), amount_in)?;
            net.master_vault.withdraw(
                net.address,
                &mut net.ledger,
                target_token,
                trader,
                amount_out,
            )?;

            let context_id = ContextBuilder::new(trader, now, "trade")
                .token(source_token)
                .token(target_token)
                .amount(amount_in)
                .finish();
            net.events.push(Event::TokensTraded {
                context_id,
                trader,
                source_token,
                target_token,
                source_amount: amount_in,
                target_amount: amount_out,
            });
            for (pool_token, kind, result) in hops {
                if !result.fee.is_zero() {
                    let fee_token = match kind {
                        TradeKind::BaseForNetworkToken => net.nt_token,
                        TradeKind::NetworkTokenForBase => pool_token,
                    };
                    net.events.push(Event::FeesCollected {
                        context_id,
                        token: fee_token,
                        kind: FeeKind::Trading,
                        amount: result.fee,
                    });
                }
                net.events.push(Event::TradingLiquidityUpdated {
                    context_id,
                    token: pool_token,
                    base_liquidity: result.base_liquidity,
                    nt_liquidity: result.nt_liquidity,
                });
            }
            Ok(amount_out)
        })
    }

    /// Permit-backed variant of [`trade`](Self::trade).
    ///
    /// # Errors
    ///
    /// Additionally [`NetworkError::PermitUnsupported`] when the source
    /// is the native or network token.
    #[allow(clippy::too_many_arguments)]
    pub fn trade_permitted(
        &mut self,
        trader: Address,
        source_token: Token,
        target_token: Token,
        amount_in: U256,
        min_return: U256,
        deadline: u32,
        permit: Permit,
    ) -> Result<U256> {
        self.check_permit(source_token, permit)?;
        self.trade(
            trader,
            source_token,
            target_token,
            amount_in,
            min_return,
            deadline,
            U256::ZERO,
        )
    }

    // -- flash loans ----------------------------------------------------------------------

    /// Lends `amount` of `token` to `recipient` for the duration of the
    /// callback; verifies the return of `amount + fee` and credits the
    /// fee to the pool's staked balance. Returns the fee.
    ///
    /// Any failure — including a reentrant callback or a short return —
    /// restores all balances.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::Reentrant`] inside another operation.
    /// - [`NetworkError::InvalidToken`] for a token without a pool.
    /// - [`NetworkError::InsufficientBalance`] if the vault cannot fund
    ///   the loan.
    /// - [`NetworkError::InsufficientFlashLoanReturn`] on a short
    ///   return.
    pub fn flash_loan(
        &mut self,
        sender: Address,
        token: Token,
        amount: U256,
        recipient: &mut dyn FlashLoanRecipient,
        data: &[u8],
    ) -> Result<U256> {
        self.non_reentrant(|net| {
            if amount.is_zero() {
                return Err(NetworkError::ZeroValue);
            }
            let pool_index = if token == net.nt_token {
                None
            } else {
                Some(
                    net.collection_index_for(token)
                        .map_err(|_| NetworkError::InvalidToken("no pool for token"))?,
                )
            };

            let vault_before = net.master_vault.balance(&net.ledger, token);
            if vault_before < amount {
                return Err(NetworkError::InsufficientBalance);
            }
            let now = net.clock.now();
            let fee = net
                .settings
                .flash_loan_fee()
                .apply(amount, crate::domain::Rounding::Down)?;

            let snapshot = net.ledger.clone();
            let borrower = recipient.address();
            let outcome = (|| -> Result<()> {
                net.master_vault
                    .withdraw(net.address, &mut net.ledger, token, borrower, amount)?;
                recipient.on_flash_loan(net, sender, token, amount, fee, data)?;
                if net.master_vault.balance(&net.ledger, token) < vault_before + fee {
                    return Err(NetworkError::InsufficientFlashLoanReturn);
                }
                Ok(())
            })();
            if let Err(err) = outcome {
                net.ledger = snapshot;
                return Err(err);
            }

            match pool_index {
                Some(index) => net.collections[index].collect_fee(net.address, token, fee)?,
                None => net.master_pool.collect_fee(net.address, fee)?,
            }

            let context_id = ContextBuilder::new(sender, now, "flash_loan")
                .token(token)
                .amount(amount)
                .finish();
            net.events.push(Event::FlashLoanCompleted {
                context_id,
                token,
                borrower: recipient.address(),
                amount,
                fee,
            });
            net.events.push(Event::FeesCollected {
                context_id,
                token,
                kind: FeeKind::FlashLoan,
                amount: fee,
            });
            Ok(fee)
        })
    }

    // -- internals --------------------------------------------------------------------------

    fn non_reentrant<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.entered {
            return Err(NetworkError::Reentrant);
        }
        self.entered = true;
        let result = f(self);
        self.entered = false;
        result
    }

    fn collection_index_for(&self, token: Token) -> Result<usize> {
        self.collections
            .iter()
            .position(|c| c.has_pool(token))
            .ok_or(NetworkError::DoesNotExist)
    }

    fn check_permit(&self, token: Token, permit: Permit) -> Result<()> {
        if token.is_native() || token == self.nt_token {
            return Err(NetworkError::PermitUnsupported);
        }
        if self.clock.now() > permit.deadline {
            return Err(NetworkError::DeadlineExpired);
        }
        Ok(())
    }

    fn context(&self, sender: Address, op: &str) -> ContextBuilder {
        ContextBuilder::new(sender, self.clock.now(), op)
    }

    /// Runs the one or two hops of a trade. On a two-hop route the
    /// intermediate NT never leaves the master vault.
    fn execute_hops(
        &mut self,
        source_token: Token,
        target_token: Token,
        amount_in: U256,
        min_return: U256,
        now: u32,
    ) -> Result<Vec<(Token, TradeKind, TradeResult)>> {
        if source_token == self.nt_token {
            let index = self.collection_index_for(target_token)?;
            let result = self.collections[index].trade(
                self.address,
                &self.settings,
                &mut self.master_pool,
                target_token,
                TradeKind::NetworkTokenForBase,
                amount_in,
                min_return,
                now,
            )?;
            return Ok(vec![(target_token, TradeKind::NetworkTokenForBase, result)]);
        }
        if target_token == self.nt_token {
            let index = self.collection_index_for(source_token)?;
            let result = self.collections[index].trade(
                self.address,
                &self.settings,
                &mut self.master_pool,
                source_token,
                TradeKind::BaseForNetworkToken,
                amount_in,
                min_return,
                now,
            )?;
            return Ok(vec![(source_token, TradeKind::BaseForNetworkToken, result)]);
        }

        let source_index = self.collection_index_for(source_token)?;
        let first = self.collections[source_index].trade(
            self.address,
            &self.settings,
            &mut self.master_pool,
            source_token,
            TradeKind::BaseForNetworkToken,
            amount_in,
            U256::ZERO,
            now,
        )?;
        let target_index = self.collection_index_for(target_token)?;
        let second = self.collections[target_index].trade(
            self.address,
            &self.settings,
            &mut self.master_pool,
            target_token,
            TradeKind::NetworkTokenForBase,
            first.amount_out,
            min_return,
            now,
        )?;
        Ok(vec![
            (source_token, TradeKind::BaseForNetworkToken, first),
            (target_token, TradeKind::NetworkTokenForBase, second),
        ])
    }
}

fn check_value(token: Token, amount: U256, value: U256) -> Result<()> {
    if token.is_native() {
        if value != amount {
            return Err(NetworkError::EthAmountMismatch);
        }
    } else if !value.is_zero() {
        return Err(NetworkError::EthAmountMismatch);
    }
    Ok(())
}
