//! End-to-end tests driving the full network through its public facade:
//! pool creation, deposits, trades, flash loans, two-phase withdrawals,
//! and pool-collection upgrades, with a hand-driven clock.

#![allow(clippy::panic)]

use std::rc::Rc;

use alloy_primitives::U256;

use nexus_amm::domain::{Address, PpmRate, Token};
use nexus_amm::error::{NetworkError, Result};
use nexus_amm::network::{Event, FeeKind, Network, Permit};
use nexus_amm::pools::PoolCollection;
use nexus_amm::traits::{FlashLoanRecipient, ManualClock};

const DAY: u32 = 24 * 60 * 60;

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

fn addr(tag: u8) -> Address {
    Address::from_bytes([tag; 32])
}

fn admin() -> Address {
    addr(1)
}

fn provider() -> Address {
    addr(5)
}

fn trader() -> Address {
    addr(6)
}

fn u(v: u128) -> U256 {
    U256::from(v)
}

fn ppm(v: u32) -> PpmRate {
    let Ok(p) = PpmRate::new(v) else {
        panic!("valid ppm");
    };
    p
}

struct Rig {
    network: Network,
    clock: Rc<ManualClock>,
    base: Token,
    base2: Token,
}

/// A network with one v1 collection and two whitelisted base tokens.
fn rig() -> Rig {
    let clock = Rc::new(ManualClock::new(0));
    let nt = Token::new(addr(0xA0));
    let gov = Token::new(addr(0xA1));
    let base = Token::new(addr(0xB0));
    let base2 = Token::new(addr(0xB1));
    let mut network = Network::new(admin(), nt, gov, Box::new(Rc::clone(&clock)));

    let collection = PoolCollection::new(addr(50), admin(), 1, 1);
    let Ok(()) = network.add_pool_collection(admin(), collection) else {
        panic!("expected Ok");
    };
    for token in [base, base2] {
        let Ok(()) = network.settings_mut().add_token_to_whitelist(admin(), token) else {
            panic!("expected Ok");
        };
        let Ok(()) = network
            .settings_mut()
            .set_funding_limit(admin(), token, u(1_000_000_000))
        else {
            panic!("expected Ok");
        };
    }
    let Ok(()) = network
        .settings_mut()
        .set_min_liquidity_for_trading(admin(), u(50_000))
    else {
        panic!("expected Ok");
    };
    let Ok(()) = network
        .settings_mut()
        .set_average_rate_max_deviation(admin(), ppm(10_000))
    else {
        panic!("expected Ok");
    };

    Rig {
        network,
        clock,
        base,
        base2,
    }
}

impl Rig {
    fn create_pool(&mut self, token: Token) {
        let Ok(_) = self.network.create_pool(admin(), 1, token) else {
            panic!("expected Ok");
        };
    }

    fn fund(&mut self, account: Address, token: Token, amount: u128) {
        let Ok(()) = self.network.ledger_mut().mint(token, account, u(amount)) else {
            panic!("expected Ok");
        };
    }

    fn deposit(&mut self, account: Address, token: Token, amount: u128) -> U256 {
        self.fund(account, token, amount);
        let Ok(shares) = self.network.deposit(account, token, u(amount), U256::ZERO) else {
            panic!("expected Ok");
        };
        shares
    }

    /// Deposits 1_000_000 and bootstraps trading at a 1:1 virtual rate,
    /// seeding b = n = 50_000.
    fn bootstrap_trading(&mut self, token: Token) {
        self.create_pool(token);
        self.deposit(provider(), token, 1_000_000);
        let Ok((b, n)) = self.network.enable_trading(admin(), token, 1, 1) else {
            panic!("expected Ok");
        };
        assert_eq!((b, n), (50_000, 50_000));
    }

    /// The protocol's pool invariants, checked after every accepted
    /// operation.
    fn assert_invariants(&self, tokens: &[Token]) {
        let settings = self.network.settings();
        for &token in tokens {
            let Ok(pool) = self.network.pool(token) else {
                continue;
            };
            let b = U256::from(pool.base_trading_liquidity());
            let n = U256::from(pool.nt_trading_liquidity());

            // 1: b ≤ s and funding under the limit.
            assert!(b <= pool.staked_balance(), "b exceeds s for {token}");
            assert!(
                self.network.master_pool().minted_for(token) <= settings.funding_limit(token),
                "funding limit breached for {token}"
            );

            // 2: supply == 0 ⇔ s == 0.
            let Ok(supply) = self.network.registry().total_supply(pool.pool_token()) else {
                panic!("expected Ok");
            };
            assert_eq!(
                supply.is_zero(),
                pool.staked_balance().is_zero(),
                "supply/staked zero mismatch for {token}"
            );

            // 3: trading implies live liquidity and a live product cache.
            // The NT floor itself is policed at bootstrap and by the
            // withdrawal auto-disable, not per trade.
            if pool.trading_enabled() {
                assert!(!n.is_zero(), "trading with an empty NT side for {token}");
                assert_eq!(pool.trading_liquidity_product(), b * n);
            }

            // 5 (solvency): the vault backs the base trading liquidity.
            assert!(
                self.network
                    .master_vault()
                    .balance(self.network.ledger(), token)
                    >= b,
                "vault does not back trading liquidity for {token}"
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Flash-loan borrowers
// ---------------------------------------------------------------------------

/// Repays `amount + fee` like a good citizen.
struct CooperativeBorrower {
    address: Address,
}

impl FlashLoanRecipient for CooperativeBorrower {
    fn address(&self) -> Address {
        self.address
    }

    fn on_flash_loan(
        &mut self,
        network: &mut Network,
        _sender: Address,
        token: Token,
        amount: U256,
        fee: U256,
        _data: &[u8],
    ) -> Result<()> {
        let vault = network.master_vault().address();
        network
            .ledger_mut()
            .transfer(token, self.address, vault, amount + fee)
    }
}

/// Returns the principal but keeps the fee.
struct ShortBorrower {
    address: Address,
}

impl FlashLoanRecipient for ShortBorrower {
    fn address(&self) -> Address {
        self.address
    }

    fn on_flash_loan(
        &mut self,
        network: &mut Network,
        _sender: Address,
        token: Token,
        amount: U256,
        _fee: U256,
        _data: &[u8],
    ) -> Result<()> {
        let vault = network.master_vault().address();
        network.ledger_mut().transfer(token, self.address, vault, amount)
    }
}

/// Tries to deposit mid-loan.
struct ReentrantBorrower {
    address: Address,
    observed: Option<NetworkError>,
}

impl FlashLoanRecipient for ReentrantBorrower {
    fn address(&self) -> Address {
        self.address
    }

    fn on_flash_loan(
        &mut self,
        network: &mut Network,
        _sender: Address,
        token: Token,
        amount: U256,
        _fee: U256,
        _data: &[u8],
    ) -> Result<()> {
        let result = network.deposit(self.address, token, amount, U256::ZERO);
        let Err(err) = result else {
            panic!("nested deposit must be denied");
        };
        self.observed = Some(err.clone());
        Err(err)
    }
}

// ---------------------------------------------------------------------------
// Scenario 1: create + first deposit
// ---------------------------------------------------------------------------

#[test]
fn create_and_first_deposit() {
    let mut rig = rig();
    rig.create_pool(rig.base);
    let shares = rig.deposit(provider(), rig.base, 10_000);

    assert_eq!(shares, u(10_000));
    let Ok(pool) = rig.network.pool(rig.base) else {
        panic!("expected Ok");
    };
    assert_eq!(pool.staked_balance(), u(10_000));
    assert!(!pool.trading_enabled());
    let Ok(supply) = rig.network.registry().total_supply(pool.pool_token()) else {
        panic!("expected Ok");
    };
    assert_eq!(supply, u(10_000));

    let deposited = rig.network.events().iter().find(|e| {
        matches!(
            e,
            Event::BaseTokenDeposited {
                amount,
                pool_token_amount,
                ..
            } if *amount == u(10_000) && *pool_token_amount == u(10_000)
        )
    });
    assert!(deposited.is_some(), "missing BaseTokenDeposited event");
    rig.assert_invariants(&[rig.base]);
}

#[test]
fn deposit_for_credits_the_beneficiary() {
    let mut rig = rig();
    rig.create_pool(rig.base);
    rig.fund(trader(), rig.base, 5_000);
    let Ok(shares) = rig
        .network
        .deposit_for(trader(), provider(), rig.base, u(5_000), U256::ZERO)
    else {
        panic!("expected Ok");
    };
    let Ok(pool) = rig.network.pool(rig.base) else {
        panic!("expected Ok");
    };
    assert_eq!(
        rig.network.registry().balance_of(pool.pool_token(), provider()),
        shares
    );
    assert_eq!(
        rig.network.registry().balance_of(pool.pool_token(), trader()),
        U256::ZERO
    );
}

#[test]
fn deposit_permitted_accepts_valid_deadline() {
    let mut rig = rig();
    rig.create_pool(rig.base);
    rig.fund(provider(), rig.base, 1_000);
    rig.clock.set(500);
    let permit = Permit {
        deadline: 600,
        v: 27,
        r: [1u8; 32],
        s: [2u8; 32],
    };
    let Ok(shares) = rig
        .network
        .deposit_permitted(provider(), rig.base, u(1_000), permit)
    else {
        panic!("expected Ok");
    };
    assert_eq!(shares, u(1_000));

    // Past the deadline the same call is rejected.
    rig.clock.set(601);
    rig.fund(provider(), rig.base, 1_000);
    assert_eq!(
        rig.network
            .deposit_permitted(provider(), rig.base, u(1_000), permit),
        Err(NetworkError::DeadlineExpired)
    );
}

#[test]
fn native_token_deposit_checks_value() {
    let mut rig = rig();
    let native = Token::native();
    let Ok(()) = rig.network.settings_mut().add_token_to_whitelist(admin(), native) else {
        panic!("expected Ok");
    };
    let Ok(_) = rig.network.create_pool(admin(), 1, native) else {
        panic!("expected Ok");
    };
    rig.fund(provider(), native, 3_000);

    // Mismatched value is rejected.
    assert_eq!(
        rig.network.deposit(provider(), native, u(3_000), U256::ZERO),
        Err(NetworkError::EthAmountMismatch)
    );
    // Matching value is accepted.
    let Ok(shares) = rig.network.deposit(provider(), native, u(3_000), u(3_000)) else {
        panic!("expected Ok");
    };
    assert_eq!(shares, u(3_000));
}

// ---------------------------------------------------------------------------
// Scenario 2: flash loan with a 1% fee
// ---------------------------------------------------------------------------

#[test]
fn flash_loan_collects_fee_into_staked_balance() {
    let mut rig = rig();
    rig.create_pool(rig.base);
    rig.deposit(provider(), rig.base, 1_000_000);
    let Ok(()) = rig.network.settings_mut().set_flash_loan_fee(admin(), ppm(10_000)) else {
        panic!("expected Ok");
    };

    // The borrower needs the fee on hand.
    let mut borrower = CooperativeBorrower { address: addr(7) };
    rig.fund(borrower.address, rig.base, 2_000);

    let vault_before = rig
        .network
        .master_vault()
        .balance(rig.network.ledger(), rig.base);
    let staked_before = {
        let Ok(pool) = rig.network.pool(rig.base) else {
            panic!("expected Ok");
        };
        pool.staked_balance()
    };

    let Ok(fee) = rig
        .network
        .flash_loan(trader(), rig.base, u(123_456), &mut borrower, &[])
    else {
        panic!("expected Ok");
    };
    assert_eq!(fee, u(1_234));

    let vault_after = rig
        .network
        .master_vault()
        .balance(rig.network.ledger(), rig.base);
    assert_eq!(vault_after, vault_before + u(1_234));
    let Ok(pool) = rig.network.pool(rig.base) else {
        panic!("expected Ok");
    };
    assert_eq!(pool.staked_balance(), staked_before + u(1_234));

    // FlashLoanCompleted first, FeesCollected second, same context id.
    let events = rig.network.events();
    let tail = &events[events.len() - 2..];
    let Event::FlashLoanCompleted {
        context_id: loan_ctx,
        amount,
        fee: loan_fee,
        ..
    } = &tail[0]
    else {
        panic!("expected FlashLoanCompleted, got {:?}", tail[0]);
    };
    assert_eq!(*amount, u(123_456));
    assert_eq!(*loan_fee, u(1_234));
    let Event::FeesCollected {
        context_id: fee_ctx,
        kind: FeeKind::FlashLoan,
        amount: collected,
        ..
    } = &tail[1]
    else {
        panic!("expected FeesCollected, got {:?}", tail[1]);
    };
    assert_eq!(*collected, u(1_234));
    assert_eq!(loan_ctx, fee_ctx);
    rig.assert_invariants(&[rig.base]);
}

#[test]
fn flash_loan_short_return_reverts_everything() {
    let mut rig = rig();
    rig.create_pool(rig.base);
    rig.deposit(provider(), rig.base, 1_000_000);
    let Ok(()) = rig.network.settings_mut().set_flash_loan_fee(admin(), ppm(10_000)) else {
        panic!("expected Ok");
    };

    let mut borrower = ShortBorrower { address: addr(7) };
    let vault_before = rig
        .network
        .master_vault()
        .balance(rig.network.ledger(), rig.base);

    let err = rig
        .network
        .flash_loan(trader(), rig.base, u(100_000), &mut borrower, &[]);
    assert_eq!(err, Err(NetworkError::InsufficientFlashLoanReturn));

    // Fully reverted: the borrower holds nothing, the vault is whole.
    assert_eq!(
        rig.network.ledger().balance_of(rig.base, borrower.address),
        U256::ZERO
    );
    assert_eq!(
        rig.network
            .master_vault()
            .balance(rig.network.ledger(), rig.base),
        vault_before
    );
}

// ---------------------------------------------------------------------------
// Scenario 3: rate-instability rejection
// ---------------------------------------------------------------------------

#[test]
fn trade_rejected_when_average_rate_disagrees() {
    let mut rig = rig();
    rig.bootstrap_trading(rig.base);

    // Let the spot drift ~1.5% from the reference under a loose bound.
    let Ok(()) = rig
        .network
        .settings_mut()
        .set_average_rate_max_deviation(admin(), ppm(500_000))
    else {
        panic!("expected Ok");
    };
    rig.fund(trader(), rig.base, 10_000);
    let Ok(_) = rig.network.trade(
        trader(),
        rig.base,
        rig.network.nt_token(),
        u(400),
        U256::ZERO,
        DAY,
        U256::ZERO,
    ) else {
        panic!("expected Ok");
    };

    // Tighten the bound back to 1% and trade again without letting the
    // average catch up: the same timestamp means no smoothing step.
    let Ok(()) = rig
        .network
        .settings_mut()
        .set_average_rate_max_deviation(admin(), ppm(10_000))
    else {
        panic!("expected Ok");
    };
    let Ok(pool_before) = rig.network.pool(rig.base).cloned() else {
        panic!("expected Ok");
    };
    let ledger_before = rig.network.ledger().balance_of(rig.base, trader());

    let err = rig.network.trade(
        trader(),
        rig.base,
        rig.network.nt_token(),
        u(400),
        U256::ZERO,
        DAY,
        U256::ZERO,
    );
    assert_eq!(err, Err(NetworkError::RateUnstable));

    // No state mutation.
    let Ok(pool_after) = rig.network.pool(rig.base) else {
        panic!("expected Ok");
    };
    assert_eq!(pool_after, &pool_before);
    assert_eq!(
        rig.network.ledger().balance_of(rig.base, trader()),
        ledger_before
    );
}

// ---------------------------------------------------------------------------
// Scenario 4: two-phase withdrawal timing
// ---------------------------------------------------------------------------

#[test]
fn two_phase_withdrawal_lock_and_window() {
    let mut rig = rig();
    rig.create_pool(rig.base);
    rig.deposit(provider(), rig.base, 10_000);
    let Ok(pool) = rig.network.pool(rig.base) else {
        panic!("expected Ok");
    };
    let pool_token = pool.pool_token();

    // Two requests at t = 0 (defaults: 7d lock, 3d window).
    let Ok(first) = rig.network.init_withdrawal(provider(), pool_token, u(1_000)) else {
        panic!("expected Ok");
    };
    let Ok(second) = rig.network.init_withdrawal(provider(), pool_token, u(1_000)) else {
        panic!("expected Ok");
    };

    // t = 6d: still locked.
    rig.clock.set(6 * DAY);
    assert_eq!(
        rig.network.withdraw(provider(), first),
        Err(NetworkError::WithdrawalNotAllowed)
    );

    // t = 7d + 1: ready.
    rig.clock.set(7 * DAY + 1);
    let Ok(paid) = rig.network.withdraw(provider(), first) else {
        panic!("expected Ok");
    };
    assert_eq!(paid, u(1_000));

    // t = 10d + 1: the second request expired.
    rig.clock.set(10 * DAY + 1);
    assert_eq!(
        rig.network.withdraw(provider(), second),
        Err(NetworkError::WithdrawalNotAllowed)
    );

    // A stale request can still be cancelled and the shares come back.
    let Ok(()) = rig.network.cancel_withdrawal(provider(), second) else {
        panic!("expected Ok");
    };
    assert_eq!(
        rig.network.registry().balance_of(pool_token, provider()),
        u(9_000)
    );
    rig.assert_invariants(&[rig.base]);
}

#[test]
fn immediate_withdrawal_returns_deposit_minus_fee() {
    let mut rig = rig();
    rig.create_pool(rig.base);
    let Ok(()) = rig.network.settings_mut().set_withdrawal_fee(admin(), ppm(10_000)) else {
        panic!("expected Ok");
    };
    let shares = rig.deposit(provider(), rig.base, 123_456);

    let Ok(pool) = rig.network.pool(rig.base) else {
        panic!("expected Ok");
    };
    let pool_token = pool.pool_token();
    let Ok(id) = rig.network.init_withdrawal(provider(), pool_token, shares) else {
        panic!("expected Ok");
    };
    rig.clock.set(7 * DAY);
    let Ok(paid) = rig.network.withdraw(provider(), id) else {
        panic!("expected Ok");
    };
    // 123_456 · 99% = 122_221 (floor).
    assert_eq!(paid, u(122_221));
    assert_eq!(
        rig.network.ledger().balance_of(rig.base, provider()),
        u(122_221)
    );
    rig.assert_invariants(&[rig.base]);
}

#[test]
fn nt_deposit_and_withdrawal_round_trip() {
    let mut rig = rig();
    let nt = rig.network.nt_token();
    let gov = rig.network.gov_token();
    rig.fund(provider(), nt, 10_000);

    let Ok(shares) = rig.network.deposit(provider(), nt, u(10_000), U256::ZERO) else {
        panic!("expected Ok");
    };
    assert_eq!(shares, u(10_000));
    assert_eq!(rig.network.ledger().balance_of(gov, provider()), u(10_000));
    let master_token = rig.network.master_pool().pool_token();
    assert_eq!(
        rig.network.registry().balance_of(master_token, provider()),
        u(10_000)
    );

    let Ok(id) = rig.network.init_withdrawal(provider(), master_token, shares) else {
        panic!("expected Ok");
    };
    rig.clock.set(7 * DAY);
    let Ok(paid) = rig.network.withdraw(provider(), id) else {
        panic!("expected Ok");
    };
    assert_eq!(paid, u(10_000));
    assert_eq!(rig.network.ledger().balance_of(nt, provider()), u(10_000));
    assert_eq!(rig.network.ledger().balance_of(gov, provider()), U256::ZERO);

    let withdrawn = rig
        .network
        .events()
        .iter()
        .any(|e| matches!(e, Event::NetworkTokenWithdrawn { nt_amount, .. } if *nt_amount == u(10_000)));
    assert!(withdrawn, "missing NetworkTokenWithdrawn event");
}

#[test]
fn withdrawal_rejected_while_vault_paused() {
    let mut rig = rig();
    rig.create_pool(rig.base);
    let shares = rig.deposit(provider(), rig.base, 1_000);
    let Ok(pool) = rig.network.pool(rig.base) else {
        panic!("expected Ok");
    };
    let Ok(id) = rig.network.init_withdrawal(provider(), pool.pool_token(), shares) else {
        panic!("expected Ok");
    };
    rig.clock.set(7 * DAY);
    let Ok(()) = rig.network.master_vault_mut().pause(admin()) else {
        panic!("expected Ok");
    };
    assert_eq!(
        rig.network.withdraw(provider(), id),
        Err(NetworkError::Paused)
    );
    // The request is still live after the rejection.
    let Ok(()) = rig.network.master_vault_mut().unpause(admin()) else {
        panic!("expected Ok");
    };
    let Ok(paid) = rig.network.withdraw(provider(), id) else {
        panic!("expected Ok");
    };
    assert_eq!(paid, u(1_000));
}

// ---------------------------------------------------------------------------
// Trading through the facade
// ---------------------------------------------------------------------------

#[test]
fn trade_base_for_nt_pays_from_vault() {
    let mut rig = rig();
    rig.bootstrap_trading(rig.base);
    rig.fund(trader(), rig.base, 1_000);
    rig.clock.set(10);

    let Ok(out) = rig.network.trade(
        trader(),
        rig.base,
        rig.network.nt_token(),
        u(100),
        u(90),
        100,
        U256::ZERO,
    ) else {
        panic!("expected Ok");
    };
    // gross = 50_000·100/50_100 = 99, no fee.
    assert_eq!(out, u(99));
    assert_eq!(
        rig.network
            .ledger()
            .balance_of(rig.network.nt_token(), trader()),
        u(99)
    );
    assert_eq!(
        rig.network.ledger().balance_of(rig.base, trader()),
        u(900)
    );

    let traded = rig.network.events().iter().any(|e| {
        matches!(
            e,
            Event::TokensTraded {
                source_amount,
                target_amount,
                ..
            } if *source_amount == u(100) && *target_amount == u(99)
        )
    });
    assert!(traded, "missing TokensTraded event");
    rig.assert_invariants(&[rig.base]);
}

#[test]
fn base_to_base_trade_routes_through_nt() {
    let mut rig = rig();
    rig.bootstrap_trading(rig.base);
    rig.bootstrap_trading(rig.base2);
    rig.fund(trader(), rig.base, 1_000);
    rig.clock.set(10);

    let Ok(out) = rig.network.trade(
        trader(),
        rig.base,
        rig.base2,
        u(100),
        u(1),
        100,
        U256::ZERO,
    ) else {
        panic!("expected Ok");
    };
    // Hop 1: 99 NT; hop 2: 50_000·99/50_099 = 98.
    assert_eq!(out, u(98));
    assert_eq!(rig.network.ledger().balance_of(rig.base2, trader()), u(98));

    // Both pools moved; the intermediate NT stayed in the vault.
    let Ok(source_pool) = rig.network.pool(rig.base) else {
        panic!("expected Ok");
    };
    let Ok(target_pool) = rig.network.pool(rig.base2) else {
        panic!("expected Ok");
    };
    assert_eq!(source_pool.base_trading_liquidity(), 50_100);
    assert_eq!(source_pool.nt_trading_liquidity(), 49_901);
    assert_eq!(target_pool.nt_trading_liquidity(), 50_099);
    assert_eq!(target_pool.base_trading_liquidity(), 49_902);
    rig.assert_invariants(&[rig.base, rig.base2]);
}

#[test]
fn round_trip_trade_loses_value_with_fees() {
    let mut rig = rig();
    rig.bootstrap_trading(rig.base);
    rig.bootstrap_trading(rig.base2);
    for token in [rig.base, rig.base2] {
        let Ok(()) = rig.network.set_trading_fee(admin(), token, ppm(5_000)) else {
            panic!("expected Ok");
        };
    }
    rig.fund(trader(), rig.base, 200);
    rig.clock.set(10);

    let Ok(forward) = rig.network.trade(
        trader(),
        rig.base,
        rig.base2,
        u(200),
        u(1),
        100,
        U256::ZERO,
    ) else {
        panic!("expected Ok");
    };
    rig.clock.set(20);
    let Ok(back) = rig.network.trade(
        trader(),
        rig.base2,
        rig.base,
        forward,
        u(1),
        100,
        U256::ZERO,
    ) else {
        panic!("expected Ok");
    };
    assert!(back < u(200), "round trip must lose the fees: {back}");
}

#[test]
fn trade_deadline_enforced() {
    let mut rig = rig();
    rig.bootstrap_trading(rig.base);
    rig.fund(trader(), rig.base, 100);
    rig.clock.set(200);
    assert_eq!(
        rig.network.trade(
            trader(),
            rig.base,
            rig.network.nt_token(),
            u(100),
            U256::ZERO,
            199,
            U256::ZERO,
        ),
        Err(NetworkError::DeadlineExpired)
    );
}

#[test]
fn failed_second_hop_rolls_back_the_first() {
    let mut rig = rig();
    rig.bootstrap_trading(rig.base);
    rig.bootstrap_trading(rig.base2);
    rig.fund(trader(), rig.base, 1_000);
    rig.clock.set(10);

    let Ok(source_before) = rig.network.pool(rig.base).cloned() else {
        panic!("expected Ok");
    };
    // min_return far above anything the second hop can produce.
    let err = rig.network.trade(
        trader(),
        rig.base,
        rig.base2,
        u(100),
        u(1_000_000),
        100,
        U256::ZERO,
    );
    assert_eq!(err, Err(NetworkError::ReturnAmountTooLow));

    // The first hop's mutation was rolled back.
    let Ok(source_after) = rig.network.pool(rig.base) else {
        panic!("expected Ok");
    };
    assert_eq!(source_after, &source_before);
    assert_eq!(rig.network.ledger().balance_of(rig.base, trader()), u(1_000));
}

// ---------------------------------------------------------------------------
// Scenario 5: pool-collection upgrade
// ---------------------------------------------------------------------------

#[test]
fn upgrade_moves_pool_and_keeps_every_field() {
    let mut rig = rig();
    rig.create_pool(rig.base);
    rig.deposit(provider(), rig.base, 50_000_000);
    let Ok(()) = rig.network.enable_trading(admin(), rig.base, 1, 1).map(|_| ()) else {
        panic!("expected Ok");
    };
    let Ok(snapshot) = rig.network.pool(rig.base).cloned() else {
        panic!("expected Ok");
    };
    let Ok(holder_shares) = rig
        .network
        .registry()
        .total_supply(snapshot.pool_token())
    else {
        panic!("expected Ok");
    };

    // Register v2 of the same type; it becomes latest.
    let v2 = PoolCollection::new(addr(51), admin(), 1, 2);
    let Ok(()) = rig.network.add_pool_collection(admin(), v2) else {
        panic!("expected Ok");
    };
    assert_eq!(rig.network.latest_pool_collection(1), Some(addr(51)));

    let Ok(upgraded) = rig.network.upgrade_pools(admin(), &[rig.base]) else {
        panic!("expected Ok");
    };
    assert_eq!(upgraded, vec![rig.base]);

    // The pool lives in v2 now, bit-identical.
    let Ok(collection) = rig.network.collection_of(rig.base) else {
        panic!("expected Ok");
    };
    assert_eq!(collection.address(), addr(51));
    let Ok(migrated) = rig.network.pool(rig.base) else {
        panic!("expected Ok");
    };
    assert_eq!(migrated, &snapshot);

    // Pool-token identity and balances survived.
    let Ok(supply_after) = rig.network.registry().total_supply(snapshot.pool_token()) else {
        panic!("expected Ok");
    };
    assert_eq!(supply_after, holder_shares);
    assert_eq!(
        rig.network
            .registry()
            .balance_of(snapshot.pool_token(), provider()),
        holder_shares
    );

    // Subsequent operations route to v2.
    let shares = rig.deposit(provider(), rig.base, 1_000);
    assert!(!shares.is_zero());
    rig.assert_invariants(&[rig.base]);

    // A second upgrade has nowhere to go and is skipped silently.
    let Ok(skipped) = rig.network.upgrade_pools(admin(), &[rig.base]) else {
        panic!("expected Ok");
    };
    assert!(skipped.is_empty());
}

// ---------------------------------------------------------------------------
// Scenario 6: reentrant flash loan
// ---------------------------------------------------------------------------

#[test]
fn reentrant_flash_loan_denied_and_reverted() {
    let mut rig = rig();
    rig.create_pool(rig.base);
    rig.deposit(provider(), rig.base, 1_000_000);

    let mut borrower = ReentrantBorrower {
        address: addr(7),
        observed: None,
    };
    let vault_before = rig
        .network
        .master_vault()
        .balance(rig.network.ledger(), rig.base);
    let Ok(staked_before) = rig.network.pool(rig.base).map(|p| p.staked_balance()) else {
        panic!("expected Ok");
    };

    let err = rig
        .network
        .flash_loan(trader(), rig.base, u(100_000), &mut borrower, &[]);
    assert_eq!(err, Err(NetworkError::Reentrant));
    assert_eq!(borrower.observed, Some(NetworkError::Reentrant));

    // The outer loan reverted: no balance changed anywhere.
    assert_eq!(
        rig.network
            .master_vault()
            .balance(rig.network.ledger(), rig.base),
        vault_before
    );
    assert_eq!(
        rig.network.ledger().balance_of(rig.base, borrower.address),
        U256::ZERO
    );
    let Ok(staked_after) = rig.network.pool(rig.base).map(|p| p.staked_balance()) else {
        panic!("expected Ok");
    };
    assert_eq!(staked_after, staked_before);
    rig.assert_invariants(&[rig.base]);
}
