//! Property-based tests using `proptest` for protocol invariants.
//!
//! Covers the core laws:
//!
//! 1. **Trade monotonicity** — larger input ⇒ larger or equal output.
//! 2. **Round-trip loss** — BT→NT→BT never returns more than went in,
//!    and strictly less once a fee applies.
//! 3. **Deposit/withdraw symmetry** — an immediate full withdrawal
//!    returns the deposit minus exactly the withdrawal fee.
//! 4. **Withdrawal solver soundness** — payout splits add up, trading
//!    liquidity stays under the staked balance, the rate is preserved.
//! 5. **`mul_div` consistency** — floor/ceil bracket the exact quotient.

use alloy_primitives::U256;
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;

use crate::domain::PpmRate;
use crate::math::{calculate_withdrawal, mul_div_ceil, mul_div_floor, target_amount_and_fee};

// ---------------------------------------------------------------------------
// Custom strategies
// ---------------------------------------------------------------------------

/// Trading-liquidity values in [10_000, 10^12] to avoid degenerate curves.
fn liquidity_strategy() -> impl Strategy<Value = u128> {
    10_000u128..=1_000_000_000_000u128
}

/// Fee rates up to 10% in ppm.
fn fee_strategy() -> impl Strategy<Value = u32> {
    0u32..=100_000u32
}

fn ppm(value: u32) -> PpmRate {
    #[allow(clippy::panic)]
    let Ok(rate) = PpmRate::new(value) else {
        panic!("strategy produced an invalid ppm rate");
    };
    rate
}

// ---------------------------------------------------------------------------
// Property 1: Trade monotonicity
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_trade_output_monotone_in_input(
        x in liquidity_strategy(),
        y in liquidity_strategy(),
        fee_ppm in fee_strategy(),
        amount in 1_000u128..=1_000_000u128,
    ) {
        let fee = ppm(fee_ppm);
        let Ok(small) = target_amount_and_fee(
            U256::from(x), U256::from(y), U256::from(amount), fee,
        ) else {
            return Ok(());
        };
        let Ok(large) = target_amount_and_fee(
            U256::from(x), U256::from(y), U256::from(amount * 2), fee,
        ) else {
            return Ok(());
        };
        prop_assert!(
            large.amount >= small.amount,
            "doubling the input shrank the output: {} -> {}",
            small.amount, large.amount
        );
    }

    #[test]
    fn prop_trade_output_bounded_by_reserve(
        x in liquidity_strategy(),
        y in liquidity_strategy(),
        fee_ppm in fee_strategy(),
        amount in 1u128..=u64::MAX as u128,
    ) {
        let Ok(result) = target_amount_and_fee(
            U256::from(x), U256::from(y), U256::from(amount), ppm(fee_ppm),
        ) else {
            return Ok(());
        };
        prop_assert!(result.gross() < U256::from(y));
    }
}

// ---------------------------------------------------------------------------
// Property 2: Round-trip loss
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_round_trip_never_profits(
        b in liquidity_strategy(),
        n in liquidity_strategy(),
        fee_ppm in fee_strategy(),
        amount in 100u128..=100_000u128,
    ) {
        let fee = ppm(fee_ppm);
        let Ok(forward) = target_amount_and_fee(
            U256::from(b), U256::from(n), U256::from(amount), fee,
        ) else {
            return Ok(());
        };
        if forward.amount.is_zero() {
            return Ok(());
        }
        // Post-trade reserves: fee leaves the NT trading liquidity.
        let new_b = U256::from(b) + U256::from(amount);
        let new_n = U256::from(n) - forward.gross();
        let Ok(back) = target_amount_and_fee(new_n, new_b, forward.amount, fee) else {
            return Ok(());
        };
        prop_assert!(
            back.amount <= U256::from(amount),
            "round trip produced a profit: in={} out={}",
            amount, back.amount
        );
    }
}

// ---------------------------------------------------------------------------
// Property 3: Deposit/withdraw symmetry
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_immediate_withdrawal_returns_deposit_minus_fee(
        amount in 1u128..=u64::MAX as u128,
        fee_ppm in fee_strategy(),
    ) {
        // A lone provider: s = supply = amount, no trading liquidity.
        let Ok(result) = calculate_withdrawal(
            0,
            0,
            U256::from(amount),
            U256::from(amount),
            U256::from(amount),
            U256::from(amount),
            U256::ZERO,
            ppm(fee_ppm),
        ) else {
            return Err(TestCaseError::fail("solver rejected a clean withdrawal"));
        };
        let expected = amount * u128::from(1_000_000 - fee_ppm) / 1_000_000;
        prop_assert_eq!(result.base_from_vault, U256::from(expected));
        prop_assert_eq!(result.new_staked_balance, U256::ZERO);
    }
}

// ---------------------------------------------------------------------------
// Property 4: Withdrawal solver soundness
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_solver_preserves_accounting(
        b in 1_000u128..=1_000_000u128,
        rate_num in 1u128..=8u128,
        staked_extra in 0u128..=1_000_000u128,
        share_permille in 1u128..=1_000u128,
        fee_ppm in fee_strategy(),
    ) {
        // n at a small integer rate so the preserved-rate check is exact.
        let n = b * rate_num;
        let staked = b + staked_extra;
        let supply = staked;
        let amount = (supply * share_permille / 1_000).max(1);

        let Ok(result) = calculate_withdrawal(
            b,
            n,
            U256::from(staked),
            U256::from(supply),
            U256::from(amount),
            U256::from(staked),
            U256::ZERO,
            ppm(fee_ppm),
        ) else {
            return Err(TestCaseError::fail("solver rejected a clean withdrawal"));
        };

        // The split adds up to the fee-reduced pro-rata share.
        let owed = staked * amount / supply;
        let payout = owed * u128::from(1_000_000 - fee_ppm) / 1_000_000;
        prop_assert_eq!(
            result.base_from_vault + result.base_from_external,
            U256::from(payout)
        );
        prop_assert_eq!(result.base_fee, U256::from(owed - payout));

        // Trading liquidity stays under the staked balance.
        prop_assert!(U256::from(result.new_base_liquidity) <= result.new_staked_balance);

        // NT accounting balances: renounced plus kept equals original.
        prop_assert_eq!(
            U256::from(result.new_nt_liquidity) + result.nt_to_renounce,
            U256::from(n)
        );

        // The rate survives the rebalance exactly at integer rates.
        if result.new_base_liquidity > 0 {
            prop_assert_eq!(
                result.new_nt_liquidity,
                result.new_base_liquidity * rate_num
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Property 5: mul_div consistency
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_mul_div_floor_ceil_bracket(
        a in 0u128..=u128::MAX,
        b in 0u128..=u128::MAX,
        c in 1u128..=u128::MAX,
    ) {
        let Ok(floor) = mul_div_floor(U256::from(a), U256::from(b), U256::from(c)) else {
            return Err(TestCaseError::fail("floor overflowed on u128 inputs"));
        };
        let Ok(ceil) = mul_div_ceil(U256::from(a), U256::from(b), U256::from(c)) else {
            return Err(TestCaseError::fail("ceil overflowed on u128 inputs"));
        };
        prop_assert!(floor <= ceil);
        prop_assert!(ceil - floor <= U256::from(1u8));
    }

    #[test]
    fn prop_mul_div_identity(
        a in 0u128..=u128::MAX,
        b in 1u128..=u128::MAX,
    ) {
        let Ok(result) = mul_div_floor(U256::from(a), U256::from(b), U256::from(b)) else {
            return Err(TestCaseError::fail("identity overflowed"));
        };
        prop_assert_eq!(result, U256::from(a));
    }
}
