//! Coverage sandwich outcomes against the forked protocol.

use sandwich_core::{as_ether, ether};
use sandwich_economics::SandwichStrategy;
use sandwich_root::logging;
use sandwich_root::{run_coverage_sandwich, CoverageOutcome, HarnessConfig};

fn run(burn_quota_bp: u32, strategy: SandwichStrategy) -> CoverageOutcome {
    logging::init_for_tests();
    let mut config = HarnessConfig::default();
    config.coverage.burn_quota_bp = burn_quota_bp;
    run_coverage_sandwich(&config, strategy).unwrap()
}

#[test]
fn test_safe_quota_trading_only_loses() {
    let outcome = run(8, SandwichStrategy::TradingOnly);
    let profit = outcome.analysis.assert_no_profit().unwrap();
    assert!(profit < 0, "{}", outcome.analysis.details);
    // the burn is spread over many reports
    assert!(outcome.burn_reports > 1);
}

#[test]
fn test_safe_quota_stake_trading_loses() {
    let outcome = run(8, SandwichStrategy::StakeTrading);
    let profit = outcome.analysis.assert_no_profit().unwrap();
    assert!(profit < 0, "{}", outcome.analysis.details);
}

#[test]
fn test_attacker_holdings_bracket_the_sandwich() {
    let outcome = run(8, SandwichStrategy::TradingOnly);
    let exchanger = outcome.attacker_before.address;
    assert_eq!(outcome.attacker_after.address, exchanger);
    assert_eq!(outcome.attacker_before.eth, ether(10_000));
    assert_eq!(outcome.attacker_before.steth, 0);
    assert_eq!(outcome.attacker_after.eth, outcome.analysis.balance_after);
    // share rounding may strand a few wei of stETH
    assert!(outcome.attacker_after.steth < 10, "{} wei left", outcome.attacker_after.steth);
}

#[test]
fn test_lower_quota_loses_more() {
    let at_eight = run(8, SandwichStrategy::TradingOnly);
    let at_four = run(4, SandwichStrategy::TradingOnly);
    assert!(at_four.attacker_profit() < at_eight.attacker_profit());
    assert!(at_four.burn_reports > at_eight.burn_reports);
}

#[test]
fn test_unrestricted_quota_is_exploitable() {
    let trading = run(10_000, SandwichStrategy::TradingOnly);
    let staking = run(10_000, SandwichStrategy::StakeTrading);

    let profit = trading.analysis.assert_profit().unwrap() as f64 / 1e18;
    assert!(profit > 80.0 && profit < 100.0, "profit {profit} ETH");
    // two swaps rebalance the pool, beating stake and single swap
    assert!(trading.attacker_profit() > staking.attacker_profit());
    // the whole cover burns in the first round
    assert_eq!(trading.burn_reports, 0);
}

#[test]
fn test_quota_just_above_safe_bound_leaks() {
    let outcome = run(9, SandwichStrategy::TradingOnly);
    assert!(
        outcome.analysis.assert_profit().is_ok(),
        "ended at {} ETH",
        as_ether(outcome.analysis.balance_after)
    );
}

#[test]
fn test_victim_is_made_whole_by_cover() {
    let outcome = run(8, SandwichStrategy::TradingOnly);
    assert!(outcome.victim_after_slashing_steth < outcome.victim_initial_steth);
    assert!(outcome.victim_recovered_steth > outcome.victim_after_slashing_steth);
    // 1% slashing against 1% of shares burnt
    let gap = outcome.victim_initial_steth.abs_diff(outcome.victim_recovered_steth);
    assert!(gap < ether(1) / 10, "victim gap {} stETH", as_ether(gap));
}

#[test]
fn test_coverage_run_is_deterministic() {
    let a = run(8, SandwichStrategy::StakeTrading);
    let b = run(8, SandwichStrategy::StakeTrading);
    assert_eq!(a, b);
}
