//! MEV / priority fee sandwich grid.

use approx::assert_relative_eq;
use sandwich_core::ether;
use sandwich_economics::{SandwichStrategy, SandwichVerifier};
use sandwich_root::logging;
use sandwich_root::{run_mev_sandwich, HarnessConfig};

fn run(strategy: SandwichStrategy) -> Vec<sandwich_root::MevIteration> {
    logging::init_for_tests();
    run_mev_sandwich(&HarnessConfig::default(), strategy).unwrap()
}

#[test]
fn test_trading_only_never_profits() {
    let grid = run(SandwichStrategy::TradingOnly);
    assert_eq!(grid.len(), 20);
    for cell in &grid {
        let profit = cell.analysis.assert_no_profit().unwrap();
        assert!(profit < 0, "{}", cell.analysis.details);
    }
    let analyses: Vec<_> = grid.into_iter().map(|c| c.analysis).collect();
    assert!(SandwichVerifier::audit(&analyses).is_ok());
}

#[test]
fn test_stake_trading_never_profits() {
    let grid = run(SandwichStrategy::StakeTrading);
    assert_eq!(grid.len(), 20);
    for cell in &grid {
        let profit = cell.analysis.assert_no_profit().unwrap();
        assert!(profit < 0, "{}", cell.analysis.details);
        assert_eq!(cell.attacker_before.eth, ether(cell.balance_eth));
        assert_eq!(cell.attacker_after.eth, cell.analysis.balance_after);
    }
}

#[test]
fn test_realized_rebase_matches_daily_rate() {
    for cell in run(SandwichStrategy::TradingOnly) {
        assert_relative_eq!(cell.rebase.realized_bp, cell.daily_rate_bp, max_relative = 1e-2);
    }
}

#[test]
fn test_cells_start_from_the_same_state() {
    // swapping never changes total pooled ether, so every cell sees the fork
    let grid = run(SandwichStrategy::TradingOnly);
    let first = grid[0].rebase.total_pooled_before;
    assert!(grid.iter().all(|c| c.rebase.total_pooled_before == first));
    assert!(grid.iter().all(|c| c.rebase.report.epoch_id == grid[0].rebase.report.epoch_id));
}

#[test]
fn test_larger_rebase_shrinks_trading_loss() {
    let grid = run(SandwichStrategy::TradingOnly);
    let loss_at = |rate: f64| {
        grid.iter()
            .find(|c| c.daily_rate_bp == rate && c.balance_eth == 10_000)
            .map(|c| c.analysis.attacker_profit)
            .unwrap()
    };
    assert!(loss_at(1.4) < loss_at(8.0));
}

#[test]
fn test_default_increase_limit_rejects_grid_top() {
    logging::init_for_tests();
    let mut config = HarnessConfig::default();
    config.mev.allowed_annual_increase_bp = 1_000;
    config.mev.daily_rates_bp = vec![8.0];
    let err = run_mev_sandwich(&config, SandwichStrategy::TradingOnly).unwrap_err();
    let chain = format!("{err:#}");
    assert!(chain.contains("ALLOWED_BEACON_BALANCE_INCREASE"), "{chain}");
}
