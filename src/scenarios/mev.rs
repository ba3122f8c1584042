//! MEV / priority fee sandwich.
//!
//! Post-merge rewards can make a single daily rebase unusually large. The
//! attacker enters stETH just before the report and exits right after;
//! Curve fees and the pool discount must eat the rebase gain.

use super::Fixture;
use crate::config::HarnessConfig;
use anyhow::{Context, Result};
use log::{info, warn};
use sandwich_core::{ether, AttackerAccount, Snapshotting};
use sandwich_economics::{
    BasisPoints, RebaseOutcome, RebaseTrigger, SandwichAnalysis, SandwichStrategy, SandwichVerifier,
};

/// One (daily rate, balance) cell of the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct MevIteration {
    pub daily_rate_bp: f64,
    pub balance_eth: u64,
    pub attacker_before: AttackerAccount,
    pub attacker_after: AttackerAccount,
    pub rebase: RebaseOutcome,
    pub analysis: SandwichAnalysis,
}

/// Run the whole grid with `strategy`, reverting the fork between cells.
pub fn run_mev_sandwich(config: &HarnessConfig, strategy: SandwichStrategy) -> Result<Vec<MevIteration>> {
    let mut fx = Fixture::new(config)?;
    let voting = fx.chain.contracts().voting;
    fx.chain
        .set_allowed_beacon_balance_annual_relative_increase(voting, config.mev.allowed_annual_increase_bp)?;
    let start = fx.chain.snapshot();

    let mut iterations = Vec::new();
    for &daily_rate_bp in &config.mev.daily_rates_bp {
        let change = BasisPoints::from_f64(daily_rate_bp)
            .with_context(|| format!("daily rate {daily_rate_bp} is not a finite number"))?;
        for &balance_eth in &config.mev.attacker_balances_eth {
            let balance = ether(balance_eth);
            fx.fund_attacker(balance)?;
            let attacker_before = fx.attacker()?;
            fx.step_in(strategy)?;
            let rebase = fx
                .simulator
                .push_checked_rebase(&mut fx.chain, &change)
                .with_context(|| format!("rebase of {daily_rate_bp} bp"))?;
            let final_balance = fx.step_out()?;
            let attacker_after = fx.attacker()?;

            let analysis = SandwichVerifier::analyse(
                strategy,
                RebaseTrigger::Mev { daily_rate_bp },
                balance,
                final_balance,
            );
            if analysis.is_profitable {
                warn!("{}", analysis.details);
            } else {
                info!("{}", analysis.details);
            }
            iterations.push(MevIteration {
                daily_rate_bp,
                balance_eth,
                attacker_before,
                attacker_after,
                rebase,
                analysis,
            });
            fx.chain.revert_to(start)?;
        }
    }
    Ok(iterations)
}
