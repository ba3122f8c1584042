//! Coverage sandwich.
//!
//! After a slashing, the DAO covers the loss by burning stETH through the
//! self-owned burner. The burn raises the share price; an attacker holding
//! stETH across the burn gains from it. The per-run burn quota bounds the
//! jump of a single report.

use super::Fixture;
use crate::config::HarnessConfig;
use anyhow::{bail, Context, Result};
use log::{info, warn};
use sandwich_core::{as_ether, ether, mul_div, AttackerAccount, StakingProtocol, Wei, BASIS_POINTS};
use sandwich_economics::{
    BasisPoints, RebaseTrigger, SandwichAnalysis, SandwichStrategy, SandwichVerifier,
};
use sandwich_sim::burn_role;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageOutcome {
    pub analysis: SandwichAnalysis,
    /// Exchanger right before stepping in
    pub attacker_before: AttackerAccount,
    /// Exchanger right after stepping out
    pub attacker_after: AttackerAccount,
    pub victim_initial_steth: Wei,
    pub victim_after_slashing_steth: Wei,
    pub victim_recovered_steth: Wei,
    /// Total pooled ether lost to the slashing
    pub ether_loss: Wei,
    pub cover_amount: Wei,
    pub attacker_steth_after_first_round: Wei,
    /// Zero reports needed after the attacker exited
    pub burn_reports: u32,
}

impl CoverageOutcome {
    pub fn attacker_profit(&self) -> i128 {
        self.analysis.attacker_profit
    }
}

/// Run one coverage sandwich with `strategy`.
pub fn run_coverage_sandwich(config: &HarnessConfig, strategy: SandwichStrategy) -> Result<CoverageOutcome> {
    let params = &config.coverage;
    let mut fx = Fixture::new(config)?;
    let contracts = *fx.chain.contracts();
    let voting = contracts.voting;
    let whale = fx.whale();
    let victim = fx.operator;

    // DAO wires the burner into the oracle
    fx.chain.add_report_callback(voting, contracts.burner)?;
    fx.chain
        .set_beacon_report_receiver(voting, Some(contracts.composite_receiver))?;
    fx.chain
        .grant_permission(voting, contracts.burner, contracts.steth, burn_role())?;
    fx.chain
        .set_burn_amount_per_run_quota(voting, params.burn_quota_bp)?;

    let attacker_initial = ether(params.attacker_eth);
    fx.fund_attacker(attacker_initial)?;

    fx.chain.submit(victim, ether(params.victim_steth_eth))?;
    fx.chain.submit(whale, ether(params.whale_stake_eth))?;
    let victim_initial_steth = fx.chain.balance_of(victim)?;
    let total_before = fx.chain.total_pooled_ether()?;

    // slashing
    fx.simulator
        .push_rebase(&mut fx.chain, &BasisPoints::whole(params.slashing_bp))
        .context("reporting the slashing")?;
    let victim_after_slashing_steth = fx.chain.balance_of(victim)?;
    let ether_loss = total_before.saturating_sub(fx.chain.total_pooled_ether()?);
    let cover_shares = mul_div(
        fx.chain.total_shares()?,
        params.cover_share_bp as u128,
        BASIS_POINTS as u128,
    )
    .context("cover share overflow")?;
    let cover_amount = fx.chain.pooled_eth_by_shares(cover_shares)?;
    info!(
        "slashing: {} ETH lost, {} stETH to recover",
        as_ether(ether_loss),
        as_ether(cover_amount)
    );

    let attacker_before = fx.attacker()?;
    fx.step_in(strategy)?;

    // coverage application
    fx.chain.transfer(whale, voting, cover_amount)?;
    fx.chain.approve(voting, contracts.burner, cover_amount)?;
    fx.chain.request_burn_my_steth_for_cover(voting, cover_amount)?;
    fx.simulator
        .push_rebase(&mut fx.chain, &BasisPoints::whole(0))
        .context("first coverage round")?;
    let attacker_steth_after_first_round = fx.chain.balance_of(fx.exchanger)?;
    info!(
        "coverage: first round with quota {} bp, attacker holds {} stETH",
        params.burn_quota_bp,
        as_ether(attacker_steth_after_first_round)
    );

    let attacker_final = fx.step_out()?;
    let attacker_after = fx.attacker()?;
    let analysis = SandwichVerifier::analyse(
        strategy,
        RebaseTrigger::Coverage {
            burn_quota_bp: params.burn_quota_bp,
        },
        attacker_initial,
        attacker_final,
    );
    if analysis.is_profitable {
        warn!("{}", analysis.details);
    } else {
        info!("{}", analysis.details);
    }

    let mut burn_reports = 0;
    while fx.chain.balance_of(contracts.burner)? > 0 {
        if burn_reports >= params.max_burn_reports {
            bail!(
                "burner still holds {} stETH after {} reports",
                as_ether(fx.chain.balance_of(contracts.burner)?),
                burn_reports
            );
        }
        fx.simulator
            .push_rebase(&mut fx.chain, &BasisPoints::whole(0))
            .context("draining the burner")?;
        burn_reports += 1;
    }
    let victim_recovered_steth = fx.chain.balance_of(victim)?;
    info!(
        "coverage: applied after {} more reports, victim at {} stETH",
        burn_reports,
        as_ether(victim_recovered_steth)
    );

    Ok(CoverageOutcome {
        analysis,
        attacker_before,
        attacker_after,
        victim_initial_steth,
        victim_after_slashing_steth,
        victim_recovered_steth,
        ether_loss,
        cover_amount,
        attacker_steth_after_first_round,
        burn_reports,
    })
}
