/// GAME-THEORETIC SANDWICH ANALYSIS
///
/// A rebase sandwich is profitable only if the attacker exits with more
/// ether than they entered with. Every scenario iteration is summarised as
/// a `SandwichAnalysis`; a profitable one means the rebase leaks value.

use crate::invariants::{InvariantChecker, InvariantError};
use sandwich_core::{as_ether, Wei};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// How the attacker enters the sandwich.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SandwichStrategy {
    /// Swap ether for stETH on Curve, swap back after the rebase
    TradingOnly,
    /// Stake ether for stETH, swap to ether after the rebase
    StakeTrading,
}

impl fmt::Display for SandwichStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SandwichStrategy::TradingOnly => write!(f, "trading-only"),
            SandwichStrategy::StakeTrading => write!(f, "stake-trading"),
        }
    }
}

/// The rebase being sandwiched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RebaseTrigger {
    /// Burner applying cover with the given per-run quota
    Coverage { burn_quota_bp: u32 },
    /// Daily positive rebase from execution-layer rewards
    Mev { daily_rate_bp: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SandwichAnalysis {
    pub strategy: SandwichStrategy,
    pub trigger: RebaseTrigger,
    pub balance_before: Wei,
    pub balance_after: Wei,
    /// Negative means a loss
    pub attacker_profit: i128,
    pub is_profitable: bool,
    pub details: String,
}

impl SandwichAnalysis {
    pub fn is_safe(&self) -> bool {
        !self.is_profitable
    }

    /// Fails with `AttackerProfited` when the attacker gained ether.
    pub fn assert_no_profit(&self) -> Result<i128, InvariantError> {
        InvariantChecker::assert_no_profit(self.balance_before, self.balance_after)
    }

    /// Fails with `ExpectedProfit` unless the attacker gained ether.
    pub fn assert_profit(&self) -> Result<i128, InvariantError> {
        InvariantChecker::assert_profit(self.balance_before, self.balance_after)
    }
}

pub struct SandwichVerifier;

impl SandwichVerifier {
    pub fn analyse(
        strategy: SandwichStrategy,
        trigger: RebaseTrigger,
        balance_before: Wei,
        balance_after: Wei,
    ) -> SandwichAnalysis {
        let profit = InvariantChecker::attacker_profit(balance_before, balance_after);
        SandwichAnalysis {
            strategy,
            trigger,
            balance_before,
            balance_after,
            attacker_profit: profit,
            is_profitable: profit > 0,
            details: format!(
                "{} sandwich of {:?}: {:.6} ETH -> {:.6} ETH ({:+.6} ETH)",
                strategy,
                trigger,
                as_ether(balance_before),
                as_ether(balance_after),
                profit as f64 / 1e18
            ),
        }
    }

    /// Fail on the first profitable analysis.
    pub fn audit(analyses: &[SandwichAnalysis]) -> Result<(), SandwichError> {
        match analyses.iter().find(|a| !a.is_safe()) {
            Some(a) => Err(SandwichError::ProfitableAttackFound(a.details.clone())),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SandwichError {
    #[error("Profitable attack found: {0}")]
    ProfitableAttackFound(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use sandwich_core::ether;

    #[test]
    fn test_loss_is_safe() {
        let a = SandwichVerifier::analyse(
            SandwichStrategy::TradingOnly,
            RebaseTrigger::Mev { daily_rate_bp: 2.0 },
            ether(100),
            ether(99),
        );
        assert!(a.is_safe());
        assert_eq!(a.attacker_profit, -(ether(1) as i128));
        assert_eq!(a.assert_no_profit(), Ok(-(ether(1) as i128)));
        assert!(a.assert_profit().is_err());
    }

    #[test]
    fn test_profit_across_i128_boundary() {
        // balances straddling i128::MAX
        let before = i128::MAX as u128 - 1;
        let a = SandwichVerifier::analyse(
            SandwichStrategy::TradingOnly,
            RebaseTrigger::Mev { daily_rate_bp: 2.0 },
            before,
            before + 3,
        );
        assert_eq!(a.attacker_profit, 3);
        assert!(a.is_profitable);
        assert_eq!(a.assert_no_profit(), Err(InvariantError::AttackerProfited { profit: 3 }));
        assert_eq!(a.assert_profit(), Ok(3));
    }

    #[test]
    fn test_break_even_is_not_profitable() {
        let a = SandwichVerifier::analyse(
            SandwichStrategy::StakeTrading,
            RebaseTrigger::Coverage { burn_quota_bp: 8 },
            ether(100),
            ether(100),
        );
        assert!(a.is_safe());
    }

    #[test]
    fn test_audit_names_profitable_iteration() {
        let safe = SandwichVerifier::analyse(
            SandwichStrategy::TradingOnly,
            RebaseTrigger::Coverage { burn_quota_bp: 8 },
            ether(10_000),
            ether(9_999),
        );
        let leak = SandwichVerifier::analyse(
            SandwichStrategy::TradingOnly,
            RebaseTrigger::Coverage { burn_quota_bp: 10_000 },
            ether(10_000),
            ether(10_090),
        );
        assert!(SandwichVerifier::audit(&[safe.clone()]).is_ok());
        match SandwichVerifier::audit(&[safe, leak]) {
            Err(SandwichError::ProfitableAttackFound(details)) => {
                assert!(details.contains("trading-only"));
                assert!(details.contains("10000"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
