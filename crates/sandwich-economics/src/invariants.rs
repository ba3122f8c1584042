/// ECONOMIC INVARIANTS
///
/// Pure checks over protocol observations: share price, relative change,
/// closeness of realized vs requested rebases, and attacker PnL.

use log::debug;
use sandwich_core::{signed_delta, ProtocolError, StakingProtocol, Wei, BASIS_POINTS};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Share count whose pooled value is used as the share price.
pub const SHARE_PRICE_REFERENCE: u128 = 1_000_000_000_000_000_000_000_000_000;

/// Closeness bounds with `math.isclose` semantics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerance {
    pub relative: f64,
    pub absolute: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Tolerance {
            relative: 1e-2,
            absolute: 0.0,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum InvariantError {
    #[error("Expected {expected} bp, got {actual} bp (rel {relative}, abs {absolute})")]
    NotClose {
        expected: f64,
        actual: f64,
        relative: f64,
        absolute: f64,
    },
    #[error("Attacker profited {profit} wei")]
    AttackerProfited { profit: i128 },
    #[error("Expected a profitable attack, attacker ended at {profit} wei")]
    ExpectedProfit { profit: i128 },
    #[error("Relative change against a zero baseline")]
    ZeroBaseline,
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

pub struct InvariantChecker;

impl InvariantChecker {
    /// Pooled ether backing `SHARE_PRICE_REFERENCE` shares.
    pub fn share_price<P: StakingProtocol + ?Sized>(protocol: &P) -> Result<Wei, ProtocolError> {
        protocol.pooled_eth_by_shares(SHARE_PRICE_REFERENCE)
    }

    /// `(after / before - 1) * 10000`
    pub fn relative_change_bp(before: Wei, after: Wei) -> Result<f64, InvariantError> {
        if before == 0 {
            return Err(InvariantError::ZeroBaseline);
        }
        Ok(signed_delta(before, after) as f64 / before as f64 * BASIS_POINTS as f64)
    }

    pub fn is_close(expected: f64, actual: f64, tolerance: &Tolerance) -> bool {
        let bound = (tolerance.relative * expected.abs().max(actual.abs())).max(tolerance.absolute);
        (expected - actual).abs() <= bound
    }

    pub fn assert_close_to(expected: f64, actual: f64, tolerance: &Tolerance) -> Result<(), InvariantError> {
        if Self::is_close(expected, actual, tolerance) {
            debug!("invariant: {} bp close to {} bp", actual, expected);
            return Ok(());
        }
        Err(InvariantError::NotClose {
            expected,
            actual,
            relative: tolerance.relative,
            absolute: tolerance.absolute,
        })
    }

    /// Signed ether delta of the attacker.
    pub fn attacker_profit(before: Wei, after: Wei) -> i128 {
        signed_delta(before, after)
    }

    pub fn assert_no_profit(before: Wei, after: Wei) -> Result<i128, InvariantError> {
        let profit = Self::attacker_profit(before, after);
        if profit > 0 {
            return Err(InvariantError::AttackerProfited { profit });
        }
        Ok(profit)
    }

    pub fn assert_profit(before: Wei, after: Wei) -> Result<i128, InvariantError> {
        let profit = Self::attacker_profit(before, after);
        if profit <= 0 {
            return Err(InvariantError::ExpectedProfit { profit });
        }
        Ok(profit)
    }
}
