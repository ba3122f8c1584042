/// ORACLE REPORT SIMULATION
///
/// Computes the beacon balance that moves total pooled ether by a requested
/// relative change, and pushes it through the oracle committee.
///
/// The computation is exact rational arithmetic. The result is a signed
/// gwei amount: a large enough negative change yields a negative balance,
/// which is surfaced when converting to the protocol's `u64` field.

use crate::invariants::{InvariantChecker, InvariantError, Tolerance};
use log::{debug, info};
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{Signed, ToPrimitive, Zero};
use sandwich_core::{
    Gwei, OracleReport, ProtocolError, ProtocolStateSnapshot, QuorumSet, StakingProtocol, Wei,
    BASIS_POINTS, WEI_PER_GWEI,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// An exact, possibly fractional, amount of basis points.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BasisPoints(BigRational);

impl BasisPoints {
    pub fn whole(bp: i64) -> Self {
        BasisPoints(BigRational::from_integer(BigInt::from(bp)))
    }

    /// `numer / denom` basis points; `None` for a zero denominator.
    pub fn ratio(numer: i64, denom: i64) -> Option<Self> {
        if denom == 0 {
            return None;
        }
        Some(BasisPoints(BigRational::new(BigInt::from(numer), BigInt::from(denom))))
    }

    /// Exact value of the binary float, e.g. `1.4` is not `7/5`.
    pub fn from_f64(bp: f64) -> Option<Self> {
        BigRational::from_float(bp).map(BasisPoints)
    }

    pub fn as_rational(&self) -> &BigRational {
        &self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0.is_positive()
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn to_f64(&self) -> f64 {
        let numer = self.0.numer().to_f64().unwrap_or(f64::NAN);
        let denom = self.0.denom().to_f64().unwrap_or(f64::NAN);
        numer / denom
    }
}

impl From<i64> for BasisPoints {
    fn from(bp: i64) -> Self {
        BasisPoints::whole(bp)
    }
}

impl fmt::Display for BasisPoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} bp", self.to_f64())
    }
}

/// Beacon balance in gwei as computed, before range conversion.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReportedBalance(pub BigInt);

impl ReportedBalance {
    pub fn to_gwei(&self) -> Result<Gwei, OracleReportError> {
        self.0
            .to_u64()
            .ok_or_else(|| OracleReportError::BalanceOutOfRange(self.0.clone()))
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }
}

#[derive(Debug, Error)]
pub enum OracleReportError {
    #[error("Protocol call failed: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("Beacon balance {0} gwei does not fit the report field")]
    BalanceOutOfRange(BigInt),
    #[error("Invariant violated: {0}")]
    Invariant(#[from] InvariantError),
    #[error("Invalid report parameters: {0}")]
    InvalidParams(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportParams {
    /// Protocol fee on rewards, in basis points
    pub protocol_fee_bp: u32,
    pub tolerance: Tolerance,
}

impl Default for ReportParams {
    fn default() -> Self {
        ReportParams {
            protocol_fee_bp: 1_000,
            tolerance: Tolerance::default(),
        }
    }
}

/// What a pushed rebase did to the protocol.
#[derive(Debug, Clone, PartialEq)]
pub struct RebaseOutcome {
    pub requested_bp: f64,
    pub realized_bp: f64,
    pub report: OracleReport,
    pub share_price_before: Wei,
    pub share_price_after: Wei,
    pub total_pooled_before: Wei,
    pub total_pooled_after: Wei,
}

#[derive(Debug, Clone)]
pub struct OracleReportSimulator {
    params: ReportParams,
}

impl OracleReportSimulator {
    pub fn new(params: ReportParams) -> Result<Self, OracleReportError> {
        if params.protocol_fee_bp >= BASIS_POINTS {
            return Err(OracleReportError::InvalidParams(format!(
                "protocol fee {} bp must be below {}",
                params.protocol_fee_bp, BASIS_POINTS
            )));
        }
        Ok(OracleReportSimulator { params })
    }

    pub fn params(&self) -> &ReportParams {
        &self.params
    }

    /// Gross change needed so holders observe `change` after the fee;
    /// decreases pass through.
    pub fn fee_adjusted_change(&self, change: &BasisPoints) -> BasisPoints {
        if !change.is_positive() {
            return change.clone();
        }
        let full = BigInt::from(BASIS_POINTS);
        let net = &full - BigInt::from(self.params.protocol_fee_bp);
        BasisPoints(change.as_rational() * BigRational::new(full, net))
    }

    /// Beacon balance (gwei, rounded half up) moving total pooled ether by
    /// `change`.
    pub fn compute_reported_balance(
        &self,
        snapshot: &ProtocolStateSnapshot,
        change: &BasisPoints,
    ) -> ReportedBalance {
        let total = BigRational::from_integer(BigInt::from(snapshot.total_pooled_ether));
        let beacon = BigRational::from_integer(BigInt::from(snapshot.beacon_balance));
        let buffered = &total - &beacon;

        let adjusted = self.fee_adjusted_change(change);
        let full = BigRational::from_integer(BigInt::from(BASIS_POINTS));
        let new_total = &total * (&full + adjusted.as_rational()) / &full;
        let new_beacon = new_total - buffered;

        let gwei = new_beacon / BigRational::from_integer(BigInt::from(WEI_PER_GWEI))
            + BigRational::new(BigInt::from(1), BigInt::from(2));
        let balance = gwei.to_integer();
        debug!(
            "report: change {} (adjusted {}) -> beacon balance {} gwei",
            change, adjusted, balance
        );
        ReportedBalance(balance)
    }

    /// Submit `report` once from each of the first `quorum` members.
    pub fn submit_report<P: StakingProtocol + ?Sized>(
        protocol: &mut P,
        quorum: &QuorumSet,
        report: &OracleReport,
    ) -> Result<(), OracleReportError> {
        for member in quorum.submitters() {
            protocol.report_beacon(
                report.epoch_id,
                report.beacon_balance,
                report.beacon_validators,
                *member,
            )?;
            debug!("report: {:?} submitted epoch {}", member, report.epoch_id);
        }
        Ok(())
    }

    /// Build the report for `change` against the current state.
    pub fn build_report<P: StakingProtocol + ?Sized>(
        &self,
        protocol: &P,
        change: &BasisPoints,
    ) -> Result<OracleReport, OracleReportError> {
        let snapshot = ProtocolStateSnapshot::capture(protocol)?;
        let balance = self.compute_reported_balance(&snapshot, change);
        Ok(OracleReport {
            epoch_id: protocol.expected_epoch_id()?,
            beacon_balance: balance.to_gwei()?,
            beacon_validators: snapshot.beacon_validators,
        })
    }

    /// Rebase total pooled ether by `change` through the committee.
    pub fn push_rebase<P: StakingProtocol + ?Sized>(
        &self,
        protocol: &mut P,
        change: &BasisPoints,
    ) -> Result<RebaseOutcome, OracleReportError> {
        let quorum = QuorumSet::capture(protocol)?;
        let share_price_before = InvariantChecker::share_price(protocol)?;
        let total_pooled_before = protocol.total_pooled_ether()?;

        let report = self.build_report(protocol, change)?;
        Self::submit_report(protocol, &quorum, &report)?;

        let share_price_after = InvariantChecker::share_price(protocol)?;
        let total_pooled_after = protocol.total_pooled_ether()?;
        let realized_bp = InvariantChecker::relative_change_bp(share_price_before, share_price_after)?;
        info!(
            "rebase at epoch {}: requested {}, realized {:.4} bp",
            report.epoch_id, change, realized_bp
        );
        Ok(RebaseOutcome {
            requested_bp: change.to_f64(),
            realized_bp,
            report,
            share_price_before,
            share_price_after,
            total_pooled_before,
            total_pooled_after,
        })
    }

    /// `push_rebase`, then require the share price to have moved by
    /// `change` within tolerance.
    pub fn push_checked_rebase<P: StakingProtocol + ?Sized>(
        &self,
        protocol: &mut P,
        change: &BasisPoints,
    ) -> Result<RebaseOutcome, OracleReportError> {
        let outcome = self.push_rebase(protocol, change)?;
        // Realized change is net of the protocol fee, so it is held against
        // `change` as requested and never against the fee-adjusted value.
        InvariantChecker::assert_close_to(outcome.requested_bp, outcome.realized_bp, &self.params.tolerance)?;
        Ok(outcome)
    }
}
