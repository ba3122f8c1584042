// BEACON ORACLE
//
// Quorum-based beacon balance reporting.
//
// INVARIANTS:
// 1. Reports are accepted only for the expected epoch or a later frame start
// 2. Each member reports at most once per frame
// 3. A report finalizes when `quorum` members submitted the identical tuple
// 4. Finalized reports must stay within the configured relative change limits

use ethers_core::types::{Address, U256};
use log::{debug, info};
use sandwich_core::{EpochId, OracleReport, ProtocolError, Wei, BASIS_POINTS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const CONTRACT: &str = "LidoOracle";

const SECONDS_PER_YEAR: u64 = 365 * 24 * 60 * 60;

fn revert(reason: &str) -> ProtocolError {
    ProtocolError::reverted(CONTRACT, reason)
}

/// Frame geometry of the beacon chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeaconSpec {
    pub epochs_per_frame: u64,
    pub slots_per_epoch: u64,
    pub seconds_per_slot: u64,
}

impl Default for BeaconSpec {
    fn default() -> Self {
        // one frame per day
        BeaconSpec {
            epochs_per_frame: 225,
            slots_per_epoch: 32,
            seconds_per_slot: 12,
        }
    }
}

/// A report that reached quorum in this call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalizedReport {
    pub report: OracleReport,
    /// Seconds since the previous finalized epoch
    pub time_elapsed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeaconOracle {
    members: Vec<Address>,
    quorum: u32,
    spec: BeaconSpec,
    expected_epoch_id: EpochId,
    last_completed_epoch_id: EpochId,
    /// Current frame submissions, keyed by member
    submissions: BTreeMap<Address, OracleReport>,
    allowed_annual_increase_bp: u64,
    allowed_decrease_bp: u64,
    report_receiver: Option<Address>,
}

impl BeaconOracle {
    pub fn new(
        members: Vec<Address>,
        quorum: u32,
        spec: BeaconSpec,
        expected_epoch_id: EpochId,
        allowed_annual_increase_bp: u64,
        allowed_decrease_bp: u64,
    ) -> Result<Self, ProtocolError> {
        if spec.epochs_per_frame == 0 || spec.slots_per_epoch == 0 || spec.seconds_per_slot == 0 {
            return Err(revert("BAD_BEACON_SPEC"));
        }
        if quorum == 0 {
            return Err(revert("QUORUM_WONT_BE_MADE"));
        }
        if quorum as usize > members.len() {
            return Err(ProtocolError::InvalidQuorum {
                quorum,
                members: members.len(),
            });
        }
        if expected_epoch_id < spec.epochs_per_frame || expected_epoch_id % spec.epochs_per_frame != 0 {
            return Err(revert("UNEXPECTED_EPOCH"));
        }
        Ok(BeaconOracle {
            members,
            quorum,
            spec,
            expected_epoch_id,
            last_completed_epoch_id: expected_epoch_id - spec.epochs_per_frame,
            submissions: BTreeMap::new(),
            allowed_annual_increase_bp,
            allowed_decrease_bp,
            report_receiver: None,
        })
    }

    pub fn members(&self) -> &[Address] {
        &self.members
    }

    pub fn quorum(&self) -> u32 {
        self.quorum
    }

    pub fn expected_epoch_id(&self) -> EpochId {
        self.expected_epoch_id
    }

    pub fn last_completed_epoch_id(&self) -> EpochId {
        self.last_completed_epoch_id
    }

    pub fn report_receiver(&self) -> Option<Address> {
        self.report_receiver
    }

    pub fn allowed_annual_increase_bp(&self) -> u64 {
        self.allowed_annual_increase_bp
    }

    pub fn allowed_decrease_bp(&self) -> u64 {
        self.allowed_decrease_bp
    }

    /// Number of submissions in the current frame.
    pub fn pending_submissions(&self) -> usize {
        self.submissions.len()
    }

    pub fn set_report_receiver(&mut self, receiver: Option<Address>) {
        self.report_receiver = receiver;
    }

    pub fn set_allowed_annual_increase_bp(&mut self, bp: u64) {
        self.allowed_annual_increase_bp = bp;
    }

    pub fn set_allowed_decrease_bp(&mut self, bp: u64) {
        self.allowed_decrease_bp = bp;
    }

    /// Record one member's report. Returns the report if it just reached
    /// quorum; the frame then advances.
    pub fn record_report(
        &mut self,
        report: OracleReport,
        member: Address,
    ) -> Result<Option<FinalizedReport>, ProtocolError> {
        if report.epoch_id < self.expected_epoch_id {
            return Err(revert("EPOCH_IS_TOO_OLD"));
        }
        if report.epoch_id > self.expected_epoch_id {
            if report.epoch_id % self.spec.epochs_per_frame != 0 {
                return Err(revert("UNEXPECTED_EPOCH"));
            }
            debug!(
                "oracle: frame skipped from epoch {} to {}",
                self.expected_epoch_id, report.epoch_id
            );
            self.submissions.clear();
            self.expected_epoch_id = report.epoch_id;
        }
        if !self.members.contains(&member) {
            return Err(revert("MEMBER_NOT_FOUND"));
        }
        if self.submissions.contains_key(&member) {
            return Err(revert("ALREADY_SUBMITTED"));
        }
        self.submissions.insert(member, report);

        let matching = self.submissions.values().filter(|r| **r == report).count();
        if matching < self.quorum as usize {
            return Ok(None);
        }

        let time_elapsed = (report.epoch_id - self.last_completed_epoch_id)
            * self.spec.slots_per_epoch
            * self.spec.seconds_per_slot;
        self.last_completed_epoch_id = report.epoch_id;
        self.expected_epoch_id = report.epoch_id + self.spec.epochs_per_frame;
        self.submissions.clear();
        info!(
            "oracle: epoch {} finalized with {} validators, {} gwei",
            report.epoch_id, report.beacon_validators, report.beacon_balance
        );
        Ok(Some(FinalizedReport { report, time_elapsed }))
    }

    /// Reject rebases outside the allowed annualised increase or the allowed
    /// one-off decrease.
    pub fn sanity_check(
        &self,
        pre_total_pooled_ether: Wei,
        post_total_pooled_ether: Wei,
        time_elapsed: u64,
    ) -> Result<(), ProtocolError> {
        let bp = U256::from(BASIS_POINTS);
        let pre = U256::from(pre_total_pooled_ether);
        if post_total_pooled_ether >= pre_total_pooled_ether {
            let increase = U256::from(post_total_pooled_ether - pre_total_pooled_ether);
            let lhs = U256::from(SECONDS_PER_YEAR) * bp * increase;
            let rhs = U256::from(self.allowed_annual_increase_bp) * pre * U256::from(time_elapsed);
            if lhs > rhs {
                return Err(revert("ALLOWED_BEACON_BALANCE_INCREASE"));
            }
        } else {
            let decrease = U256::from(pre_total_pooled_ether - post_total_pooled_ether);
            if bp * decrease > U256::from(self.allowed_decrease_bp) * pre {
                return Err(revert("ALLOWED_BEACON_BALANCE_DECREASE"));
            }
        }
        Ok(())
    }
}
