//! Protocol data model observed by the harness.

use crate::protocol::{ProtocolError, StakingProtocol};
use crate::units::{Gwei, Shares, Wei};
use ethers_core::types::Address;
use serde::{Deserialize, Serialize};

/// Beacon chain reporting epoch.
pub type EpochId = u64;

/// Handle returned by `Snapshotting::snapshot`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SnapshotId(pub u64);

/// `getBeaconStat()` result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeaconStat {
    pub deposited_validators: u32,
    pub beacon_validators: u32,
    pub beacon_balance: Wei,
}

/// Read-only view of the protocol at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolStateSnapshot {
    pub total_pooled_ether: Wei,
    pub deposited_validators: u32,
    pub beacon_validators: u32,
    /// Beacon side of `total_pooled_ether`, as last reported
    pub beacon_balance: Wei,
    pub total_shares: Shares,
}

impl ProtocolStateSnapshot {
    pub fn capture<P: StakingProtocol + ?Sized>(protocol: &P) -> Result<Self, ProtocolError> {
        let stat = protocol.beacon_stat()?;
        Ok(ProtocolStateSnapshot {
            total_pooled_ether: protocol.total_pooled_ether()?,
            deposited_validators: stat.deposited_validators,
            beacon_validators: stat.beacon_validators,
            beacon_balance: stat.beacon_balance,
            total_shares: protocol.total_shares()?,
        })
    }

    /// Not-yet-staked part of the pool. `None` if the snapshot breaks
    /// `total_pooled_ether >= beacon_balance`.
    pub fn buffered_ether(&self) -> Option<Wei> {
        self.total_pooled_ether.checked_sub(self.beacon_balance)
    }
}

/// One member's `reportBeacon` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OracleReport {
    pub epoch_id: EpochId,
    /// Beacon balance in gwei
    pub beacon_balance: Gwei,
    pub beacon_validators: u32,
}

/// Oracle committee and the number of identical reports that finalize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuorumSet {
    members: Vec<Address>,
    quorum: u32,
}

impl QuorumSet {
    pub fn new(members: Vec<Address>, quorum: u32) -> Result<Self, ProtocolError> {
        if quorum as usize > members.len() {
            return Err(ProtocolError::InvalidQuorum {
                quorum,
                members: members.len(),
            });
        }
        Ok(QuorumSet { members, quorum })
    }

    pub fn capture<P: StakingProtocol + ?Sized>(protocol: &P) -> Result<Self, ProtocolError> {
        QuorumSet::new(protocol.oracle_members()?, protocol.quorum()?)
    }

    pub fn members(&self) -> &[Address] {
        &self.members
    }

    pub fn quorum(&self) -> u32 {
        self.quorum
    }

    /// The first `quorum` members, in committee order.
    pub fn submitters(&self) -> &[Address] {
        &self.members[..self.quorum as usize]
    }
}

/// Attacker balances observed between scenario steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackerAccount {
    pub address: Address,
    pub eth: Wei,
    pub steth: Wei,
}

impl AttackerAccount {
    pub fn observe<P: StakingProtocol + ?Sized>(
        protocol: &P,
        address: Address,
    ) -> Result<Self, ProtocolError> {
        Ok(AttackerAccount {
            address,
            eth: protocol.eth_balance(address)?,
            steth: protocol.balance_of(address)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::ether;

    fn members(n: u64) -> Vec<Address> {
        (1..=n).map(Address::from_low_u64_be).collect()
    }

    #[test]
    fn test_quorum_set_submitters_are_prefix() {
        let set = QuorumSet::new(members(5), 3).unwrap();
        assert_eq!(set.submitters(), &members(5)[..3]);
        assert_eq!(set.members().len(), 5);
    }

    #[test]
    fn test_quorum_larger_than_committee_rejected() {
        let err = QuorumSet::new(members(2), 3).unwrap_err();
        assert_eq!(err, ProtocolError::InvalidQuorum { quorum: 3, members: 2 });
    }

    #[test]
    fn test_zero_quorum_has_no_submitters() {
        let set = QuorumSet::new(members(3), 0).unwrap();
        assert!(set.submitters().is_empty());
    }

    #[test]
    fn test_buffered_ether() {
        let snapshot = ProtocolStateSnapshot {
            total_pooled_ether: ether(105),
            deposited_validators: 3,
            beacon_validators: 3,
            beacon_balance: ether(100),
            total_shares: ether(100),
        };
        assert_eq!(snapshot.buffered_ether(), Some(ether(5)));

        let broken = ProtocolStateSnapshot { beacon_balance: ether(106), ..snapshot };
        assert_eq!(broken.buffered_ether(), None);
    }

    #[test]
    fn test_report_serde() {
        let report = OracleReport {
            epoch_id: 225_000,
            beacon_balance: 4_200_000_000_000_000,
            beacon_validators: 130_000,
        };
        let json = serde_json::to_string(&report).unwrap();
        let back: OracleReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }
}
