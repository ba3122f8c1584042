//! External staking protocol interface.
//!
//! The harness never re-implements the protocol: it reads state and submits
//! reports through this trait. Every call is synchronous and atomic from the
//! caller's point of view; a revert is returned as `ProtocolError` and is
//! never retried.

use crate::types::{BeaconStat, EpochId, SnapshotId};
use crate::units::{Gwei, Shares, Wei};
use ethers_core::types::Address;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("{contract} reverted: {reason}")]
    Reverted { contract: String, reason: String },

    #[error("Quorum {quorum} exceeds member count {members}")]
    InvalidQuorum { quorum: u32, members: usize },

    #[error("Unknown snapshot {0:?}")]
    UnknownSnapshot(SnapshotId),

    #[error("Arithmetic overflow in {0}")]
    Overflow(&'static str),
}

impl ProtocolError {
    pub fn reverted(contract: impl Into<String>, reason: impl Into<String>) -> Self {
        ProtocolError::Reverted {
            contract: contract.into(),
            reason: reason.into(),
        }
    }

    /// Revert reason string, if this is a revert.
    pub fn revert_reason(&self) -> Option<&str> {
        match self {
            ProtocolError::Reverted { reason, .. } => Some(reason.as_str()),
            _ => None,
        }
    }
}

/// Query and mutation surface of the deployed staking protocol.
///
/// Method names follow the on-chain ABI (`getTotalPooledEther`,
/// `getBeaconStat`, `reportBeacon`, ...) in Rust casing. Mutating calls take
/// the sender explicitly.
pub trait StakingProtocol {
    /// Total ether under management: buffer + beacon balance + transient.
    fn total_pooled_ether(&self) -> Result<Wei, ProtocolError>;

    fn beacon_stat(&self) -> Result<BeaconStat, ProtocolError>;

    fn total_shares(&self) -> Result<Shares, ProtocolError>;

    fn pooled_eth_by_shares(&self, shares: Shares) -> Result<Wei, ProtocolError>;

    fn shares_by_pooled_eth(&self, amount: Wei) -> Result<Shares, ProtocolError>;

    /// stETH balance.
    fn balance_of(&self, account: Address) -> Result<Wei, ProtocolError>;

    /// Native ether balance.
    fn eth_balance(&self, account: Address) -> Result<Wei, ProtocolError>;

    fn expected_epoch_id(&self) -> Result<EpochId, ProtocolError>;

    /// Oracle committee in registration order.
    fn oracle_members(&self) -> Result<Vec<Address>, ProtocolError>;

    fn quorum(&self) -> Result<u32, ProtocolError>;

    /// Submit one member's beacon report. Applies the rebase once the
    /// quorum-th identical report arrives.
    fn report_beacon(
        &mut self,
        epoch_id: EpochId,
        beacon_balance: Gwei,
        beacon_validators: u32,
        from: Address,
    ) -> Result<(), ProtocolError>;

    /// Stake ether, returns minted shares.
    fn submit(&mut self, from: Address, value: Wei) -> Result<Shares, ProtocolError>;

    /// stETH transfer.
    fn transfer(&mut self, from: Address, to: Address, amount: Wei) -> Result<(), ProtocolError>;

    /// stETH allowance.
    fn approve(&mut self, owner: Address, spender: Address, amount: Wei)
        -> Result<(), ProtocolError>;

    /// Plain value transfer.
    fn transfer_eth(&mut self, from: Address, to: Address, amount: Wei)
        -> Result<(), ProtocolError>;
}

/// Whole-environment isolation primitive (`evm_snapshot` / `evm_revert`).
///
/// Reverting to a snapshot keeps that snapshot alive so a scenario loop can
/// revert to the same point repeatedly; later snapshots are discarded.
pub trait Snapshotting {
    fn snapshot(&mut self) -> SnapshotId;

    fn revert_to(&mut self, id: SnapshotId) -> Result<(), ProtocolError>;
}
