//! SANDWICH CORE
//!
//! Shared vocabulary for the rebase-sandwich harness:
//! - integer units (wei, gwei, shares, basis points)
//! - read-only protocol snapshots and oracle reports
//! - the external staking protocol interface the harness drives
//! - the contract address book, resolved once and passed explicitly

pub mod units;
pub mod types;
pub mod protocol;
pub mod contracts;

pub use units::{
    as_ether, ether, mul_div, signed_delta, to_u128, Gwei, Shares, Wei, BASIS_POINTS, DEPOSIT_SIZE,
    WEI_PER_ETHER, WEI_PER_GWEI,
};

pub use types::{
    AttackerAccount, BeaconStat, EpochId, OracleReport, ProtocolStateSnapshot, QuorumSet,
    SnapshotId,
};

pub use protocol::{ProtocolError, Snapshotting, StakingProtocol};

pub use contracts::ProtocolContracts;

pub use ethers_core::types::{Address, H256, U256};
