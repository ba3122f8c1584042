// FORK GENESIS
// Forked-state parameters for the simulated protocol.
//
// Defaults approximate mainnet around the introduction of the burner:
// ~4.2M ether on the beacon chain, share price 1.07, and a Curve pool
// holding more stETH than ether (stETH trading at a ~0.5% discount).

use crate::acl::Acl;
use crate::burner::{CompositeReceiver, SelfOwnedBurner};
use crate::chain::{ChainState, SimulatedChain};
use crate::curve::StableSwapPool;
use crate::oracle::{BeaconOracle, BeaconSpec};
use crate::steth::StEthLedger;
use ethers_core::types::Address;
use log::info;
use sandwich_core::{ether, mul_div, ProtocolContracts, ProtocolError, BASIS_POINTS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Holder of every pre-existing share at the fork block.
const GENESIS_HOLDER: u64 = 0x57e7_4017;
const ORACLE_MEMBER_BASE: u64 = 0x0ac1e_0000;
const DEV_ACCOUNT_BASE: u64 = 0xde_0000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenesisParams {
    // --- stETH ---
    pub beacon_balance_eth: u64,
    pub buffered_eth: u64,
    pub beacon_validators: u32,
    /// Pooled ether per share, in basis points (10700 = 1.07)
    pub share_rate_bp: u32,
    pub protocol_fee_bp: u32,

    // --- Oracle ---
    pub oracle_members: u32,
    pub oracle_quorum: u32,
    pub epochs_per_frame: u64,
    pub slots_per_epoch: u64,
    pub seconds_per_slot: u64,
    pub expected_epoch_id: u64,
    pub allowed_annual_increase_bp: u64,
    pub allowed_decrease_bp: u64,

    // --- Burner ---
    pub burn_quota_bp: u32,

    // --- Curve pool ---
    pub pool_eth: u64,
    pub pool_steth: u64,
    pub pool_amp: u64,
    /// 1e10 = 100%
    pub pool_fee: u64,
    /// 1e10 = 100%
    pub pool_admin_fee: u64,

    // --- Accounts ---
    pub whale_eth: u64,
    pub dev_accounts: u32,
    pub dev_account_eth: u64,
}

impl Default for GenesisParams {
    fn default() -> Self {
        GenesisParams {
            beacon_balance_eth: 4_200_000,
            buffered_eth: 5_000,
            beacon_validators: 130_000,
            share_rate_bp: 10_700,
            protocol_fee_bp: 1_000,

            oracle_members: 5,
            oracle_quorum: 3,
            epochs_per_frame: 225,
            slots_per_epoch: 32,
            seconds_per_slot: 12,
            expected_epoch_id: 225_000,
            allowed_annual_increase_bp: 1_000,
            allowed_decrease_bp: 500,

            burn_quota_bp: 4,

            pool_eth: 430_000,
            pool_steth: 570_000,
            pool_amp: 50,
            pool_fee: 4_000_000,
            pool_admin_fee: 5_000_000_000,

            whale_eth: 10_000_000,
            dev_accounts: 10,
            dev_account_eth: 1_000,
        }
    }
}

impl GenesisParams {
    pub fn validate(&self) -> Result<(), String> {
        if self.share_rate_bp == 0 {
            return Err("share_rate_bp must be > 0".to_string());
        }
        if self.protocol_fee_bp >= 10_000 {
            return Err("protocol_fee_bp must be < 10000".to_string());
        }
        if self.oracle_quorum == 0 || self.oracle_quorum > self.oracle_members {
            return Err(format!(
                "oracle_quorum {} must be in 1..={}",
                self.oracle_quorum, self.oracle_members
            ));
        }
        if self.pool_eth == 0 || self.pool_steth == 0 {
            return Err("pool reserves must be non-zero".to_string());
        }
        if self.pool_steth > self.beacon_balance_eth + self.buffered_eth {
            return Err("pool stETH exceeds total pooled ether".to_string());
        }
        if self.dev_accounts == 0 {
            return Err("at least one dev account is required".to_string());
        }
        Ok(())
    }
}

impl SimulatedChain {
    /// Build the forked state described by `params` at `contracts`.
    pub fn fork(params: &GenesisParams, contracts: &ProtocolContracts) -> Result<Self, ProtocolError> {
        params
            .validate()
            .map_err(|reason| ProtocolError::reverted("Genesis", reason))?;
        contracts
            .validate()
            .map_err(|reason| ProtocolError::reverted("Genesis", reason))?;

        let holder = Address::from_low_u64_be(GENESIS_HOLDER);
        let beacon_balance = ether(params.beacon_balance_eth);
        let buffered = ether(params.buffered_eth);
        let total_shares = mul_div(
            beacon_balance + buffered,
            BASIS_POINTS as u128,
            params.share_rate_bp as u128,
        )
        .ok_or(ProtocolError::Overflow("genesis"))?;

        let mut steth = StEthLedger::with_state(
            contracts.treasury,
            params.protocol_fee_bp,
            buffered,
            params.beacon_validators,
            beacon_balance,
            total_shares,
            holder,
        );
        steth.transfer(holder, contracts.curve_pool, ether(params.pool_steth))?;

        let members: Vec<Address> = (0..params.oracle_members as u64)
            .map(|i| Address::from_low_u64_be(ORACLE_MEMBER_BASE + i))
            .collect();
        let spec = BeaconSpec {
            epochs_per_frame: params.epochs_per_frame,
            slots_per_epoch: params.slots_per_epoch,
            seconds_per_slot: params.seconds_per_slot,
        };
        let oracle = BeaconOracle::new(
            members,
            params.oracle_quorum,
            spec,
            params.expected_epoch_id,
            params.allowed_annual_increase_bp,
            params.allowed_decrease_bp,
        )?;

        let accounts: Vec<Address> = (0..params.dev_accounts as u64)
            .map(|i| Address::from_low_u64_be(DEV_ACCOUNT_BASE + i))
            .collect();
        let mut eth = BTreeMap::new();
        eth.insert(contracts.steth, buffered);
        eth.insert(contracts.curve_pool, ether(params.pool_eth));
        eth.insert(contracts.eth_whale, ether(params.whale_eth));
        for account in &accounts {
            eth.insert(*account, ether(params.dev_account_eth));
        }

        let state = ChainState {
            eth,
            steth,
            oracle,
            receiver: CompositeReceiver::default(),
            burner: SelfOwnedBurner::new(params.burn_quota_bp)?,
            acl: Acl::new(contracts.voting),
            pool: StableSwapPool::new(params.pool_amp, params.pool_fee, params.pool_admin_fee)?,
            exchangers: BTreeMap::new(),
            nonce: 0,
        };
        info!(
            "forked: {} ETH pooled, {} shares, pool {} ETH / {} stETH",
            params.beacon_balance_eth + params.buffered_eth,
            total_shares,
            params.pool_eth,
            params.pool_steth
        );
        Ok(SimulatedChain::from_state(*contracts, accounts, state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sandwich_core::{StakingProtocol, WEI_PER_ETHER};

    #[test]
    fn test_defaults_are_valid() {
        assert!(GenesisParams::default().validate().is_ok());
    }

    #[test]
    fn test_quorum_validation() {
        let params = GenesisParams {
            oracle_quorum: 6,
            ..GenesisParams::default()
        };
        assert!(params.validate().unwrap_err().contains("oracle_quorum"));
    }

    #[test]
    fn test_fork_share_price_and_pool() {
        let contracts = ProtocolContracts::mainnet();
        let chain = SimulatedChain::fork(&GenesisParams::default(), &contracts).unwrap();
        assert_eq!(chain.total_pooled_ether().unwrap(), ether(4_205_000));
        let price = chain.pooled_eth_by_shares(WEI_PER_ETHER).unwrap();
        assert!(price.abs_diff(ether(107) / 100) < 10);
        let pool_steth = chain.balance_of(contracts.curve_pool).unwrap();
        assert!(pool_steth.abs_diff(ether(570_000)) <= 2);
        assert_eq!(chain.eth_balance(contracts.curve_pool).unwrap(), ether(430_000));
        assert_eq!(chain.oracle_members().unwrap().len(), 5);
        assert_eq!(chain.quorum().unwrap(), 3);
        assert_eq!(chain.expected_epoch_id().unwrap(), 225_000);
    }

    #[test]
    fn test_fork_is_deterministic() {
        let contracts = ProtocolContracts::mainnet();
        let a = SimulatedChain::fork(&GenesisParams::default(), &contracts).unwrap();
        let b = SimulatedChain::fork(&GenesisParams::default(), &contracts).unwrap();
        assert_eq!(a.state_root().unwrap(), b.state_root().unwrap());
    }
}
