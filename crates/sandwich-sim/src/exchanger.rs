// ATTACKER EXCHANGER
//
// Bundles the step-in and step-out legs of a sandwich into single calls
// that always move the exchanger's whole balance.

use crate::chain::SimulatedChain;
use crate::curve::{ETH_INDEX, STETH_INDEX};
use ethers_core::types::Address;
use log::info;
use sandwich_core::{ProtocolError, Shares, Wei};

const CONTRACT: &str = "Exchanger";
const EXCHANGER_ADDRESS_BASE: u64 = 0xe8c4_0000;

impl SimulatedChain {
    /// Deploy a fresh exchanger owned by `deployer`.
    pub fn deploy_exchanger(&mut self, deployer: Address) -> Result<Address, ProtocolError> {
        let exchanger = self.transact(|state, _| {
            state.nonce += 1;
            let exchanger = Address::from_low_u64_be(EXCHANGER_ADDRESS_BASE + state.nonce);
            state.exchangers.insert(exchanger, deployer);
            Ok(exchanger)
        })?;
        info!("exchanger deployed at {:?} by {:?}", exchanger, deployer);
        Ok(exchanger)
    }

    /// Owner of a deployed exchanger.
    pub fn exchanger_owner(&self, exchanger: Address) -> Option<Address> {
        self.state().exchangers.get(&exchanger).copied()
    }

    fn ensure_owner(&self, caller: Address, exchanger: Address) -> Result<(), ProtocolError> {
        match self.exchanger_owner(exchanger) {
            None => Err(ProtocolError::reverted(CONTRACT, "NOT_DEPLOYED")),
            Some(owner) if owner != caller => Err(ProtocolError::reverted(CONTRACT, "ONLY_OWNER")),
            Some(_) => Ok(()),
        }
    }

    /// Swap the exchanger's whole ether balance for stETH on Curve.
    pub fn swap_eth_to_steth(&mut self, caller: Address, exchanger: Address) -> Result<Wei, ProtocolError> {
        self.ensure_owner(caller, exchanger)?;
        let received = self.transact(|state, contracts| {
            let amount = state.eth_of(exchanger);
            state.exchange(contracts, exchanger, ETH_INDEX, STETH_INDEX, amount)
        })?;
        info!("exchanger {:?}: ETH -> {} stETH", exchanger, received);
        Ok(received)
    }

    /// Swap the exchanger's whole stETH balance back to ether.
    pub fn swap_steth_to_eth(&mut self, caller: Address, exchanger: Address) -> Result<Wei, ProtocolError> {
        self.ensure_owner(caller, exchanger)?;
        let received = self.transact(|state, contracts| {
            let amount = state.steth.balance_of(exchanger)?;
            state.steth.approve(exchanger, contracts.curve_pool, amount)?;
            state.exchange(contracts, exchanger, STETH_INDEX, ETH_INDEX, amount)
        })?;
        info!("exchanger {:?}: stETH -> {} ETH", exchanger, received);
        Ok(received)
    }

    /// Stake the exchanger's whole ether balance with the protocol.
    pub fn stake_eth_for_steth(&mut self, caller: Address, exchanger: Address) -> Result<Shares, ProtocolError> {
        self.ensure_owner(caller, exchanger)?;
        let shares = self.transact(|state, contracts| {
            let amount = state.eth_of(exchanger);
            state.submit(contracts, exchanger, amount)
        })?;
        info!("exchanger {:?}: staked for {} shares", exchanger, shares);
        Ok(shares)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genesis::GenesisParams;
    use sandwich_core::{ether, ProtocolContracts, StakingProtocol};

    fn funded() -> (SimulatedChain, Address, Address) {
        let mut c = SimulatedChain::fork(&GenesisParams::default(), &ProtocolContracts::mainnet()).unwrap();
        let owner = c.accounts()[0];
        let exchanger = c.deploy_exchanger(owner).unwrap();
        c.transfer_eth(owner, exchanger, ether(100)).unwrap();
        (c, owner, exchanger)
    }

    #[test]
    fn test_round_trip_loses_fees() {
        let (mut c, owner, exchanger) = funded();
        c.swap_eth_to_steth(owner, exchanger).unwrap();
        assert_eq!(c.eth_balance(exchanger).unwrap(), 0);
        let back = c.swap_steth_to_eth(owner, exchanger).unwrap();
        assert!(back < ether(100));
        assert!(back > ether(99));
        assert!(c.balance_of(exchanger).unwrap() <= 1);
    }

    #[test]
    fn test_stake_moves_whole_balance() {
        let (mut c, owner, exchanger) = funded();
        c.stake_eth_for_steth(owner, exchanger).unwrap();
        assert_eq!(c.eth_balance(exchanger).unwrap(), 0);
        assert!(c.balance_of(exchanger).unwrap().abs_diff(ether(100)) <= 1);
    }

    #[test]
    fn test_only_owner_may_drive_exchanger() {
        let (mut c, _, exchanger) = funded();
        let stranger = c.accounts()[1];
        let err = c.swap_eth_to_steth(stranger, exchanger).unwrap_err();
        assert_eq!(err.revert_reason(), Some("ONLY_OWNER"));
    }

    #[test]
    fn test_distinct_deployments() {
        let (mut c, owner, first) = funded();
        let second = c.deploy_exchanger(owner).unwrap();
        assert_ne!(first, second);
    }
}
