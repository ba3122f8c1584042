//! Scenario drivers.
//!
//! Every scenario follows the same shape: fork, attacker steps in, a
//! simulated rebase lands, attacker steps out, invariants are checked.

pub mod coverage;
pub mod mev;

use crate::config::HarnessConfig;
use anyhow::{Context, Result};
use log::info;
use sandwich_core::{as_ether, Address, AttackerAccount, StakingProtocol, Wei};
use sandwich_economics::{OracleReportSimulator, SandwichStrategy};
use sandwich_sim::SimulatedChain;

/// Forked chain, report simulator and a deployed, empty exchanger.
pub struct Fixture {
    pub chain: SimulatedChain,
    pub simulator: OracleReportSimulator,
    /// Account driving the exchanger
    pub operator: Address,
    pub exchanger: Address,
}

impl Fixture {
    pub fn new(config: &HarnessConfig) -> Result<Self> {
        let mut chain =
            SimulatedChain::fork(&config.genesis, &config.contracts).context("forking protocol state")?;
        let simulator = OracleReportSimulator::new(config.report)?;
        let operator = *chain.accounts().first().context("genesis has no dev accounts")?;
        let exchanger = chain.deploy_exchanger(operator)?;
        Ok(Fixture {
            chain,
            simulator,
            operator,
            exchanger,
        })
    }

    pub fn whale(&self) -> Address {
        self.chain.contracts().eth_whale
    }

    /// Send `amount` from the whale to the exchanger.
    pub fn fund_attacker(&mut self, amount: Wei) -> Result<()> {
        let whale = self.whale();
        self.chain
            .transfer_eth(whale, self.exchanger, amount)
            .context("funding the exchanger")?;
        info!("attacker funded with {} ETH", as_ether(amount));
        Ok(())
    }

    /// Convert the exchanger's ether into stETH.
    pub fn step_in(&mut self, strategy: SandwichStrategy) -> Result<()> {
        match strategy {
            SandwichStrategy::TradingOnly => {
                self.chain.swap_eth_to_steth(self.operator, self.exchanger)?;
            }
            SandwichStrategy::StakeTrading => {
                self.chain.stake_eth_for_steth(self.operator, self.exchanger)?;
            }
        }
        Ok(())
    }

    /// Swap all stETH back; returns the exchanger's ether balance.
    pub fn step_out(&mut self) -> Result<Wei> {
        self.chain.swap_steth_to_eth(self.operator, self.exchanger)?;
        Ok(self.chain.eth_balance(self.exchanger)?)
    }

    /// Current ether and stETH holdings of the exchanger.
    pub fn attacker(&self) -> Result<AttackerAccount> {
        Ok(AttackerAccount::observe(&self.chain, self.exchanger)?)
    }
}
