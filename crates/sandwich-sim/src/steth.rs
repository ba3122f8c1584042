// STETH SHARE LEDGER
//
// Rebasing token accounting: balances are shares, and a share redeems
// `total_pooled_ether / total_shares` wei. An oracle report changes the
// numerator, burns change the denominator, stakes change both in step.
//
// Arithmetic mirrors the token contract: every conversion rounds down.

use ethers_core::types::Address;
use log::debug;
use sandwich_core::{
    mul_div, BeaconStat, ProtocolError, Shares, Wei, BASIS_POINTS, DEPOSIT_SIZE,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const CONTRACT: &str = "stETH";

fn revert(reason: &str) -> ProtocolError {
    ProtocolError::reverted(CONTRACT, reason)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StEthLedger {
    buffered_ether: Wei,
    deposited_validators: u32,
    beacon_validators: u32,
    beacon_balance: Wei,
    total_shares: Shares,
    shares: BTreeMap<Address, Shares>,
    /// (owner, spender) -> allowance
    allowances: BTreeMap<(Address, Address), Wei>,
    /// Protocol fee on beacon rewards
    fee_bp: u32,
    treasury: Address,
}

impl StEthLedger {
    /// Ledger with an existing validator set and a single holder owning
    /// every share.
    pub fn with_state(
        treasury: Address,
        fee_bp: u32,
        buffered_ether: Wei,
        beacon_validators: u32,
        beacon_balance: Wei,
        total_shares: Shares,
        holder: Address,
    ) -> Self {
        let mut shares = BTreeMap::new();
        if total_shares > 0 {
            shares.insert(holder, total_shares);
        }
        StEthLedger {
            buffered_ether,
            deposited_validators: beacon_validators,
            beacon_validators,
            beacon_balance,
            total_shares,
            shares,
            allowances: BTreeMap::new(),
            fee_bp,
            treasury,
        }
    }

    pub fn total_pooled_ether(&self) -> Wei {
        let transient = (self.deposited_validators - self.beacon_validators) as Wei * DEPOSIT_SIZE;
        self.buffered_ether + self.beacon_balance + transient
    }

    pub fn buffered_ether(&self) -> Wei {
        self.buffered_ether
    }

    pub fn total_shares(&self) -> Shares {
        self.total_shares
    }

    pub fn fee_bp(&self) -> u32 {
        self.fee_bp
    }

    pub fn beacon_stat(&self) -> BeaconStat {
        BeaconStat {
            deposited_validators: self.deposited_validators,
            beacon_validators: self.beacon_validators,
            beacon_balance: self.beacon_balance,
        }
    }

    pub fn pooled_eth_by_shares(&self, shares: Shares) -> Result<Wei, ProtocolError> {
        if self.total_shares == 0 {
            return Ok(0);
        }
        mul_div(shares, self.total_pooled_ether(), self.total_shares)
            .ok_or(ProtocolError::Overflow("getPooledEthByShares"))
    }

    pub fn shares_by_pooled_eth(&self, amount: Wei) -> Result<Shares, ProtocolError> {
        let total_pooled = self.total_pooled_ether();
        if total_pooled == 0 {
            return Ok(0);
        }
        mul_div(amount, self.total_shares, total_pooled)
            .ok_or(ProtocolError::Overflow("getSharesByPooledEth"))
    }

    pub fn shares_of(&self, account: Address) -> Shares {
        self.shares.get(&account).copied().unwrap_or(0)
    }

    pub fn balance_of(&self, account: Address) -> Result<Wei, ProtocolError> {
        self.pooled_eth_by_shares(self.shares_of(account))
    }

    pub fn allowance(&self, owner: Address, spender: Address) -> Wei {
        self.allowances.get(&(owner, spender)).copied().unwrap_or(0)
    }

    /// Stake ether into the buffer. The caller moves the ether itself.
    pub fn submit(&mut self, sender: Address, value: Wei) -> Result<Shares, ProtocolError> {
        if value == 0 {
            return Err(revert("ZERO_DEPOSIT"));
        }
        let mut shares = self.shares_by_pooled_eth(value)?;
        if shares == 0 {
            // bootstrap: empty pool mints 1:1
            shares = value;
        }
        self.mint_shares(sender, shares);
        self.buffered_ether += value;
        debug!("submit: {:?} staked {} wei for {} shares", sender, value, shares);
        Ok(shares)
    }

    pub fn transfer(&mut self, from: Address, to: Address, amount: Wei) -> Result<(), ProtocolError> {
        let shares = self.shares_by_pooled_eth(amount)?;
        self.transfer_shares(from, to, shares)
    }

    pub fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: Wei,
    ) -> Result<(), ProtocolError> {
        let allowance = self.allowance(from, spender);
        if allowance < amount {
            return Err(revert("TRANSFER_AMOUNT_EXCEEDS_ALLOWANCE"));
        }
        self.transfer(from, to, amount)?;
        self.allowances.insert((from, spender), allowance - amount);
        Ok(())
    }

    pub fn approve(&mut self, owner: Address, spender: Address, amount: Wei) -> Result<(), ProtocolError> {
        if owner.is_zero() {
            return Err(revert("APPROVE_FROM_ZERO_ADDRESS"));
        }
        if spender.is_zero() {
            return Err(revert("APPROVE_TO_ZERO_ADDRESS"));
        }
        self.allowances.insert((owner, spender), amount);
        Ok(())
    }

    pub fn transfer_shares(&mut self, from: Address, to: Address, shares: Shares) -> Result<(), ProtocolError> {
        if from.is_zero() {
            return Err(revert("TRANSFER_FROM_THE_ZERO_ADDRESS"));
        }
        if to.is_zero() {
            return Err(revert("TRANSFER_TO_THE_ZERO_ADDRESS"));
        }
        let from_shares = self.shares_of(from);
        if from_shares < shares {
            return Err(revert("TRANSFER_AMOUNT_EXCEEDS_BALANCE"));
        }
        self.shares.insert(from, from_shares - shares);
        *self.shares.entry(to).or_insert(0) += shares;
        Ok(())
    }

    /// Apply a finalized beacon report.
    ///
    /// Rewards are measured against the previous beacon balance plus 32 ether
    /// per newly appeared validator; a positive difference pays the protocol
    /// fee in freshly minted shares.
    pub fn handle_oracle_report(
        &mut self,
        beacon_validators: u32,
        beacon_balance: Wei,
    ) -> Result<(), ProtocolError> {
        if beacon_validators > self.deposited_validators {
            return Err(revert("REPORTED_MORE_DEPOSITED"));
        }
        if beacon_validators < self.beacon_validators {
            return Err(revert("REPORTED_LESS_VALIDATORS"));
        }
        let appeared = (beacon_validators - self.beacon_validators) as Wei;
        let reward_base = appeared * DEPOSIT_SIZE + self.beacon_balance;

        self.beacon_validators = beacon_validators;
        self.beacon_balance = beacon_balance;

        if beacon_balance > reward_base {
            self.distribute_fee(beacon_balance - reward_base)?;
        }
        Ok(())
    }

    /// Mint fee shares so the treasury ends up owning `fee_bp` of `rewards`:
    /// `shares = rewards * fee * S / (T * 10000 - fee * rewards)`.
    fn distribute_fee(&mut self, rewards: Wei) -> Result<(), ProtocolError> {
        let fee = self.fee_bp as Wei;
        let fee_rewards = rewards * fee;
        let denominator = self.total_pooled_ether() * BASIS_POINTS as Wei - fee_rewards;
        let shares = mul_div(fee_rewards, self.total_shares, denominator)
            .ok_or(ProtocolError::Overflow("distributeFee"))?;
        self.mint_shares(self.treasury, shares);
        debug!("distribute_fee: rewards {} wei, minted {} fee shares", rewards, shares);
        Ok(())
    }

    fn mint_shares(&mut self, to: Address, shares: Shares) {
        *self.shares.entry(to).or_insert(0) += shares;
        self.total_shares += shares;
    }

    pub fn burn_shares(&mut self, account: Address, shares: Shares) -> Result<(), ProtocolError> {
        let balance = self.shares_of(account);
        if balance < shares {
            return Err(revert("BURN_AMOUNT_EXCEEDS_BALANCE"));
        }
        self.shares.insert(account, balance - shares);
        self.total_shares -= shares;
        Ok(())
    }
}
