// SIMULATED CHAIN
// Forked protocol state with transaction atomicity and snapshot/revert.
//
// SAFETY INVARIANTS:
// 1. A transaction either applies completely or leaves the state untouched
// 2. Reverting to a snapshot restores the exact state it captured
// 3. Reverting keeps the target snapshot and discards every later one
// 4. Administrative calls are accepted only from the voting contract
// 5. Burning shares requires BURN_ROLE on the stETH app in the ACL

use crate::acl::{burn_role, Acl, Role};
use crate::burner::{CompositeReceiver, SelfOwnedBurner};
use crate::curve::{StableSwapPool, ETH_INDEX, N_COINS};
use crate::oracle::BeaconOracle;
use crate::steth::StEthLedger;
use ethers_core::types::Address;
use log::{debug, info, warn};
use sandwich_core::{
    BeaconStat, EpochId, Gwei, OracleReport, ProtocolContracts, ProtocolError, Shares,
    SnapshotId, Snapshotting, StakingProtocol, Wei, WEI_PER_GWEI,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Everything a transaction can touch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ChainState {
    pub(crate) eth: BTreeMap<Address, Wei>,
    pub(crate) steth: StEthLedger,
    pub(crate) oracle: BeaconOracle,
    pub(crate) receiver: CompositeReceiver,
    pub(crate) burner: SelfOwnedBurner,
    pub(crate) acl: Acl,
    pub(crate) pool: StableSwapPool,
    /// Deployed exchanger -> owner
    pub(crate) exchangers: BTreeMap<Address, Address>,
    pub(crate) nonce: u64,
}

impl ChainState {
    pub(crate) fn eth_of(&self, account: Address) -> Wei {
        self.eth.get(&account).copied().unwrap_or(0)
    }

    pub(crate) fn move_eth(&mut self, from: Address, to: Address, amount: Wei) -> Result<(), ProtocolError> {
        let balance = self.eth_of(from);
        if balance < amount {
            return Err(ProtocolError::reverted("evm", "insufficient balance for transfer"));
        }
        self.eth.insert(from, balance - amount);
        *self.eth.entry(to).or_insert(0) += amount;
        Ok(())
    }

    fn pool_balances(&self, contracts: &ProtocolContracts) -> Result<[Wei; N_COINS], ProtocolError> {
        let raw = [
            self.eth_of(contracts.curve_pool),
            self.steth.balance_of(contracts.curve_pool)?,
        ];
        self.pool.balances(raw)
    }

    /// Curve `exchange`: `dx` of coin `i` in, coin `j` out to `who`.
    /// stETH is pulled with `transferFrom`, so `who` must have approved the
    /// pool.
    pub(crate) fn exchange(
        &mut self,
        contracts: &ProtocolContracts,
        who: Address,
        i: usize,
        j: usize,
        dx: Wei,
    ) -> Result<Wei, ProtocolError> {
        let old = self.pool_balances(contracts)?;
        let quote = self.pool.quote(i, j, dx, old)?;

        if i == ETH_INDEX {
            self.move_eth(who, contracts.curve_pool, dx)?;
        } else {
            self.steth.transfer_from(contracts.curve_pool, who, contracts.curve_pool, dx)?;
        }
        self.pool.record_swap(j, &quote);
        if j == ETH_INDEX {
            self.move_eth(contracts.curve_pool, who, quote.dy)?;
        } else {
            self.steth.transfer(contracts.curve_pool, who, quote.dy)?;
        }
        debug!(
            "curve: {:?} swapped {} of coin {} for {} of coin {} (fee {})",
            who, dx, i, quote.dy, j, quote.fee
        );
        Ok(quote.dy)
    }

    pub(crate) fn submit(
        &mut self,
        contracts: &ProtocolContracts,
        from: Address,
        value: Wei,
    ) -> Result<Shares, ProtocolError> {
        self.move_eth(from, contracts.steth, value)?;
        self.steth.submit(from, value)
    }

    fn report_beacon(
        &mut self,
        contracts: &ProtocolContracts,
        report: OracleReport,
        from: Address,
    ) -> Result<(), ProtocolError> {
        let Some(finalized) = self.oracle.record_report(report, from)? else {
            return Ok(());
        };

        let pre = self.steth.total_pooled_ether();
        let balance = Wei::from(report.beacon_balance) * WEI_PER_GWEI;
        self.steth.handle_oracle_report(report.beacon_validators, balance)?;
        let post = self.steth.total_pooled_ether();
        self.oracle.sanity_check(pre, post, finalized.time_elapsed)?;

        match self.oracle.report_receiver() {
            Some(receiver) if receiver == contracts.composite_receiver => {
                for callback in self.receiver.callbacks().to_vec() {
                    self.dispatch_report_callback(contracts, callback)?;
                }
            }
            Some(receiver) => self.dispatch_report_callback(contracts, receiver)?,
            None => {}
        }
        Ok(())
    }

    fn dispatch_report_callback(
        &mut self,
        contracts: &ProtocolContracts,
        callback: Address,
    ) -> Result<(), ProtocolError> {
        if callback == contracts.burner {
            return self.process_burner_report(contracts);
        }
        warn!("oracle: report callback {:?} has no simulated code, skipped", callback);
        Ok(())
    }

    fn process_burner_report(&mut self, contracts: &ProtocolContracts) -> Result<(), ProtocolError> {
        let run = self.burner.settle_run(self.steth.total_shares())?;
        if run.total() == 0 {
            return Ok(());
        }
        if !self.acl.has_permission(contracts.burner, contracts.steth, burn_role()) {
            return Err(ProtocolError::reverted("Lido", "APP_AUTH_FAILED"));
        }
        self.steth.burn_shares(contracts.burner, run.total())
    }

    fn request_burn(
        &mut self,
        contracts: &ProtocolContracts,
        sender: Address,
        amount: Wei,
        is_cover: bool,
    ) -> Result<Shares, ProtocolError> {
        if amount == 0 {
            return Err(ProtocolError::reverted("SelfOwnedStETHBurner", "ZERO_BURN_AMOUNT"));
        }
        self.steth.transfer_from(contracts.burner, sender, contracts.burner, amount)?;
        let shares = self.steth.shares_by_pooled_eth(amount)?;
        self.burner.request(shares, is_cover);
        info!(
            "burner: {} stETH ({} shares) requested for {} burn",
            amount,
            shares,
            if is_cover { "cover" } else { "non-cover" }
        );
        Ok(shares)
    }
}

/// In-memory fork of the staking protocol.
pub struct SimulatedChain {
    contracts: ProtocolContracts,
    accounts: Vec<Address>,
    state: ChainState,
    snapshots: Vec<(SnapshotId, ChainState)>,
    next_snapshot: u64,
}

impl SimulatedChain {
    pub(crate) fn from_state(contracts: ProtocolContracts, accounts: Vec<Address>, state: ChainState) -> Self {
        SimulatedChain {
            contracts,
            accounts,
            state,
            snapshots: Vec::new(),
            next_snapshot: 1,
        }
    }

    /// Run `tx` against the state; on error the state is rolled back.
    pub(crate) fn transact<T>(
        &mut self,
        tx: impl FnOnce(&mut ChainState, &ProtocolContracts) -> Result<T, ProtocolError>,
    ) -> Result<T, ProtocolError> {
        let checkpoint = self.state.clone();
        match tx(&mut self.state, &self.contracts) {
            Ok(value) => Ok(value),
            Err(err) => {
                debug!("transaction reverted: {}", err);
                self.state = checkpoint;
                Err(err)
            }
        }
    }

    pub(crate) fn state(&self) -> &ChainState {
        &self.state
    }

    pub fn contracts(&self) -> &ProtocolContracts {
        &self.contracts
    }

    /// Funded development accounts.
    pub fn accounts(&self) -> &[Address] {
        &self.accounts
    }

    pub fn steth(&self) -> &StEthLedger {
        &self.state.steth
    }

    pub fn oracle(&self) -> &BeaconOracle {
        &self.state.oracle
    }

    pub fn report_receiver(&self) -> &CompositeReceiver {
        &self.state.receiver
    }

    pub fn burner(&self) -> &SelfOwnedBurner {
        &self.state.burner
    }

    pub fn acl(&self) -> &Acl {
        &self.state.acl
    }

    pub fn pool(&self) -> &StableSwapPool {
        &self.state.pool
    }

    pub fn allowance(&self, owner: Address, spender: Address) -> Wei {
        self.state.steth.allowance(owner, spender)
    }

    /// SHA-256 over the canonical encoding of the whole state.
    pub fn state_root(&self) -> Result<String, bincode::Error> {
        let encoded = bincode::serialize(&self.state)?;
        let mut hasher = Sha256::new();
        hasher.update(&encoded);
        Ok(hex::encode(hasher.finalize()))
    }

    /// Curve `get_dy`: output of swapping `dx` of coin `i` into coin `j`.
    pub fn get_dy(&self, i: usize, j: usize, dx: Wei) -> Result<Wei, ProtocolError> {
        let balances = self.state.pool_balances(&self.contracts)?;
        Ok(self.state.pool.quote(i, j, dx, balances)?.dy)
    }

    /// Curve `exchange`, sent by `from`.
    pub fn exchange(&mut self, from: Address, i: usize, j: usize, dx: Wei) -> Result<Wei, ProtocolError> {
        self.transact(|state, contracts| state.exchange(contracts, from, i, j, dx))
    }

    fn ensure_voting(&self, sender: Address, contract: &str) -> Result<(), ProtocolError> {
        if sender != self.contracts.voting {
            return Err(ProtocolError::reverted(contract, "APP_AUTH_FAILED"));
        }
        Ok(())
    }

    // --- Voting-only administration ---

    pub fn add_report_callback(&mut self, sender: Address, callback: Address) -> Result<(), ProtocolError> {
        self.ensure_voting(sender, "CompositePostRebaseBeaconReceiver")?;
        self.transact(|state, _| state.receiver.add_callback(callback))?;
        info!("receiver: callback {:?} added", callback);
        Ok(())
    }

    pub fn set_beacon_report_receiver(
        &mut self,
        sender: Address,
        receiver: Option<Address>,
    ) -> Result<(), ProtocolError> {
        self.ensure_voting(sender, "LidoOracle")?;
        self.state.oracle.set_report_receiver(receiver);
        info!("oracle: beacon report receiver set to {:?}", receiver);
        Ok(())
    }

    pub fn grant_permission(
        &mut self,
        sender: Address,
        entity: Address,
        app: Address,
        role: Role,
    ) -> Result<(), ProtocolError> {
        self.transact(|state, _| state.acl.grant_permission(entity, app, role, sender))?;
        info!("acl: granted {:?} on {:?} to {:?}", role, app, entity);
        Ok(())
    }

    pub fn revoke_permission(
        &mut self,
        sender: Address,
        entity: Address,
        app: Address,
        role: Role,
    ) -> Result<(), ProtocolError> {
        self.transact(|state, _| state.acl.revoke_permission(entity, app, role, sender))?;
        info!("acl: revoked {:?} on {:?} from {:?}", role, app, entity);
        Ok(())
    }

    pub fn set_burn_amount_per_run_quota(&mut self, sender: Address, quota_bp: u32) -> Result<(), ProtocolError> {
        self.ensure_voting(sender, "SelfOwnedStETHBurner")?;
        self.transact(|state, _| state.burner.set_max_burn_per_run_bp(quota_bp))?;
        info!("burner: per-run quota set to {} bp", quota_bp);
        Ok(())
    }

    /// Move `amount` stETH from voting into the burner as a cover request.
    /// Voting must have approved the burner beforehand.
    pub fn request_burn_my_steth_for_cover(&mut self, sender: Address, amount: Wei) -> Result<Shares, ProtocolError> {
        self.ensure_voting(sender, "SelfOwnedStETHBurner")?;
        self.transact(|state, contracts| state.request_burn(contracts, sender, amount, true))
    }

    pub fn request_burn_my_steth(&mut self, sender: Address, amount: Wei) -> Result<Shares, ProtocolError> {
        self.ensure_voting(sender, "SelfOwnedStETHBurner")?;
        self.transact(|state, contracts| state.request_burn(contracts, sender, amount, false))
    }

    pub fn set_allowed_beacon_balance_annual_relative_increase(
        &mut self,
        sender: Address,
        bp: u64,
    ) -> Result<(), ProtocolError> {
        self.ensure_voting(sender, "LidoOracle")?;
        self.state.oracle.set_allowed_annual_increase_bp(bp);
        info!("oracle: allowed annual increase set to {} bp", bp);
        Ok(())
    }

    pub fn set_allowed_beacon_balance_relative_decrease(
        &mut self,
        sender: Address,
        bp: u64,
    ) -> Result<(), ProtocolError> {
        self.ensure_voting(sender, "LidoOracle")?;
        self.state.oracle.set_allowed_decrease_bp(bp);
        info!("oracle: allowed decrease set to {} bp", bp);
        Ok(())
    }
}

impl StakingProtocol for SimulatedChain {
    fn total_pooled_ether(&self) -> Result<Wei, ProtocolError> {
        Ok(self.state.steth.total_pooled_ether())
    }

    fn beacon_stat(&self) -> Result<BeaconStat, ProtocolError> {
        Ok(self.state.steth.beacon_stat())
    }

    fn total_shares(&self) -> Result<Shares, ProtocolError> {
        Ok(self.state.steth.total_shares())
    }

    fn pooled_eth_by_shares(&self, shares: Shares) -> Result<Wei, ProtocolError> {
        self.state.steth.pooled_eth_by_shares(shares)
    }

    fn shares_by_pooled_eth(&self, amount: Wei) -> Result<Shares, ProtocolError> {
        self.state.steth.shares_by_pooled_eth(amount)
    }

    fn balance_of(&self, account: Address) -> Result<Wei, ProtocolError> {
        self.state.steth.balance_of(account)
    }

    fn eth_balance(&self, account: Address) -> Result<Wei, ProtocolError> {
        Ok(self.state.eth_of(account))
    }

    fn expected_epoch_id(&self) -> Result<EpochId, ProtocolError> {
        Ok(self.state.oracle.expected_epoch_id())
    }

    fn oracle_members(&self) -> Result<Vec<Address>, ProtocolError> {
        Ok(self.state.oracle.members().to_vec())
    }

    fn quorum(&self) -> Result<u32, ProtocolError> {
        Ok(self.state.oracle.quorum())
    }

    fn report_beacon(
        &mut self,
        epoch_id: EpochId,
        beacon_balance: Gwei,
        beacon_validators: u32,
        from: Address,
    ) -> Result<(), ProtocolError> {
        let report = OracleReport {
            epoch_id,
            beacon_balance,
            beacon_validators,
        };
        self.transact(|state, contracts| state.report_beacon(contracts, report, from))
    }

    fn submit(&mut self, from: Address, value: Wei) -> Result<Shares, ProtocolError> {
        self.transact(|state, contracts| state.submit(contracts, from, value))
    }

    fn transfer(&mut self, from: Address, to: Address, amount: Wei) -> Result<(), ProtocolError> {
        self.transact(|state, _| state.steth.transfer(from, to, amount))
    }

    fn approve(&mut self, owner: Address, spender: Address, amount: Wei) -> Result<(), ProtocolError> {
        self.transact(|state, _| state.steth.approve(owner, spender, amount))
    }

    fn transfer_eth(&mut self, from: Address, to: Address, amount: Wei) -> Result<(), ProtocolError> {
        self.transact(|state, _| state.move_eth(from, to, amount))
    }
}

impl Snapshotting for SimulatedChain {
    fn snapshot(&mut self) -> SnapshotId {
        let id = SnapshotId(self.next_snapshot);
        self.next_snapshot += 1;
        self.snapshots.push((id, self.state.clone()));
        debug!("snapshot {:?} taken", id);
        id
    }

    fn revert_to(&mut self, id: SnapshotId) -> Result<(), ProtocolError> {
        let position = self
            .snapshots
            .iter()
            .position(|(snapshot, _)| *snapshot == id)
            .ok_or(ProtocolError::UnknownSnapshot(id))?;
        self.snapshots.truncate(position + 1);
        self.state = self.snapshots[position].1.clone();
        debug!("reverted to snapshot {:?}", id);
        Ok(())
    }
}
