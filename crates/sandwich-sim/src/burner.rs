// POST-REBASE RECEIVERS
// Composite callback fan-out and the self-owned stETH burner that applies
// coverage by destroying shares.

use ethers_core::types::Address;
use log::info;
use sandwich_core::{mul_div, ProtocolError, Shares, BASIS_POINTS};
use serde::{Deserialize, Serialize};

const MAX_CALLBACKS: usize = 16;

/// Forwards `processLidoOracleReport` to an ordered list of callbacks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompositeReceiver {
    callbacks: Vec<Address>,
}

impl CompositeReceiver {
    pub fn callbacks(&self) -> &[Address] {
        &self.callbacks
    }

    pub fn add_callback(&mut self, callback: Address) -> Result<(), ProtocolError> {
        if callback.is_zero() {
            return Err(ProtocolError::reverted("CompositeReceiver", "CALLBACK_ZERO_ADDRESS"));
        }
        if self.callbacks.contains(&callback) {
            return Err(ProtocolError::reverted("CompositeReceiver", "CALLBACK_ALREADY_ADDED"));
        }
        if self.callbacks.len() >= MAX_CALLBACKS {
            return Err(ProtocolError::reverted("CompositeReceiver", "MAX_CALLBACKS_COUNT_EXCEEDED"));
        }
        self.callbacks.push(callback);
        Ok(())
    }
}

/// Shares burnt in one oracle run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BurnRun {
    pub cover: Shares,
    pub non_cover: Shares,
}

impl BurnRun {
    pub fn total(&self) -> Shares {
        self.cover + self.non_cover
    }
}

/// Burn request book of the self-owned burner. Token custody lives in the
/// stETH ledger under the burner's address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelfOwnedBurner {
    cover_shares_requested: Shares,
    non_cover_shares_requested: Shares,
    total_cover_shares_burnt: Shares,
    total_non_cover_shares_burnt: Shares,
    /// Max share of `total_shares` burnt per report
    max_burn_per_run_bp: u32,
}

impl SelfOwnedBurner {
    pub fn new(max_burn_per_run_bp: u32) -> Result<Self, ProtocolError> {
        validate_quota(max_burn_per_run_bp)?;
        Ok(SelfOwnedBurner {
            cover_shares_requested: 0,
            non_cover_shares_requested: 0,
            total_cover_shares_burnt: 0,
            total_non_cover_shares_burnt: 0,
            max_burn_per_run_bp,
        })
    }

    pub fn max_burn_per_run_bp(&self) -> u32 {
        self.max_burn_per_run_bp
    }

    pub fn set_max_burn_per_run_bp(&mut self, bp: u32) -> Result<(), ProtocolError> {
        validate_quota(bp)?;
        self.max_burn_per_run_bp = bp;
        Ok(())
    }

    pub fn cover_shares_requested(&self) -> Shares {
        self.cover_shares_requested
    }

    pub fn non_cover_shares_requested(&self) -> Shares {
        self.non_cover_shares_requested
    }

    pub fn total_cover_shares_burnt(&self) -> Shares {
        self.total_cover_shares_burnt
    }

    pub fn total_non_cover_shares_burnt(&self) -> Shares {
        self.total_non_cover_shares_burnt
    }

    pub fn request(&mut self, shares: Shares, is_cover: bool) {
        if is_cover {
            self.cover_shares_requested += shares;
        } else {
            self.non_cover_shares_requested += shares;
        }
    }

    /// Settle the requests for one report: at most
    /// `total_shares * quota / 10000` shares, cover requests first.
    pub fn settle_run(&mut self, total_shares: Shares) -> Result<BurnRun, ProtocolError> {
        if self.cover_shares_requested + self.non_cover_shares_requested == 0 {
            return Ok(BurnRun::default());
        }
        let max_shares = mul_div(total_shares, self.max_burn_per_run_bp as u128, BASIS_POINTS as u128)
            .ok_or(ProtocolError::Overflow("processLidoOracleReport"))?;

        let cover = self.cover_shares_requested.min(max_shares);
        let non_cover = self.non_cover_shares_requested.min(max_shares - cover);

        self.cover_shares_requested -= cover;
        self.non_cover_shares_requested -= non_cover;
        self.total_cover_shares_burnt += cover;
        self.total_non_cover_shares_burnt += non_cover;

        info!(
            "burner: burning {} cover and {} non-cover shares ({} cover pending)",
            cover, non_cover, self.cover_shares_requested
        );
        Ok(BurnRun { cover, non_cover })
    }
}

fn validate_quota(bp: u32) -> Result<(), ProtocolError> {
    if bp == 0 {
        return Err(ProtocolError::reverted("SelfOwnedStETHBurner", "ZERO_BURN_AMOUNT_PER_RUN"));
    }
    if bp > BASIS_POINTS {
        return Err(ProtocolError::reverted(
            "SelfOwnedStETHBurner",
            "TOO_LARGE_BURN_AMOUNT_PER_RUN",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_bounds() {
        assert!(SelfOwnedBurner::new(0).is_err());
        assert!(SelfOwnedBurner::new(10_001).is_err());
        let mut b = SelfOwnedBurner::new(4).unwrap();
        let err = b.set_max_burn_per_run_bp(0).unwrap_err();
        assert_eq!(err.revert_reason(), Some("ZERO_BURN_AMOUNT_PER_RUN"));
        b.set_max_burn_per_run_bp(10_000).unwrap();
        assert_eq!(b.max_burn_per_run_bp(), 10_000);
    }

    #[test]
    fn test_cover_burnt_first_within_quota() {
        let mut b = SelfOwnedBurner::new(8).unwrap();
        b.request(5_000, false);
        b.request(12_000, true);

        // 8 bp of 10M shares = 8000 per run
        let run = b.settle_run(10_000_000).unwrap();
        assert_eq!(run, BurnRun { cover: 8_000, non_cover: 0 });

        let run = b.settle_run(10_000_000).unwrap();
        assert_eq!(run, BurnRun { cover: 4_000, non_cover: 4_000 });

        let run = b.settle_run(10_000_000).unwrap();
        assert_eq!(run, BurnRun { cover: 0, non_cover: 1_000 });
        assert_eq!(run.total(), 1_000);

        assert_eq!(b.settle_run(10_000_000).unwrap().total(), 0);
        assert_eq!(b.total_cover_shares_burnt(), 12_000);
        assert_eq!(b.total_non_cover_shares_burnt(), 5_000);
    }

    #[test]
    fn test_unrestricted_quota_burns_everything_at_once() {
        let mut b = SelfOwnedBurner::new(10_000).unwrap();
        b.request(1_000_000, true);
        let run = b.settle_run(100_000_000).unwrap();
        assert_eq!(run.cover, 1_000_000);
        assert_eq!(b.cover_shares_requested(), 0);
    }

    #[test]
    fn test_composite_receiver_callbacks() {
        let mut r = CompositeReceiver::default();
        let cb = Address::from_low_u64_be(7);
        r.add_callback(cb).unwrap();
        let err = r.add_callback(cb).unwrap_err();
        assert_eq!(err.revert_reason(), Some("CALLBACK_ALREADY_ADDED"));
        assert!(r.add_callback(Address::zero()).is_err());
        assert_eq!(r.callbacks(), &[cb]);
    }
}
