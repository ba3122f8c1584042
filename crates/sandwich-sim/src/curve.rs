// CURVE STETH/ETH STABLESWAP POOL (n = 2)
//
// StableSwap invariant:
// 4A(x+y) + D = 4AD + D^3/(4xy)
//
// Solved by Newton iteration exactly as the Vyper pool does, with 256-bit
// integer arithmetic. Coin 0 is ether, coin 1 is stETH. The stETH reserve is
// read from the pool's rebasing balance, so a rebase moves the pool price.

use ethers_core::types::U256;
use sandwich_core::{to_u128, ProtocolError, Wei};
use serde::{Deserialize, Serialize};

const CONTRACT: &str = "CurveStETHPool";

pub const N_COINS: usize = 2;
pub const ETH_INDEX: usize = 0;
pub const STETH_INDEX: usize = 1;
pub const FEE_DENOMINATOR: u64 = 10_000_000_000;

const MAX_ITERATIONS: usize = 255;

fn revert(reason: &str) -> ProtocolError {
    ProtocolError::reverted(CONTRACT, reason)
}

/// Output of a priced swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapQuote {
    /// Amount paid out, fee deducted
    pub dy: Wei,
    /// Fee retained by the pool
    pub fee: Wei,
    /// Part of `fee` set aside for the admin
    pub admin_fee: Wei,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StableSwapPool {
    amp: u64,
    /// Swap fee, 1e10 = 100%
    fee: u64,
    /// Admin share of the fee, 1e10 = 100%
    admin_fee: u64,
    admin_balances: [Wei; N_COINS],
}

impl StableSwapPool {
    pub fn new(amp: u64, fee: u64, admin_fee: u64) -> Result<Self, ProtocolError> {
        if amp == 0 {
            return Err(revert("ZERO_AMPLIFICATION"));
        }
        if fee > FEE_DENOMINATOR || admin_fee > FEE_DENOMINATOR {
            return Err(revert("FEE_TOO_LARGE"));
        }
        Ok(StableSwapPool {
            amp,
            fee,
            admin_fee,
            admin_balances: [0; N_COINS],
        })
    }

    pub fn amp(&self) -> u64 {
        self.amp
    }

    pub fn admin_balances(&self) -> [Wei; N_COINS] {
        self.admin_balances
    }

    /// LP-owned reserves given the raw token holdings of the pool.
    pub fn balances(&self, raw: [Wei; N_COINS]) -> Result<[Wei; N_COINS], ProtocolError> {
        let mut out = [0; N_COINS];
        for k in 0..N_COINS {
            out[k] = raw[k]
                .checked_sub(self.admin_balances[k])
                .ok_or_else(|| revert("ADMIN_BALANCE_EXCEEDS_HOLDINGS"))?;
        }
        Ok(out)
    }

    /// Price `dx` of coin `i` into coin `j` against reserves `balances`
    /// (reserves before `dx` arrives).
    pub fn quote(
        &self,
        i: usize,
        j: usize,
        dx: Wei,
        balances: [Wei; N_COINS],
    ) -> Result<SwapQuote, ProtocolError> {
        if i == j || i >= N_COINS || j >= N_COINS {
            return Err(revert("BAD_COIN_INDEX"));
        }
        let xp = [U256::from(balances[0]), U256::from(balances[1])];
        let x = xp[i] + U256::from(dx);
        let y = self.get_y(i, j, x, xp)?;

        let dy = xp[j]
            .checked_sub(y)
            .and_then(|v| v.checked_sub(U256::one()))
            .ok_or_else(|| revert("INSUFFICIENT_OUTPUT"))?;
        let fee = dy * U256::from(self.fee) / U256::from(FEE_DENOMINATOR);
        let admin_fee = fee * U256::from(self.admin_fee) / U256::from(FEE_DENOMINATOR);

        let narrow = |v: U256| to_u128(v).ok_or(ProtocolError::Overflow("exchange"));
        Ok(SwapQuote {
            dy: narrow(dy - fee)?,
            fee: narrow(fee)?,
            admin_fee: narrow(admin_fee)?,
        })
    }

    /// Book the admin fee of an executed swap.
    pub fn record_swap(&mut self, j: usize, quote: &SwapQuote) {
        self.admin_balances[j] += quote.admin_fee;
    }

    /// Invariant `D` for reserves `xp`.
    pub fn get_d(&self, xp: [U256; N_COINS]) -> Result<U256, ProtocolError> {
        let n = U256::from(N_COINS as u64);
        let s = xp[0] + xp[1];
        if s.is_zero() {
            return Ok(U256::zero());
        }
        let ann = U256::from(self.amp) * n;
        let mut d = s;
        for _ in 0..MAX_ITERATIONS {
            let mut d_p = d;
            for x in xp {
                // +1 guards an empty reserve
                d_p = d_p * d / (x * n + U256::one());
            }
            let d_prev = d;
            d = (ann * s + d_p * n) * d / ((ann - U256::one()) * d + (n + U256::one()) * d_p);
            if abs_diff(d, d_prev) <= U256::one() {
                return Ok(d);
            }
        }
        Err(revert("D_DID_NOT_CONVERGE"))
    }

    /// New reserve of coin `j` once coin `i` holds `x`, keeping `D` fixed.
    pub fn get_y(&self, i: usize, j: usize, x: U256, xp: [U256; N_COINS]) -> Result<U256, ProtocolError> {
        let n = U256::from(N_COINS as u64);
        let d = self.get_d(xp)?;
        let ann = U256::from(self.amp) * n;
        let mut c = d;
        let mut s = U256::zero();
        for k in 0..N_COINS {
            let x_k = if k == i {
                x
            } else if k != j {
                xp[k]
            } else {
                continue;
            };
            if x_k.is_zero() {
                return Err(revert("ZERO_RESERVE"));
            }
            s += x_k;
            c = c * d / (x_k * n);
        }
        c = c * d / (ann * n);
        let b = s + d / ann;

        let mut y = d;
        for _ in 0..MAX_ITERATIONS {
            let y_prev = y;
            y = (y * y + c) / (U256::from(2u64) * y + b - d);
            if abs_diff(y, y_prev) <= U256::one() {
                return Ok(y);
            }
        }
        Err(revert("Y_DID_NOT_CONVERGE"))
    }
}

fn abs_diff(a: U256, b: U256) -> U256 {
    if a > b {
        a - b
    } else {
        b - a
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sandwich_core::ether;

    fn pool() -> StableSwapPool {
        StableSwapPool::new(50, 4_000_000, 5_000_000_000).unwrap()
    }

    #[test]
    fn test_balanced_pool_swaps_near_par() {
        let p = pool();
        let q = p.quote(ETH_INDEX, STETH_INDEX, ether(1), [ether(500_000), ether(500_000)]).unwrap();
        // par minus the 4 bp fee
        let expected = ether(1) - ether(1) * 4 / 10_000;
        assert!(expected.abs_diff(q.dy) < ether(1) / 1_000_000, "dy {}", q.dy);
        assert_eq!(q.admin_fee, q.fee / 2);
    }

    #[test]
    fn test_abundant_steth_trades_at_discount() {
        let p = pool();
        let q = p.quote(ETH_INDEX, STETH_INDEX, ether(1), [ether(430_000), ether(570_000)]).unwrap();
        assert!(q.dy > ether(1), "ether buys more than par stETH");
        let q = p.quote(STETH_INDEX, ETH_INDEX, ether(1), [ether(430_000), ether(570_000)]).unwrap();
        assert!(q.dy < ether(1));
    }

    #[test]
    fn test_invariant_preserved_by_swap_without_fee() {
        let p = StableSwapPool::new(50, 0, 0).unwrap();
        let xp = [U256::from(ether(430_000)), U256::from(ether(570_000))];
        let d0 = p.get_d(xp).unwrap();
        let dx = ether(10_000);
        let q = p.quote(ETH_INDEX, STETH_INDEX, dx, [ether(430_000), ether(570_000)]).unwrap();
        let after = [xp[0] + U256::from(dx), xp[1] - U256::from(q.dy)];
        let d1 = p.get_d(after).unwrap();
        assert!(abs_diff(d1, d0) < U256::from(ether(1) / 1_000_000));
    }

    #[test]
    fn test_round_trip_loses_fees() {
        let mut p = pool();
        let mut balances = [ether(430_000), ether(570_000)];
        let dx = ether(10_000);

        let q1 = p.quote(ETH_INDEX, STETH_INDEX, dx, balances).unwrap();
        p.record_swap(STETH_INDEX, &q1);
        balances[0] += dx;
        balances[1] -= q1.dy + q1.admin_fee;

        let q2 = p.quote(STETH_INDEX, ETH_INDEX, q1.dy, balances).unwrap();
        assert!(q2.dy < dx);
        // two 4 bp fees dominate the loss
        assert!(dx - q2.dy > dx * 7 / 10_000);
    }

    #[test]
    fn test_bad_indices_and_empty_pool() {
        let p = pool();
        assert!(p.quote(0, 0, 1, [1, 1]).is_err());
        assert!(p.quote(0, 2, 1, [1, 1]).is_err());
        assert_eq!(p.get_d([U256::zero(), U256::zero()]).unwrap(), U256::zero());
    }

    #[test]
    fn test_admin_balances_are_excluded() {
        let mut p = pool();
        let quote = SwapQuote { dy: 0, fee: 10, admin_fee: 5 };
        p.record_swap(STETH_INDEX, &quote);
        assert_eq!(p.balances([100, 100]).unwrap(), [100, 95]);
        assert!(p.balances([100, 4]).is_err());
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(64))]

            #[test]
            fn prop_swap_never_drains_output_reserve(dx_eth in 1u64..2_000_000, eth_in in any::<bool>()) {
                let p = pool();
                let (i, j) = if eth_in { (ETH_INDEX, STETH_INDEX) } else { (STETH_INDEX, ETH_INDEX) };
                let balances = [ether(430_000), ether(570_000)];
                let q = p.quote(i, j, ether(dx_eth), balances).unwrap();
                prop_assert!(q.dy + q.admin_fee < balances[j]);
                prop_assert!(q.admin_fee <= q.fee);
            }
        }
    }
}
