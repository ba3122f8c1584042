//! Integer units used across the harness.
//!
//! Balances and shares are `u128`: the largest pooled value the protocol can
//! hold is many orders of magnitude below `u128::MAX`. Products of two such
//! values do not fit, so every multiply-then-divide goes through `U256`.

use ethers_core::types::U256;

/// Amount of ether in wei.
pub type Wei = u128;

/// Amount of internal share units.
pub type Shares = u128;

/// Amount of ether in gwei (oracle report denomination).
pub type Gwei = u64;

pub const WEI_PER_ETHER: Wei = 1_000_000_000_000_000_000;
pub const WEI_PER_GWEI: Wei = 1_000_000_000;

/// 100% expressed in basis points.
pub const BASIS_POINTS: u32 = 10_000;

/// Balance of a freshly activated validator.
pub const DEPOSIT_SIZE: Wei = 32 * WEI_PER_ETHER;

/// Whole ether to wei.
pub const fn ether(amount: u64) -> Wei {
    amount as Wei * WEI_PER_ETHER
}

/// `floor(a * b / denominator)` with a 256-bit intermediate product.
///
/// Returns `None` when the denominator is zero or the quotient does not fit
/// back into `u128`.
pub fn mul_div(a: u128, b: u128, denominator: u128) -> Option<u128> {
    if denominator == 0 {
        return None;
    }
    let product = U256::from(a) * U256::from(b);
    to_u128(product / U256::from(denominator))
}

/// Narrow a `U256` to `u128`, `None` on overflow.
pub fn to_u128(value: U256) -> Option<u128> {
    if value.bits() > 128 {
        None
    } else {
        Some(value.low_u128())
    }
}

/// Lossy conversion for log lines.
pub fn as_ether(amount: Wei) -> f64 {
    amount as f64 / WEI_PER_ETHER as f64
}

/// Signed difference `after - before`.
pub fn signed_delta(before: Wei, after: Wei) -> i128 {
    if after >= before {
        (after - before) as i128
    } else {
        -((before - after) as i128)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_ether_conversion() {
        assert_eq!(ether(1), WEI_PER_ETHER);
        assert_eq!(ether(10_000), 10_000 * 10u128.pow(18));
        assert_eq!(DEPOSIT_SIZE, ether(32));
    }

    #[test]
    fn test_mul_div_wide_product() {
        // 10^27 reference shares against a ~4.2M ether pool overflows u128 mid-way
        let shares = 10u128.pow(27);
        let pooled = ether(4_200_000);
        let total_shares = ether(4_000_000);
        let value = mul_div(shares, pooled, total_shares).unwrap();
        assert_eq!(value, 1_050_000_000_000_000_000_000_000_000);
    }

    #[test]
    fn test_mul_div_rejects_zero_denominator() {
        assert_eq!(mul_div(1, 1, 0), None);
    }

    #[test]
    fn test_mul_div_overflowing_quotient() {
        assert_eq!(mul_div(u128::MAX, 2, 1), None);
        assert_eq!(mul_div(u128::MAX, 2, 2), Some(u128::MAX));
    }

    #[test]
    fn test_signed_delta() {
        assert_eq!(signed_delta(ether(10), ether(12)), ether(2) as i128);
        assert_eq!(signed_delta(ether(12), ether(10)), -(ether(2) as i128));
        assert_eq!(signed_delta(5, 5), 0);
    }

    proptest! {
        #[test]
        fn mul_div_matches_narrow_arithmetic(a in 0u64.., b in 0u64.., c in 1u64..) {
            let expected = (a as u128 * b as u128) / c as u128;
            prop_assert_eq!(mul_div(a as u128, b as u128, c as u128), Some(expected));
        }
    }
}
