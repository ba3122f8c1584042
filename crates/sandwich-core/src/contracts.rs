//! Contract address book.
//!
//! One typed field per external contract, resolved once at environment setup
//! and handed to every component that needs it.

use ethers_core::types::{Address, H160};
use hex_literal::hex;
use serde::{Deserialize, Serialize};

pub const MAINNET_STETH: Address = H160(hex!("ae7ab96520DE3A18E5e111B5EaAb095312D7fE84"));
pub const MAINNET_ORACLE: Address = H160(hex!("442af784A788A5bd6F42A01Ebe9F287a871243fb"));
pub const MAINNET_VOTING: Address = H160(hex!("2e59A20f205bB85a89C53f1936454680651E618e"));
pub const MAINNET_ACL: Address = H160(hex!("9895F0F17cc1d1891b6f18ee0b483B6f221b37Bb"));
pub const MAINNET_TREASURY: Address = H160(hex!("3e40D73EB977Dc6a537aF587D48316feE66E9C8c"));
pub const MAINNET_COMPOSITE_RECEIVER: Address =
    H160(hex!("55a7E1cbD678d9EbD50c7d69Dce75203B0dDd8Cb"));
pub const MAINNET_SELF_OWNED_BURNER: Address =
    H160(hex!("B280E33812c0B09353180e92e27b8AD399B07f26"));
pub const MAINNET_CURVE_STETH_POOL: Address =
    H160(hex!("DC24316b9AE028F1497c275EB9192a3Ea0f67022"));
/// Beacon deposit contract, used as the large ether holder
pub const MAINNET_ETH_WHALE: Address = H160(hex!("00000000219ab540356cBB839Cbe05303d7705Fa"));

/// Addresses of every protocol contract a scenario touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolContracts {
    pub steth: Address,
    pub oracle: Address,
    pub voting: Address,
    pub acl: Address,
    pub treasury: Address,
    pub composite_receiver: Address,
    pub burner: Address,
    pub curve_pool: Address,
    pub eth_whale: Address,
}

impl ProtocolContracts {
    pub const fn mainnet() -> Self {
        ProtocolContracts {
            steth: MAINNET_STETH,
            oracle: MAINNET_ORACLE,
            voting: MAINNET_VOTING,
            acl: MAINNET_ACL,
            treasury: MAINNET_TREASURY,
            composite_receiver: MAINNET_COMPOSITE_RECEIVER,
            burner: MAINNET_SELF_OWNED_BURNER,
            curve_pool: MAINNET_CURVE_STETH_POOL,
            eth_whale: MAINNET_ETH_WHALE,
        }
    }

    /// Contract addresses must be distinct, otherwise balances of two
    /// contracts would alias.
    pub fn validate(&self) -> Result<(), String> {
        let all = self.all();
        for (i, (name, a)) in all.iter().enumerate() {
            if a.is_zero() {
                return Err(format!("{name} address is zero"));
            }
            if let Some((other, _)) = all[i + 1..].iter().find(|(_, b)| b == a) {
                return Err(format!("{name} and {other} share address {a:?}"));
            }
        }
        Ok(())
    }

    fn all(&self) -> [(&'static str, Address); 9] {
        [
            ("steth", self.steth),
            ("oracle", self.oracle),
            ("voting", self.voting),
            ("acl", self.acl),
            ("treasury", self.treasury),
            ("composite_receiver", self.composite_receiver),
            ("burner", self.burner),
            ("curve_pool", self.curve_pool),
            ("eth_whale", self.eth_whale),
        ]
    }
}

impl Default for ProtocolContracts {
    fn default() -> Self {
        ProtocolContracts::mainnet()
    }
}
