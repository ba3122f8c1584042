// SANDWICH SIM
//
// Deterministic in-memory fork of the liquid staking protocol:
// - stETH share ledger with fee minting on positive rebases
// - quorum beacon oracle with daily frames and sanity limits
// - composite report receiver and the self-owned stETH burner
// - ACL holding the burner's BURN_ROLE
// - Curve stETH/ETH StableSwap pool
// - attacker exchanger contract
//
// Every mutation is an atomic transaction; the whole state can be
// snapshotted and reverted, and hashed into a state root.

pub mod acl;
pub mod steth;
pub mod oracle;
pub mod burner;
pub mod curve;
pub mod chain;
pub mod exchanger;
pub mod genesis;

pub use acl::{burn_role, Acl, Role};
pub use steth::StEthLedger;
pub use oracle::{BeaconOracle, BeaconSpec, FinalizedReport};
pub use burner::{BurnRun, CompositeReceiver, SelfOwnedBurner};
pub use curve::{StableSwapPool, SwapQuote, ETH_INDEX, STETH_INDEX};
pub use chain::SimulatedChain;
pub use genesis::GenesisParams;
