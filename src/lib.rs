//! stETH rebase sandwich harness.
//!
//! Drives a forked staking protocol through adversarial rebase scenarios
//! and checks that an attacker cannot profit from sandwiching:
//! - a coverage application by the self-owned burner
//! - a large positive daily rebase (MEV and priority fees)

pub mod config;
pub mod logging;
pub mod scenarios;

pub use crate::config::{CoverageConfig, HarnessConfig, MevConfig};
pub use scenarios::coverage::{run_coverage_sandwich, CoverageOutcome};
pub use scenarios::mev::{run_mev_sandwich, MevIteration};
pub use scenarios::Fixture;
