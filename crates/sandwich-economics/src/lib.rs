/// SANDWICH ECONOMICS
///
/// Oracle report simulation and the economic checks applied around it:
/// - exact computation of the beacon balance for a requested rebase
/// - quorum submission through the protocol interface
/// - share price, relative change and attacker PnL invariants
/// - per-iteration sandwich profitability analysis

pub mod oracle_report;
pub mod invariants;
pub mod game_theory;

pub use oracle_report::{
    BasisPoints, OracleReportError, OracleReportSimulator, RebaseOutcome, ReportParams,
    ReportedBalance,
};

pub use invariants::{InvariantChecker, InvariantError, Tolerance, SHARE_PRICE_REFERENCE};

pub use game_theory::{
    RebaseTrigger, SandwichAnalysis, SandwichError, SandwichStrategy, SandwichVerifier,
};
