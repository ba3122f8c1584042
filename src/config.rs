//! Harness configuration.
//!
//! Layered with the `config` crate: built-in defaults, an optional file
//! (TOML, YAML or JSON by extension), then `SANDWICH__SECTION__KEY`
//! environment overrides. The MEV grids take comma-separated lists, e.g.
//! `SANDWICH__MEV__DAILY_RATES_BP=1.4,8`.

use anyhow::{bail, Context, Result};
use config::{Config, ConfigBuilder, Environment, File, FileFormat, Map};
use config::builder::DefaultState;
use log::info;
use sandwich_core::{ProtocolContracts, BASIS_POINTS};
use sandwich_economics::ReportParams;
use sandwich_sim::GenesisParams;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const ENV_PREFIX: &str = "SANDWICH";
const ENV_SEPARATOR: &str = "__";
const ENV_LIST_SEPARATOR: &str = ",";
/// Keys read from the environment as comma-separated lists
const ENV_LIST_KEYS: [&str; 2] = ["mev.daily_rates_bp", "mev.attacker_balances_eth"];

/// Coverage sandwich parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverageConfig {
    pub victim_steth_eth: u64,
    pub whale_stake_eth: u64,
    pub attacker_eth: u64,
    /// Relative loss reported before coverage, negative
    pub slashing_bp: i64,
    /// Share of all shares covered, in basis points
    pub cover_share_bp: u32,
    pub burn_quota_bp: u32,
    /// Bound on zero reports while draining the burner
    pub max_burn_reports: u32,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        CoverageConfig {
            victim_steth_eth: 100,
            whale_stake_eth: 50_000,
            attacker_eth: 10_000,
            slashing_bp: -100,
            cover_share_bp: 100,
            burn_quota_bp: 8,
            max_burn_reports: 20_000,
        }
    }
}

/// MEV sandwich grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MevConfig {
    pub daily_rates_bp: Vec<f64>,
    pub attacker_balances_eth: Vec<u64>,
    /// Annual increase limit voted in before the grid runs
    pub allowed_annual_increase_bp: u64,
}

impl Default for MevConfig {
    fn default() -> Self {
        MevConfig {
            daily_rates_bp: vec![1.4, 2.0, 4.0, 6.0, 8.0],
            attacker_balances_eth: vec![100, 1_000, 10_000, 100_000],
            allowed_annual_increase_bp: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub contracts: ProtocolContracts,
    pub genesis: GenesisParams,
    pub report: ReportParams,
    pub coverage: CoverageConfig,
    pub mev: MevConfig,
}

impl HarnessConfig {
    /// Defaults, then `path` if given, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = defaults()?;
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        builder = builder.add_source(environment(None));
        finish(builder).with_context(|| match path {
            Some(path) => format!("loading configuration from {}", path.display()),
            None => "loading configuration".to_string(),
        })
    }

    /// Defaults, then an in-memory document, then the given variables
    /// instead of the process environment.
    pub fn from_sources(document: Option<(&str, FileFormat)>, env: Map<String, String>) -> Result<Self> {
        let mut builder = defaults()?;
        if let Some((text, format)) = document {
            builder = builder.add_source(File::from_str(text, format));
        }
        builder = builder.add_source(environment(Some(env)));
        finish(builder)
    }

    pub fn validate(&self) -> Result<()> {
        if let Err(reason) = self.contracts.validate() {
            bail!("contracts: {reason}");
        }
        if let Err(reason) = self.genesis.validate() {
            bail!("genesis: {reason}");
        }
        if self.report.protocol_fee_bp >= BASIS_POINTS {
            bail!("report: protocol fee {} bp must be below {}", self.report.protocol_fee_bp, BASIS_POINTS);
        }
        if !(self.report.tolerance.relative >= 0.0 && self.report.tolerance.absolute >= 0.0) {
            bail!("report: tolerances must be non-negative");
        }

        let coverage = &self.coverage;
        if coverage.burn_quota_bp == 0 || coverage.burn_quota_bp > BASIS_POINTS {
            bail!("coverage: burn quota {} bp must be in 1..={}", coverage.burn_quota_bp, BASIS_POINTS);
        }
        if coverage.cover_share_bp == 0 || coverage.cover_share_bp > BASIS_POINTS {
            bail!("coverage: cover share {} bp must be in 1..={}", coverage.cover_share_bp, BASIS_POINTS);
        }
        if coverage.slashing_bp <= -(BASIS_POINTS as i64) {
            bail!("coverage: slashing {} bp wipes out the pool", coverage.slashing_bp);
        }
        if coverage.attacker_eth == 0 || coverage.victim_steth_eth == 0 {
            bail!("coverage: attacker and victim balances must be non-zero");
        }

        let mev = &self.mev;
        if mev.daily_rates_bp.is_empty() || mev.attacker_balances_eth.is_empty() {
            bail!("mev: daily rate and balance grids must be non-empty");
        }
        if let Some(rate) = mev.daily_rates_bp.iter().find(|r| !r.is_finite() || **r <= 0.0) {
            bail!("mev: daily rate {rate} bp must be finite and positive");
        }
        if mev.attacker_balances_eth.contains(&0) {
            bail!("mev: attacker balances must be non-zero");
        }
        Ok(())
    }
}

fn defaults() -> Result<ConfigBuilder<DefaultState>> {
    let defaults = Config::try_from(&HarnessConfig::default()).context("encoding default configuration")?;
    Ok(Config::builder().add_source(defaults))
}

fn environment(source: Option<Map<String, String>>) -> Environment {
    ENV_LIST_KEYS.into_iter().fold(
        Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true)
            .list_separator(ENV_LIST_SEPARATOR),
        |env, key| env.with_list_parse_key(key),
    )
    .source(source)
}

fn finish(builder: ConfigBuilder<DefaultState>) -> Result<HarnessConfig> {
    let config: HarnessConfig = builder
        .build()
        .context("building configuration")?
        .try_deserialize()
        .context("decoding configuration")?;
    config.validate()?;
    info!(
        "configuration: quota {} bp, {} daily rates x {} balances",
        config.coverage.burn_quota_bp,
        config.mev.daily_rates_bp.len(),
        config.mev.attacker_balances_eth.len()
    );
    Ok(config)
}
