//! Layered configuration loading.

use config::{FileFormat, Map};
use sandwich_core::ProtocolContracts;
use sandwich_root::HarnessConfig;

fn no_env() -> Map<String, String> {
    Map::new()
}

#[test]
fn test_defaults_round_trip_through_layers() {
    let config = HarnessConfig::from_sources(None, no_env()).unwrap();
    assert_eq!(config, HarnessConfig::default());
    assert_eq!(config.contracts, ProtocolContracts::mainnet());
    assert_eq!(config.coverage.burn_quota_bp, 8);
    assert_eq!(config.mev.daily_rates_bp, vec![1.4, 2.0, 4.0, 6.0, 8.0]);
}

#[test]
fn test_document_overrides_single_keys() {
    let doc = serde_json::json!({
        "coverage": { "burn_quota_bp": 4 },
        "mev": { "attacker_balances_eth": [500] },
    })
    .to_string();
    let config = HarnessConfig::from_sources(Some((&doc, FileFormat::Json)), no_env()).unwrap();
    assert_eq!(config.coverage.burn_quota_bp, 4);
    assert_eq!(config.coverage.attacker_eth, 10_000);
    assert_eq!(config.mev.attacker_balances_eth, vec![500]);
    assert_eq!(config.genesis.oracle_quorum, 3);
}

#[test]
fn test_environment_beats_document() {
    let doc = "[coverage]\nburn_quota_bp = 4\n";
    let mut env = no_env();
    env.insert("SANDWICH__COVERAGE__BURN_QUOTA_BP".to_string(), "6".to_string());
    env.insert("SANDWICH__GENESIS__POOL_AMP".to_string(), "100".to_string());
    let config = HarnessConfig::from_sources(Some((doc, FileFormat::Toml)), env).unwrap();
    assert_eq!(config.coverage.burn_quota_bp, 6);
    assert_eq!(config.genesis.pool_amp, 100);
}

#[test]
fn test_environment_overrides_grid_lists() {
    let mut env = no_env();
    env.insert("SANDWICH__MEV__DAILY_RATES_BP".to_string(), "1.5,3,7.25".to_string());
    env.insert("SANDWICH__MEV__ATTACKER_BALANCES_ETH".to_string(), "50,5000".to_string());
    env.insert("SANDWICH__COVERAGE__BURN_QUOTA_BP".to_string(), "9".to_string());
    let config = HarnessConfig::from_sources(None, env).unwrap();
    assert_eq!(config.mev.daily_rates_bp, vec![1.5, 3.0, 7.25]);
    assert_eq!(config.mev.attacker_balances_eth, vec![50, 5_000]);
    // scalars stay scalars
    assert_eq!(config.coverage.burn_quota_bp, 9);
    assert_eq!(config.contracts, ProtocolContracts::mainnet());
}

#[test]
fn test_invalid_values_are_rejected() {
    for doc in [
        "[coverage]\nburn_quota_bp = 0\n",
        "[coverage]\nburn_quota_bp = 10001\n",
        "[genesis]\noracle_quorum = 6\n",
        "[report]\nprotocol_fee_bp = 10000\n",
        "[mev]\ndaily_rates_bp = []\n",
        "[mev]\nattacker_balances_eth = [0]\n",
    ] {
        let err = HarnessConfig::from_sources(Some((doc, FileFormat::Toml)), no_env());
        assert!(err.is_err(), "accepted {doc}");
    }
}

#[test]
fn test_duplicate_contract_addresses_are_rejected() {
    let mut env = no_env();
    let steth = format!("{:?}", ProtocolContracts::mainnet().steth);
    env.insert("SANDWICH__CONTRACTS__BURNER".to_string(), steth);
    let err = HarnessConfig::from_sources(None, env).unwrap_err();
    assert!(format!("{err:#}").contains("share address"));
}
