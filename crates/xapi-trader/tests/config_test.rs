/*
[INPUT]:  YAML files on disk and environment override maps
[OUTPUT]: Configuration loading and validation verification
[POS]:    Integration test layer - config file handling
[UPDATE]: When adding configuration options or changing override rules
*/

use std::io::Write;
use std::time::Duration;

use xapi_adapter::{Environment, PeriodCode, RolloverRule, TimeUnit};
use xapi_trader::TraderConfig;

const FULL_YAML: &str = r#"
account:
  account_id: "12345"
  password: from-file
  environment: real
  safe: true
trading:
  symbol: EURUSD
  min_hour: 8
  max_hour: 18
  override_enabled: false
  rollover_rule: from_final_hour
  candle_topic_symbols: [EURUSD, GBPJPY]
backtest:
  enabled: true
  period: H1
  lookback:
    unit: WEEKS
    multiplier: 2
  max_candles: 500
connection:
  call_timeout_secs: null
  max_retries: 5
log_file: logs/trader.log
"#;

fn yaml_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn no_env() -> config::Environment {
    TraderConfig::environment().source(Some(config::Map::new()))
}

#[test]
fn test_load_full_file() {
    let file = yaml_file(FULL_YAML);
    let config = TraderConfig::load_with(file.path(), no_env()).unwrap();

    assert_eq!(config.account.environment, Environment::Real);
    assert!(config.account.safe);
    assert_eq!(config.trading.symbol, "EURUSD");
    assert_eq!(config.trading.rollover_rule, RolloverRule::FromFinalHour);
    assert_eq!(config.backtest.period, PeriodCode::H1);
    assert_eq!(config.backtest.lookback.unit, TimeUnit::Weeks);
    assert_eq!(config.backtest.max_candles, Some(500));
    assert_eq!(config.log_file.as_deref(), Some(std::path::Path::new("logs/trader.log")));

    let session = config.session_config();
    assert_eq!(session.client.call_timeout, None);
    assert_eq!(session.client.connect_timeout, Duration::from_secs(10));
    assert_eq!(config.reconnect_policy().max_retries, Some(5));

    let hours = config.market_hours_config().unwrap();
    assert_eq!((hours.window.min, hours.window.max), (8, 18));
    assert!(!hours.override_enabled);
    assert_eq!(hours.venue_tz, chrono_tz::Europe::Warsaw);
}

#[test]
fn test_environment_overrides_file() {
    let file = yaml_file(FULL_YAML);
    let mut vars = config::Map::new();
    vars.insert("XAPI__ACCOUNT__PASSWORD".to_string(), "from-env".to_string());
    vars.insert("XAPI__TRADING__MAX_HOUR".to_string(), "20".to_string());

    let config = TraderConfig::load_with(
        file.path(),
        TraderConfig::environment().source(Some(vars)),
    )
    .unwrap();

    assert_eq!(config.account.password, "from-env");
    assert_eq!(config.trading.max_hour, 20);
    assert_eq!(config.trading.symbol, "EURUSD");
}

#[test]
fn test_invalid_window_is_rejected() {
    let file = yaml_file(
        r#"
account:
  account_id: "1"
  password: pw
trading:
  min_hour: 9
  max_hour: 24
"#,
    );
    let err = TraderConfig::load_with(file.path(), no_env()).unwrap_err();
    assert!(format!("{err:#}").contains("invalid trading hour window"));
}

#[test]
fn test_missing_account_is_rejected() {
    let file = yaml_file("trading:\n  symbol: GBPJPY\n");
    assert!(TraderConfig::load_with(file.path(), no_env()).is_err());
}

#[test]
fn test_redacted_yaml_reloads() {
    let file = yaml_file(FULL_YAML);
    let config = TraderConfig::load_with(file.path(), no_env()).unwrap();
    let printed = config.redacted().to_yaml().unwrap();

    let reloaded: TraderConfig = serde_yaml::from_str(&printed).unwrap();
    assert_eq!(reloaded.account.password, "***");
    assert_eq!(reloaded.trading, config.trading);
    assert_eq!(reloaded.backtest, config.backtest);
}
