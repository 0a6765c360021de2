/*
[INPUT]:  YAML configuration file plus XAPI__* environment overrides
[OUTPUT]: Validated TraderConfig and the library configs derived from it
[POS]:    Configuration layer - runner setup
[UPDATE]: When adding new configuration options
*/

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use xapi_adapter::{
    ClientConfig, Credentials, DEFAULT_HOST, Environment, HourWindow, Lookback,
    MarketHoursConfig, PeriodCode, ReconnectPolicy, RolloverRule, ServerEndpoint, SessionConfig,
    XapiError,
};

const ENV_PREFIX: &str = "XAPI";
const ENV_SEPARATOR: &str = "__";
const REDACTED: &str = "***";

/// Top-level configuration for the runner
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TraderConfig {
    pub account: AccountConfig,
    #[serde(default)]
    pub trading: TradingConfig,
    #[serde(default)]
    pub backtest: BacktestConfig,
    #[serde(default)]
    pub connection: ConnectionConfig,
    /// Daily-rolling log file written next to stderr output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

/// Account credentials and venue selection
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AccountConfig {
    pub account_id: String,
    pub password: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default)]
    pub environment: Environment,
    #[serde(default = "default_true")]
    pub secure: bool,
    /// Read-only session: trade transactions are answered locally
    #[serde(default)]
    pub safe: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TradingConfig {
    #[serde(default = "default_symbol")]
    pub symbol: String,
    #[serde(default = "default_min_hour")]
    pub min_hour: u32,
    #[serde(default = "default_max_hour")]
    pub max_hour: u32,
    #[serde(default = "default_true")]
    pub override_enabled: bool,
    /// IANA name of the zone the venue's trading hours are quoted in
    #[serde(default = "default_venue_timezone")]
    pub venue_timezone: String,
    #[serde(default)]
    pub rollover_rule: RolloverRule,
    /// Symbols to stream candles for; empty means just `symbol`
    #[serde(default)]
    pub candle_topic_symbols: Vec<String>,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            symbol: default_symbol(),
            min_hour: default_min_hour(),
            max_hour: default_max_hour(),
            override_enabled: true,
            venue_timezone: default_venue_timezone(),
            rollover_rule: RolloverRule::default(),
            candle_topic_symbols: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BacktestConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Pull a fresh chart block instead of replaying `data_file`
    #[serde(default)]
    pub fetch_new_data: bool,
    #[serde(default = "default_period", with = "period_name")]
    pub period: PeriodCode,
    /// How far back a chart pull starts
    #[serde(default)]
    pub lookback: Lookback,
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,
    /// Keep only the most recent N rows when replaying
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_candles: Option<usize>,
    /// Price shift used when replaying a file written without chart metadata
    #[serde(default = "default_price_digits")]
    pub price_digits: u32,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            fetch_new_data: false,
            period: default_period(),
            lookback: Lookback::default(),
            data_file: default_data_file(),
            max_candles: None,
            price_digits: default_price_digits(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ConnectionConfig {
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// `null` waits for replies forever
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: Option<u64>,
    /// Unset retries until shutdown
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_backoff_max_secs")]
    pub backoff_max_secs: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            call_timeout_secs: default_call_timeout_secs(),
            max_retries: None,
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_secs: default_backoff_max_secs(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_symbol() -> String {
    "GBPJPY".to_string()
}

fn default_min_hour() -> u32 {
    7
}

fn default_max_hour() -> u32 {
    20
}

fn default_venue_timezone() -> String {
    "Europe/Warsaw".to_string()
}

fn default_period() -> PeriodCode {
    PeriodCode::M15
}

fn default_data_file() -> PathBuf {
    PathBuf::from("backtest_data/latest.csv")
}

fn default_price_digits() -> u32 {
    3
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_call_timeout_secs() -> Option<u64> {
    Some(30)
}

fn default_backoff_base_ms() -> u64 {
    1000
}

fn default_backoff_max_secs() -> u64 {
    30
}

/// Periods are written by name (`M15`) in configuration files.
mod period_name {
    use serde::{Deserialize, Deserializer, Serializer};
    use xapi_adapter::PeriodCode;

    pub fn serialize<S: Serializer>(period: &PeriodCode, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(period.name())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<PeriodCode, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl TraderConfig {
    /// Environment source for `XAPI__SECTION__KEY` overrides.
    pub fn environment() -> ::config::Environment {
        ::config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator(ENV_SEPARATOR)
            .separator(ENV_SEPARATOR)
            .try_parsing(true)
    }

    /// Load a YAML file layered with process environment overrides, then validate.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        Self::load_with(path, Self::environment())
    }

    pub fn load_with(path: &Path, environment: ::config::Environment) -> anyhow::Result<Self> {
        let config: Self = ::config::Config::builder()
            .add_source(::config::File::from(path).format(::config::FileFormat::Yaml))
            .add_source(environment)
            .build()
            .with_context(|| format!("read config {}", path.display()))?
            .try_deserialize()
            .context("deserialize config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> xapi_adapter::Result<()> {
        if self.account.account_id.trim().is_empty() {
            return Err(XapiError::Config("account.account_id is empty".to_string()));
        }
        if self.account.password.is_empty() {
            return Err(XapiError::Config("account.password is empty".to_string()));
        }
        if self.trading.symbol.trim().is_empty() {
            return Err(XapiError::Config("trading.symbol is empty".to_string()));
        }
        HourWindow::new(self.trading.min_hour, self.trading.max_hour)?;
        self.venue_tz()?;
        Ok(())
    }

    pub fn venue_tz(&self) -> xapi_adapter::Result<Tz> {
        self.trading.venue_timezone.parse::<Tz>().map_err(|err| {
            XapiError::Config(format!(
                "unknown venue_timezone {}: {err}",
                self.trading.venue_timezone
            ))
        })
    }

    pub fn session_config(&self) -> SessionConfig {
        let account = &self.account;
        let connection = &self.connection;
        SessionConfig::new(Credentials::new(&account.account_id, &account.password))
            .with_endpoint(ServerEndpoint {
                host: account.host.clone(),
                secure: account.secure,
                environment: account.environment,
            })
            .with_safe_mode(account.safe)
            .with_client(ClientConfig {
                connect_timeout: Duration::from_secs(connection.connect_timeout_secs),
                call_timeout: connection.call_timeout_secs.map(Duration::from_secs),
            })
    }

    pub fn market_hours_config(&self) -> xapi_adapter::Result<MarketHoursConfig> {
        Ok(MarketHoursConfig {
            window: HourWindow::new(self.trading.min_hour, self.trading.max_hour)?,
            override_enabled: self.trading.override_enabled,
            venue_tz: self.venue_tz()?,
            rollover_rule: self.trading.rollover_rule,
        })
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            max_retries: self.connection.max_retries,
            base_delay: Duration::from_millis(self.connection.backoff_base_ms),
            max_delay: Duration::from_secs(self.connection.backoff_max_secs),
        }
    }

    pub fn candle_symbols(&self) -> Vec<String> {
        if self.trading.candle_topic_symbols.is_empty() {
            vec![self.trading.symbol.clone()]
        } else {
            self.trading.candle_topic_symbols.clone()
        }
    }

    /// Copy safe to print or log.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.account.password = REDACTED.to_string();
        copy
    }

    pub fn to_yaml(&self) -> anyhow::Result<String> {
        serde_yaml::to_string(self).context("serialize config")
    }
}
