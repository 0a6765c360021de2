/*
[INPUT]:  Command names, arguments and session identifiers
[OUTPUT]: Serializable command envelopes and argument records
[POS]:    Data layer - outbound wire types
[UPDATE]: When adding commands or changing argument shapes
*/

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::enums::{PeriodCode, TimeUnit, TradeCmd, TradeType};

/// One outbound frame.
///
/// Socket commands carry their parameters under `arguments`; stream commands carry
/// `streamSessionId` and put their parameters at the top level of the frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    #[serde(rename = "command")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
    #[serde(
        rename = "streamSessionId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub stream_session_id: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: None,
            stream_session_id: None,
            fields: Map::new(),
        }
    }

    pub fn with_arguments(mut self, arguments: Value) -> Self {
        self.arguments = Some(arguments);
        self
    }

    pub fn with_stream_session(mut self, stream_session_id: impl Into<String>) -> Self {
        self.stream_session_id = Some(stream_session_id.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn to_frame(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// `CHART_LAST_INFO_RECORD`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartLastInfo {
    pub period: PeriodCode,
    /// Start of the chart block in ms since epoch
    pub start: i64,
    pub symbol: String,
}

/// `CHART_RANGE_INFO_RECORD`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartRangeInfo {
    pub end: i64,
    pub period: PeriodCode,
    pub start: i64,
    pub symbol: String,
    /// Number of candles requested from `start`; negative means backwards.
    /// When non-zero the server ignores `end`.
    #[serde(default)]
    pub ticks: i32,
}

/// `TRADE_TRANS_INFO`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeTransInfo {
    pub cmd: TradeCmd,
    pub custom_comment: String,
    pub expiration: i64,
    pub offset: i64,
    pub order: i64,
    pub price: f64,
    pub sl: f64,
    pub symbol: String,
    pub tp: f64,
    #[serde(rename = "type")]
    pub trade_type: TradeType,
    pub volume: f64,
}

impl TradeTransInfo {
    /// Market order opening a new position.
    pub fn market(symbol: impl Into<String>, cmd: TradeCmd, price: f64, volume: f64) -> Self {
        Self {
            cmd,
            custom_comment: String::new(),
            expiration: 0,
            offset: 0,
            order: 0,
            price,
            sl: 0.0,
            symbol: symbol.into(),
            tp: 0.0,
            trade_type: TradeType::Open,
            volume,
        }
    }
}

/// "Now minus N units" window used to compute the `start` of a chart pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lookback {
    pub unit: TimeUnit,
    pub multiplier: u32,
}

impl Default for Lookback {
    fn default() -> Self {
        Self::new(TimeUnit::Days, 1)
    }
}

impl Lookback {
    pub fn new(unit: TimeUnit, multiplier: u32) -> Self {
        Self { unit, multiplier }
    }

    /// Start of the window, never before the epoch.
    pub fn start_from(&self, now_ms: i64) -> i64 {
        let span = self.unit.millis().saturating_mul(i64::from(self.multiplier));
        now_ms.saturating_sub(span).max(0)
    }
}
