/*
[INPUT]:  xAPI record schemas
[OUTPUT]: Explicit record structs that reject unknown or missing fields
[POS]:    Data layer - returnData payloads and push message bodies
[UPDATE]: When the venue schema changes or new records are consumed
*/

use serde::{Deserialize, Serialize};

use super::enums::{TradeCmd, TradeDay, TradeStatus};

/// `SYMBOL_RECORD` returned by `getSymbol` / `getAllSymbols`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct SymbolRecord {
    pub ask: f64,
    pub bid: f64,
    pub category_name: String,
    pub contract_size: i64,
    pub currency: String,
    pub currency_pair: bool,
    pub currency_profit: String,
    pub description: String,
    pub expiration: Option<i64>,
    pub group_name: String,
    pub high: f64,
    pub initial_margin: i64,
    pub instant_max_volume: i64,
    pub leverage: f64,
    pub long_only: bool,
    pub lot_max: f64,
    pub lot_min: f64,
    pub lot_step: f64,
    pub low: f64,
    pub margin_hedged: i64,
    pub margin_hedged_strong: bool,
    pub margin_maintenance: Option<i64>,
    pub margin_mode: i64,
    pub percentage: f64,
    pub pips_precision: i32,
    pub precision: i32,
    pub profit_mode: i64,
    pub quote_id: i64,
    pub quote_id_cross: Option<i64>,
    pub short_selling: bool,
    pub spread_raw: f64,
    pub spread_table: f64,
    pub starting: Option<i64>,
    pub step_rule_id: i64,
    pub stops_level: i64,
    #[serde(rename = "swap_rollover3days")]
    pub swap_rollover_3days: i64,
    pub swap_enable: bool,
    pub swap_long: f64,
    pub swap_short: f64,
    pub swap_type: i64,
    pub symbol: String,
    pub tick_size: Option<f64>,
    pub tick_value: Option<f64>,
    /// Ask & bid tick time, ms since epoch
    pub time: i64,
    pub time_string: String,
    pub trailing_enabled: bool,
    #[serde(rename = "type")]
    pub instrument_type: i64,
    pub exemode: Option<i64>,
}

/// `getServerTime` payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ServerTimeRecord {
    /// ms since epoch
    pub time: i64,
    pub time_string: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VersionRecord {
    pub version: String,
}

/// `RATE_INFO_RECORD`; prices are shifted integers, see `ChartResponse::digits`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct RateInfoRecord {
    /// Shift from open price
    pub close: f64,
    /// Candle start time in CET/CEST, ms since epoch
    pub ctm: i64,
    pub ctm_string: String,
    /// Shift from open price
    pub high: f64,
    /// Shift from open price
    pub low: f64,
    /// Open price in base currency * 10^digits
    pub open: f64,
    pub vol: f64,
}

/// `getChartLastRequest` / `getChartRangeRequest` payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ChartResponse {
    pub digits: u32,
    pub rate_infos: Vec<RateInfoRecord>,
}

/// One open/close interval of a trading-hours table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HoursRecord {
    pub day: TradeDay,
    /// ms since 00:00 venue time
    #[serde(rename = "fromT")]
    pub from_t: i64,
    /// ms since 00:00 venue time
    #[serde(rename = "toT")]
    pub to_t: i64,
}

/// `TRADING_HOURS_RECORD`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TradingHoursRecord {
    pub quotes: Vec<HoursRecord>,
    pub symbol: String,
    pub trading: Vec<HoursRecord>,
}

/// `TICK_RECORD` from the socket `getTickPrices`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct TickRecord {
    pub ask: f64,
    pub ask_volume: Option<i64>,
    pub bid: f64,
    pub bid_volume: Option<i64>,
    pub high: f64,
    pub level: i32,
    pub low: f64,
    pub spread_raw: f64,
    pub spread_table: f64,
    pub symbol: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TickPricesResponse {
    pub quotations: Vec<TickRecord>,
}

/// `getMarginLevel` payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MarginLevelRecord {
    pub balance: f64,
    pub credit: f64,
    pub currency: String,
    pub equity: f64,
    pub margin: f64,
    pub margin_free: f64,
    pub margin_level: f64,
}

/// `tradeTransaction` payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TradeTransactionResponse {
    pub order: i64,
}

/// `tradeTransactionStatus` payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct TradeTransactionStatusRecord {
    pub ask: f64,
    pub bid: f64,
    pub custom_comment: Option<String>,
    pub message: Option<String>,
    pub order: i64,
    pub request_status: TradeStatus,
}

/// Push body of the `candle` topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct StreamingCandleRecord {
    pub close: f64,
    pub ctm: i64,
    pub ctm_string: String,
    pub high: f64,
    pub low: f64,
    pub open: f64,
    pub quote_id: i64,
    pub symbol: String,
    pub vol: f64,
}

/// Push body of the `tickPrices` topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct StreamingTickRecord {
    pub ask: f64,
    pub ask_volume: Option<i64>,
    pub bid: f64,
    pub bid_volume: Option<i64>,
    pub high: f64,
    pub level: i32,
    pub low: f64,
    pub quote_id: i64,
    pub spread_raw: f64,
    pub spread_table: f64,
    pub symbol: String,
    pub timestamp: i64,
}

/// Push body of the `trade` topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StreamingTradeRecord {
    pub close_price: f64,
    pub close_time: Option<i64>,
    pub closed: bool,
    pub cmd: TradeCmd,
    pub comment: String,
    pub commission: Option<f64>,
    #[serde(rename = "customComment")]
    pub custom_comment: Option<String>,
    pub digits: i32,
    pub expiration: Option<i64>,
    pub margin_rate: f64,
    pub offset: i64,
    pub open_price: f64,
    pub open_time: i64,
    pub order: i64,
    pub order2: i64,
    pub position: i64,
    pub profit: Option<f64>,
    pub sl: f64,
    pub state: String,
    pub storage: f64,
    pub symbol: Option<String>,
    pub tp: f64,
    #[serde(rename = "type")]
    pub trade_type: i64,
    pub volume: f64,
}

/// Push body of the `tradeStatus` topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct StreamingTradeStatusRecord {
    pub custom_comment: Option<String>,
    pub message: Option<String>,
    pub order: i64,
    pub price: f64,
    pub request_status: TradeStatus,
}

/// Push body of the `keepAlive` topic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StreamingKeepAliveRecord {
    pub timestamp: i64,
}

/// Push body of the `profit` topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StreamingProfitRecord {
    pub order: i64,
    pub order2: i64,
    pub position: i64,
    pub profit: f64,
}

/// Push body of the `news` topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StreamingNewsRecord {
    pub body: String,
    pub key: String,
    pub time: i64,
    pub title: String,
}

/// Push body of the `balance` topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct StreamingBalanceRecord {
    pub balance: f64,
    pub credit: f64,
    pub equity: f64,
    pub margin: f64,
    pub margin_free: f64,
    pub margin_level: f64,
}
