/*
[INPUT]:  Server epoch time, a symbol's weekly trading-hours table, configured hour window
[OUTPUT]: MarketWindowDecision (open flag + reason)
[POS]:    Market-hours layer - pure evaluation, no clock reads and no I/O
[UPDATE]: When changing rollover handling or window rules
*/

use std::fmt;

use chrono::{DateTime, Datelike, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::socket::{Result, XapiError};
use crate::types::{HoursRecord, TradeDay, TradingHoursRecord};

const MS_PER_HOUR: i64 = 3_600_000;

/// Inclusive intraday hour range in venue-local time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HourWindow {
    pub min: u32,
    pub max: u32,
}

impl HourWindow {
    pub fn new(min: u32, max: u32) -> Result<Self> {
        if min > max || max > 23 {
            return Err(XapiError::Config(format!(
                "invalid trading hour window {min}..={max}"
            )));
        }
        Ok(Self { min, max })
    }

    pub fn contains(&self, hour: u32) -> bool {
        (self.min..=self.max).contains(&hour)
    }
}

impl Default for HourWindow {
    fn default() -> Self {
        Self { min: 7, max: 20 }
    }
}

/// How the final hour before rollover is blocked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RolloverRule {
    /// Block only when the current hour equals the final hour
    #[default]
    ExactHour,
    /// Block the final hour and anything after it
    FromFinalHour,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarketWindowReason {
    WithinConfiguredHours,
    OverrideWindow,
    OutsideHours,
    RolloverBlackout,
}

impl fmt::Display for MarketWindowReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MarketWindowReason::WithinConfiguredHours => "WITHIN_CONFIGURED_HOURS",
            MarketWindowReason::OverrideWindow => "OVERRIDE_WINDOW",
            MarketWindowReason::OutsideHours => "OUTSIDE_HOURS",
            MarketWindowReason::RolloverBlackout => "ROLLOVER_BLACKOUT",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketWindowDecision {
    pub open: bool,
    pub reason: MarketWindowReason,
}

impl MarketWindowDecision {
    pub const fn open(reason: MarketWindowReason) -> Self {
        Self { open: true, reason }
    }

    pub const fn closed(reason: MarketWindowReason) -> Self {
        Self {
            open: false,
            reason,
        }
    }
}

/// A symbol's weekly trading sessions, offsets in ms since venue-local midnight
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradingHoursTable {
    pub symbol: String,
    pub intervals: Vec<HoursRecord>,
}

impl TradingHoursTable {
    pub fn new(symbol: impl Into<String>, intervals: Vec<HoursRecord>) -> Self {
        Self {
            symbol: symbol.into(),
            intervals,
        }
    }

    /// Interval containing `offset_ms` on `day`; otherwise the one closing last that day.
    pub fn interval_for(&self, day: TradeDay, offset_ms: i64) -> Option<&HoursRecord> {
        let mut latest: Option<&HoursRecord> = None;
        for row in self.intervals.iter().filter(|row| row.day == day) {
            if row.from_t <= offset_ms && offset_ms < row.to_t {
                return Some(row);
            }
            if latest.is_none_or(|best| row.to_t > best.to_t) {
                latest = Some(row);
            }
        }
        latest
    }
}

impl From<TradingHoursRecord> for TradingHoursTable {
    fn from(record: TradingHoursRecord) -> Self {
        Self::new(record.symbol, record.trading)
    }
}

/// Venue-local weekday, hour, and ms since midnight for a server timestamp.
pub fn venue_clock(server_epoch_ms: i64, venue_tz: Tz) -> Option<(TradeDay, u32, i64)> {
    let local = DateTime::<Utc>::from_timestamp_millis(server_epoch_ms)?.with_timezone(&venue_tz);
    let offset_ms = i64::from(local.num_seconds_from_midnight()) * 1000
        + i64::from(local.timestamp_subsec_millis());
    Some((TradeDay::from(local.weekday()), local.hour(), offset_ms))
}

/// Final hour before rollover for an interval closing at `to_t`.
pub fn max_hour(to_t: i64) -> i64 {
    to_t / MS_PER_HOUR - 1
}

/// Window decision for an already-derived venue-local day and time.
pub fn decide(
    table: &TradingHoursTable,
    day: TradeDay,
    hour: u32,
    offset_ms: i64,
    window: HourWindow,
    override_enabled: bool,
    rollover_rule: RolloverRule,
) -> MarketWindowDecision {
    let Some(interval) = table.interval_for(day, offset_ms) else {
        return MarketWindowDecision::closed(MarketWindowReason::OutsideHours);
    };

    let final_hour = max_hour(interval.to_t);
    let current = i64::from(hour);
    let blackout = match rollover_rule {
        RolloverRule::ExactHour => final_hour - current == 0,
        RolloverRule::FromFinalHour => current >= final_hour,
    };

    if blackout {
        MarketWindowDecision::closed(MarketWindowReason::RolloverBlackout)
    } else if window.contains(hour) {
        MarketWindowDecision::open(MarketWindowReason::WithinConfiguredHours)
    } else if override_enabled && current < final_hour {
        MarketWindowDecision::open(MarketWindowReason::OverrideWindow)
    } else {
        MarketWindowDecision::closed(MarketWindowReason::OutsideHours)
    }
}

/// Whether new positions may be opened on `symbol` at `server_epoch_ms`.
///
/// Uses the venue's default civil time zone and the exact-hour rollover rule.
pub fn is_open(
    symbol: &str,
    server_epoch_ms: i64,
    table: &TradingHoursTable,
    window: HourWindow,
    override_enabled: bool,
) -> MarketWindowDecision {
    let config = MarketHoursConfig {
        window,
        override_enabled,
        ..MarketHoursConfig::default()
    };
    MarketHoursEvaluator::new(config).evaluate(symbol, server_epoch_ms, table)
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarketHoursConfig {
    pub window: HourWindow,
    pub override_enabled: bool,
    /// Civil time zone the trading-hours offsets are expressed in (CET/CEST)
    pub venue_tz: Tz,
    pub rollover_rule: RolloverRule,
}

impl Default for MarketHoursConfig {
    fn default() -> Self {
        Self {
            window: HourWindow::default(),
            override_enabled: true,
            venue_tz: chrono_tz::Europe::Warsaw,
            rollover_rule: RolloverRule::default(),
        }
    }
}

/// Market-hours evaluator bound to one configuration
#[derive(Debug, Clone, Default)]
pub struct MarketHoursEvaluator {
    config: MarketHoursConfig,
}

impl MarketHoursEvaluator {
    pub fn new(config: MarketHoursConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MarketHoursConfig {
        &self.config
    }

    pub fn evaluate(
        &self,
        symbol: &str,
        server_epoch_ms: i64,
        table: &TradingHoursTable,
    ) -> MarketWindowDecision {
        if table.symbol != symbol {
            debug!(symbol, table_symbol = %table.symbol, "trading hours table is for another symbol");
            return MarketWindowDecision::closed(MarketWindowReason::OutsideHours);
        }
        let Some((day, hour, offset_ms)) = venue_clock(server_epoch_ms, self.config.venue_tz)
        else {
            warn!(symbol, server_epoch_ms, "server time out of range");
            return MarketWindowDecision::closed(MarketWindowReason::OutsideHours);
        };

        let decision = decide(
            table,
            day,
            hour,
            offset_ms,
            self.config.window,
            self.config.override_enabled,
            self.config.rollover_rule,
        );

        match decision.reason {
            MarketWindowReason::RolloverBlackout => {
                info!(symbol, ?day, hour, "rollover blackout: no new positions before rollover");
            }
            MarketWindowReason::OverrideWindow => {
                warn!(
                    symbol,
                    ?day,
                    hour,
                    min_hour = self.config.window.min,
                    max_hour = self.config.window.max,
                    "outside configured hours; trading under override window"
                );
            }
            MarketWindowReason::OutsideHours => debug!(symbol, ?day, hour, "market closed"),
            MarketWindowReason::WithinConfiguredHours => {}
        }
        decision
    }
}
