/*
[INPUT]:  Topic selections and subscription parameters
[OUTPUT]: Subscribe / unsubscribe commands and registry keys
[POS]:    Stream layer - topic table
[UPDATE]: When the venue adds a streaming topic
*/

use std::fmt;

use crate::types::Command;

/// Push-message category on the stream channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Candles,
    TickPrices,
    Trades,
    TradeStatus,
    KeepAlive,
    Profits,
    News,
    Balance,
}

impl Topic {
    pub const ALL: [Topic; 8] = [
        Topic::Candles,
        Topic::TickPrices,
        Topic::Trades,
        Topic::TradeStatus,
        Topic::KeepAlive,
        Topic::Profits,
        Topic::News,
        Topic::Balance,
    ];

    pub fn subscribe_command(self) -> &'static str {
        match self {
            Topic::Candles => "getCandles",
            Topic::TickPrices => "getTickPrices",
            Topic::Trades => "getTrades",
            Topic::TradeStatus => "getTradeStatus",
            Topic::KeepAlive => "getKeepAlive",
            Topic::Profits => "getProfits",
            Topic::News => "getNews",
            Topic::Balance => "getBalance",
        }
    }

    pub fn unsubscribe_command(self) -> &'static str {
        match self {
            Topic::Candles => "stopCandles",
            Topic::TickPrices => "stopTickPrices",
            Topic::Trades => "stopTrades",
            Topic::TradeStatus => "stopTradeStatus",
            Topic::KeepAlive => "stopKeepAlive",
            Topic::Profits => "stopProfits",
            Topic::News => "stopNews",
            Topic::Balance => "stopBalance",
        }
    }

    /// `command` tag carried by pushes of this topic
    pub fn push_command(self) -> &'static str {
        match self {
            Topic::Candles => "candle",
            Topic::TickPrices => "tickPrices",
            Topic::Trades => "trade",
            Topic::TradeStatus => "tradeStatus",
            Topic::KeepAlive => "keepAlive",
            Topic::Profits => "profit",
            Topic::News => "news",
            Topic::Balance => "balance",
        }
    }

    pub fn from_push_command(command: &str) -> Option<Topic> {
        Topic::ALL
            .into_iter()
            .find(|topic| topic.push_command() == command)
    }

    /// Per-symbol topics are subscribed once per symbol.
    pub fn is_per_symbol(self) -> bool {
        matches!(self, Topic::Candles | Topic::TickPrices)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.push_command())
    }
}

/// Registry key: one active subscription per (topic, symbol)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionKey {
    pub topic: Topic,
    pub symbol: Option<String>,
}

impl SubscriptionKey {
    pub fn new(topic: Topic, symbol: Option<&str>) -> Self {
        let symbol = if topic.is_per_symbol() {
            symbol.map(str::to_string)
        } else {
            None
        };
        Self { topic, symbol }
    }

    pub fn topic(topic: Topic) -> Self {
        Self::new(topic, None)
    }

    pub fn symbol(topic: Topic, symbol: &str) -> Self {
        Self::new(topic, Some(symbol))
    }

    /// Stop command for this key. Stream commands always carry `streamSessionId`.
    pub fn unsubscribe_command(&self, stream_session_id: &str) -> Command {
        let command = Command::new(self.topic.unsubscribe_command())
            .with_stream_session(stream_session_id);
        match &self.symbol {
            Some(symbol) => command.with_field("symbol", symbol.as_str()),
            None => command,
        }
    }
}

impl fmt::Display for SubscriptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.symbol {
            Some(symbol) => write!(f, "{}:{}", self.topic, symbol),
            None => write!(f, "{}", self.topic),
        }
    }
}

/// A subscription request with its parameters
#[derive(Debug, Clone, PartialEq)]
pub enum Subscription {
    Candles {
        symbol: String,
    },
    TickPrices {
        symbol: String,
        /// Minimal interval between two ticks in ms
        min_arrival_time: i64,
        /// Market depth level; 0 streams only the top of book
        max_level: i32,
    },
    Trades,
    TradeStatus,
    KeepAlive,
    Profits,
    News,
    Balance,
}

impl Subscription {
    pub fn candles(symbol: impl Into<String>) -> Self {
        Subscription::Candles {
            symbol: symbol.into(),
        }
    }

    pub fn tick_prices(symbol: impl Into<String>) -> Self {
        Subscription::TickPrices {
            symbol: symbol.into(),
            min_arrival_time: 0,
            max_level: 0,
        }
    }

    pub fn topic(&self) -> Topic {
        match self {
            Subscription::Candles { .. } => Topic::Candles,
            Subscription::TickPrices { .. } => Topic::TickPrices,
            Subscription::Trades => Topic::Trades,
            Subscription::TradeStatus => Topic::TradeStatus,
            Subscription::KeepAlive => Topic::KeepAlive,
            Subscription::Profits => Topic::Profits,
            Subscription::News => Topic::News,
            Subscription::Balance => Topic::Balance,
        }
    }

    pub fn key(&self) -> SubscriptionKey {
        match self {
            Subscription::Candles { symbol } | Subscription::TickPrices { symbol, .. } => {
                SubscriptionKey::symbol(self.topic(), symbol)
            }
            _ => SubscriptionKey::topic(self.topic()),
        }
    }

    pub fn command(&self, stream_session_id: &str) -> Command {
        let command =
            Command::new(self.topic().subscribe_command()).with_stream_session(stream_session_id);
        match self {
            Subscription::Candles { symbol } => command.with_field("symbol", symbol.as_str()),
            Subscription::TickPrices {
                symbol,
                min_arrival_time,
                max_level,
            } => command
                .with_field("symbol", symbol.as_str())
                .with_field("minArrivalTime", *min_arrival_time)
                .with_field("maxLevel", *max_level),
            _ => command,
        }
    }
}
