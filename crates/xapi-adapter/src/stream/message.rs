/*
[INPUT]:  Raw stream-channel frames
[OUTPUT]: PushMessage envelopes and typed StreamEvent payloads
[POS]:    Stream layer - message parsing and validation
[UPDATE]: When adding push topics or changing record schemas
*/

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::socket::{Result, XapiError};
use crate::stream::topic::{SubscriptionKey, Topic};
use crate::types::{
    Reply, StreamingBalanceRecord, StreamingCandleRecord, StreamingKeepAliveRecord,
    StreamingNewsRecord, StreamingProfitRecord, StreamingTickRecord, StreamingTradeRecord,
    StreamingTradeStatusRecord,
};

/// One unsolicited push from the stream channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PushMessage {
    pub command: String,
    #[serde(default)]
    pub data: Value,
}

impl PushMessage {
    pub fn topic(&self) -> Option<Topic> {
        Topic::from_push_command(&self.command)
    }

    pub fn symbol(&self) -> Option<&str> {
        self.data.get("symbol").and_then(Value::as_str)
    }

    /// Registry key this push would be dispatched under.
    pub fn key(&self) -> Option<SubscriptionKey> {
        let topic = self.topic()?;
        Some(SubscriptionKey::new(topic, self.symbol()))
    }

    /// Decode `data` into the record type of its topic.
    pub fn event(&self) -> Result<StreamEvent> {
        let topic = self
            .topic()
            .ok_or_else(|| XapiError::Protocol(format!("unknown push command {}", self.command)))?;

        Ok(match topic {
            Topic::Candles => StreamEvent::Candle(self.decode()?),
            Topic::TickPrices => StreamEvent::Tick(self.decode()?),
            Topic::Trades => StreamEvent::Trade(self.decode()?),
            Topic::TradeStatus => StreamEvent::TradeStatus(self.decode()?),
            Topic::KeepAlive => StreamEvent::KeepAlive(self.decode()?),
            Topic::Profits => StreamEvent::Profit(self.decode()?),
            Topic::News => StreamEvent::News(self.decode()?),
            Topic::Balance => StreamEvent::Balance(self.decode()?),
        })
    }

    fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        T::deserialize(&self.data).map_err(|err| {
            XapiError::Protocol(format!("unexpected {} payload: {err}", self.command))
        })
    }
}

/// Typed push payloads
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Candle(StreamingCandleRecord),
    Tick(StreamingTickRecord),
    Trade(StreamingTradeRecord),
    TradeStatus(StreamingTradeStatusRecord),
    KeepAlive(StreamingKeepAliveRecord),
    Profit(StreamingProfitRecord),
    News(StreamingNewsRecord),
    Balance(StreamingBalanceRecord),
}

/// Anything that may legitimately arrive on the stream channel
#[derive(Debug, Clone, PartialEq)]
pub enum StreamFrame {
    Push(PushMessage),
    /// Status envelope, e.g. a rejected stream command
    Status(Reply),
}

impl StreamFrame {
    pub fn decode(frame: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(frame)
            .map_err(|err| XapiError::Protocol(format!("malformed stream frame: {err}")))?;

        if value.get("command").is_some() {
            let push = serde_json::from_value(value)
                .map_err(|err| XapiError::Protocol(format!("malformed push message: {err}")))?;
            return Ok(StreamFrame::Push(push));
        }
        if value.get("status").is_some() {
            let reply = serde_json::from_value(value)
                .map_err(|err| XapiError::Protocol(format!("malformed status frame: {err}")))?;
            return Ok(StreamFrame::Status(reply));
        }
        Err(XapiError::Protocol(
            "stream frame has neither command nor status".to_string(),
        ))
    }
}
