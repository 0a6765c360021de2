/*
[INPUT]:  Trade transaction requests
[OUTPUT]: Order numbers and transaction status
[POS]:    Socket layer - trading commands, gated by the read-only flag
[UPDATE]: When adding trading commands or changing the read-only gate
*/

use serde_json::json;
use tracing::{info, warn};

use crate::socket::{Result, XapiSocket};
use crate::types::{
    Command, Reply, TradeTransInfo, TradeTransactionResponse, TradeTransactionStatusRecord,
};

impl XapiSocket {
    /// Submit a trade transaction.
    ///
    /// In safe mode nothing is sent; the caller gets a synthetic
    /// `TRADING_DISABLED` failure reply instead.
    pub async fn trade_transaction(
        &self,
        info: &TradeTransInfo,
    ) -> Result<Reply<TradeTransactionResponse>> {
        if self.is_safe() {
            warn!(symbol = %info.symbol, cmd = ?info.cmd, "trade blocked: session is read-only");
            return Ok(Reply::trading_disabled());
        }

        info!(symbol = %info.symbol, cmd = ?info.cmd, volume = info.volume, price = info.price, "submitting trade transaction");
        let command =
            Command::new("tradeTransaction").with_arguments(json!({ "tradeTransInfo": info }));
        self.typed_call(command).await
    }

    /// Status of a previously submitted order.
    pub async fn trade_transaction_status(
        &self,
        order: i64,
    ) -> Result<Reply<TradeTransactionStatusRecord>> {
        let command =
            Command::new("tradeTransactionStatus").with_arguments(json!({ "order": order }));
        self.typed_call(command).await
    }
}
