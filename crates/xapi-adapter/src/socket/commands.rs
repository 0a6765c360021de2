/*
[INPUT]:  Typed command arguments
[OUTPUT]: Typed replies for account and market-data commands
[POS]:    Socket layer - non-trading commands
[UPDATE]: When adding commands or changing argument shapes
*/

use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::session::Credentials;
use crate::socket::{Result, XapiSocket};
use crate::types::{
    ChartLastInfo, ChartRangeInfo, ChartResponse, Command, MarginLevelRecord, Reply,
    ServerTimeRecord, SymbolRecord, TickPricesResponse, TradingHoursRecord, VersionRecord,
};

impl XapiSocket {
    /// Call and decode `returnData` as `T`.
    pub(crate) async fn typed_call<T: DeserializeOwned>(&self, command: Command) -> Result<Reply<T>> {
        self.call(&command).await?.into_typed()
    }

    /// Authenticate the connection.
    ///
    /// A successful reply carries `streamSessionId` for the stream channel.
    pub async fn login(&self, credentials: &Credentials) -> Result<Reply> {
        let command = Command::new("login").with_arguments(json!({
            "userId": credentials.account_id,
            "password": credentials.password,
        }));
        self.call(&command).await
    }

    pub async fn logout(&self) -> Result<Reply> {
        self.call(&Command::new("logout")).await
    }

    /// `logout` that fails with `CallInFlight` rather than queueing behind a pending call.
    pub async fn try_logout(&self) -> Result<Reply> {
        self.try_call(&Command::new("logout")).await
    }

    /// Keep the socket connection alive.
    pub async fn ping(&self) -> Result<Reply> {
        self.call(&Command::new("ping")).await
    }

    pub async fn get_version(&self) -> Result<Reply<VersionRecord>> {
        self.typed_call(Command::new("getVersion")).await
    }

    pub async fn get_server_time(&self) -> Result<Reply<ServerTimeRecord>> {
        self.typed_call(Command::new("getServerTime")).await
    }

    pub async fn get_symbol(&self, symbol: &str) -> Result<Reply<SymbolRecord>> {
        let command = Command::new("getSymbol").with_arguments(json!({ "symbol": symbol }));
        self.typed_call(command).await
    }

    pub async fn get_all_symbols(&self) -> Result<Reply<Vec<SymbolRecord>>> {
        self.typed_call(Command::new("getAllSymbols")).await
    }

    /// Quote and trading sessions, one record per requested symbol.
    pub async fn get_trading_hours(
        &self,
        symbols: &[&str],
    ) -> Result<Reply<Vec<TradingHoursRecord>>> {
        let command =
            Command::new("getTradingHours").with_arguments(json!({ "symbols": symbols }));
        self.typed_call(command).await
    }

    /// Candles from `info.start` up to now.
    pub async fn get_chart_last_request(
        &self,
        info: &ChartLastInfo,
    ) -> Result<Reply<ChartResponse>> {
        let command = Command::new("getChartLastRequest").with_arguments(json!({ "info": info }));
        self.typed_call(command).await
    }

    pub async fn get_chart_range_request(
        &self,
        info: &ChartRangeInfo,
    ) -> Result<Reply<ChartResponse>> {
        let command =
            Command::new("getChartRangeRequest").with_arguments(json!({ "info": info }));
        self.typed_call(command).await
    }

    /// Tick prices newer than `timestamp` (ms) at the given market depth level.
    pub async fn get_tick_prices(
        &self,
        symbols: &[&str],
        timestamp: i64,
        level: i32,
    ) -> Result<Reply<TickPricesResponse>> {
        let command = Command::new("getTickPrices").with_arguments(json!({
            "level": level,
            "symbols": symbols,
            "timestamp": timestamp,
        }));
        self.typed_call(command).await
    }

    pub async fn get_margin_level(&self) -> Result<Reply<MarginLevelRecord>> {
        self.typed_call(Command::new("getMarginLevel")).await
    }

    /// Escape hatch for commands without a typed wrapper.
    pub async fn raw_command(&self, name: &str, arguments: Option<Value>) -> Result<Reply> {
        let mut command = Command::new(name);
        command.arguments = arguments;
        self.call(&command).await
    }
}
