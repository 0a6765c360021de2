/*
[INPUT]:  TraderConfig, shutdown token
[OUTPUT]: Session lifecycle: backtest pulls or live candle feed gated by market hours
[POS]:    Runner layer - reconnecting driver loop
[UPDATE]: When changing what a session does or how lost sessions are retried
*/

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use xapi_adapter::{
    ChartLastInfo, MarketHoursEvaluator, MarketWindowReason, PushMessage, ReconnectPolicy,
    SessionHandle, SessionManager, StreamEvent, Subscription, SubscriptionKey, Topic,
    TradingHoursTable, XapiError, XapiSocket, XapiStream,
};

use crate::config::TraderConfig;
use crate::history::{OhlcvRow, PriceBar, archive_existing, read_rows, write_rows};

const PING_INTERVAL: Duration = Duration::from_secs(30);

/// How a session ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionExit {
    /// Shutdown was requested
    Shutdown,
    /// Work finished (backtest pull)
    Completed,
}

pub struct Driver {
    config: TraderConfig,
    manager: SessionManager,
    evaluator: MarketHoursEvaluator,
    policy: ReconnectPolicy,
}

impl Driver {
    pub fn new(config: TraderConfig) -> Result<Self> {
        let evaluator = MarketHoursEvaluator::new(
            config
                .market_hours_config()
                .context("market hours config")?,
        );
        Ok(Self {
            manager: SessionManager::new(config.session_config()),
            policy: config.reconnect_policy(),
            evaluator,
            config,
        })
    }

    pub fn manager(&self) -> &SessionManager {
        &self.manager
    }

    /// Run sessions until shutdown, reconnecting after transport loss.
    ///
    /// A rejected login, or any error that is not a transport failure, is returned.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        let backtest = &self.config.backtest;
        if backtest.enabled && !backtest.fetch_new_data {
            return self.replay();
        }

        let mut lost_count: u32 = 0;
        loop {
            let handle = match self
                .manager
                .connect_with_retry(&self.policy, &shutdown)
                .await
            {
                Ok(handle) => handle,
                Err(XapiError::Cancelled) => {
                    info!("shutdown before a session was ready");
                    return Ok(());
                }
                Err(err) => return Err(err).context("open session"),
            };

            let started = Instant::now();
            let outcome =
                SessionManager::scope(handle, |session| self.drive(session, &shutdown)).await;

            let err = match outcome {
                Ok(SessionExit::Shutdown) => {
                    info!("driver stopped");
                    return Ok(());
                }
                Ok(SessionExit::Completed) => return Ok(()),
                Err(err) if is_transport_loss(&err) => err,
                Err(err) => return Err(err),
            };

            if started.elapsed() >= self.policy.max_delay {
                lost_count = 0;
            }
            lost_count = lost_count.saturating_add(1);
            let backoff = self.policy.backoff_duration(lost_count);
            warn!(retry_count = lost_count, ?backoff, error = %err, "session lost; reconnecting");

            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("driver stopped");
                    return Ok(());
                }
                _ = tokio::time::sleep(backoff) => {}
            }
        }
    }

    async fn drive(
        &self,
        session: Arc<SessionHandle>,
        shutdown: &CancellationToken,
    ) -> Result<SessionExit> {
        info!(
            account_id = %session.session().account_id(),
            stream_session_id = %session.session().stream_session_id(),
            backtest = self.config.backtest.enabled,
            "driver session started"
        );
        if self.config.backtest.enabled {
            self.fetch_history(session.socket()).await?;
            return Ok(SessionExit::Completed);
        }
        self.trade_live(&session, shutdown).await
    }

    /// Pull a chart block covering the lookback window and store it.
    async fn fetch_history(&self, socket: &XapiSocket) -> Result<()> {
        let backtest = &self.config.backtest;
        let symbol = &self.config.trading.symbol;

        let now_ms = match server_time(socket).await? {
            Some(now_ms) => now_ms,
            None => Utc::now().timestamp_millis(),
        };
        let info = ChartLastInfo {
            period: backtest.period,
            start: backtest.lookback.start_from(now_ms),
            symbol: symbol.clone(),
        };
        let chart = socket
            .get_chart_last_request(&info)
            .await?
            .into_result()
            .context("chart request rejected")?
            .ok_or_else(|| anyhow!("chart request returned no data"))?;

        let rows: Vec<OhlcvRow> = chart.rate_infos.iter().map(OhlcvRow::from).collect();
        archive_existing(&backtest.data_file, symbol, backtest.period)?;
        write_rows(&backtest.data_file, &rows)?;
        summarize(symbol, &rows, chart.digits);
        Ok(())
    }

    /// Offline run over the stored data file.
    fn replay(&self) -> Result<()> {
        let backtest = &self.config.backtest;
        let rows = read_rows(&backtest.data_file, backtest.max_candles)?;
        summarize(&self.config.trading.symbol, &rows, backtest.price_digits);
        Ok(())
    }

    async fn trade_live(
        &self,
        session: &SessionHandle,
        shutdown: &CancellationToken,
    ) -> Result<SessionExit> {
        let socket = session.socket();
        let stream = session.stream();
        let table = trading_hours(socket, &self.config.trading.symbol).await?;

        let mut candles = stream.consume(Topic::Candles);
        let mut keep_alive = stream.consume(Topic::KeepAlive);
        session.start_dispatch();
        stream.subscribe(&Subscription::KeepAlive).await?;

        let mut feed = CandleFeed::new(self.config.candle_symbols());
        self.refresh_market(socket, stream, &table, &mut feed).await?;

        let mut ping = tokio::time::interval_at(
            tokio::time::Instant::now() + PING_INTERVAL,
            PING_INTERVAL,
        );
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    feed.stop_quietly(stream).await;
                    return Ok(SessionExit::Shutdown);
                }
                _ = socket.connection().closed() => return Err(XapiError::ConnectionClosed.into()),
                _ = stream.connection().closed() => return Err(XapiError::ConnectionClosed.into()),
                Some(push) = candles.recv() => log_candle(&push),
                Some(_) = keep_alive.recv() => {
                    self.refresh_market(socket, stream, &table, &mut feed).await?;
                }
                _ = ping.tick() => {
                    socket.ping().await?;
                    stream.ping().await?;
                }
            }
        }
    }

    /// Start or stop the candle feed to match the current market window.
    async fn refresh_market(
        &self,
        socket: &XapiSocket,
        stream: &XapiStream,
        table: &TradingHoursTable,
        feed: &mut CandleFeed,
    ) -> xapi_adapter::Result<()> {
        let Some(now_ms) = server_time(socket).await? else {
            return Ok(());
        };
        let decision = self
            .evaluator
            .evaluate(&self.config.trading.symbol, now_ms, table);
        if decision.open {
            feed.start(stream, decision.reason).await
        } else {
            feed.stop(stream, decision.reason).await
        }
    }
}

/// Convenience wrapper used by the binary.
pub async fn run(config: TraderConfig, shutdown: CancellationToken) -> Result<()> {
    Driver::new(config)?.run(shutdown).await
}

fn is_transport_loss(err: &anyhow::Error) -> bool {
    err.downcast_ref::<XapiError>()
        .is_some_and(XapiError::is_retryable)
}

/// Candle subscriptions for the configured symbols, on or off together.
struct CandleFeed {
    symbols: Vec<String>,
    active: bool,
}

impl CandleFeed {
    fn new(symbols: Vec<String>) -> Self {
        Self {
            symbols,
            active: false,
        }
    }

    async fn start(
        &mut self,
        stream: &XapiStream,
        reason: MarketWindowReason,
    ) -> xapi_adapter::Result<()> {
        if self.active {
            return Ok(());
        }
        for symbol in &self.symbols {
            stream.subscribe(&Subscription::candles(symbol.as_str())).await?;
        }
        self.active = true;
        info!(symbols = ?self.symbols, %reason, "market open; candle feed started");
        Ok(())
    }

    async fn stop(
        &mut self,
        stream: &XapiStream,
        reason: MarketWindowReason,
    ) -> xapi_adapter::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        for symbol in &self.symbols {
            stream
                .unsubscribe(&SubscriptionKey::symbol(Topic::Candles, symbol))
                .await?;
        }
        info!(symbols = ?self.symbols, %reason, "market closed; candle feed stopped");
        Ok(())
    }

    async fn stop_quietly(&mut self, stream: &XapiStream) {
        if !self.active {
            return;
        }
        self.active = false;
        for symbol in &self.symbols {
            let key = SubscriptionKey::symbol(Topic::Candles, symbol);
            if let Err(err) = stream.unsubscribe(&key).await {
                debug!(key = %key, error = %err, "unsubscribe on shutdown failed");
            }
        }
    }
}

async fn server_time(socket: &XapiSocket) -> xapi_adapter::Result<Option<i64>> {
    let reply = socket.get_server_time().await?;
    match reply.data() {
        Some(record) => Ok(Some(record.time)),
        None => {
            warn!(code = ?reply.error_code, "server time unavailable");
            Ok(None)
        }
    }
}

async fn trading_hours(socket: &XapiSocket, symbol: &str) -> Result<TradingHoursTable> {
    let records = socket
        .get_trading_hours(&[symbol])
        .await?
        .into_result()
        .context("trading hours request rejected")?
        .unwrap_or_default();

    match records.into_iter().find(|record| record.symbol == symbol) {
        Some(record) => Ok(TradingHoursTable::from(record)),
        None => {
            warn!(symbol, "no trading hours returned; market treated as closed");
            Ok(TradingHoursTable::new(symbol, Vec::new()))
        }
    }
}

fn log_candle(push: &PushMessage) {
    match push.event() {
        Ok(StreamEvent::Candle(candle)) => info!(
            symbol = %candle.symbol,
            ctm = candle.ctm,
            open = candle.open,
            high = candle.high,
            low = candle.low,
            close = candle.close,
            vol = candle.vol,
            "candle"
        ),
        Ok(other) => debug!(?other, "unexpected event on candle queue"),
        Err(err) => warn!(error = %err, "undecodable candle push"),
    }
}

fn summarize(symbol: &str, rows: &[OhlcvRow], digits: u32) {
    let first = rows.first().and_then(|row| PriceBar::from_row(row, digits));
    let last = rows.last().and_then(|row| PriceBar::from_row(row, digits));
    match (first, last) {
        (Some(first), Some(last)) => info!(
            symbol,
            rows = rows.len(),
            from = %first.time,
            to = %last.time,
            last_close = last.close,
            "historical candles ready"
        ),
        _ => warn!(symbol, rows = rows.len(), "no historical candles"),
    }
}
