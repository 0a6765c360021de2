/*
[INPUT]:  Venue clock and scripted market data
[OUTPUT]: In-process mock venue plus runner configs pointed at it
[POS]:    Test infrastructure - shared across runner test modules
[UPDATE]: When the driver needs new venue commands
*/

//! Common test utilities for xapi-trader tests

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::{Notify, broadcast};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_util::sync::CancellationToken;
use xapi_trader::TraderConfig;

pub const PASSWORD: &str = "pw";

/// Monday 2024-01-08 10:00 Europe/Warsaw
pub const MONDAY_10AM: i64 = 1_704_704_400_000;
/// Saturday 2024-01-13 10:00 Europe/Warsaw
pub const SATURDAY_10AM: i64 = 1_705_136_400_000;

#[derive(Debug, Clone)]
pub struct Seen {
    pub path: String,
    pub command: Value,
}

impl Seen {
    pub fn name(&self) -> &str {
        self.command["command"].as_str().unwrap_or_default()
    }
}

struct Shared {
    seen: Mutex<Vec<Seen>>,
    seen_notify: Notify,
    clock: AtomicI64,
    sessions: AtomicUsize,
}

/// Venue serving `/demo` with market replies and `/demoStream` with recorded
/// commands plus whatever `push` is given.
pub struct MockVenue {
    addr: SocketAddr,
    shared: Arc<Shared>,
    pushes: broadcast::Sender<String>,
    kill: Arc<Mutex<CancellationToken>>,
    task: tokio::task::JoinHandle<()>,
}

impl MockVenue {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shared = Arc::new(Shared {
            seen: Mutex::new(Vec::new()),
            seen_notify: Notify::new(),
            clock: AtomicI64::new(MONDAY_10AM),
            sessions: AtomicUsize::new(0),
        });
        let (pushes, _) = broadcast::channel(64);
        let kill = Arc::new(Mutex::new(CancellationToken::new()));

        let task = {
            let shared = shared.clone();
            let pushes = pushes.clone();
            let kill = kill.clone();
            tokio::spawn(async move {
                while let Ok((tcp, _)) = listener.accept().await {
                    let kill = kill.lock().unwrap().clone();
                    tokio::spawn(serve_connection(tcp, shared.clone(), pushes.subscribe(), kill));
                }
            })
        };

        Self {
            addr,
            shared,
            pushes,
            kill,
            task,
        }
    }

    /// Runner configuration aimed at this venue, data files under `dir`.
    pub fn trader_config(&self, dir: &Path) -> TraderConfig {
        let yaml = format!(
            r#"
account:
  account_id: "12345"
  password: {PASSWORD}
  host: "{addr}"
  secure: false
backtest:
  data_file: "{data}"
connection:
  connect_timeout_secs: 2
  call_timeout_secs: 2
  max_retries: 2
  backoff_base_ms: 10
  backoff_max_secs: 1
"#,
            addr = self.addr,
            data = dir.join("latest.csv").display(),
        );
        serde_yaml::from_str(&yaml).unwrap()
    }

    pub fn set_clock(&self, epoch_ms: i64) {
        self.shared.clock.store(epoch_ms, Ordering::SeqCst);
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.shared.seen.lock().unwrap().clone()
    }

    pub fn seen_named(&self, name: &str) -> Vec<Seen> {
        self.seen().into_iter().filter(|seen| seen.name() == name).collect()
    }

    /// Wait until the `n`-th (1-based) command called `name` has arrived.
    pub async fn wait_for(&self, name: &str, n: usize) -> Seen {
        let wait = async {
            loop {
                let notified = self.shared.seen_notify.notified();
                if let Some(seen) = self.seen_named(name).into_iter().nth(n - 1) {
                    return seen;
                }
                notified.await;
            }
        };
        tokio::time::timeout(Duration::from_secs(3), wait)
            .await
            .unwrap_or_else(|_| panic!("venue never saw {name} #{n}"))
    }

    pub fn push(&self, frame: Value) {
        let _ = self.pushes.send(frame.to_string());
    }

    pub fn drop_connections(&self) {
        let mut kill = self.kill.lock().unwrap();
        kill.cancel();
        *kill = CancellationToken::new();
    }
}

impl Drop for MockVenue {
    fn drop(&mut self) {
        self.task.abort();
        self.kill.lock().unwrap().cancel();
    }
}

async fn serve_connection(
    tcp: tokio::net::TcpStream,
    shared: Arc<Shared>,
    mut pushes: broadcast::Receiver<String>,
    kill: CancellationToken,
) {
    let mut path = String::new();
    let capture_path = |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
        path = request.uri().path().to_string();
        Ok(response)
    };
    let Ok(ws) = tokio_tungstenite::accept_hdr_async(tcp, capture_path).await else {
        return;
    };
    let is_stream = path.ends_with("Stream");
    let (mut write, mut read) = ws.split();

    loop {
        tokio::select! {
            _ = kill.cancelled() => break,
            frame = read.next() => {
                let text = match frame {
                    Some(Ok(Message::Text(text))) => text.to_string(),
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => continue,
                };
                let command: Value = serde_json::from_str(&text).unwrap();
                shared.seen.lock().unwrap().push(Seen { path: path.clone(), command: command.clone() });
                shared.seen_notify.notify_waiters();

                if is_stream {
                    continue;
                }
                let reply = market_reply(&shared, &command);
                if write.send(Message::Text(reply.to_string().into())).await.is_err() {
                    break;
                }
            }
            push = pushes.recv(), if is_stream => {
                match push {
                    Ok(frame) => {
                        if write.send(Message::Text(frame.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }
}

fn market_reply(shared: &Shared, command: &Value) -> Value {
    match command["command"].as_str().unwrap_or_default() {
        "login" => {
            if command["arguments"]["password"] == json!(PASSWORD) {
                let n = shared.sessions.fetch_add(1, Ordering::SeqCst) + 1;
                json!({ "status": true, "streamSessionId": format!("sid-{n}") })
            } else {
                json!({ "status": false, "errorCode": "BE005", "errorDescr": "userPasswordCheck: Invalid login or password" })
            }
        }
        "logout" | "ping" => json!({ "status": true }),
        "getServerTime" => json!({
            "status": true,
            "returnData": { "time": shared.clock.load(Ordering::SeqCst), "timeString": "" }
        }),
        "getTradingHours" => {
            let weekdays: Vec<Value> = (1..=5)
                .map(|day| json!({ "day": day, "fromT": 0, "toT": 86_400_000 }))
                .collect();
            json!({
                "status": true,
                "returnData": [{ "symbol": "GBPJPY", "quotes": weekdays.clone(), "trading": weekdays }]
            })
        }
        "getChartLastRequest" => json!({
            "status": true,
            "returnData": {
                "digits": 3,
                "rateInfos": [
                    { "ctm": 1_704_700_800_000i64, "ctmString": "Jan 8, 2024, 9:00:00 AM", "open": 187_250.0, "high": 40.0, "low": -10.0, "close": 15.0, "vol": 310.0 },
                    { "ctm": 1_704_701_700_000i64, "ctmString": "Jan 8, 2024, 9:15:00 AM", "open": 187_265.0, "high": 20.0, "low": -30.0, "close": -5.0, "vol": 284.0 }
                ]
            }
        }),
        other => json!({ "status": false, "errorCode": "EX000", "errorDescr": format!("unknown command {other}") }),
    }
}

pub fn keep_alive(timestamp: i64) -> Value {
    json!({ "command": "keepAlive", "data": { "timestamp": timestamp } })
}
