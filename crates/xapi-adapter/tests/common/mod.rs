/*
[INPUT]:  Scripted replies and push frames
[OUTPUT]: In-process mock venue serving both socket and stream channels
[POS]:    Test infrastructure - shared across all test modules
[UPDATE]: When adding new test patterns or fixtures
*/

//! Common test utilities for xapi-adapter tests

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::{Notify, broadcast};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_util::sync::CancellationToken;
use xapi_adapter::{ClientConfig, Credentials, Environment, ServerEndpoint, SessionConfig};

pub const ACCOUNT_ID: &str = "12345";
pub const PASSWORD: &str = "pw";

pub type Responder = dyn Fn(&str, &Value) -> Option<Value> + Send + Sync;

/// One command as seen by the venue, with the path of the connection it arrived on
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

/// Minimal venue: `/demo` answers commands through the responder, `/demoStream`
/// records commands and forwards whatever `push` is given.
pub struct MockVenue {
    addr: SocketAddr,
    seen: Arc<Mutex<Vec<Seen>>>,
    seen_notify: Arc<Notify>,
    pushes: broadcast::Sender<String>,
    kill: Arc<Mutex<CancellationToken>>,
    task: tokio::task::JoinHandle<()>,
}

impl MockVenue {
    pub async fn start<F>(responder: F) -> Self
    where
        F: Fn(&str, &Value) -> Option<Value> + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let responder: Arc<Responder> = Arc::new(responder);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_notify = Arc::new(Notify::new());
        let (pushes, _) = broadcast::channel(256);
        let kill = Arc::new(Mutex::new(CancellationToken::new()));

        let task = {
            let seen = seen.clone();
            let seen_notify = seen_notify.clone();
            let pushes = pushes.clone();
            let kill = kill.clone();
            tokio::spawn(async move {
                while let Ok((tcp, _)) = listener.accept().await {
                    let kill = kill.lock().unwrap().clone();
                    tokio::spawn(serve_connection(
                        tcp,
                        responder.clone(),
                        seen.clone(),
                        seen_notify.clone(),
                        pushes.subscribe(),
                        kill,
                    ));
                }
            })
        };

        Self {
            addr,
            seen,
            seen_notify,
            pushes,
            kill,
            task,
        }
    }

    /// Venue with `standard_replies`.
    pub async fn standard() -> Self {
        let sessions = Arc::new(AtomicUsize::new(0));
        Self::start(move |path, command| standard_replies(&sessions, path, command)).await
    }

    pub fn endpoint(&self) -> ServerEndpoint {
        ServerEndpoint {
            host: self.addr.to_string(),
            secure: false,
            environment: Environment::Demo,
        }
    }

    pub fn socket_url(&self) -> url::Url {
        self.endpoint().socket_url().unwrap()
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::new(Credentials::new(ACCOUNT_ID, PASSWORD))
            .with_endpoint(self.endpoint())
            .with_client(ClientConfig {
                connect_timeout: Duration::from_secs(2),
                call_timeout: Some(Duration::from_secs(2)),
            })
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }

    pub fn seen_named(&self, name: &str) -> Vec<Seen> {
        self.seen().into_iter().filter(|seen| seen.name() == name).collect()
    }

    /// Wait until the `n`-th (1-based) command called `name` has arrived.
    pub async fn wait_for(&self, name: &str, n: usize) -> Seen {
        let wait = async {
            loop {
                let notified = self.seen_notify.notified();
                if let Some(seen) = self.seen_named(name).into_iter().nth(n - 1) {
                    return seen;
                }
                notified.await;
            }
        };
        tokio::time::timeout(Duration::from_secs(2), wait)
            .await
            .unwrap_or_else(|_| panic!("venue never saw {name} #{n}"))
    }

    /// Send a frame to every open stream connection.
    pub fn push(&self, frame: Value) {
        let _ = self.pushes.send(frame.to_string());
    }

    /// Abruptly drop every open connection; later connections are served normally.
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
    responder: Arc<Responder>,
    seen: Arc<Mutex<Vec<Seen>>>,
    seen_notify: Arc<Notify>,
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
                seen.lock().unwrap().push(Seen { path: path.clone(), command: command.clone() });
                seen_notify.notify_waiters();

                match responder(&path, &command) {
                    Some(reply) if reply.get("__close") == Some(&json!(true)) => break,
                    Some(reply) => {
                        if write.send(Message::Text(reply.to_string().into())).await.is_err() {
                            break;
                        }
                    }
                    None => {}
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

/// Socket replies for the commands sessions need; stream commands get no reply.
///
/// Each successful login hands out a fresh `sid-N`.
pub fn standard_replies(sessions: &AtomicUsize, path: &str, command: &Value) -> Option<Value> {
    if path.ends_with("Stream") {
        return None;
    }
    let name = command["command"].as_str().unwrap_or_default();
    Some(match name {
        "login" => {
            if command["arguments"]["password"] == json!(PASSWORD) {
                let n = sessions.fetch_add(1, Ordering::SeqCst) + 1;
                json!({ "status": true, "streamSessionId": format!("sid-{n}") })
            } else {
                json!({ "status": false, "errorCode": "BE005", "errorDescr": "userPasswordCheck: Invalid login or password" })
            }
        }
        "logout" | "ping" => json!({ "status": true }),
        "getServerTime" => json!({
            "status": true,
            "returnData": { "time": 1_704_704_400_000i64, "timeString": "Jan 8, 2024, 10:00:00 AM" }
        }),
        "getVersion" => json!({ "status": true, "returnData": { "version": "2.5.0" } }),
        "echo" => json!({ "status": true, "returnData": command["arguments"].clone() }),
        "hang" => return None,
        "boom" => json!({ "__close": true }),
        other => json!({ "status": false, "errorCode": "EX000", "errorDescr": format!("unknown command {other}") }),
    })
}

pub fn candle(symbol: &str, ctm: i64) -> Value {
    json!({
        "command": "candle",
        "data": {
            "close": 12.0, "ctm": ctm, "ctmString": "", "high": 25.0, "low": -5.0,
            "open": 188500.0, "quoteId": 1, "symbol": symbol, "vol": 10.0
        }
    })
}

pub fn keep_alive(timestamp: i64) -> Value {
    json!({ "command": "keepAlive", "data": { "timestamp": timestamp } })
}
