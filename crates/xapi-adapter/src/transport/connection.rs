/*
[INPUT]:  An established WebSocket stream
[OUTPUT]: Connection handle with send / receive / close over text frames
[POS]:    Transport layer - dumb full-duplex I/O, no retry logic
[UPDATE]: When changing frame handling or shutdown semantics
*/

use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::{debug, warn};

use crate::socket::{Result, XapiError};

const OUTBOUND_CAPACITY: usize = 100;
const CLOSE_GRACE: Duration = Duration::from_secs(2);
const RAW_LOG_MAX_BYTES: usize = 512;

/// One full-duplex message connection to the venue.
///
/// Reading and writing are independent: one task may wait in `receive` while another
/// calls `send`. An I/O task owns the socket; this handle only talks to it over channels.
#[derive(Debug)]
pub struct Connection {
    url: String,
    outbound_tx: mpsc::Sender<WsMessage>,
    inbound_rx: Mutex<mpsc::UnboundedReceiver<String>>,
    shutdown: CancellationToken,
    terminated: CancellationToken,
}

impl Connection {
    /// Take ownership of a handshaken WebSocket and start its I/O task.
    pub fn spawn<S>(url: impl Into<String>, ws_stream: WebSocketStream<S>) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let url = url.into();
        let (mut write, mut read) = ws_stream.split();
        let (outbound_tx, mut outbound_rx) = mpsc::channel::<WsMessage>(OUTBOUND_CAPACITY);
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<String>();
        let shutdown = CancellationToken::new();
        let terminated = CancellationToken::new();

        let task_shutdown = shutdown.clone();
        let task_terminated = terminated.clone();
        let task_url = url.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = task_shutdown.cancelled() => {
                        let _ = write.send(WsMessage::Close(None)).await;
                        break;
                    }
                    outbound = outbound_rx.recv() => {
                        match outbound {
                            Some(message) => {
                                if let Err(err) = write.send(message).await {
                                    warn!(url = %task_url, error = %err, "ws write failed");
                                    break;
                                }
                            }
                            None => {
                                let _ = write.send(WsMessage::Close(None)).await;
                                break;
                            }
                        }
                    }
                    incoming = read.next() => {
                        match incoming {
                            Some(Ok(WsMessage::Text(text))) => {
                                if inbound_tx.send(text.to_string()).is_err() {
                                    break;
                                }
                            }
                            Some(Ok(WsMessage::Binary(bytes))) => {
                                match String::from_utf8(bytes.to_vec()) {
                                    Ok(text) => {
                                        if inbound_tx.send(text).is_err() {
                                            break;
                                        }
                                    }
                                    Err(_) => debug!(url = %task_url, bytes = bytes.len(), "dropping non-utf8 binary frame"),
                                }
                            }
                            Some(Ok(WsMessage::Close(frame))) => {
                                debug!(url = %task_url, ?frame, "ws closed by peer");
                                let _ = write.send(WsMessage::Close(None)).await;
                                break;
                            }
                            Some(Ok(_)) => {}
                            Some(Err(err)) => {
                                warn!(url = %task_url, error = %err, "ws read failed");
                                break;
                            }
                            None => break,
                        }
                    }
                }
            }

            drop(inbound_tx);
            task_terminated.cancel();
            debug!(url = %task_url, "ws io task finished");
        });

        Self {
            url,
            outbound_tx,
            inbound_rx: Mutex::new(inbound_rx),
            shutdown,
            terminated,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Queue one text frame for sending.
    pub async fn send(&self, payload: String) -> Result<()> {
        if self.is_closed() {
            return Err(XapiError::ConnectionClosed);
        }
        debug!(url = %self.url, frame = %truncate_for_log(&payload, RAW_LOG_MAX_BYTES), "ws send");
        self.outbound_tx
            .send(WsMessage::Text(payload.into()))
            .await
            .map_err(|_| XapiError::ConnectionClosed)
    }

    /// Wait for the next text frame. Fails with `ConnectionClosed` on EOF, reset or close.
    pub async fn receive(&self) -> Result<String> {
        let mut inbound = self.inbound_rx.lock().await;
        tokio::select! {
            frame = inbound.recv() => frame.ok_or(XapiError::ConnectionClosed),
            _ = self.shutdown.cancelled() => Err(XapiError::ConnectionClosed),
        }
    }

    /// Request shutdown without waiting. Safe to call from `Drop` and repeatedly.
    pub fn close_now(&self) {
        self.shutdown.cancel();
    }

    /// Close and wait (bounded) for the I/O task to finish. Idempotent.
    pub async fn close(&self) {
        self.shutdown.cancel();
        if tokio::time::timeout(CLOSE_GRACE, self.terminated.cancelled())
            .await
            .is_err()
        {
            debug!(url = %self.url, "ws io task did not finish within close grace");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled() || self.terminated.is_cancelled()
    }

    /// Resolves once the I/O task has stopped, for any reason.
    pub fn closed(&self) -> WaitForCancellationFuture<'_> {
        self.terminated.cancelled()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

pub(crate) fn truncate_for_log(value: &str, max_len: usize) -> String {
    if value.len() <= max_len {
        return value.to_string();
    }
    let mut cut = max_len;
    while !value.is_char_boundary(cut) {
        cut -= 1;
    }
    let mut out = String::with_capacity(cut + 3);
    out.push_str(&value[..cut]);
    out.push_str("...");
    out
}
