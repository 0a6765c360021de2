/*
[INPUT]:  Command envelopes and a dedicated socket-channel Connection
[OUTPUT]: Exactly one Reply per Command, strictly FIFO
[POS]:    Socket layer - request/response correlation
[UPDATE]: When changing call serialization, timeouts or teardown rules
*/

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::socket::{Result, XapiError};
use crate::transport::Connection;
use crate::types::{Command, Reply};

/// Request/response client for the socket channel.
///
/// The protocol does not echo a request id, so replies are matched by arrival order.
/// At most one command is in flight per connection; concurrent callers queue on
/// `in_flight`.
#[derive(Debug)]
pub struct XapiSocket {
    connection: Arc<Connection>,
    in_flight: Mutex<()>,
    call_timeout: Option<Duration>,
    safe: bool,
}

impl XapiSocket {
    pub fn new(connection: Connection) -> Self {
        Self {
            connection: Arc::new(connection),
            in_flight: Mutex::new(()),
            call_timeout: None,
            safe: false,
        }
    }

    pub fn with_call_timeout(mut self, call_timeout: Option<Duration>) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// Read-only sessions answer `tradeTransaction` locally.
    pub fn with_safe_mode(mut self, safe: bool) -> Self {
        self.safe = safe;
        self
    }

    pub fn is_safe(&self) -> bool {
        self.safe
    }

    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    /// Send one command and wait for its reply, queueing behind any call in flight.
    pub async fn call(&self, command: &Command) -> Result<Reply> {
        let _turn = self.in_flight.lock().await;
        self.exchange(command).await
    }

    /// Like `call`, but fails with `CallInFlight` instead of queueing.
    pub async fn try_call(&self, command: &Command) -> Result<Reply> {
        let _turn = self
            .in_flight
            .try_lock()
            .map_err(|_| XapiError::CallInFlight)?;
        self.exchange(command).await
    }

    async fn exchange(&self, command: &Command) -> Result<Reply> {
        let payload = command.to_frame()?;
        let mut guard = PendingGuard::new(&self.connection);

        let round_trip = async {
            self.connection.send(payload).await?;
            guard.sent = true;
            self.connection.receive().await
        };

        let frame = match self.call_timeout {
            Some(limit) => match tokio::time::timeout(limit, round_trip).await {
                Ok(frame) => frame,
                Err(_) => {
                    warn!(command = %command.name, ?limit, "call timed out; closing connection");
                    self.connection.close_now();
                    guard.done();
                    return Err(XapiError::Timeout {
                        duration_ms: millis(limit),
                    });
                }
            },
            None => round_trip.await,
        };
        guard.done();

        let frame = frame?;
        match Reply::decode(&frame) {
            Ok(reply) => {
                debug!(command = %command.name, status = reply.status, "reply received");
                Ok(reply)
            }
            Err(err) => {
                warn!(command = %command.name, error = %err, "undecodable reply; closing connection");
                self.connection.close_now();
                Err(err)
            }
        }
    }

    pub async fn close(&self) {
        self.connection.close().await;
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Closes the connection if a call is abandoned after its command hit the wire,
/// so a late reply can never be matched to the next command.
struct PendingGuard<'a> {
    connection: &'a Connection,
    sent: bool,
    finished: bool,
}

impl<'a> PendingGuard<'a> {
    fn new(connection: &'a Connection) -> Self {
        Self {
            connection,
            sent: false,
            finished: false,
        }
    }

    fn done(&mut self) {
        self.finished = true;
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.sent && !self.finished {
            warn!(url = %self.connection.url(), "call abandoned with reply outstanding; closing connection");
            self.connection.close_now();
        }
    }
}
