/*
[INPUT]:  SessionConfig (credentials, endpoint, timeouts, read-only flag)
[OUTPUT]: Authenticated SessionHandle owning one socket and one stream connection
[POS]:    Session layer - login/logout, state machine, scoped acquisition
[UPDATE]: When changing lifecycle transitions or cleanup guarantees
*/

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures_util::FutureExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::session::config::SessionConfig;
use crate::session::retry::ReconnectPolicy;
use crate::session::state::{Session, SessionState};
use crate::socket::{Result, XapiError, XapiSocket};
use crate::stream::XapiStream;
use crate::transport;

const LOGOUT_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens sessions and publishes their lifecycle state.
///
/// Reconnect policy is the caller's: `connect` makes exactly one attempt and
/// `connect_with_retry` is provided for driver loops.
#[derive(Debug)]
pub struct SessionManager {
    config: SessionConfig,
    board: Arc<StateBoard>,
}

impl SessionManager {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            board: Arc::new(StateBoard::new()),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// State of the most recent connect attempt and the session it produced.
    pub fn state(&self) -> SessionState {
        self.board.current()
    }

    /// Watch state changes.
    ///
    /// Do not hold the `watch::Ref` from `borrow` or `wait_for` across an await:
    /// state updates block until it is released.
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.board.state.subscribe()
    }

    /// Connect both channels and log in. One attempt, no retry.
    ///
    /// A rejected login yields `LoginFailed`; transport trouble before the
    /// session is ready yields the transport error. Both leave the state `Failed`.
    pub async fn connect(&self) -> Result<SessionHandle> {
        let generation = self.board.next_generation();
        self.board.set_for(generation, SessionState::Connecting);
        match self.establish(generation).await {
            Ok(handle) => {
                info!(
                    account_id = %handle.session.account_id(),
                    host = %self.config.endpoint.host,
                    "session ready"
                );
                Ok(handle)
            }
            Err(err) => {
                self.board.set_for(generation, SessionState::Failed);
                Err(err)
            }
        }
    }

    async fn establish(&self, generation: u64) -> Result<SessionHandle> {
        let endpoint = &self.config.endpoint;
        let connect_timeout = self.config.client.connect_timeout;

        let socket_url = endpoint.socket_url()?;
        let stream_url = endpoint.stream_url()?;

        let socket = transport::connect(&socket_url, connect_timeout)
            .await
            .inspect_err(|err| warn!(url = %socket_url, error = %err, "socket connect failed"))?;
        let socket = XapiSocket::new(socket)
            .with_call_timeout(self.config.client.call_timeout)
            .with_safe_mode(self.config.safe);

        self.board.set_for(generation, SessionState::Authenticating);
        let stream_session_id = match self.login(&socket).await {
            Ok(id) => id,
            Err(err) => {
                socket.close().await;
                return Err(err);
            }
        };

        let stream = match transport::connect(&stream_url, connect_timeout).await {
            Ok(connection) => XapiStream::new(connection, stream_session_id.clone()),
            Err(err) => {
                warn!(url = %stream_url, error = %err, "stream connect failed");
                let _ = tokio::time::timeout(LOGOUT_TIMEOUT, socket.logout()).await;
                socket.close().await;
                return Err(err);
            }
        };

        let session = Session::new(
            stream_session_id,
            self.config.credentials.account_id.clone(),
            endpoint.clone(),
        );
        let state = HandleState::new(self.board.clone(), generation);
        Ok(SessionHandle::new(session, socket, stream, state))
    }

    async fn login(&self, socket: &XapiSocket) -> Result<String> {
        let reply = socket.login(&self.config.credentials).await?;
        if !reply.status {
            warn!(
                account_id = %self.config.credentials.account_id,
                code = ?reply.error_code,
                description = ?reply.error_descr,
                "login rejected"
            );
            return Err(XapiError::LoginFailed {
                code: reply.error_code,
                description: reply.error_descr,
            });
        }
        reply
            .stream_session_id
            .ok_or_else(|| XapiError::Protocol("login reply without streamSessionId".to_string()))
    }

    /// `connect` with exponential backoff on retryable errors.
    ///
    /// Non-retryable errors (a rejected login among them) return at once.
    /// Cancelling `shutdown` aborts the wait with `Cancelled`.
    pub async fn connect_with_retry(
        &self,
        policy: &ReconnectPolicy,
        shutdown: &CancellationToken,
    ) -> Result<SessionHandle> {
        let mut retry_count: u32 = 0;
        loop {
            let attempt = tokio::select! {
                _ = shutdown.cancelled() => {
                    self.board.set(SessionState::Disconnected);
                    return Err(XapiError::Cancelled);
                }
                attempt = self.connect() => attempt,
            };

            let err = match attempt {
                Ok(handle) => {
                    if retry_count > 0 {
                        info!(retry_count, "session reconnected");
                    }
                    return Ok(handle);
                }
                Err(err) if err.is_retryable() => err,
                Err(err) => return Err(err),
            };

            retry_count = retry_count.saturating_add(1);
            if !policy.allows_retry(retry_count) {
                warn!(retry_count, max_retries = ?policy.max_retries, error = %err, "session connect gave up");
                return Err(err);
            }

            let backoff = policy.backoff_duration(retry_count);
            warn!(retry_count, ?backoff, error = %err, "session connect failed; retrying with backoff");

            tokio::select! {
                _ = shutdown.cancelled() => {
                    self.board.set(SessionState::Disconnected);
                    return Err(XapiError::Cancelled);
                }
                _ = tokio::time::sleep(backoff) => {}
            }
        }
    }

    /// Run `f` against a fresh session, then log out and close.
    ///
    /// Cleanup runs on every exit path: success, error, or a panic inside `f`
    /// (re-raised after cleanup). If the returned future is dropped mid-scope the
    /// connections are still closed, without the logout.
    pub async fn scoped<F, Fut, T, E>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(Arc<SessionHandle>) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: From<XapiError>,
    {
        let handle = self.connect().await?;
        Self::scope(handle, f).await
    }

    /// `scoped` for a session that is already open, e.g. from `connect_with_retry`.
    pub async fn scope<F, Fut, T, E>(handle: SessionHandle, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(Arc<SessionHandle>) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        let handle = Arc::new(handle);
        let scope = handle.clone();
        let outcome = AssertUnwindSafe(async move { f(scope).await })
            .catch_unwind()
            .await;
        handle.close().await;

        match outcome {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

/// Manager-wide state channel. Only the newest connect attempt publishes to it,
/// so an older handle closing never overwrites a newer session's state.
#[derive(Debug)]
struct StateBoard {
    state: watch::Sender<SessionState>,
    generation: AtomicU64,
}

impl StateBoard {
    fn new() -> Self {
        let (state, _) = watch::channel(SessionState::Disconnected);
        Self {
            state,
            generation: AtomicU64::new(0),
        }
    }

    fn current(&self) -> SessionState {
        *self.state.borrow()
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel).wrapping_add(1)
    }

    fn set(&self, next: SessionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(from = %previous, to = %next, "session state");
        }
    }

    /// Publish `next` only while `generation` is the newest attempt.
    fn set_for(&self, generation: u64, next: SessionState) {
        let mut previous = None;
        self.state.send_if_modified(|current| {
            if self.generation.load(Ordering::Acquire) != generation || *current == next {
                return false;
            }
            previous = Some(std::mem::replace(current, next));
            true
        });
        if let Some(previous) = previous {
            debug!(generation, from = %previous, to = %next, "session state");
        }
    }
}

/// State of one session, mirrored to the manager while it is the newest.
#[derive(Debug)]
struct HandleState {
    local: watch::Sender<SessionState>,
    board: Arc<StateBoard>,
    generation: u64,
}

impl HandleState {
    fn new(board: Arc<StateBoard>, generation: u64) -> Self {
        let (local, _) = watch::channel(SessionState::Authenticating);
        Self {
            local,
            board,
            generation,
        }
    }

    fn get(&self) -> SessionState {
        *self.local.borrow()
    }

    fn set(&self, next: SessionState) {
        self.local.send_replace(next);
        self.board.set_for(self.generation, next);
    }

    /// `Ready` to `Disconnected`; false if the session had already left `Ready`.
    fn lose(&self) -> bool {
        let lost = self.local.send_if_modified(|current| {
            if *current == SessionState::Ready {
                *current = SessionState::Disconnected;
                true
            } else {
                false
            }
        });
        if lost {
            self.board.set_for(self.generation, SessionState::Disconnected);
        }
        lost
    }
}

/// A ready session: socket correlator, stream multiplexer, and their watchdog.
#[derive(Debug)]
pub struct SessionHandle {
    session: Session,
    socket: XapiSocket,
    stream: Arc<XapiStream>,
    state: Arc<HandleState>,
    closing: AtomicBool,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
    monitor: JoinHandle<()>,
}

impl SessionHandle {
    fn new(
        session: Session,
        socket: XapiSocket,
        stream: XapiStream,
        state: HandleState,
    ) -> Self {
        let stream = Arc::new(stream);
        let state = Arc::new(state);
        state.set(SessionState::Ready);
        let monitor = spawn_monitor(&socket, &stream, state.clone());
        Self {
            session,
            socket,
            stream,
            state,
            closing: AtomicBool::new(false),
            dispatcher: Mutex::new(None),
            monitor,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn socket(&self) -> &XapiSocket {
        &self.socket
    }

    pub fn stream(&self) -> &Arc<XapiStream> {
        &self.stream
    }

    /// State of this session, independent of later connects on the same manager.
    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    /// `NotConnected` unless the session is still `Ready`.
    pub fn ensure_ready(&self) -> Result<()> {
        if self.closing.load(Ordering::Acquire) || !self.state().is_ready() {
            return Err(XapiError::NotConnected);
        }
        Ok(())
    }

    /// Start the stream read loop feeding `XapiStream::consume` queues. Idempotent.
    pub fn start_dispatch(&self) {
        let mut slot = self.dispatcher.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return;
        }
        let stream = self.stream.clone();
        *slot = Some(tokio::spawn(async move {
            if let Err(err) = stream.run().await {
                debug!(error = %err, "stream dispatch finished");
            }
        }));
    }

    /// Log out (best effort) and close both connections. Idempotent.
    ///
    /// Logout is skipped while another call is in flight; closing the socket then
    /// resolves that call with `ConnectionClosed`.
    pub async fn close(&self) {
        if self.closing.swap(true, Ordering::AcqRel) {
            return;
        }
        self.state.set(SessionState::Disconnecting);

        if !self.socket.connection().is_closed() {
            match tokio::time::timeout(LOGOUT_TIMEOUT, self.socket.try_logout()).await {
                Ok(Ok(reply)) if reply.status => debug!("logged out"),
                Ok(Ok(reply)) => warn!(code = ?reply.error_code, "logout rejected"),
                Ok(Err(XapiError::CallInFlight)) => debug!("call in flight; logout skipped"),
                Ok(Err(err)) => warn!(error = %err, "logout failed"),
                Err(_) => warn!(timeout = ?LOGOUT_TIMEOUT, "logout timed out"),
            }
        }

        self.stream.close().await;
        self.socket.close().await;
        self.abort_tasks();
        self.state.set(SessionState::Disconnected);
        info!(account_id = %self.session.account_id(), "session closed");
    }

    fn abort_tasks(&self) {
        self.monitor.abort();
        let slot = self.dispatcher.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(dispatcher) = slot {
            dispatcher.abort();
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        if self.closing.swap(true, Ordering::AcqRel) {
            return;
        }
        self.socket.connection().close_now();
        self.stream.connection().close_now();
        self.abort_tasks();
        self.state.set(SessionState::Disconnected);
    }
}

/// Moves a ready session to `Disconnected` when either connection drops on its own.
fn spawn_monitor(
    socket: &XapiSocket,
    stream: &Arc<XapiStream>,
    state: Arc<HandleState>,
) -> JoinHandle<()> {
    let socket_conn = socket.connection().clone();
    let stream_conn = stream.connection().clone();

    tokio::spawn(async move {
        let channel = tokio::select! {
            _ = socket_conn.closed() => "socket",
            _ = stream_conn.closed() => "stream",
        };

        if state.lose() {
            warn!(channel, "connection closed unexpectedly; session disconnected");
            socket_conn.close_now();
            stream_conn.close_now();
        }
    })
}
