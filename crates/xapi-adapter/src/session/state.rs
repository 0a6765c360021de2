/*
[INPUT]:  Session lifecycle events
[OUTPUT]: Observable session state and the live session record
[POS]:    Session layer - state machine values
[UPDATE]: When adding lifecycle states
*/

use std::fmt;

use chrono::{DateTime, Utc};

use crate::session::config::ServerEndpoint;

/// Lifecycle of one session.
///
/// `Disconnected -> Connecting -> Authenticating -> Ready -> Disconnecting -> Disconnected`.
/// `Failed` is absorbing for the attempt that reached it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Authenticating,
    Ready,
    Disconnecting,
    Failed,
}

impl SessionState {
    pub fn is_ready(self) -> bool {
        matches!(self, SessionState::Ready)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Disconnected | SessionState::Failed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Disconnected => "DISCONNECTED",
            SessionState::Connecting => "CONNECTING",
            SessionState::Authenticating => "AUTHENTICATING",
            SessionState::Ready => "READY",
            SessionState::Disconnecting => "DISCONNECTING",
            SessionState::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// An authenticated session.
///
/// Fields are fixed at login; a reconnect negotiates a new `Session`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    stream_session_id: String,
    connected_at: DateTime<Utc>,
    account_id: String,
    endpoint: ServerEndpoint,
}

impl Session {
    pub fn new(
        stream_session_id: impl Into<String>,
        account_id: impl Into<String>,
        endpoint: ServerEndpoint,
    ) -> Self {
        Self {
            stream_session_id: stream_session_id.into(),
            connected_at: Utc::now(),
            account_id: account_id.into(),
            endpoint,
        }
    }

    pub fn stream_session_id(&self) -> &str {
        &self.stream_session_id
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn endpoint(&self) -> &ServerEndpoint {
        &self.endpoint
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_helpers() {
        assert!(SessionState::Ready.is_ready());
        assert!(SessionState::Failed.is_terminal());
        assert!(!SessionState::Authenticating.is_terminal());
        assert_eq!(SessionState::Disconnecting.to_string(), "DISCONNECTING");
    }
}
