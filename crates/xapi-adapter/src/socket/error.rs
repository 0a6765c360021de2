/*
[INPUT]:  Error sources (transport, login, decoding, local policy)
[OUTPUT]: Structured error types with retry hints
[POS]:    Error handling layer - unified error types for entire crate
[UPDATE]: When adding new error sources or improving error messages
*/

use thiserror::Error;

/// Main error type for the xAPI adapter
#[derive(Error, Debug)]
pub enum XapiError {
    /// Transport could not be established
    #[error("Connect to {url} failed: {reason}")]
    ConnectFailed { url: String, reason: String },

    /// Transport dropped mid-session
    #[error("Connection closed")]
    ConnectionClosed,

    /// Login was rejected by the venue
    #[error("Login failed (code {code:?}): {description:?}")]
    LoginFailed {
        code: Option<String>,
        description: Option<String>,
    },

    /// Malformed or unexpected frame
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Call exceeded its deadline; the connection was closed
    #[error("Call timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Another call is in flight on the same connection
    #[error("Another call is already in flight on this connection")]
    CallInFlight,

    /// Session is not in the READY state
    #[error("Session is not connected")]
    NotConnected,

    /// Shutdown requested while waiting
    #[error("Operation cancelled")]
    Cancelled,

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for XapiError {
    fn from(err: serde_json::Error) -> Self {
        XapiError::Protocol(err.to_string())
    }
}

impl XapiError {
    /// Check if the caller may retry with a fresh connection
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            XapiError::ConnectFailed { .. } | XapiError::ConnectionClosed | XapiError::Timeout { .. }
        )
    }

    /// Check if error indicates authentication failure
    pub fn is_auth_error(&self) -> bool {
        matches!(self, XapiError::LoginFailed { .. })
    }

    pub fn is_protocol_error(&self) -> bool {
        matches!(self, XapiError::Protocol(_))
    }
}

/// Result type alias for xAPI operations
pub type Result<T> = std::result::Result<T, XapiError>;
