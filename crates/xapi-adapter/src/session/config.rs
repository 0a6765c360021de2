/*
[INPUT]:  Account credentials, venue host and environment, timeouts
[OUTPUT]: Session configuration and endpoint URLs
[POS]:    Session layer - explicit configuration passed in at construction
[UPDATE]: When adding connection options or changing URL layout
*/

use std::fmt;
use std::time::Duration;

use url::Url;

use crate::socket::Result;
use crate::types::Environment;

pub const DEFAULT_HOST: &str = "ws.xtb.com";

/// Login credentials
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub account_id: String,
    pub password: String,
}

impl Credentials {
    pub fn new(account_id: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("account_id", &self.account_id)
            .field("password", &"***")
            .finish()
    }
}

/// Venue address; both channels live on the same host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEndpoint {
    pub host: String,
    pub secure: bool,
    pub environment: Environment,
}

impl Default for ServerEndpoint {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            secure: true,
            environment: Environment::Demo,
        }
    }
}

impl ServerEndpoint {
    fn scheme(&self) -> &'static str {
        if self.secure { "wss" } else { "ws" }
    }

    /// `{scheme}://{host}/{env}`
    pub fn socket_url(&self) -> Result<Url> {
        Ok(Url::parse(&format!(
            "{}://{}/{}",
            self.scheme(),
            self.host,
            self.environment.as_path()
        ))?)
    }

    /// `{scheme}://{host}/{env}Stream`
    pub fn stream_url(&self) -> Result<Url> {
        Ok(Url::parse(&format!(
            "{}://{}/{}Stream",
            self.scheme(),
            self.host,
            self.environment.as_path()
        ))?)
    }
}

/// Timeouts applied by the session's clients
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub connect_timeout: Duration,
    /// `None` waits for a reply indefinitely
    pub call_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            call_timeout: Some(Duration::from_secs(30)),
        }
    }
}

/// Everything needed to open a session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub credentials: Credentials,
    pub endpoint: ServerEndpoint,
    /// Read-only: trade transactions are answered locally
    pub safe: bool,
    pub client: ClientConfig,
}

impl SessionConfig {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            endpoint: ServerEndpoint::default(),
            safe: false,
            client: ClientConfig::default(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: ServerEndpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    pub fn with_safe_mode(mut self, safe: bool) -> Self {
        self.safe = safe;
        self
    }

    pub fn with_client(mut self, client: ClientConfig) -> Self {
        self.client = client;
        self
    }
}
