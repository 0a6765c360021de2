/*
[INPUT]:  Session configuration and reconnect policy
[OUTPUT]: Authenticated session handles with guaranteed cleanup
[POS]:    Session layer - lifecycle of a logged-in pair of connections
[UPDATE]: When changing lifecycle, configuration or reconnect behavior
*/

pub mod config;
pub mod manager;
pub mod retry;
pub mod state;

pub use config::{ClientConfig, Credentials, DEFAULT_HOST, ServerEndpoint, SessionConfig};
pub use manager::{SessionHandle, SessionManager};
pub use retry::ReconnectPolicy;
pub use state::{Session, SessionState};
