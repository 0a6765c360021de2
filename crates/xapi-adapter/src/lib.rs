/*
[INPUT]:  Crate modules and public type definitions
[OUTPUT]: Public xAPI adapter crate surface
[POS]:    Crate root - module wiring
[UPDATE]: When public modules or exports change
*/

pub mod market_hours;
pub mod session;
pub mod socket;
pub mod stream;
pub mod transport;
pub mod types;

// Re-export commonly used types from market_hours
pub use market_hours::{
    HourWindow,
    MarketHoursConfig,
    MarketHoursEvaluator,
    MarketWindowDecision,
    MarketWindowReason,
    RolloverRule,
    TradingHoursTable,
    is_open,
};

// Re-export commonly used types from session
pub use session::{
    ClientConfig,
    Credentials,
    DEFAULT_HOST,
    ReconnectPolicy,
    ServerEndpoint,
    Session,
    SessionConfig,
    SessionHandle,
    SessionManager,
    SessionState,
};

// Re-export commonly used types from socket
pub use socket::{
    Result,
    XapiError,
    XapiSocket,
};

// Re-export commonly used types from stream
pub use stream::{
    PushMessage,
    StreamEvent,
    Subscription,
    SubscriptionKey,
    Topic,
    XapiStream,
};

pub use transport::Connection;

// Re-export all types
pub use types::*;
