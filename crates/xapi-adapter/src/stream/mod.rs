/*
[INPUT]:  Stream-channel connection, session id and topic selections
[OUTPUT]: Per-topic push feeds
[POS]:    Stream layer - subscription-based push traffic
[UPDATE]: When adding topics or changing dispatch rules
*/

pub mod client;
pub mod message;
pub mod topic;

pub use client::XapiStream;
pub use message::{PushMessage, StreamEvent, StreamFrame};
pub use topic::{Subscription, SubscriptionKey, Topic};
