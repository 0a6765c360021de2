/*
[INPUT]:  Socket-channel connection and typed command arguments
[OUTPUT]: Typed replies for every request/response command
[POS]:    Socket layer - request/response API surface
[UPDATE]: When adding commands or changing call semantics
*/

pub mod client;
pub mod commands;
pub mod error;
pub mod trade;

pub use client::XapiSocket;
pub use error::{Result, XapiError};
