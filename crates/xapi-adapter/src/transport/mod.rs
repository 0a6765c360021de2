/*
[INPUT]:  Endpoint URL and connect timeout
[OUTPUT]: Connected full-duplex Connection handles
[POS]:    Transport layer - owns raw WebSocket connections to the venue
[UPDATE]: When changing connect options or TLS handling
*/

pub mod connection;

pub use connection::Connection;

use std::time::Duration;

use tokio_tungstenite::connect_async;
use tracing::{debug, info};
use url::Url;

use crate::socket::{Result, XapiError};

/// Open one connection. No retry here; reconnects belong to the caller.
pub async fn connect(url: &Url, connect_timeout: Duration) -> Result<Connection> {
    debug!(url = %url, ?connect_timeout, "ws connecting");

    let attempt = tokio::time::timeout(connect_timeout, connect_async(url.as_str())).await;
    let (ws_stream, _response) = match attempt {
        Ok(Ok(pair)) => pair,
        Ok(Err(err)) => {
            return Err(XapiError::ConnectFailed {
                url: url.to_string(),
                reason: err.to_string(),
            });
        }
        Err(_) => {
            return Err(XapiError::ConnectFailed {
                url: url.to_string(),
                reason: format!("timed out after {}ms", connect_timeout.as_millis()),
            });
        }
    };

    info!(url = %url, "ws connected");
    Ok(Connection::spawn(url.as_str(), ws_stream))
}
