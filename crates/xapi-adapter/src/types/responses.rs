/*
[INPUT]:  Raw reply frames from the socket channel
[OUTPUT]: Typed Reply envelopes with business errors kept as data
[POS]:    Data layer - inbound wire types for request/response traffic
[UPDATE]: When the reply envelope changes or new reply payloads are added
*/

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::socket::{Result, XapiError};

/// Error code carried by the synthetic reply for locally blocked trades.
pub const TRADING_DISABLED_CODE: &str = "TRADING_DISABLED";

/// Reply to exactly one socket command.
///
/// `status == false` is a business failure and is returned as data; only transport
/// and decoding problems surface as `XapiError`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct Reply<T = Value> {
    pub status: bool,
    #[serde(default = "none", skip_serializing_if = "Option::is_none")]
    pub return_data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_descr: Option<String>,
    /// Only present on a successful login
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_tag: Option<String>,
}

fn none<T>() -> Option<T> {
    None
}

impl Reply<Value> {
    /// Decode one reply frame.
    pub fn decode(frame: &str) -> Result<Self> {
        serde_json::from_str(frame)
            .map_err(|err| XapiError::Protocol(format!("malformed reply frame: {err}")))
    }

    /// Decode `returnData` into an explicit record type.
    ///
    /// A failed reply keeps its error fields and carries no data.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<Reply<T>> {
        let return_data = match (self.status, self.return_data) {
            (true, Some(Value::Null)) | (true, None) | (false, _) => None,
            (true, Some(data)) => Some(serde_json::from_value(data).map_err(|err| {
                XapiError::Protocol(format!("unexpected returnData shape: {err}"))
            })?),
        };

        Ok(Reply {
            status: self.status,
            return_data,
            error_code: self.error_code,
            error_descr: self.error_descr,
            stream_session_id: self.stream_session_id,
            custom_tag: self.custom_tag,
        })
    }
}

impl<T> Reply<T> {
    pub fn failure(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            status: false,
            return_data: None,
            error_code: Some(code.into()),
            error_descr: Some(description.into()),
            stream_session_id: None,
            custom_tag: None,
        }
    }

    /// Synthetic reply for a trade blocked by the read-only flag.
    pub fn trading_disabled() -> Self {
        Self::failure(
            TRADING_DISABLED_CODE,
            "Trading is disabled for read-only sessions",
        )
    }

    pub fn is_ok(&self) -> bool {
        self.status
    }

    /// Successful payload, if any.
    pub fn data(&self) -> Option<&T> {
        if self.status {
            self.return_data.as_ref()
        } else {
            None
        }
    }

    /// Collapse into a std result for callers that treat a failure as terminal.
    pub fn into_result(self) -> std::result::Result<Option<T>, ReplyError> {
        if self.status {
            Ok(self.return_data)
        } else {
            Err(ReplyError {
                code: self.error_code,
                description: self.error_descr,
            })
        }
    }
}

/// Error fields of an unsuccessful reply.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("reply failed (code {code:?}): {description:?}")]
pub struct ReplyError {
    pub code: Option<String>,
    pub description: Option<String>,
}
