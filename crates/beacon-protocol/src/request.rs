//! Client requests sent over the event channel.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::codec::ProtocolError;
use crate::response::{AppError, WebSocketResponse, STATUS_OK};

/// A client-initiated call, answered by a [`WebSocketResponse`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebSocketRequest {
    /// Client-assigned sequence number, echoed as `seq_reply`.
    #[serde(default)]
    pub seq: i64,
    /// The action to perform, e.g. `user_typing`.
    #[serde(default)]
    pub action: String,
    /// Action arguments.
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl WebSocketRequest {
    /// Create a new request.
    #[must_use]
    pub fn new(seq: i64, action: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            seq,
            action: action.into(),
            data,
        }
    }

    /// A request is valid when it names an action.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.action.is_empty()
    }

    /// Build the success reply to this request.
    #[must_use]
    pub fn reply_ok(&self, data: Map<String, Value>) -> WebSocketResponse {
        WebSocketResponse::new(STATUS_OK, self.seq, data)
    }

    /// Build the failure reply to this request.
    #[must_use]
    pub fn reply_error(&self, error: AppError) -> WebSocketResponse {
        WebSocketResponse::error(self.seq, error)
    }

    /// Decode a request.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a valid request.
    pub fn from_json(data: &[u8]) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_slice(data)?)
    }
}
