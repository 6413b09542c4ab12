//! Responses to client requests.
//!
//! When a client sends a request over the event channel it gets back a
//! [`WebSocketResponse`] that names the request's sequence number in
//! `seq_reply`. Responses share the channel with events and report the fixed
//! `response` event type so receivers can tell them apart.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::codec::ProtocolError;
use crate::event_type::{event_types, EventType};

/// Status of a successful request.
pub const STATUS_OK: &str = "OK";

/// Status of a failed request.
pub const STATUS_FAIL: &str = "FAIL";

static RESPONSE_EVENT: EventType = event_types::RESPONSE;

fn is_zero(value: &i64) -> bool {
    *value == 0
}

fn is_zero_status(value: &u16) -> bool {
    *value == 0
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// A structured application error returned to clients.
#[derive(Debug, Clone, Default, PartialEq, Error, Serialize, Deserialize)]
#[error("{location}: {message}, {detailed_error}")]
pub struct AppError {
    /// Stable error identifier, e.g. `api.websocket_handler.invalid_action`.
    pub id: String,
    /// Human-readable message.
    pub message: String,
    /// Internal details.
    #[serde(default)]
    pub detailed_error: String,
    /// Id of the request that failed. Omitted when empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub request_id: String,
    /// HTTP-equivalent status code.
    #[serde(default, skip_serializing_if = "is_zero_status")]
    pub status_code: u16,
    /// Whether the error came from an OAuth flow. Omitted when false.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_oauth: bool,
    /// Where the error was raised. Not sent to clients.
    #[serde(skip)]
    pub location: String,
    /// Parameters for message translation. Not sent to clients.
    #[serde(skip)]
    pub params: Map<String, Value>,
}

impl AppError {
    /// Create a new error.
    #[must_use]
    pub fn new(
        location: impl Into<String>,
        id: impl Into<String>,
        detailed_error: impl Into<String>,
        status_code: u16,
    ) -> Self {
        let id = id.into();
        Self {
            message: id.clone(),
            id,
            detailed_error: detailed_error.into(),
            status_code,
            location: location.into(),
            ..Self::default()
        }
    }

    /// Set the human-readable message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Set the originating request id.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }
}

/// A reply to a client request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebSocketResponse {
    /// Result code, e.g. `OK` or `FAIL`.
    pub status: String,
    /// Sequence number of the request being answered.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub seq_reply: i64,
    /// Result data.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub data: Map<String, Value>,
    /// Set when the request failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<AppError>,
}

impl WebSocketResponse {
    /// Create a response carrying data.
    #[must_use]
    pub fn new(status: impl Into<String>, seq_reply: i64, data: Map<String, Value>) -> Self {
        Self {
            status: status.into(),
            seq_reply,
            data,
            error: None,
        }
    }

    /// Create a failure response.
    #[must_use]
    pub fn error(seq_reply: i64, error: AppError) -> Self {
        Self {
            status: STATUS_FAIL.to_string(),
            seq_reply,
            data: Map::new(),
            error: Some(error),
        }
    }

    /// Add a data entry.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(key.into(), value.into());
    }

    /// A response is valid when it has a status.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.status.is_empty()
    }

    /// Check whether the request failed.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.status == STATUS_FAIL
    }

    /// Always [`event_types::RESPONSE`].
    #[must_use]
    pub fn event_type(&self) -> &EventType {
        &RESPONSE_EVENT
    }

    /// Encode the response.
    ///
    /// # Errors
    ///
    /// Returns an error if a data value cannot be serialized.
    pub fn to_json(&self) -> Result<Bytes, ProtocolError> {
        Ok(Bytes::from(serde_json::to_vec(self)?))
    }

    /// Decode a response.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a valid response.
    pub fn from_json(data: &[u8]) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_slice(data)?)
    }
}
