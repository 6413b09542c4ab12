//! Messages flowing from server to client.
//!
//! Events and responses share one channel. A receiver tells them apart by
//! event type: a frame with a non-empty `event` is an event, anything else is
//! read as a response.

use bytes::Bytes;

use crate::codec::ProtocolError;
use crate::event::WebSocketEvent;
use crate::event_type::EventType;
use crate::response::WebSocketResponse;

/// Behaviour common to everything sent to a client.
pub trait WebSocketMessage {
    /// Encode the message.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be serialized.
    fn to_json(&self) -> Result<Bytes, ProtocolError>;

    /// Check whether the message is well formed.
    fn is_valid(&self) -> bool;

    /// The event type used to dispatch the message.
    fn event_type(&self) -> &EventType;
}

impl WebSocketMessage for WebSocketEvent {
    fn to_json(&self) -> Result<Bytes, ProtocolError> {
        self.serialize()
    }

    fn is_valid(&self) -> bool {
        WebSocketEvent::is_valid(self)
    }

    fn event_type(&self) -> &EventType {
        WebSocketEvent::event_type(self)
    }
}

impl WebSocketMessage for WebSocketResponse {
    fn to_json(&self) -> Result<Bytes, ProtocolError> {
        WebSocketResponse::to_json(self)
    }

    fn is_valid(&self) -> bool {
        WebSocketResponse::is_valid(self)
    }

    fn event_type(&self) -> &EventType {
        WebSocketResponse::event_type(self)
    }
}

/// A decoded server-to-client message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// A pushed event.
    Event(WebSocketEvent),
    /// A reply to an earlier request.
    Response(WebSocketResponse),
}

impl Message {
    /// Get the message as a trait object.
    #[must_use]
    pub fn as_message(&self) -> &dyn WebSocketMessage {
        match self {
            Message::Event(event) => event,
            Message::Response(response) => response,
        }
    }
}

/// Decode a frame received from the server.
///
/// # Errors
///
/// Returns an error if the frame is neither a valid event nor a valid
/// response.
pub fn decode_message(data: &[u8]) -> Result<Message, ProtocolError> {
    if let Ok(event) = WebSocketEvent::deserialize(data) {
        if event.is_valid() {
            return Ok(Message::Event(event));
        }
    }
    WebSocketResponse::from_json(data).map(Message::Response)
}
