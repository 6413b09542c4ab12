//! # beacon-protocol
//!
//! Wire envelopes for the Beacon realtime push layer.
//!
//! An event is represented once, matched against many connections and
//! serialized many times. This crate defines that representation and its
//! JSON wire form:
//!
//! - **Event envelope** - [`WebSocketEvent`], with copy-on-write mutation and
//!   a frozen serialization snapshot reused across recipients
//! - **Broadcast target** - [`WebsocketBroadcast`], who should receive it
//! - **Hook ledger** - [`HookLedger`], per-connection transformations stripped
//!   before transmission
//! - **Response / request** - client-acknowledged calls
//!
//! ## Example
//!
//! ```rust
//! use beacon_protocol::{event_types, WebSocketEvent};
//!
//! let mut event = WebSocketEvent::new(event_types::POSTED, "team1", "chan1", "", None, "");
//! event.add("post", serde_json::json!({"id": "p1"}));
//!
//! // Freeze once, then stamp a sequence per connection.
//! let frozen = event.precompute().unwrap();
//! let bytes = frozen.with_sequence(7).serialize().unwrap();
//! assert!(bytes.ends_with(b"\"seq\":7}"));
//! ```

pub mod broadcast;
pub mod codec;
pub mod event;
pub mod event_type;
pub mod hooks;
pub mod message;
pub mod request;
pub mod response;
pub mod user;

pub use broadcast::WebsocketBroadcast;
pub use codec::ProtocolError;
pub use event::{Payload, PayloadValue, WebSocketEvent};
pub use event_type::{event_types, EventType};
pub use hooks::{BroadcastHook, HookArgs, HookLedger};
pub use message::{decode_message, Message, WebSocketMessage};
pub use request::WebSocketRequest;
pub use response::{AppError, WebSocketResponse, STATUS_FAIL, STATUS_OK};
pub use user::User;
