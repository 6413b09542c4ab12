//! The event envelope.
//!
//! A [`WebSocketEvent`] is built once per state change and then handed to the
//! dispatcher, which may deliver it to thousands of connections from several
//! threads at once. Payload and broadcast live behind `Arc`s: the `with_*`
//! methods return cheap copies that share them, and in-place mutation goes
//! through `Arc::make_mut`, so a shared substructure is never written to.
//!
//! [`precompute`](WebSocketEvent::precompute) freezes the encoded event type,
//! payload and broadcast; afterwards every [`serialize`](WebSocketEvent::serialize)
//! only splices in the connection's sequence number.

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::sync::Arc;

use crate::broadcast::WebsocketBroadcast;
use crate::codec::{self, EventJson, ProtocolError};
use crate::event_type::EventType;
use crate::hooks::{HookArgs, HookLedger};
use crate::user::User;

/// Payload key that is decoded into a [`User`] record.
pub const USER_KEY: &str = "user";

/// A single payload value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PayloadValue {
    /// A structured user record.
    User(Box<User>),
    /// Any other JSON value.
    Json(Value),
}

impl PayloadValue {
    /// Get the value as generic JSON, if it is not a user record.
    #[must_use]
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            PayloadValue::Json(value) => Some(value),
            PayloadValue::User(_) => None,
        }
    }

    /// Get the value as a user record.
    #[must_use]
    pub fn as_user(&self) -> Option<&User> {
        match self {
            PayloadValue::User(user) => Some(user),
            PayloadValue::Json(_) => None,
        }
    }
}

impl<'de> Deserialize<'de> for PayloadValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(PayloadValue::Json)
    }
}

impl From<Value> for PayloadValue {
    fn from(value: Value) -> Self {
        PayloadValue::Json(value)
    }
}

impl From<User> for PayloadValue {
    fn from(user: User) -> Self {
        PayloadValue::User(Box::new(user))
    }
}

impl From<&str> for PayloadValue {
    fn from(value: &str) -> Self {
        PayloadValue::Json(Value::String(value.to_string()))
    }
}

impl From<String> for PayloadValue {
    fn from(value: String) -> Self {
        PayloadValue::Json(Value::String(value))
    }
}

impl From<bool> for PayloadValue {
    fn from(value: bool) -> Self {
        PayloadValue::Json(Value::Bool(value))
    }
}

impl From<i64> for PayloadValue {
    fn from(value: i64) -> Self {
        PayloadValue::Json(Value::from(value))
    }
}

/// Event payload. Ordered so repeated encodings are byte-identical.
pub type Payload = BTreeMap<String, PayloadValue>;

/// Frozen encodings of everything but the sequence number.
#[derive(Debug, Clone, PartialEq)]
struct PrecomputedJson {
    event: Bytes,
    data: Bytes,
    broadcast: Bytes,
}

impl PrecomputedJson {
    fn encode(
        event: &EventType,
        data: &Payload,
        broadcast: &WebsocketBroadcast,
    ) -> Result<Self, ProtocolError> {
        Ok(Self {
            event: Bytes::from(serde_json::to_vec(event)?),
            data: Bytes::from(serde_json::to_vec(data)?),
            broadcast: Bytes::from(serde_json::to_vec(broadcast)?),
        })
    }

    fn with_broadcast(&self, broadcast: &WebsocketBroadcast) -> Result<Self, ProtocolError> {
        Ok(Self {
            event: self.event.clone(),
            data: self.data.clone(),
            broadcast: Bytes::from(serde_json::to_vec(broadcast)?),
        })
    }

    fn write(&self, buf: &mut BytesMut, seq: i64) {
        codec::write_event_frame(buf, &self.event, &self.data, &self.broadcast, seq);
    }
}

/// A realtime event pushed to client connections.
#[derive(Debug, Clone)]
pub struct WebSocketEvent {
    event: EventType,
    data: Arc<Payload>,
    broadcast: Arc<WebsocketBroadcast>,
    sequence: i64,
    precomputed: Option<Arc<PrecomputedJson>>,
}

impl WebSocketEvent {
    /// Create an event with an empty payload and a broadcast built from the
    /// given targeting arguments. Empty strings leave a dimension unrestricted.
    #[must_use]
    pub fn new(
        event: impl Into<EventType>,
        team_id: impl Into<String>,
        channel_id: impl Into<String>,
        user_id: impl Into<String>,
        omit_users: Option<BTreeSet<String>>,
        omit_connection_id: impl Into<String>,
    ) -> Self {
        let broadcast = WebsocketBroadcast {
            omit_users: omit_users.unwrap_or_default(),
            user_id: user_id.into(),
            channel_id: channel_id.into(),
            team_id: team_id.into(),
            omit_connection_id: omit_connection_id.into(),
            ..WebsocketBroadcast::default()
        };
        Self::with_target(event, broadcast)
    }

    /// Create an event with an empty payload and the given broadcast.
    #[must_use]
    pub fn with_target(event: impl Into<EventType>, broadcast: WebsocketBroadcast) -> Self {
        Self {
            event: event.into(),
            data: Arc::new(Payload::new()),
            broadcast: Arc::new(broadcast),
            sequence: 0,
            precomputed: None,
        }
    }

    /// Get the event type.
    #[must_use]
    pub fn event_type(&self) -> &EventType {
        &self.event
    }

    /// Get the payload.
    #[must_use]
    pub fn data(&self) -> &Payload {
        &self.data
    }

    /// Get a payload entry.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&PayloadValue> {
        self.data.get(key)
    }

    /// Get the user record stored under the `user` key, if any.
    #[must_use]
    pub fn user(&self) -> Option<&User> {
        self.data.get(USER_KEY).and_then(PayloadValue::as_user)
    }

    /// Get the broadcast target.
    #[must_use]
    pub fn broadcast(&self) -> &WebsocketBroadcast {
        &self.broadcast
    }

    /// Get the sequence number.
    #[must_use]
    pub fn sequence(&self) -> i64 {
        self.sequence
    }

    /// An event is valid when it has an event type.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.event.is_empty()
    }

    /// Check whether a frozen encoding is attached.
    #[must_use]
    pub fn is_precomputed(&self) -> bool {
        self.precomputed.is_some()
    }

    /// Check whether two events share the same payload allocation.
    #[must_use]
    pub fn shares_payload_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    /// Insert a payload entry.
    ///
    /// A payload shared with other copies is cloned first. Any frozen
    /// encoding is discarded since it no longer matches.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<PayloadValue>) {
        Arc::make_mut(&mut self.data).insert(key.into(), value.into());
        self.precomputed = None;
    }

    /// Mutable access to the broadcast, cloning it first if shared.
    /// Any frozen encoding is discarded.
    pub fn broadcast_mut(&mut self) -> &mut WebsocketBroadcast {
        self.precomputed = None;
        Arc::make_mut(&mut self.broadcast)
    }

    /// Attach a hook to the broadcast.
    pub fn add_hook(&mut self, hook_id: impl Into<String>, args: HookArgs) {
        self.broadcast_mut().add_hook(hook_id, args);
    }

    /// Copy with a different event type. Shares payload and broadcast.
    #[must_use]
    pub fn with_event_type(&self, event: impl Into<EventType>) -> Self {
        Self {
            event: event.into(),
            precomputed: None,
            ..self.clone()
        }
    }

    /// Copy with a different payload. Shares the broadcast.
    #[must_use]
    pub fn with_data(&self, data: Payload) -> Self {
        Self {
            data: Arc::new(data),
            precomputed: None,
            ..self.clone()
        }
    }

    /// Copy with a different broadcast. Shares the payload.
    #[must_use]
    pub fn with_broadcast(&self, broadcast: WebsocketBroadcast) -> Self {
        Self {
            broadcast: Arc::new(broadcast),
            precomputed: None,
            ..self.clone()
        }
    }

    /// Copy with a different sequence number. Keeps the frozen encoding.
    #[must_use]
    pub fn with_sequence(&self, sequence: i64) -> Self {
        Self {
            sequence,
            ..self.clone()
        }
    }

    /// Fully independent copy: payload and broadcast are cloned. The frozen
    /// encoding, being immutable, is still shared.
    #[must_use]
    pub fn deep_copy(&self) -> Self {
        Self {
            event: self.event.clone(),
            data: Arc::new(Payload::clone(&self.data)),
            broadcast: Arc::new(WebsocketBroadcast::clone(&self.broadcast)),
            sequence: self.sequence,
            precomputed: self.precomputed.clone(),
        }
    }

    /// Deep copy with the event type, payload and broadcast encoded once.
    ///
    /// # Errors
    ///
    /// Returns an error if a payload value cannot be serialized.
    pub fn precompute(&self) -> Result<Self, ProtocolError> {
        let mut copy = self.deep_copy();
        let frozen = PrecomputedJson::encode(&copy.event, &copy.data, &copy.broadcast)?;
        copy.precomputed = Some(Arc::new(frozen));
        Ok(copy)
    }

    /// Deep copy without a frozen encoding.
    #[must_use]
    pub fn without_precomputed(&self) -> Self {
        Self {
            precomputed: None,
            ..self.deep_copy()
        }
    }

    /// Split off the broadcast hooks.
    ///
    /// Without hooks, returns a copy sharing everything with `self` and an
    /// empty ledger. Otherwise returns a copy whose broadcast has no hooks,
    /// along with the extracted hooks. If `self` is precomputed, only the
    /// broadcast fragment of the copy's snapshot is re-encoded; the event
    /// and payload fragments are shared. `self` is never modified.
    ///
    /// Must be called before an event is serialized for a client.
    #[must_use]
    pub fn without_hooks(&self) -> (Self, HookLedger) {
        if !self.broadcast.has_hooks() {
            return (self.clone(), HookLedger::new());
        }

        let (broadcast, hooks) = self.broadcast.without_hooks();
        let precomputed = self
            .precomputed
            .as_ref()
            .and_then(|frozen| frozen.with_broadcast(&broadcast).ok())
            .map(Arc::new);

        let stripped = Self {
            broadcast: Arc::new(broadcast),
            precomputed,
            ..self.clone()
        };
        (stripped, hooks)
    }

    fn view(&self) -> EventJson<'_> {
        EventJson {
            event: &self.event,
            data: &self.data,
            broadcast: &self.broadcast,
            seq: self.sequence,
        }
    }

    /// Encode the event as a wire frame.
    ///
    /// # Errors
    ///
    /// Returns an error if a payload value cannot be serialized.
    pub fn serialize(&self) -> Result<Bytes, ProtocolError> {
        let mut buf = BytesMut::new();
        self.serialize_into(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Append the wire frame to a buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if a payload value cannot be serialized.
    pub fn serialize_into(&self, buf: &mut BytesMut) -> Result<(), ProtocolError> {
        match &self.precomputed {
            Some(frozen) => frozen.write(buf, self.sequence),
            None => serde_json::to_writer(buf.writer(), &self.view())?,
        }
        Ok(())
    }

    /// Write the wire frame to a destination.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn serialize_to<W: io::Write>(&self, mut writer: W) -> Result<(), ProtocolError> {
        match &self.precomputed {
            Some(frozen) => {
                let mut buf = BytesMut::new();
                frozen.write(&mut buf, self.sequence);
                writer.write_all(&buf)?;
            }
            None => serde_json::to_writer(writer, &self.view())?,
        }
        Ok(())
    }

    /// Decode a wire frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a valid frame or its `user`
    /// entry is not a valid user record.
    pub fn deserialize(data: &[u8]) -> Result<Self, ProtocolError> {
        let record: EventRecord = serde_json::from_slice(data)?;
        record.into_event()
    }

    /// Decode a wire frame from a reader.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails, the input is not a valid frame or
    /// its `user` entry is not a valid user record.
    pub fn deserialize_from<R: io::Read>(reader: R) -> Result<Self, ProtocolError> {
        let record: EventRecord = serde_json::from_reader(reader)?;
        record.into_event()
    }
}

/// Events compare by content; a frozen encoding does not affect equality.
impl PartialEq for WebSocketEvent {
    fn eq(&self, other: &Self) -> bool {
        self.event == other.event
            && self.sequence == other.sequence
            && self.data == other.data
            && self.broadcast == other.broadcast
    }
}

#[derive(Deserialize)]
struct EventRecord {
    #[serde(default)]
    event: EventType,
    #[serde(default)]
    data: Option<Map<String, Value>>,
    #[serde(default)]
    broadcast: Option<WebsocketBroadcast>,
    #[serde(default)]
    seq: i64,
}

impl EventRecord {
    fn into_event(self) -> Result<WebSocketEvent, ProtocolError> {
        let mut data = Payload::new();
        for (key, value) in self.data.unwrap_or_default() {
            let value = if key == USER_KEY && !value.is_null() {
                let user: User = serde_json::from_value(value).map_err(ProtocolError::InvalidUser)?;
                PayloadValue::from(user)
            } else {
                PayloadValue::Json(value)
            };
            data.insert(key, value);
        }

        Ok(WebSocketEvent {
            event: self.event,
            data: Arc::new(data),
            broadcast: Arc::new(self.broadcast.unwrap_or_default()),
            sequence: self.seq,
            precomputed: None,
        })
    }
}
