//! JSON codec for event frames.
//!
//! An event frame on the wire is exactly:
//!
//! ```text
//! {"event":<string>,"data":<object>,"broadcast":<object>,"seq":<integer>}
//! ```
//!
//! Two encoders produce it. The generic one runs `serde_json` over an
//! [`EventJson`] view. The fast one splices already-encoded fragments around a
//! per-connection sequence number and must yield the same bytes.

use bytes::{BufMut, BytesMut};
use serde::Serialize;
use thiserror::Error;

use crate::broadcast::WebsocketBroadcast;
use crate::event::Payload;
use crate::event_type::EventType;

/// Errors that can occur while encoding or decoding envelopes.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Input was not valid JSON, or did not have the frame shape.
    #[error("Malformed frame: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload's `user` entry could not be read as a user record.
    #[error("Invalid user in payload: {0}")]
    InvalidUser(#[source] serde_json::Error),

    /// Hook ids and hook arguments differ in length.
    #[error("Hook length mismatch: {hooks} hooks, {args} argument sets")]
    HookLengthMismatch {
        /// Number of hook identifiers.
        hooks: usize,
        /// Number of argument bags.
        args: usize,
    },

    /// Writing to the destination failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

const EVENT_PREFIX: &[u8] = b"{\"event\":";
const DATA_PREFIX: &[u8] = b",\"data\":";
const BROADCAST_PREFIX: &[u8] = b",\"broadcast\":";
const SEQ_PREFIX: &[u8] = b",\"seq\":";
const FRAME_SUFFIX: &[u8] = b"}";

/// Fixed overhead of a frame around its four values.
const FRAME_OVERHEAD: usize = EVENT_PREFIX.len()
    + DATA_PREFIX.len()
    + BROADCAST_PREFIX.len()
    + SEQ_PREFIX.len()
    + FRAME_SUFFIX.len();

/// Longest decimal rendering of an `i64` (`-9223372036854775808`).
const MAX_SEQ_DIGITS: usize = 20;

/// Borrowed view of an event in its generic wire shape.
#[derive(Serialize)]
pub struct EventJson<'a> {
    pub event: &'a EventType,
    pub data: &'a Payload,
    pub broadcast: &'a WebsocketBroadcast,
    pub seq: i64,
}

/// Encode an event view with the generic encoder.
///
/// # Errors
///
/// Returns an error if a payload value cannot be serialized.
pub fn encode_generic(view: &EventJson<'_>) -> Result<Vec<u8>, ProtocolError> {
    Ok(serde_json::to_vec(view)?)
}

/// Upper bound of the frame size produced by [`write_event_frame`].
#[must_use]
pub fn precomputed_len(event: &[u8], data: &[u8], broadcast: &[u8]) -> usize {
    FRAME_OVERHEAD + event.len() + data.len() + broadcast.len() + MAX_SEQ_DIGITS
}

/// Assemble a frame from pre-encoded fragments and a sequence number.
///
/// The fragments must be the `serde_json` encodings of the event type,
/// payload and broadcast respectively.
pub fn write_event_frame(buf: &mut BytesMut, event: &[u8], data: &[u8], broadcast: &[u8], seq: i64) {
    buf.reserve(precomputed_len(event, data, broadcast));
    buf.put_slice(EVENT_PREFIX);
    buf.put_slice(event);
    buf.put_slice(DATA_PREFIX);
    buf.put_slice(data);
    buf.put_slice(BROADCAST_PREFIX);
    buf.put_slice(broadcast);
    buf.put_slice(SEQ_PREFIX);
    buf.put_slice(seq.to_string().as_bytes());
    buf.put_slice(FRAME_SUFFIX);
}
