//! Fan-out dispatcher.
//!
//! The hub owns the registered connections and their send queues. Publishing
//! an event hands it to the cluster sink, if any, then delivers it to every
//! local connection the broadcast targets, running broadcast hooks and
//! stamping the connection's sequence number on the way.

use crate::config::HubConfig;
use crate::hook::{BroadcastHookHandler, HookRegistry};
use crate::metrics;
use crate::target::{skip_reason, Recipient};
use beacon_protocol::{ProtocolError, WebSocketEvent};
use bytes::Bytes;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, trace, warn};

/// Hub errors.
#[derive(Debug, Error)]
pub enum HubError {
    /// The event has no event type.
    #[error("Invalid event: missing event type")]
    InvalidEvent,

    /// A connection with this id is already registered.
    #[error("Connection already registered: {0}")]
    DuplicateConnection(String),

    /// No connection with this id is registered.
    #[error("Connection not found: {0}")]
    ConnectionNotFound(String),

    /// The event could not be encoded.
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Receives every locally published event for delivery to other nodes.
pub trait ClusterSink: Send + Sync {
    /// Forward an encoded event. `reliable` mirrors the broadcast's
    /// `reliable_cluster_send` flag.
    fn send(&self, payload: Bytes, reliable: bool);
}

/// Outcome of delivering one event to the local connections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Messages queued.
    pub delivered: usize,
    /// Connections the broadcast does not target.
    pub skipped: usize,
    /// Messages dropped because a queue was full or closed.
    pub dropped: usize,
    /// Connections skipped because a hook or the encoding failed.
    pub failed: usize,
    /// Connections removed during delivery.
    pub disconnected: usize,
}

/// Hub statistics.
#[derive(Debug, Clone, Default)]
pub struct HubStats {
    /// Registered connections.
    pub connection_count: usize,
    /// Registered hook handlers.
    pub hook_count: usize,
    /// Events accepted by `publish` or `publish_local`.
    pub events_published: u64,
    /// Messages queued to connections.
    pub messages_delivered: u64,
    /// Messages dropped before delivery.
    pub messages_dropped: u64,
    /// Per-connection hook or encoding failures.
    pub delivery_failures: u64,
}

/// A registered connection.
///
/// Cloning is cheap; delivery works on clones so no map lock is held while
/// hooks run or frames are queued.
#[derive(Clone)]
struct ConnectionEntry {
    recipient: Arc<Recipient>,
    sender: mpsc::Sender<Bytes>,
    /// Sequence number for the next message. Held while a frame is stamped
    /// and queued so queue order matches sequence order.
    sequence: Arc<Mutex<i64>>,
}

/// The fan-out hub.
pub struct Hub {
    /// Connections indexed by connection id.
    connections: DashMap<String, ConnectionEntry>,
    hooks: HookRegistry,
    cluster: Option<Arc<dyn ClusterSink>>,
    config: HubConfig,
    events_published: AtomicU64,
    messages_delivered: AtomicU64,
    messages_dropped: AtomicU64,
    delivery_failures: AtomicU64,
}

impl Hub {
    /// Create a new hub.
    #[must_use]
    pub fn new(config: HubConfig) -> Self {
        info!("Creating hub with config: {:?}", config);
        metrics::describe_metrics();
        Self {
            connections: DashMap::new(),
            hooks: HookRegistry::new(),
            cluster: None,
            config,
            events_published: AtomicU64::new(0),
            messages_delivered: AtomicU64::new(0),
            messages_dropped: AtomicU64::new(0),
            delivery_failures: AtomicU64::new(0),
        }
    }

    /// Attach a cluster sink.
    #[must_use]
    pub fn with_cluster(mut self, sink: Arc<dyn ClusterSink>) -> Self {
        self.set_cluster(sink);
        self
    }

    /// Attach or replace the cluster sink.
    pub fn set_cluster(&mut self, sink: Arc<dyn ClusterSink>) {
        self.cluster = Some(sink);
    }

    /// Register a broadcast hook handler.
    pub fn register_hook(&self, hook_id: impl Into<String>, handler: Arc<dyn BroadcastHookHandler>) {
        let hook_id = hook_id.into();
        debug!(hook = %hook_id, "Registered broadcast hook");
        self.hooks.register(hook_id, handler);
    }

    /// Get the hub configuration.
    #[must_use]
    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Number of registered connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Get hub statistics.
    #[must_use]
    pub fn stats(&self) -> HubStats {
        HubStats {
            connection_count: self.connections.len(),
            hook_count: self.hooks.len(),
            events_published: self.events_published.load(Ordering::Relaxed),
            messages_delivered: self.messages_delivered.load(Ordering::Relaxed),
            messages_dropped: self.messages_dropped.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
        }
    }

    /// Register a connection.
    ///
    /// Returns the receiving end of the connection's send queue.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection id is already registered.
    pub fn register(&self, recipient: Recipient) -> Result<mpsc::Receiver<Bytes>, HubError> {
        let connection_id = recipient.connection_id.clone();
        match self.connections.entry(connection_id.clone()) {
            Entry::Occupied(_) => Err(HubError::DuplicateConnection(connection_id)),
            Entry::Vacant(slot) => {
                let (sender, receiver) = mpsc::channel(self.config.send_queue_size.max(1));
                debug!(
                    connection = %connection_id,
                    user = %recipient.user_id,
                    "Registered connection"
                );
                slot.insert(ConnectionEntry {
                    recipient: Arc::new(recipient),
                    sender,
                    sequence: Arc::new(Mutex::new(0)),
                });
                metrics::set_active_connections(self.connections.len());
                Ok(receiver)
            }
        }
    }

    /// Remove a connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is not registered.
    pub fn unregister(&self, connection_id: &str) -> Result<(), HubError> {
        self.connections
            .remove(connection_id)
            .ok_or_else(|| HubError::ConnectionNotFound(connection_id.to_string()))?;

        debug!(connection = %connection_id, "Unregistered connection");
        metrics::set_active_connections(self.connections.len());
        Ok(())
    }

    /// Add a channel to a connection's memberships.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is not registered.
    pub fn join_channel(&self, connection_id: &str, channel_id: &str) -> Result<(), HubError> {
        self.with_recipient(connection_id, |r| {
            r.channels.insert(channel_id.to_string());
        })?;
        trace!(connection = %connection_id, channel = %channel_id, "Joined channel");
        Ok(())
    }

    /// Remove a channel from a connection's memberships.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is not registered.
    pub fn leave_channel(&self, connection_id: &str, channel_id: &str) -> Result<(), HubError> {
        self.with_recipient(connection_id, |r| {
            r.channels.remove(channel_id);
        })?;
        trace!(connection = %connection_id, channel = %channel_id, "Left channel");
        Ok(())
    }

    /// Add a team to a connection's memberships.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is not registered.
    pub fn join_team(&self, connection_id: &str, team_id: &str) -> Result<(), HubError> {
        self.with_recipient(connection_id, |r| {
            r.teams.insert(team_id.to_string());
        })
    }

    /// Remove a team from a connection's memberships.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is not registered.
    pub fn leave_team(&self, connection_id: &str, team_id: &str) -> Result<(), HubError> {
        self.with_recipient(connection_id, |r| {
            r.teams.remove(team_id);
        })
    }

    fn with_recipient(
        &self,
        connection_id: &str,
        f: impl FnOnce(&mut Recipient),
    ) -> Result<(), HubError> {
        let mut entry = self
            .connections
            .get_mut(connection_id)
            .ok_or_else(|| HubError::ConnectionNotFound(connection_id.to_string()))?;
        f(Arc::make_mut(&mut entry.recipient));
        Ok(())
    }

    /// Publish an event produced on this node.
    ///
    /// The event goes to the cluster sink with its hooks intact, then to the
    /// local connections.
    ///
    /// # Errors
    ///
    /// Returns an error if the event is invalid or cannot be encoded.
    pub fn publish(&self, event: &WebSocketEvent) -> Result<DeliveryReport, HubError> {
        self.accept(event, "local")?;

        if let Some(cluster) = &self.cluster {
            let payload = event.serialize()?;
            let reliable = event.broadcast().reliable_cluster_send;
            trace!(
                event = %event.event_type(),
                bytes = payload.len(),
                reliable,
                "Forwarding event to cluster"
            );
            cluster.send(payload, reliable);
        }

        self.broadcast_local(event)
    }

    /// Deliver an event received from another node. It is not forwarded to
    /// the cluster again.
    ///
    /// # Errors
    ///
    /// Returns an error if the event is invalid or cannot be encoded.
    pub fn publish_local(&self, event: &WebSocketEvent) -> Result<DeliveryReport, HubError> {
        self.accept(event, "cluster")?;
        self.broadcast_local(event)
    }

    fn accept(&self, event: &WebSocketEvent, origin: &'static str) -> Result<(), HubError> {
        if !event.is_valid() {
            warn!(origin, "Rejected event without event type");
            return Err(HubError::InvalidEvent);
        }
        self.events_published.fetch_add(1, Ordering::Relaxed);
        metrics::record_published(origin);
        Ok(())
    }

    /// Deliver an event to every targeted local connection.
    ///
    /// Hooks are stripped once and run per connection. Targeted connections
    /// are collected first, so hooks run without any hub lock held and may
    /// read or update the hub. A failed hook or a full queue affects only
    /// that connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the event cannot be encoded.
    pub fn broadcast_local(&self, event: &WebSocketEvent) -> Result<DeliveryReport, HubError> {
        let (base, hooks) = event.without_hooks();
        let base = if self.config.precompute {
            base.precompute()?
        } else {
            base
        };

        let mut report = DeliveryReport::default();
        let mut targets = Vec::new();
        for entry in self.connections.iter() {
            match skip_reason(base.broadcast(), &entry.recipient) {
                Some(reason) => {
                    trace!(connection = %entry.key(), %reason, "Skipped connection");
                    report.skipped += 1;
                }
                None => targets.push((entry.key().clone(), entry.value().clone())),
            }
        }

        let mut closed = Vec::new();
        for (connection_id, conn) in targets {
            let message = if hooks.is_empty() {
                base.clone()
            } else {
                match self.hooks.run(base.clone(), &hooks, &conn.recipient) {
                    Ok(processed) => processed,
                    Err(e) => {
                        warn!(connection = %connection_id, error = %e, "Broadcast hook failed");
                        metrics::record_hook_error();
                        report.failed += 1;
                        continue;
                    }
                }
            };

            let mut sequence = conn
                .sequence
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let frame = match message.with_sequence(*sequence).serialize() {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(connection = %connection_id, error = %e, "Failed to encode event");
                    report.failed += 1;
                    continue;
                }
            };
            let len = frame.len();

            match conn.sender.try_send(frame) {
                Ok(()) => {
                    *sequence += 1;
                    report.delivered += 1;
                    metrics::record_delivered(len);
                }
                Err(TrySendError::Full(_)) => {
                    report.dropped += 1;
                    metrics::record_dropped("queue_full");
                    if self.config.drop_on_full_queue {
                        warn!(connection = %connection_id, "Send queue full, dropping message");
                    } else {
                        warn!(connection = %connection_id, "Send queue full, disconnecting");
                        closed.push((connection_id, conn.sender.clone()));
                    }
                }
                Err(TrySendError::Closed(_)) => {
                    report.dropped += 1;
                    metrics::record_dropped("closed");
                    closed.push((connection_id, conn.sender.clone()));
                }
            }
        }

        for (connection_id, sender) in closed {
            // Leave a connection that re-registered under the same id alone.
            let removed = self
                .connections
                .remove_if(&connection_id, |_, entry| entry.sender.same_channel(&sender));
            if removed.is_some() {
                debug!(connection = %connection_id, "Removed connection");
                report.disconnected += 1;
            }
        }
        if report.disconnected > 0 {
            metrics::set_active_connections(self.connections.len());
        }

        self.messages_delivered
            .fetch_add(report.delivered as u64, Ordering::Relaxed);
        self.messages_dropped
            .fetch_add(report.dropped as u64, Ordering::Relaxed);
        self.delivery_failures
            .fetch_add(report.failed as u64, Ordering::Relaxed);

        debug!(
            event = %event.event_type(),
            delivered = report.delivered,
            skipped = report.skipped,
            dropped = report.dropped,
            failed = report.failed,
            "Broadcast event"
        );

        Ok(report)
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new(HubConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::HookError;
    use beacon_protocol::{event_types, HookArgs, WebsocketBroadcast};
    use serde_json::{json, Value};
    use std::sync::Mutex;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    }

    fn config(send_queue_size: usize) -> HubConfig {
        HubConfig {
            send_queue_size,
            precompute: true,
            drop_on_full_queue: true,
        }
    }

    fn recv(rx: &mut mpsc::Receiver<Bytes>) -> WebSocketEvent {
        let frame = rx.try_recv().expect("expected a queued message");
        WebSocketEvent::deserialize(&frame).unwrap()
    }

    fn typing(channel_id: &str) -> WebSocketEvent {
        let mut event = WebSocketEvent::new(event_types::TYPING, "", channel_id, "", None, "");
        event.add("user_id", "u1");
        event
    }

    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<(Bytes, bool)>>,
    }

    impl ClusterSink for RecordingSink {
        fn send(&self, payload: Bytes, reliable: bool) {
            self.sent.lock().unwrap().push((payload, reliable));
        }
    }

    fn mention_flag(
        mut event: WebSocketEvent,
        recipient: &Recipient,
        args: &HookArgs,
    ) -> Result<WebSocketEvent, HookError> {
        let mentioned = args
            .get("mentions")
            .and_then(Value::as_array)
            .map_or(false, |m| {
                m.iter().any(|id| id.as_str() == Some(recipient.user_id.as_str()))
            });
        if mentioned {
            event.add("mentioned", true);
        }
        Ok(event)
    }

    #[tokio::test]
    async fn test_register_and_unregister() {
        let hub = Hub::new(config(4));
        let _rx = hub.register(Recipient::new("c1", "alice")).unwrap();
        assert_eq!(hub.connection_count(), 1);

        assert!(matches!(
            hub.register(Recipient::new("c1", "alice")),
            Err(HubError::DuplicateConnection(_))
        ));

        hub.unregister("c1").unwrap();
        assert_eq!(hub.connection_count(), 0);
        assert!(matches!(
            hub.unregister("c1"),
            Err(HubError::ConnectionNotFound(_))
        ));
        assert!(hub.join_channel("c1", "chan1").is_err());
    }

    #[tokio::test]
    async fn test_sequences_are_per_connection() {
        init_tracing();
        let hub = Hub::new(config(8));
        let mut a = hub.register(Recipient::new("c1", "alice")).unwrap();

        hub.publish(&typing("")).unwrap();
        let mut b = hub.register(Recipient::new("c2", "bob")).unwrap();
        hub.publish(&typing("")).unwrap();
        hub.publish(&typing("")).unwrap();

        let a_seqs: Vec<i64> = (0..3).map(|_| recv(&mut a).sequence()).collect();
        let b_seqs: Vec<i64> = (0..2).map(|_| recv(&mut b).sequence()).collect();
        assert_eq!(a_seqs, vec![0, 1, 2]);
        assert_eq!(b_seqs, vec![0, 1]);
    }

    #[tokio::test]
    async fn test_channel_targeting() {
        let hub = Hub::new(config(4));
        let mut member = hub.register(Recipient::new("c1", "alice")).unwrap();
        let mut outsider = hub.register(Recipient::new("c2", "bob")).unwrap();
        hub.join_channel("c1", "chan1").unwrap();

        let report = hub.publish(&typing("chan1")).unwrap();
        assert_eq!(report.delivered, 1);
        assert_eq!(report.skipped, 1);

        assert_eq!(recv(&mut member).event_type(), &event_types::TYPING);
        assert!(outsider.try_recv().is_err());

        hub.leave_channel("c1", "chan1").unwrap();
        let report = hub.publish(&typing("chan1")).unwrap();
        assert_eq!(report.delivered, 0);
    }

    #[tokio::test]
    async fn test_team_targeting() {
        let hub = Hub::new(config(4));
        let _rx = hub.register(Recipient::new("c1", "alice")).unwrap();
        let event = WebSocketEvent::new(event_types::UPDATE_TEAM, "team1", "", "", None, "");

        assert_eq!(hub.publish(&event).unwrap().delivered, 0);
        hub.join_team("c1", "team1").unwrap();
        assert_eq!(hub.publish(&event).unwrap().delivered, 1);
        hub.leave_team("c1", "team1").unwrap();
        assert_eq!(hub.publish(&event).unwrap().delivered, 0);
    }

    #[tokio::test]
    async fn test_hooks_are_per_connection_and_never_leak() {
        init_tracing();
        let hub = Hub::new(config(4));
        hub.register_hook("add_mention_flags", Arc::new(mention_flag));
        let mut alice = hub.register(Recipient::new("c1", "alice")).unwrap();
        let mut bob = hub.register(Recipient::new("c2", "bob")).unwrap();

        let mut event = WebSocketEvent::new(event_types::POSTED, "", "", "", None, "");
        event.add("post", json!({"id": "p1", "message": "hi @alice"}));
        event.add_hook(
            "add_mention_flags",
            json!({"mentions": ["alice"]}).as_object().cloned().unwrap(),
        );

        let report = hub.publish(&event).unwrap();
        assert_eq!(report.delivered, 2);

        let alice_frame = alice.try_recv().unwrap();
        let bob_frame = bob.try_recv().unwrap();
        for frame in [&alice_frame, &bob_frame] {
            let text = std::str::from_utf8(frame).unwrap();
            assert!(!text.contains("broadcast_hooks"));
            assert!(!text.contains("broadcast_hook_args"));
        }

        let alice_event = WebSocketEvent::deserialize(&alice_frame).unwrap();
        let bob_event = WebSocketEvent::deserialize(&bob_frame).unwrap();
        assert_eq!(
            alice_event.get("mentioned").and_then(|v| v.as_json()),
            Some(&json!(true))
        );
        assert!(bob_event.get("mentioned").is_none());
    }

    #[tokio::test]
    async fn test_failed_hook_skips_only_that_connection() {
        let hub = Hub::new(config(4));
        hub.register_hook(
            "bob_only",
            Arc::new(|event: WebSocketEvent, recipient: &Recipient, _: &HookArgs| {
                if recipient.user_id == "bob" {
                    Ok(event)
                } else {
                    Err(HookError::Failed {
                        hook: "bob_only".to_string(),
                        message: "not bob".to_string(),
                    })
                }
            }),
        );
        let mut alice = hub.register(Recipient::new("c1", "alice")).unwrap();
        let mut bob = hub.register(Recipient::new("c2", "bob")).unwrap();

        let mut event = typing("");
        event.add_hook("bob_only", HookArgs::new());
        let report = hub.publish(&event).unwrap();
        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed, 1);
        assert!(alice.try_recv().is_err());
        assert_eq!(recv(&mut bob).sequence(), 0);

        // Alice's sequence was not consumed by the failed delivery.
        hub.publish(&typing("")).unwrap();
        assert_eq!(recv(&mut alice).sequence(), 0);
        assert_eq!(hub.stats().delivery_failures, 1);
    }

    #[tokio::test]
    async fn test_unknown_hook_fails_delivery() {
        let hub = Hub::new(config(4));
        let mut rx = hub.register(Recipient::new("c1", "alice")).unwrap();

        let mut event = typing("");
        event.add_hook("missing", HookArgs::new());
        let report = hub.publish(&event).unwrap();
        assert_eq!(report.failed, 1);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_cluster_receives_full_event() {
        let sink = Arc::new(RecordingSink::default());
        let hub = Hub::new(config(4)).with_cluster(sink.clone());

        let mut event = WebSocketEvent::with_target(
            event_types::POSTED,
            WebsocketBroadcast::new().for_channel("chan1").reliable(),
        );
        event.add_hook("add_mention_flags", HookArgs::new());
        hub.publish(&event).unwrap();

        let sent = sink.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let (payload, reliable) = &sent[0];
        assert!(*reliable);
        let forwarded = WebSocketEvent::deserialize(payload).unwrap();
        assert_eq!(forwarded.broadcast().hooks.len(), 1);
    }

    #[tokio::test]
    async fn test_publish_local_does_not_echo_to_cluster() {
        let sink = Arc::new(RecordingSink::default());
        let hub = Hub::new(config(4)).with_cluster(sink.clone());
        let mut rx = hub.register(Recipient::new("c1", "alice")).unwrap();

        let report = hub.publish_local(&typing("")).unwrap();
        assert_eq!(report.delivered, 1);
        assert!(rx.try_recv().is_ok());
        assert!(sink.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_full_queue_drops_message() {
        let hub = Hub::new(config(1));
        let mut rx = hub.register(Recipient::new("c1", "alice")).unwrap();

        assert_eq!(hub.publish(&typing("")).unwrap().delivered, 1);
        let report = hub.publish(&typing("")).unwrap();
        assert_eq!(report.dropped, 1);
        assert_eq!(hub.connection_count(), 1);

        assert_eq!(recv(&mut rx).sequence(), 0);
        hub.publish(&typing("")).unwrap();
        assert_eq!(recv(&mut rx).sequence(), 1);
        assert_eq!(hub.stats().messages_dropped, 1);
    }

    #[tokio::test]
    async fn test_full_queue_disconnects_when_configured() {
        let hub = Hub::new(HubConfig {
            drop_on_full_queue: false,
            ..config(1)
        });
        let _rx = hub.register(Recipient::new("c1", "alice")).unwrap();

        hub.publish(&typing("")).unwrap();
        let report = hub.publish(&typing("")).unwrap();
        assert_eq!(report.dropped, 1);
        assert_eq!(report.disconnected, 1);
        assert_eq!(hub.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_closed_receiver_is_removed() {
        let hub = Hub::new(config(4));
        let rx = hub.register(Recipient::new("c1", "alice")).unwrap();
        drop(rx);

        let report = hub.publish(&typing("")).unwrap();
        assert_eq!(report.disconnected, 1);
        assert_eq!(hub.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_event_rejected() {
        let sink = Arc::new(RecordingSink::default());
        let hub = Hub::new(config(4)).with_cluster(sink.clone());
        let event = WebSocketEvent::new("", "", "", "", None, "");

        assert!(matches!(hub.publish(&event), Err(HubError::InvalidEvent)));
        assert!(matches!(hub.publish_local(&event), Err(HubError::InvalidEvent)));
        assert!(sink.sent.lock().unwrap().is_empty());
        assert_eq!(hub.stats().events_published, 0);
    }

    #[tokio::test]
    async fn test_precompute_setting_does_not_change_bytes() {
        let precomputed = Hub::new(config(4));
        let generic = Hub::new(HubConfig {
            precompute: false,
            ..config(4)
        });
        let mut a = precomputed.register(Recipient::new("c1", "alice")).unwrap();
        let mut b = generic.register(Recipient::new("c1", "alice")).unwrap();

        let mut event = typing("");
        event.add("nested", json!({"list": [1, 2, 3], "flag": false}));
        precomputed.publish(&event).unwrap();
        generic.publish(&event).unwrap();

        assert_eq!(a.try_recv().unwrap(), b.try_recv().unwrap());
    }

    #[test]
    fn test_hook_can_use_the_hub() {
        let hub = Arc::new(Hub::new(config(4)));
        let inner = Arc::clone(&hub);
        hub.register_hook(
            "count_connections",
            Arc::new(
                move |mut event: WebSocketEvent,
                      recipient: &Recipient,
                      _: &HookArgs|
                      -> Result<WebSocketEvent, HookError> {
                    event.add("connections", inner.connection_count() as i64);
                    inner
                        .join_channel(&recipient.connection_id, "seen")
                        .map_err(|e| HookError::Failed {
                            hook: "count_connections".to_string(),
                            message: e.to_string(),
                        })?;
                    Ok(event)
                },
            ),
        );
        let mut a = hub.register(Recipient::new("c1", "alice")).unwrap();
        let _b = hub.register(Recipient::new("c2", "bob")).unwrap();

        let (done_tx, done_rx) = std::sync::mpsc::channel();
        let publisher = Arc::clone(&hub);
        std::thread::spawn(move || {
            let mut event = typing("");
            event.add_hook("count_connections", HookArgs::new());
            let _ = done_tx.send(publisher.publish(&event).map(|r| r.delivered).ok());
        });

        let delivered = done_rx
            .recv_timeout(std::time::Duration::from_secs(5))
            .expect("publish did not finish");
        assert_eq!(delivered, Some(2));
        assert_eq!(
            recv(&mut a).get("connections").and_then(|v| v.as_json()),
            Some(&json!(2))
        );

        let seen = WebSocketEvent::new(event_types::TYPING, "", "seen", "", None, "");
        assert_eq!(hub.publish(&seen).unwrap().delivered, 2);
    }

    #[test]
    fn test_concurrent_publishers_never_reuse_sequences() {
        let hub = Arc::new(Hub::new(config(1024)));
        let mut rx = hub.register(Recipient::new("c1", "alice")).unwrap();

        let publishers: Vec<_> = (0..4)
            .map(|_| {
                let hub = Arc::clone(&hub);
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        hub.publish(&typing("")).unwrap();
                    }
                })
            })
            .collect();
        for publisher in publishers {
            publisher.join().unwrap();
        }

        let seqs: Vec<i64> = (0..200).map(|_| recv(&mut rx).sequence()).collect();
        assert_eq!(seqs, (0..200).collect::<Vec<i64>>());
        assert!(rx.try_recv().is_err());
    }
}
