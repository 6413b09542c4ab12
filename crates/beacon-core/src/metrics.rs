//! Hub instrumentation.
//!
//! Recorded through the `metrics` facade; installing an exporter is up to the
//! embedding application.

use metrics::{counter, gauge};
use tracing::debug;

/// Metric names.
pub mod names {
    pub const EVENTS_PUBLISHED: &str = "beacon_events_published_total";
    pub const MESSAGES_DELIVERED: &str = "beacon_messages_delivered_total";
    pub const MESSAGES_BYTES: &str = "beacon_messages_bytes_total";
    pub const MESSAGES_DROPPED: &str = "beacon_messages_dropped_total";
    pub const HOOK_ERRORS: &str = "beacon_hook_errors_total";
    pub const CONNECTIONS_ACTIVE: &str = "beacon_connections_active";
}

/// Describe the hub metrics.
pub fn describe_metrics() {
    metrics::describe_counter!(names::EVENTS_PUBLISHED, "Total number of events published");
    metrics::describe_counter!(
        names::MESSAGES_DELIVERED,
        "Total number of messages queued to connections"
    );
    metrics::describe_counter!(names::MESSAGES_BYTES, "Total bytes queued to connections");
    metrics::describe_counter!(
        names::MESSAGES_DROPPED,
        "Total number of messages dropped before delivery"
    );
    metrics::describe_counter!(names::HOOK_ERRORS, "Total number of failed broadcast hooks");
    metrics::describe_gauge!(
        names::CONNECTIONS_ACTIVE,
        "Current number of registered connections"
    );

    debug!("Hub metrics described");
}

/// Record a published event.
pub fn record_published(origin: &'static str) {
    counter!(names::EVENTS_PUBLISHED, "origin" => origin).increment(1);
}

/// Record a message queued to a connection.
pub fn record_delivered(bytes: usize) {
    counter!(names::MESSAGES_DELIVERED).increment(1);
    counter!(names::MESSAGES_BYTES).increment(bytes as u64);
}

/// Record a dropped message.
pub fn record_dropped(reason: &'static str) {
    counter!(names::MESSAGES_DROPPED, "reason" => reason).increment(1);
}

/// Record a failed broadcast hook.
pub fn record_hook_error() {
    counter!(names::HOOK_ERRORS).increment(1);
}

/// Update the registered connection count.
pub fn set_active_connections(count: usize) {
    gauge!(names::CONNECTIONS_ACTIVE).set(count as f64);
}
