//! # beacon-core
//!
//! Delivery side of the Beacon realtime push layer.
//!
//! This crate sits at the boundary between event envelopes and the
//! connections that receive them:
//!
//! - **Target** - Decide whether a broadcast reaches a given recipient
//! - **Hook** - Registry of per-connection broadcast hook handlers
//! - **Hub** - Fan an event out to registered connections with per-connection
//!   sequence numbers, and hand it to the cluster channel
//! - **Config** / **Metrics** - Hub settings and instrumentation
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Producer   │────▶│     Hub     │────▶│ Connection  │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                       │         │
//!                       ▼         ▼
//!               ┌─────────────┐ ┌─────────────┐
//!               │   Hooks     │ │ ClusterSink │
//!               └─────────────┘ └─────────────┘
//! ```

pub mod config;
pub mod hook;
pub mod hub;
pub mod metrics;
pub mod target;

pub use config::{ConfigError, HubConfig};
pub use hook::{BroadcastHookHandler, HookError, HookRegistry};
pub use hub::{ClusterSink, DeliveryReport, Hub, HubError, HubStats};
pub use target::{should_send, skip_reason, Recipient, SkipReason};
