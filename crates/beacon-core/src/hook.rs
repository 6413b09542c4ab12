//! Broadcast hook execution.
//!
//! Producers attach hook ids and arguments to a broadcast; the hub strips them
//! and, for each recipient, runs the matching handlers in order before the
//! event is serialized for that connection.

use beacon_protocol::{HookArgs, HookLedger, WebSocketEvent};
use dashmap::DashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::trace;

use crate::target::Recipient;

/// Hook execution errors.
#[derive(Debug, Error)]
pub enum HookError {
    /// No handler is registered under this id.
    #[error("Unknown broadcast hook: {0}")]
    Unknown(String),

    /// A required argument is missing or has the wrong type.
    #[error("Invalid argument {arg} for hook {hook}")]
    InvalidArgument {
        /// Hook id.
        hook: String,
        /// Argument name.
        arg: String,
    },

    /// The handler failed.
    #[error("Hook {hook} failed: {message}")]
    Failed {
        /// Hook id.
        hook: String,
        /// Failure description.
        message: String,
    },
}

/// Transforms an event for one recipient.
pub trait BroadcastHookHandler: Send + Sync {
    /// Process `event` for `recipient` and return the event to send.
    ///
    /// # Errors
    ///
    /// Returns an error if the event must not be sent to this recipient.
    fn process(
        &self,
        event: WebSocketEvent,
        recipient: &Recipient,
        args: &HookArgs,
    ) -> Result<WebSocketEvent, HookError>;
}

impl<F> BroadcastHookHandler for F
where
    F: Fn(WebSocketEvent, &Recipient, &HookArgs) -> Result<WebSocketEvent, HookError> + Send + Sync,
{
    fn process(
        &self,
        event: WebSocketEvent,
        recipient: &Recipient,
        args: &HookArgs,
    ) -> Result<WebSocketEvent, HookError> {
        self(event, recipient, args)
    }
}

/// Hook handlers indexed by id.
#[derive(Default)]
pub struct HookRegistry {
    handlers: DashMap<String, Arc<dyn BroadcastHookHandler>>,
}

impl HookRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, replacing any previous handler with the same id.
    pub fn register(&self, hook_id: impl Into<String>, handler: Arc<dyn BroadcastHookHandler>) {
        self.handlers.insert(hook_id.into(), handler);
    }

    /// Check whether a handler is registered.
    #[must_use]
    pub fn contains(&self, hook_id: &str) -> bool {
        self.handlers.contains_key(hook_id)
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run every hook in `hooks`, in order, threading the event through.
    ///
    /// # Errors
    ///
    /// Returns the first error; later hooks are not run.
    pub fn run(
        &self,
        mut event: WebSocketEvent,
        hooks: &HookLedger,
        recipient: &Recipient,
    ) -> Result<WebSocketEvent, HookError> {
        for hook in hooks {
            let handler = self
                .handlers
                .get(&hook.id)
                .map(|h| Arc::clone(h.value()))
                .ok_or_else(|| HookError::Unknown(hook.id.clone()))?;

            trace!(hook = %hook.id, connection = %recipient.connection_id, "Running broadcast hook");
            event = handler.process(event, recipient, &hook.args)?;
        }
        Ok(event)
    }
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ids: Vec<String> = self.handlers.iter().map(|e| e.key().clone()).collect();
        f.debug_struct("HookRegistry").field("hooks", &ids).finish()
    }
}
