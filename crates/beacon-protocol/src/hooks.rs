//! Broadcast hooks.
//!
//! A hook is an opaque request to transform an event for one specific
//! connection just before it is sent (for example to sanitize a post for a
//! recipient without permission to see it). Hooks are resolved by id outside
//! this crate and must never reach a client.

use serde_json::{Map, Value};
use std::sync::Arc;

use crate::codec::ProtocolError;

/// Named arguments for one hook invocation.
pub type HookArgs = Map<String, Value>;

/// A single hook request: which hook to run and with what arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct BroadcastHook {
    /// Hook identifier, understood by the hook executor.
    pub id: String,
    /// Arguments passed to the hook.
    pub args: HookArgs,
}

impl BroadcastHook {
    /// Create a new hook request.
    #[must_use]
    pub fn new(id: impl Into<String>, args: HookArgs) -> Self {
        Self {
            id: id.into(),
            args,
        }
    }
}

/// Ordered hook requests attached to a broadcast.
///
/// Identifiers and their arguments are stored side by side, so the two
/// sequences exposed by [`ids`](Self::ids) and [`args`](Self::args) always
/// have the same length. Cloning shares the underlying list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HookLedger {
    hooks: Arc<Vec<BroadcastHook>>,
}

impl HookLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from its two wire sequences.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::HookLengthMismatch`] if the sequences differ in length.
    pub fn from_parts(ids: Vec<String>, args: Vec<HookArgs>) -> Result<Self, ProtocolError> {
        if ids.len() != args.len() {
            return Err(ProtocolError::HookLengthMismatch {
                hooks: ids.len(),
                args: args.len(),
            });
        }

        let hooks = ids
            .into_iter()
            .zip(args)
            .map(|(id, args)| BroadcastHook { id, args })
            .collect();
        Ok(Self {
            hooks: Arc::new(hooks),
        })
    }

    /// Append a hook. Copies the list first if it is shared.
    pub fn push(&mut self, id: impl Into<String>, args: HookArgs) {
        Arc::make_mut(&mut self.hooks).push(BroadcastHook::new(id, args));
    }

    /// Number of hooks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Check if there are no hooks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Iterate over hook requests in order.
    pub fn iter(&self) -> std::slice::Iter<'_, BroadcastHook> {
        self.hooks.iter()
    }

    /// Hook identifiers, in order.
    pub fn ids(&self) -> impl ExactSizeIterator<Item = &str> + '_ {
        self.hooks.iter().map(|h| h.id.as_str())
    }

    /// Hook arguments, in order. Index `i` belongs to the `i`th id.
    pub fn args(&self) -> impl ExactSizeIterator<Item = &HookArgs> + '_ {
        self.hooks.iter().map(|h| &h.args)
    }

    /// Check whether two ledgers share the same allocation.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.hooks, &other.hooks)
    }
}

impl<'a> IntoIterator for &'a HookLedger {
    type Item = &'a BroadcastHook;
    type IntoIter = std::slice::Iter<'a, BroadcastHook>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
