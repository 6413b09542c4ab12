//! Broadcast targets.
//!
//! A [`WebsocketBroadcast`] describes who should receive an event. The
//! dispatcher evaluates it per connection; this module only carries the data
//! and its wire form.

use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};

use crate::hooks::{HookArgs, HookLedger};

/// Inclusion and exclusion rules for delivering one event.
///
/// Every non-empty inclusion field (`user_id`, `channel_id`, `team_id`,
/// `connection_id`) narrows the audience; `omit_users` and
/// `omit_connection_id` remove recipients from it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WebsocketBroadcast {
    /// Users that must not receive the event.
    pub omit_users: BTreeSet<String>,
    /// Deliver only to this user.
    pub user_id: String,
    /// Deliver only to members of this channel.
    pub channel_id: String,
    /// Deliver only to members of this team.
    pub team_id: String,
    /// Deliver only to this connection.
    pub connection_id: String,
    /// Never deliver to this connection.
    pub omit_connection_id: String,
    /// Deliver only to recipients without system-admin privileges.
    pub contains_sanitized_data: bool,
    /// Deliver only to recipients with system-admin privileges.
    pub contains_sensitive_data: bool,
    /// Also replicate through the reliable cluster channel. Never serialized.
    pub reliable_cluster_send: bool,
    /// Per-connection transformations. Must be stripped before transmission.
    pub hooks: HookLedger,
}

impl WebsocketBroadcast {
    /// Create an empty broadcast, which targets every connection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict delivery to one user.
    #[must_use]
    pub fn for_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    /// Restrict delivery to members of a channel.
    #[must_use]
    pub fn for_channel(mut self, channel_id: impl Into<String>) -> Self {
        self.channel_id = channel_id.into();
        self
    }

    /// Restrict delivery to members of a team.
    #[must_use]
    pub fn for_team(mut self, team_id: impl Into<String>) -> Self {
        self.team_id = team_id.into();
        self
    }

    /// Restrict delivery to one connection.
    #[must_use]
    pub fn for_connection(mut self, connection_id: impl Into<String>) -> Self {
        self.connection_id = connection_id.into();
        self
    }

    /// Exclude a user.
    #[must_use]
    pub fn omit_user(mut self, user_id: impl Into<String>) -> Self {
        self.omit_users.insert(user_id.into());
        self
    }

    /// Exclude a connection.
    #[must_use]
    pub fn omit_connection(mut self, connection_id: impl Into<String>) -> Self {
        self.omit_connection_id = connection_id.into();
        self
    }

    /// Request replication through the reliable cluster channel.
    #[must_use]
    pub fn reliable(mut self) -> Self {
        self.reliable_cluster_send = true;
        self
    }

    /// Attach a hook to be run for each recipient connection.
    pub fn add_hook(&mut self, hook_id: impl Into<String>, args: HookArgs) {
        self.hooks.push(hook_id, args);
    }

    /// Check whether any hooks are attached.
    #[must_use]
    pub fn has_hooks(&self) -> bool {
        !self.hooks.is_empty()
    }

    /// Split off the hooks, returning a hook-free copy and the extracted ledger.
    #[must_use]
    pub fn without_hooks(&self) -> (Self, HookLedger) {
        let mut copy = self.clone();
        let hooks = std::mem::take(&mut copy.hooks);
        (copy, hooks)
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn serialize_omit_users<S>(users: &&BTreeSet<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if users.is_empty() {
        return serializer.serialize_none();
    }
    let mut map = serializer.serialize_map(Some(users.len()))?;
    for user in users.iter() {
        map.serialize_entry(user, &true)?;
    }
    map.end()
}

/// Borrowed wire view; field order is part of the wire format.
#[derive(Serialize)]
struct BroadcastJson<'a> {
    #[serde(serialize_with = "serialize_omit_users")]
    omit_users: &'a BTreeSet<String>,
    user_id: &'a str,
    channel_id: &'a str,
    team_id: &'a str,
    connection_id: &'a str,
    omit_connection_id: &'a str,
    #[serde(skip_serializing_if = "is_false")]
    contains_sanitized_data: bool,
    #[serde(skip_serializing_if = "is_false")]
    contains_sensitive_data: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    broadcast_hooks: Vec<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    broadcast_hook_args: Vec<&'a HookArgs>,
}

impl Serialize for WebsocketBroadcast {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        BroadcastJson {
            omit_users: &self.omit_users,
            user_id: &self.user_id,
            channel_id: &self.channel_id,
            team_id: &self.team_id,
            connection_id: &self.connection_id,
            omit_connection_id: &self.omit_connection_id,
            contains_sanitized_data: self.contains_sanitized_data,
            contains_sensitive_data: self.contains_sensitive_data,
            broadcast_hooks: self.hooks.ids().collect(),
            broadcast_hook_args: self.hooks.args().collect(),
        }
        .serialize(serializer)
    }
}

#[derive(Deserialize)]
struct BroadcastRecord {
    #[serde(default)]
    omit_users: Option<BTreeMap<String, bool>>,
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    channel_id: String,
    #[serde(default)]
    team_id: String,
    #[serde(default)]
    connection_id: String,
    #[serde(default)]
    omit_connection_id: String,
    #[serde(default)]
    contains_sanitized_data: bool,
    #[serde(default)]
    contains_sensitive_data: bool,
    #[serde(default)]
    broadcast_hooks: Option<Vec<String>>,
    #[serde(default)]
    broadcast_hook_args: Option<Vec<Option<HookArgs>>>,
}

impl<'de> Deserialize<'de> for WebsocketBroadcast {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let record = BroadcastRecord::deserialize(deserializer)?;

        let omit_users = record
            .omit_users
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(user, omitted)| omitted.then_some(user))
            .collect();

        let hook_args = record
            .broadcast_hook_args
            .unwrap_or_default()
            .into_iter()
            .map(Option::unwrap_or_default)
            .collect();
        let hooks = HookLedger::from_parts(record.broadcast_hooks.unwrap_or_default(), hook_args)
            .map_err(D::Error::custom)?;

        Ok(Self {
            omit_users,
            user_id: record.user_id,
            channel_id: record.channel_id,
            team_id: record.team_id,
            connection_id: record.connection_id,
            omit_connection_id: record.omit_connection_id,
            contains_sanitized_data: record.contains_sanitized_data,
            contains_sensitive_data: record.contains_sensitive_data,
            reliable_cluster_send: false,
            hooks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_broadcast_wire_shape() {
        let json = serde_json::to_string(&WebsocketBroadcast::new()).unwrap();
        assert_eq!(
            json,
            r#"{"omit_users":null,"user_id":"","channel_id":"","team_id":"","connection_id":"","omit_connection_id":""}"#
        );
    }

    #[test]
    fn test_reliable_flag_never_serialized() {
        let broadcast = WebsocketBroadcast::new().for_team("team1").reliable();
        let value = serde_json::to_value(&broadcast).unwrap();
        assert!(value.get("reliable_cluster_send").is_none());
        assert_eq!(value["team_id"], "team1");
    }

    #[test]
    fn test_omit_users_and_flags() {
        let mut broadcast = WebsocketBroadcast::new().omit_user("u1").omit_user("u2");
        broadcast.contains_sanitized_data = true;

        let value = serde_json::to_value(&broadcast).unwrap();
        assert_eq!(value["omit_users"], json!({"u1": true, "u2": true}));
        assert_eq!(value["contains_sanitized_data"], true);
        assert!(value.get("contains_sensitive_data").is_none());
    }

    #[test]
    fn test_hooks_serialize_as_parallel_arrays() {
        let mut broadcast = WebsocketBroadcast::new();
        broadcast.add_hook("h1", json!({"x": 1}).as_object().cloned().unwrap());
        broadcast.add_hook("h2", HookArgs::new());

        let value = serde_json::to_value(&broadcast).unwrap();
        assert_eq!(value["broadcast_hooks"], json!(["h1", "h2"]));
        assert_eq!(value["broadcast_hook_args"], json!([{"x": 1}, {}]));

        let parsed: WebsocketBroadcast = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.hooks, broadcast.hooks);
    }

    #[test]
    fn test_without_hooks_leaves_source_intact() {
        let mut broadcast = WebsocketBroadcast::new().for_channel("c1");
        broadcast.add_hook("h1", HookArgs::new());

        let (stripped, hooks) = broadcast.without_hooks();
        assert!(!stripped.has_hooks());
        assert_eq!(stripped.channel_id, "c1");
        assert_eq!(hooks.len(), 1);
        assert!(broadcast.has_hooks());
    }

    #[test]
    fn test_deserialize_ignores_false_omits_and_null_args() {
        let parsed: WebsocketBroadcast = serde_json::from_value(json!({
            "omit_users": {"u1": true, "u2": false},
            "broadcast_hooks": ["h1"],
            "broadcast_hook_args": [null],
        }))
        .unwrap();

        assert!(parsed.omit_users.contains("u1"));
        assert!(!parsed.omit_users.contains("u2"));
        assert_eq!(parsed.hooks.len(), 1);
        assert!(parsed.hooks.args().all(HookArgs::is_empty));
    }

    #[test]
    fn test_deserialize_rejects_unpaired_hooks() {
        let result: Result<WebsocketBroadcast, _> = serde_json::from_value(json!({
            "broadcast_hooks": ["h1", "h2"],
            "broadcast_hook_args": [{}],
        }));
        assert!(result.is_err());
    }
}
