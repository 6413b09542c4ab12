//! Event type identifiers.
//!
//! Clients dispatch on the `event` string of every frame, so the well-known
//! identifiers below are a public contract and must never change spelling.
//! Plugins may introduce their own identifiers; those travel as owned strings.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// The kind of change an event describes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventType(Cow<'static, str>);

impl EventType {
    /// Create an event type from a static string.
    #[must_use]
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Create an event type from any string, e.g. a plugin-defined name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// An empty identifier makes the owning envelope invalid.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check whether this identifier belongs to the built-in catalog.
    #[must_use]
    pub fn is_well_known(&self) -> bool {
        event_types::ALL.iter().any(|known| known.as_str() == self.as_str())
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EventType {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for EventType {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

impl From<String> for EventType {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl PartialEq<str> for EventType {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for EventType {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

/// Well-known event identifiers.
pub mod event_types {
    use super::EventType;

    pub const TYPING: EventType = EventType::from_static("typing");
    pub const POSTED: EventType = EventType::from_static("posted");
    pub const POST_EDITED: EventType = EventType::from_static("post_edited");
    pub const POST_DELETED: EventType = EventType::from_static("post_deleted");
    pub const POST_UNREAD: EventType = EventType::from_static("post_unread");
    pub const CHANNEL_CONVERTED: EventType = EventType::from_static("channel_converted");
    pub const CHANNEL_CREATED: EventType = EventType::from_static("channel_created");
    pub const CHANNEL_DELETED: EventType = EventType::from_static("channel_deleted");
    pub const CHANNEL_RESTORED: EventType = EventType::from_static("channel_restored");
    pub const CHANNEL_UPDATED: EventType = EventType::from_static("channel_updated");
    pub const CHANNEL_MEMBER_UPDATED: EventType = EventType::from_static("channel_member_updated");
    pub const CHANNEL_SCHEME_UPDATED: EventType = EventType::from_static("channel_scheme_updated");
    pub const DIRECT_ADDED: EventType = EventType::from_static("direct_added");
    pub const GROUP_ADDED: EventType = EventType::from_static("group_added");
    pub const NEW_USER: EventType = EventType::from_static("new_user");
    pub const ADDED_TO_TEAM: EventType = EventType::from_static("added_to_team");
    pub const LEAVE_TEAM: EventType = EventType::from_static("leave_team");
    pub const UPDATE_TEAM: EventType = EventType::from_static("update_team");
    pub const DELETE_TEAM: EventType = EventType::from_static("delete_team");
    pub const RESTORE_TEAM: EventType = EventType::from_static("restore_team");
    pub const UPDATE_TEAM_SCHEME: EventType = EventType::from_static("update_team_scheme");
    pub const USER_ADDED: EventType = EventType::from_static("user_added");
    pub const USER_UPDATED: EventType = EventType::from_static("user_updated");
    pub const USER_ROLE_UPDATED: EventType = EventType::from_static("user_role_updated");
    pub const MEMBERROLE_UPDATED: EventType = EventType::from_static("memberrole_updated");
    pub const USER_REMOVED: EventType = EventType::from_static("user_removed");
    pub const PREFERENCE_CHANGED: EventType = EventType::from_static("preference_changed");
    pub const PREFERENCES_CHANGED: EventType = EventType::from_static("preferences_changed");
    pub const PREFERENCES_DELETED: EventType = EventType::from_static("preferences_deleted");
    pub const EPHEMERAL_MESSAGE: EventType = EventType::from_static("ephemeral_message");
    pub const STATUS_CHANGE: EventType = EventType::from_static("status_change");
    pub const HELLO: EventType = EventType::from_static("hello");
    pub const AUTHENTICATION_CHALLENGE: EventType =
        EventType::from_static("authentication_challenge");
    pub const REACTION_ADDED: EventType = EventType::from_static("reaction_added");
    pub const REACTION_REMOVED: EventType = EventType::from_static("reaction_removed");
    pub const RESPONSE: EventType = EventType::from_static("response");
    pub const EMOJI_ADDED: EventType = EventType::from_static("emoji_added");
    pub const CHANNEL_VIEWED: EventType = EventType::from_static("channel_viewed");
    pub const MULTIPLE_CHANNELS_VIEWED: EventType =
        EventType::from_static("multiple_channels_viewed");
    pub const PLUGIN_STATUSES_CHANGED: EventType =
        EventType::from_static("plugin_statuses_changed");
    pub const PLUGIN_ENABLED: EventType = EventType::from_static("plugin_enabled");
    pub const PLUGIN_DISABLED: EventType = EventType::from_static("plugin_disabled");
    pub const ROLE_UPDATED: EventType = EventType::from_static("role_updated");
    pub const LICENSE_CHANGED: EventType = EventType::from_static("license_changed");
    pub const CONFIG_CHANGED: EventType = EventType::from_static("config_changed");
    pub const OPEN_DIALOG: EventType = EventType::from_static("open_dialog");
    pub const GUESTS_DEACTIVATED: EventType = EventType::from_static("guests_deactivated");
    pub const USER_ACTIVATION_STATUS_CHANGE: EventType =
        EventType::from_static("user_activation_status_change");
    pub const RECEIVED_GROUP: EventType = EventType::from_static("received_group");
    pub const RECEIVED_GROUP_ASSOCIATED_TO_TEAM: EventType =
        EventType::from_static("received_group_associated_to_team");
    pub const RECEIVED_GROUP_NOT_ASSOCIATED_TO_TEAM: EventType =
        EventType::from_static("received_group_not_associated_to_team");
    pub const RECEIVED_GROUP_ASSOCIATED_TO_CHANNEL: EventType =
        EventType::from_static("received_group_associated_to_channel");
    pub const RECEIVED_GROUP_NOT_ASSOCIATED_TO_CHANNEL: EventType =
        EventType::from_static("received_group_not_associated_to_channel");
    pub const GROUP_MEMBER_DELETED: EventType = EventType::from_static("group_member_deleted");
    pub const GROUP_MEMBER_ADD: EventType = EventType::from_static("group_member_add");
    pub const SIDEBAR_CATEGORY_CREATED: EventType =
        EventType::from_static("sidebar_category_created");
    pub const SIDEBAR_CATEGORY_UPDATED: EventType =
        EventType::from_static("sidebar_category_updated");
    pub const SIDEBAR_CATEGORY_DELETED: EventType =
        EventType::from_static("sidebar_category_deleted");
    pub const SIDEBAR_CATEGORY_ORDER_UPDATED: EventType =
        EventType::from_static("sidebar_category_order_updated");
    pub const WARN_METRIC_STATUS_RECEIVED: EventType =
        EventType::from_static("warn_metric_status_received");
    pub const WARN_METRIC_STATUS_REMOVED: EventType =
        EventType::from_static("warn_metric_status_removed");
    pub const CLOUD_PAYMENT_STATUS_UPDATED: EventType =
        EventType::from_static("cloud_payment_status_updated");
    pub const CLOUD_SUBSCRIPTION_CHANGED: EventType =
        EventType::from_static("cloud_subscription_changed");
    pub const THREAD_UPDATED: EventType = EventType::from_static("thread_updated");
    pub const THREAD_FOLLOW_CHANGED: EventType = EventType::from_static("thread_follow_changed");
    pub const THREAD_READ_CHANGED: EventType = EventType::from_static("thread_read_changed");
    pub const FIRST_ADMIN_VISIT_MARKETPLACE_STATUS_RECEIVED: EventType =
        EventType::from_static("first_admin_visit_marketplace_status_received");
    pub const DRAFT_CREATED: EventType = EventType::from_static("draft_created");
    pub const DRAFT_UPDATED: EventType = EventType::from_static("draft_updated");
    pub const DRAFT_DELETED: EventType = EventType::from_static("draft_deleted");
    pub const ACKNOWLEDGEMENT_ADDED: EventType =
        EventType::from_static("post_acknowledgement_added");
    pub const ACKNOWLEDGEMENT_REMOVED: EventType =
        EventType::from_static("post_acknowledgement_removed");
    pub const PERSISTENT_NOTIFICATION_TRIGGERED: EventType =
        EventType::from_static("persistent_notification_triggered");
    pub const HOSTED_CUSTOMER_SIGNUP_PROGRESS_UPDATED: EventType =
        EventType::from_static("hosted_customer_signup_progress_updated");

    /// The full catalog.
    pub static ALL: &[EventType] = &[
        TYPING,
        POSTED,
        POST_EDITED,
        POST_DELETED,
        POST_UNREAD,
        CHANNEL_CONVERTED,
        CHANNEL_CREATED,
        CHANNEL_DELETED,
        CHANNEL_RESTORED,
        CHANNEL_UPDATED,
        CHANNEL_MEMBER_UPDATED,
        CHANNEL_SCHEME_UPDATED,
        DIRECT_ADDED,
        GROUP_ADDED,
        NEW_USER,
        ADDED_TO_TEAM,
        LEAVE_TEAM,
        UPDATE_TEAM,
        DELETE_TEAM,
        RESTORE_TEAM,
        UPDATE_TEAM_SCHEME,
        USER_ADDED,
        USER_UPDATED,
        USER_ROLE_UPDATED,
        MEMBERROLE_UPDATED,
        USER_REMOVED,
        PREFERENCE_CHANGED,
        PREFERENCES_CHANGED,
        PREFERENCES_DELETED,
        EPHEMERAL_MESSAGE,
        STATUS_CHANGE,
        HELLO,
        AUTHENTICATION_CHALLENGE,
        REACTION_ADDED,
        REACTION_REMOVED,
        RESPONSE,
        EMOJI_ADDED,
        CHANNEL_VIEWED,
        MULTIPLE_CHANNELS_VIEWED,
        PLUGIN_STATUSES_CHANGED,
        PLUGIN_ENABLED,
        PLUGIN_DISABLED,
        ROLE_UPDATED,
        LICENSE_CHANGED,
        CONFIG_CHANGED,
        OPEN_DIALOG,
        GUESTS_DEACTIVATED,
        USER_ACTIVATION_STATUS_CHANGE,
        RECEIVED_GROUP,
        RECEIVED_GROUP_ASSOCIATED_TO_TEAM,
        RECEIVED_GROUP_NOT_ASSOCIATED_TO_TEAM,
        RECEIVED_GROUP_ASSOCIATED_TO_CHANNEL,
        RECEIVED_GROUP_NOT_ASSOCIATED_TO_CHANNEL,
        GROUP_MEMBER_DELETED,
        GROUP_MEMBER_ADD,
        SIDEBAR_CATEGORY_CREATED,
        SIDEBAR_CATEGORY_UPDATED,
        SIDEBAR_CATEGORY_DELETED,
        SIDEBAR_CATEGORY_ORDER_UPDATED,
        WARN_METRIC_STATUS_RECEIVED,
        WARN_METRIC_STATUS_REMOVED,
        CLOUD_PAYMENT_STATUS_UPDATED,
        CLOUD_SUBSCRIPTION_CHANGED,
        THREAD_UPDATED,
        THREAD_FOLLOW_CHANGED,
        THREAD_READ_CHANGED,
        FIRST_ADMIN_VISIT_MARKETPLACE_STATUS_RECEIVED,
        DRAFT_CREATED,
        DRAFT_UPDATED,
        DRAFT_DELETED,
        ACKNOWLEDGEMENT_ADDED,
        ACKNOWLEDGEMENT_REMOVED,
        PERSISTENT_NOTIFICATION_TRIGGERED,
        HOSTED_CUSTOMER_SIGNUP_PROGRESS_UPDATED,
    ];
}
