//! Recipient matching.
//!
//! A broadcast is checked against a recipient in three stages:
//!
//! 1. **Privilege** - sanitized data never reaches system admins, sensitive
//!    data reaches nobody else.
//! 2. **Inclusion** - every non-empty `connection_id`, `user_id`,
//!    `channel_id` and `team_id` must match the recipient.
//! 3. **Exclusion** - `omit_connection_id` and `omit_users` remove the
//!    recipient even if inclusion selected it.

use beacon_protocol::WebsocketBroadcast;
use std::collections::HashSet;
use std::fmt;

/// A connection as seen by the dispatcher.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recipient {
    /// Connection identifier.
    pub connection_id: String,
    /// Authenticated user behind the connection.
    pub user_id: String,
    /// Whether the user holds system-admin privileges.
    pub is_system_admin: bool,
    /// Channels the user is a member of.
    pub channels: HashSet<String>,
    /// Teams the user is a member of.
    pub teams: HashSet<String>,
}

impl Recipient {
    /// Create a recipient for a user's connection.
    #[must_use]
    pub fn new(connection_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            connection_id: connection_id.into(),
            user_id: user_id.into(),
            ..Self::default()
        }
    }

    /// Mark the recipient as a system admin.
    #[must_use]
    pub fn admin(mut self) -> Self {
        self.is_system_admin = true;
        self
    }

    /// Add a channel membership.
    #[must_use]
    pub fn in_channel(mut self, channel_id: impl Into<String>) -> Self {
        self.channels.insert(channel_id.into());
        self
    }

    /// Add a team membership.
    #[must_use]
    pub fn in_team(mut self, team_id: impl Into<String>) -> Self {
        self.teams.insert(team_id.into());
        self
    }

    /// Check channel membership.
    #[must_use]
    pub fn is_member_of_channel(&self, channel_id: &str) -> bool {
        self.channels.contains(channel_id)
    }

    /// Check team membership.
    #[must_use]
    pub fn is_member_of_team(&self, team_id: &str) -> bool {
        self.teams.contains(team_id)
    }
}

/// Why a recipient does not receive a broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// Sanitized data and the recipient is an admin.
    SanitizedForAdmin,
    /// Sensitive data and the recipient is not an admin.
    SensitiveForNonAdmin,
    /// Targeted at another connection.
    OtherConnection,
    /// Targeted at another user.
    OtherUser,
    /// Recipient is not in the channel.
    NotInChannel,
    /// Recipient is not in the team.
    NotInTeam,
    /// Recipient's connection is omitted.
    OmittedConnection,
    /// Recipient's user is omitted.
    OmittedUser,
}

impl SkipReason {
    /// Short label used in logs and metrics.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::SanitizedForAdmin => "sanitized_for_admin",
            SkipReason::SensitiveForNonAdmin => "sensitive_for_non_admin",
            SkipReason::OtherConnection => "other_connection",
            SkipReason::OtherUser => "other_user",
            SkipReason::NotInChannel => "not_in_channel",
            SkipReason::NotInTeam => "not_in_team",
            SkipReason::OmittedConnection => "omitted_connection",
            SkipReason::OmittedUser => "omitted_user",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Explain why `recipient` is excluded from `broadcast`, or `None` if it
/// should receive it.
#[must_use]
pub fn skip_reason(broadcast: &WebsocketBroadcast, recipient: &Recipient) -> Option<SkipReason> {
    if broadcast.contains_sanitized_data && recipient.is_system_admin {
        return Some(SkipReason::SanitizedForAdmin);
    }
    if broadcast.contains_sensitive_data && !recipient.is_system_admin {
        return Some(SkipReason::SensitiveForNonAdmin);
    }

    if !broadcast.connection_id.is_empty() && broadcast.connection_id != recipient.connection_id {
        return Some(SkipReason::OtherConnection);
    }
    if !broadcast.user_id.is_empty() && broadcast.user_id != recipient.user_id {
        return Some(SkipReason::OtherUser);
    }
    if !broadcast.channel_id.is_empty() && !recipient.is_member_of_channel(&broadcast.channel_id) {
        return Some(SkipReason::NotInChannel);
    }
    if !broadcast.team_id.is_empty() && !recipient.is_member_of_team(&broadcast.team_id) {
        return Some(SkipReason::NotInTeam);
    }

    if !broadcast.omit_connection_id.is_empty()
        && broadcast.omit_connection_id == recipient.connection_id
    {
        return Some(SkipReason::OmittedConnection);
    }
    if broadcast.omit_users.contains(&recipient.user_id) {
        return Some(SkipReason::OmittedUser);
    }

    None
}

/// Check whether `recipient` should receive `broadcast`.
#[must_use]
pub fn should_send(broadcast: &WebsocketBroadcast, recipient: &Recipient) -> bool {
    skip_reason(broadcast, recipient).is_none()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Recipient {
        Recipient::new("conn-a", "alice")
            .in_channel("town-square")
            .in_team("team1")
    }

    #[test]
    fn test_empty_broadcast_reaches_everyone() {
        assert!(should_send(&WebsocketBroadcast::new(), &alice()));
        assert!(should_send(&WebsocketBroadcast::new(), &Recipient::default()));
    }

    #[test]
    fn test_inclusion_dimensions_all_apply() {
        let channel_and_team = WebsocketBroadcast::new()
            .for_channel("town-square")
            .for_team("team1");
        assert!(should_send(&channel_and_team, &alice()));

        let other_team = WebsocketBroadcast::new()
            .for_channel("town-square")
            .for_team("team2");
        assert_eq!(skip_reason(&other_team, &alice()), Some(SkipReason::NotInTeam));

        let user_and_channel = WebsocketBroadcast::new()
            .for_user("alice")
            .for_channel("off-topic");
        assert_eq!(
            skip_reason(&user_and_channel, &alice()),
            Some(SkipReason::NotInChannel)
        );

        let other_user = WebsocketBroadcast::new().for_user("bob");
        assert_eq!(skip_reason(&other_user, &alice()), Some(SkipReason::OtherUser));

        let this_connection = WebsocketBroadcast::new().for_connection("conn-a");
        assert!(should_send(&this_connection, &alice()));
        let other_connection = WebsocketBroadcast::new().for_connection("conn-b");
        assert_eq!(
            skip_reason(&other_connection, &alice()),
            Some(SkipReason::OtherConnection)
        );
    }

    #[test]
    fn test_exclusion_overrides_inclusion() {
        let targeted_but_omitted = WebsocketBroadcast::new().for_user("alice").omit_user("alice");
        assert_eq!(
            skip_reason(&targeted_but_omitted, &alice()),
            Some(SkipReason::OmittedUser)
        );

        let connection_omitted = WebsocketBroadcast::new()
            .for_connection("conn-a")
            .omit_connection("conn-a");
        assert_eq!(
            skip_reason(&connection_omitted, &alice()),
            Some(SkipReason::OmittedConnection)
        );

        let other_connection_omitted = WebsocketBroadcast::new()
            .for_channel("town-square")
            .omit_connection("conn-b");
        assert!(should_send(&other_connection_omitted, &alice()));
    }

    #[test]
    fn test_privilege_flags() {
        let mut sanitized = WebsocketBroadcast::new();
        sanitized.contains_sanitized_data = true;
        assert!(should_send(&sanitized, &alice()));
        assert_eq!(
            skip_reason(&sanitized, &alice().admin()),
            Some(SkipReason::SanitizedForAdmin)
        );

        let mut sensitive = WebsocketBroadcast::new();
        sensitive.contains_sensitive_data = true;
        assert!(should_send(&sensitive, &alice().admin()));
        assert_eq!(
            skip_reason(&sensitive, &alice()),
            Some(SkipReason::SensitiveForNonAdmin)
        );
    }

    #[test]
    fn test_privilege_checked_before_targeting() {
        let mut sensitive_for_alice = WebsocketBroadcast::new().for_user("alice");
        sensitive_for_alice.contains_sensitive_data = true;
        assert_eq!(
            skip_reason(&sensitive_for_alice, &alice()),
            Some(SkipReason::SensitiveForNonAdmin)
        );
    }
}
