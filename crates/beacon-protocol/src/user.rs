//! User record carried in event payloads.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

fn is_zero(value: &i64) -> bool {
    *value == 0
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// A user account as it appears under the `"user"` key of an event payload.
///
/// Fields not modelled here are preserved in `extra` so the record
/// re-serializes without loss.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub id: String,
    pub create_at: i64,
    pub update_at: i64,
    pub delete_at: i64,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_data: Option<String>,
    pub auth_service: String,
    pub email: String,
    #[serde(skip_serializing_if = "is_false")]
    pub email_verified: bool,
    pub nickname: String,
    pub first_name: String,
    pub last_name: String,
    pub position: String,
    pub roles: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub props: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub notify_props: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "is_zero")]
    pub last_password_update: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub last_picture_update: i64,
    pub locale: String,
    pub timezone: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "is_false")]
    pub mfa_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
    #[serde(skip_serializing_if = "is_zero")]
    pub last_activity_at: i64,
    #[serde(skip_serializing_if = "is_false")]
    pub is_bot: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub bot_description: String,
    pub disable_welcome_email: bool,
    /// Unrecognized fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    /// Create a user with an id and username.
    #[must_use]
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            ..Self::default()
        }
    }

    /// Check whether the account has been deactivated.
    #[must_use]
    pub fn is_deactivated(&self) -> bool {
        self.delete_at != 0
    }

    /// Check whether the account belongs to a remote cluster.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        self.remote_id.as_deref().is_some_and(|id| !id.is_empty())
    }

    /// Check whether the user holds the given role.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.split_whitespace().any(|r| r == role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_partial_record_uses_defaults() {
        let user: User = serde_json::from_value(json!({
            "id": "u1",
            "username": "alice",
            "roles": "system_user system_admin",
        }))
        .unwrap();

        assert_eq!(user.id, "u1");
        assert!(user.has_role("system_admin"));
        assert!(!user.is_deactivated());
        assert!(!user.is_remote());
    }

    #[test]
    fn test_unknown_fields_survive() {
        let value = json!({"id": "u1", "terms_of_service_id": "tos-3"});
        let user: User = serde_json::from_value(value).unwrap();
        assert_eq!(user.extra["terms_of_service_id"], "tos-3");

        let back = serde_json::to_value(&user).unwrap();
        assert_eq!(back["terms_of_service_id"], "tos-3");
    }

    #[test]
    fn test_wrong_shape_is_rejected() {
        assert!(serde_json::from_value::<User>(json!("u1")).is_err());
        assert!(serde_json::from_value::<User>(json!({"create_at": "yesterday"})).is_err());
    }
}
