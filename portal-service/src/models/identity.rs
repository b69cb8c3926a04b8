use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata key the identity provider uses for the application role.
const ROLE_METADATA_KEY: &str = "role";

/// Authenticated principal resolved for a single request. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionIdentity {
    /// The identity provider's user id.
    pub identity_id: String,
    /// Provider session id, when the token carries one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl SessionIdentity {
    pub fn new(identity_id: impl Into<String>) -> Self {
        Self {
            identity_id: identity_id.into(),
            session_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddress {
    #[serde(default)]
    pub id: String,
    pub email_address: String,
}

/// A user as held by the identity provider's directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    #[serde(default)]
    pub email_addresses: Vec<EmailAddress>,
    #[serde(default)]
    pub primary_email_address_id: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub public_metadata: Map<String, Value>,
}

impl UserRecord {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email_addresses: vec![EmailAddress {
                id: "email_primary".to_string(),
                email_address: email.into(),
            }],
            primary_email_address_id: Some("email_primary".to_string()),
            first_name: None,
            last_name: None,
            image_url: None,
            public_metadata: Map::new(),
        }
    }

    pub fn with_role(mut self, role: &str) -> Self {
        self.public_metadata
            .insert(ROLE_METADATA_KEY.to_string(), Value::String(role.to_string()));
        self
    }

    /// The address flagged as primary, falling back to the first one listed.
    pub fn primary_email(&self) -> Option<&str> {
        self.primary_email_address_id
            .as_deref()
            .and_then(|primary| self.email_addresses.iter().find(|e| e.id == primary))
            .or_else(|| self.email_addresses.first())
            .map(|e| e.email_address.as_str())
    }

    pub fn role(&self) -> RoleMarker {
        RoleMarker::from_metadata(&self.public_metadata)
    }
}

/// Role carried in provider-managed public metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleMarker {
    NoRole,
    Role(String),
}

impl RoleMarker {
    pub const ADMIN: &'static str = "admin";

    /// A missing or non-string `role` entry reads as [`RoleMarker::NoRole`].
    pub fn from_metadata(metadata: &Map<String, Value>) -> Self {
        match metadata.get(ROLE_METADATA_KEY) {
            Some(Value::String(role)) => RoleMarker::Role(role.clone()),
            _ => RoleMarker::NoRole,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, RoleMarker::Role(role) if role == Self::ADMIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn role_is_read_from_metadata() {
        let user: UserRecord = serde_json::from_value(json!({
            "id": "user_1",
            "public_metadata": { "role": "admin" }
        }))
        .unwrap();
        assert_eq!(user.role(), RoleMarker::Role("admin".to_string()));
        assert!(user.role().is_admin());
    }

    #[test]
    fn absent_or_malformed_role_is_no_role() {
        let user: UserRecord = serde_json::from_value(json!({ "id": "user_1" })).unwrap();
        assert_eq!(user.role(), RoleMarker::NoRole);

        let user: UserRecord = serde_json::from_value(json!({
            "id": "user_1",
            "public_metadata": { "role": ["admin"] }
        }))
        .unwrap();
        assert_eq!(user.role(), RoleMarker::NoRole);
    }

    #[test]
    fn other_roles_are_not_admin() {
        assert!(!RoleMarker::Role("instructor".to_string()).is_admin());
        assert!(!RoleMarker::Role("Admin".to_string()).is_admin());
    }

    #[test]
    fn primary_email_prefers_flagged_address() {
        let user: UserRecord = serde_json::from_value(json!({
            "id": "user_1",
            "primary_email_address_id": "idn_2",
            "email_addresses": [
                { "id": "idn_1", "email_address": "old@example.com" },
                { "id": "idn_2", "email_address": "new@example.com" }
            ]
        }))
        .unwrap();
        assert_eq!(user.primary_email(), Some("new@example.com"));
    }

    #[test]
    fn primary_email_falls_back_to_first() {
        let user: UserRecord = serde_json::from_value(json!({
            "id": "user_1",
            "email_addresses": [
                { "id": "idn_1", "email_address": "first@example.com" },
                { "id": "idn_2", "email_address": "second@example.com" }
            ]
        }))
        .unwrap();
        assert_eq!(user.primary_email(), Some("first@example.com"));

        let user: UserRecord = serde_json::from_value(json!({ "id": "user_2" })).unwrap();
        assert_eq!(user.primary_email(), None);
    }
}
