use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Online,
    #[default]
    Offline,
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserStatus::Online => f.write_str("online"),
            UserStatus::Offline => f.write_str("offline"),
        }
    }
}

/// The signed-in account.
///
/// Derived from the access token on demand and kept only in memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct AuthenticatedUser {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub status: UserStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
}

impl AuthenticatedUser {
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.email
        } else {
            &self.name
        }
    }

    pub fn is_online(&self) -> bool {
        self.status == UserStatus::Online
    }
}

/// Registration payload for a new account.
#[derive(Clone, Serialize)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(rename = "re_password")]
    pub password_confirmation: String,
}

impl fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewAccount")
            .field("name", &self.name)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_me_response() {
        let json = r#"{"id": 7, "name": "Ada", "email": "ada@example.com", "status": "online"}"#;
        let user: AuthenticatedUser = serde_json::from_str(json).unwrap();
        assert_eq!(user.id, 7);
        assert_eq!(user.display_name(), "Ada");
        assert!(user.is_online());
        assert_eq!(user.profile_picture, None);
    }

    #[test]
    fn test_missing_status_defaults_to_offline() {
        let json = r#"{"name": "", "email": "x@y.io", "id": 1, "profile_picture": "/media/x.png"}"#;
        let user: AuthenticatedUser = serde_json::from_str(json).unwrap();
        assert_eq!(user.status, UserStatus::Offline);
        assert_eq!(user.display_name(), "x@y.io");
        assert_eq!(user.profile_picture.as_deref(), Some("/media/x.png"));
    }

    #[test]
    fn test_new_account_wire_format() {
        let account = NewAccount {
            name: "ada".into(),
            email: "ada@example.com".into(),
            password: "pw".into(),
            password_confirmation: "pw".into(),
        };
        let value = serde_json::to_value(&account).unwrap();
        assert_eq!(value["re_password"], "pw");
        assert!(value.get("password_confirmation").is_none());
        assert!(!format!("{:?}", account).contains("pw"));
    }
}
