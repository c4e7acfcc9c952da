use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "snake_case")]
pub enum ContactState {
    Pending,
    Accepted,
    Denied,
    #[default]
    NotSent,
}

/// A contact request between two users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Contact {
    pub id: i64,
    #[serde(default)]
    pub state: ContactState,
    pub receiver: i64,
    pub sender: i64,
}

/// Another user as listed by the contacts endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ContactUser {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub profile_picture: Option<String>,
}
