// src/models/user.rs
use serde::{Deserialize, Serialize};

use super::identity::{RecordId, lenient};

/// The signed-in account as reported by the backend's `me` endpoint.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(alias = "_id")]
    pub id: RecordId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub is_driver: Option<bool>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub role: Option<String>, // Older accounts carry "driver" here instead of isDriver
}

impl UserProfile {
    pub fn is_driver(&self) -> bool {
        self.is_driver.unwrap_or(false)
            || self
                .role
                .as_deref()
                .is_some_and(|role| role.trim().eq_ignore_ascii_case("driver"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_flag_and_legacy_role() {
        let flagged: UserProfile =
            serde_json::from_str(r#"{"_id": "u1", "isDriver": true}"#).unwrap();
        assert!(flagged.is_driver());

        let legacy: UserProfile = serde_json::from_str(r#"{"id": 5, "role": "DRIVER"}"#).unwrap();
        assert!(legacy.is_driver());

        let rider: UserProfile = serde_json::from_str(r#"{"id": "u3"}"#).unwrap();
        assert!(!rider.is_driver());
    }
}
