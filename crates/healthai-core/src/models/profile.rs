//! User profile model.

use serde::{Deserialize, Serialize};

use super::new_id;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationSettings {
    pub enabled: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// The single profile belonging to an identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub age: String,
    #[serde(default)]
    pub weight: String,
    #[serde(default)]
    pub blood_type: String,
    #[serde(default)]
    pub notifications: NotificationSettings,
}

impl UserProfile {
    /// Create a blank profile with notifications on.
    pub fn new(name: String, email: String) -> Self {
        Self {
            id: new_id(),
            name,
            email,
            phone: String::new(),
            age: String::new(),
            weight: String::new(),
            blood_type: String::new(),
            notifications: NotificationSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_profile() {
        let profile = UserProfile::new("Pat".into(), "pat@example.com".into());
        assert!(profile.notifications.enabled);
        assert!(profile.phone.is_empty());
    }

    #[test]
    fn test_wire_format() {
        let profile = UserProfile::new("Pat".into(), "pat@example.com".into());
        let json = serde_json::to_value(&profile).unwrap();
        assert!(json.get("bloodType").is_some());
        assert_eq!(json["notifications"]["enabled"], true);
    }
}
