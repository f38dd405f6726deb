use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::de::deserialize_id;
use super::movie::Movie;

/// Genres offered when choosing preferences
pub const PREFERENCE_GENRES: [&str; 8] = [
    "Action",
    "Comedy",
    "Drama",
    "Horror",
    "Romance",
    "Sci-Fi",
    "Thriller",
    "Documentary",
];

/// Languages offered when choosing preferences
pub const PREFERENCE_LANGUAGES: [&str; 6] =
    ["Hindi", "English", "Tamil", "Telugu", "Malayalam", "Kannada"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    #[serde(rename = "_id", alias = "id", deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Response of `POST /auth/login`
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

/// Response of `POST /auth/signup`. Some deployments log the new account in
/// directly, others only confirm creation.
#[derive(Debug, Clone, Deserialize)]
pub struct SignupResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Preferences {
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
}

impl Preferences {
    pub fn is_empty(&self) -> bool {
        self.genres.is_empty() && self.languages.is_empty()
    }
}

/// Response of `GET /users/preferences`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferencesStatus {
    #[serde(rename = "hasSetPreferences", default)]
    pub has_set_preferences: bool,
    #[serde(default)]
    pub preferences: Option<Preferences>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(rename = "_id", alias = "id", deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub preferences: Option<Preferences>,
    #[serde(rename = "ratedMovies", default)]
    pub rated_movies: Vec<Movie>,
}

impl UserProfile {
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or("(unnamed)")
    }

    /// "Member since" date, e.g. "March 2024"
    pub fn member_since(&self) -> Option<String> {
        self.created_at.map(|dt| dt.format("%B %Y").to_string())
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ProfileUpdateError {
    #[error("Name cannot be empty")]
    EmptyName,

    #[error("New passwords do not match")]
    PasswordMismatch,

    #[error("Current password is required to change password")]
    MissingCurrentPassword,
}

/// Body of `PUT /users/update`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub name: String,
    #[serde(rename = "currentPassword", skip_serializing_if = "Option::is_none")]
    pub current_password: Option<String>,
    #[serde(rename = "newPassword", skip_serializing_if = "Option::is_none")]
    pub new_password: Option<String>,
}

impl ProfileUpdate {
    pub fn rename(name: &str) -> Result<Self, ProfileUpdateError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ProfileUpdateError::EmptyName);
        }
        Ok(Self {
            name: name.to_string(),
            current_password: None,
            new_password: None,
        })
    }

    /// Add a password change. An empty new password means "keep the current one".
    pub fn with_password_change(
        mut self,
        current: &str,
        new: &str,
        confirm: &str,
    ) -> Result<Self, ProfileUpdateError> {
        if new.is_empty() {
            return Ok(self);
        }
        if new != confirm {
            return Err(ProfileUpdateError::PasswordMismatch);
        }
        if current.is_empty() {
            return Err(ProfileUpdateError::MissingCurrentPassword);
        }
        self.current_password = Some(current.to_string());
        self.new_password = Some(new.to_string());
        Ok(self)
    }

    pub fn changes_password(&self) -> bool {
        self.new_password.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_auth_response() {
        let json = r#"{"token": "eyJhbGciOiJIUzI1NiJ9.x.y", "user": {"id": "u1", "name": "Asha", "email": "asha@example.com"}}"#;
        let auth: AuthResponse = serde_json::from_str(json).expect("parse auth");
        assert_eq!(auth.user.id, "u1");
        assert_eq!(auth.user.name.as_deref(), Some("Asha"));
    }

    #[test]
    fn test_parse_profile() {
        let json = r#"{
            "_id": "u1",
            "name": "Asha",
            "email": "asha@example.com",
            "createdAt": "2024-03-05T09:30:00.000Z",
            "preferences": {"genres": ["Drama"], "languages": ["Hindi"]},
            "ratedMovies": [{"_id": "m1", "title": "Dangal"}]
        }"#;
        let profile: UserProfile = serde_json::from_str(json).expect("parse profile");
        assert_eq!(profile.display_name(), "Asha");
        assert_eq!(profile.member_since().as_deref(), Some("March 2024"));
        assert_eq!(profile.rated_movies.len(), 1);
        assert_eq!(
            profile.preferences.unwrap().languages,
            vec!["Hindi".to_string()]
        );
    }

    #[test]
    fn test_parse_preferences_status_defaults() {
        let status: PreferencesStatus = serde_json::from_str("{}").expect("parse status");
        assert!(!status.has_set_preferences);
        assert!(status.preferences.is_none());
    }

    #[test]
    fn test_profile_update_rename_only() {
        let update = ProfileUpdate::rename("  Asha  ").unwrap();
        assert_eq!(update.name, "Asha");
        assert!(!update.changes_password());
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            serde_json::json!({ "name": "Asha" })
        );
        assert_eq!(ProfileUpdate::rename("   "), Err(ProfileUpdateError::EmptyName));
    }

    #[test]
    fn test_profile_update_password_validation() {
        let base = ProfileUpdate::rename("Asha").unwrap();

        assert_eq!(
            base.clone().with_password_change("old", "new1", "new2"),
            Err(ProfileUpdateError::PasswordMismatch)
        );
        assert_eq!(
            base.clone().with_password_change("", "new1", "new1"),
            Err(ProfileUpdateError::MissingCurrentPassword)
        );

        let unchanged = base.clone().with_password_change("", "", "").unwrap();
        assert!(!unchanged.changes_password());

        let update = base.with_password_change("old", "new1", "new1").unwrap();
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            serde_json::json!({ "name": "Asha", "currentPassword": "old", "newPassword": "new1" })
        );
    }
}
