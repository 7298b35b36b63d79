//! Public user profiles.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::de::null_as_default;
use crate::ids::{ProfileId, UserId};
use crate::validate::validate_username;
use crate::ValidationError;

/// Longest accepted bio.
pub const MAX_BIO_LEN: usize = 500;

const DEFAULT_BIO: &str = "Welcome to my profile!";
const DEFAULT_FULL_NAME: &str = "New User";
const AVATAR_SEED_URL: &str = "https://api.dicebear.com/7.x/avataaars/svg?seed=";

/// A profile row, one per authenticated identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    pub user_id: UserId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub review_count: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub comment_count: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub like_count: u32,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Profile {
    /// Name shown next to reviews and comments.
    pub fn display_name(&self) -> &str {
        match self.full_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.username,
        }
    }
}

/// Profile created the first time a signed-in user has none.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewProfile {
    pub user_id: UserId,
    pub username: String,
    pub full_name: String,
    pub bio: String,
    pub avatar_url: String,
    pub review_count: u32,
    pub comment_count: u32,
    pub like_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewProfile {
    /// Defaults for a user that has never saved a profile.
    pub fn default_for(user_id: &UserId, full_name: Option<&str>, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.clone(),
            username: generate_username(),
            full_name: full_name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or(DEFAULT_FULL_NAME)
                .to_string(),
            bio: DEFAULT_BIO.to_string(),
            avatar_url: format!("{}{}", AVATAR_SEED_URL, user_id),
            review_count: 0,
            comment_count: 0,
            like_count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Placeholder username: `user_` plus nine base-36 characters.
pub fn generate_username() -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("user_{}", suffix)
}

/// Partial profile update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProfilePatch {
    /// Patch that only swaps the avatar.
    pub fn avatar(url: impl Into<String>) -> Self {
        Self {
            avatar_url: Some(url.into()),
            ..Default::default()
        }
    }

    /// Stamp the patch with its write time.
    pub fn touched(mut self, now: DateTime<Utc>) -> Self {
        self.updated_at = Some(now);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(username) = &self.username {
            validate_username(username)?;
        }
        if let Some(bio) = &self.bio {
            if bio.chars().count() > MAX_BIO_LEN {
                return Err(ValidationError::TooLong {
                    field: "Bio",
                    max: MAX_BIO_LEN,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_username_shape() {
        let name = generate_username();
        assert!(name.starts_with("user_"));
        assert_eq!(name.len(), 14);
        assert!(name[5..].chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(validate_username(&name).is_ok());
    }

    #[test]
    fn test_default_profile() {
        let user = UserId::new("abc-123");
        let now = Utc::now();
        let profile = NewProfile::default_for(&user, None, now);
        assert_eq!(profile.full_name, "New User");
        assert_eq!(profile.bio, "Welcome to my profile!");
        assert_eq!(
            profile.avatar_url,
            "https://api.dicebear.com/7.x/avataaars/svg?seed=abc-123"
        );
        assert_eq!(profile.review_count, 0);

        let named = NewProfile::default_for(&user, Some("Ada Lovelace"), now);
        assert_eq!(named.full_name, "Ada Lovelace");
    }

    #[test]
    fn test_display_name_falls_back_to_username() {
        let mut profile: Profile = serde_json::from_value(serde_json::json!({
            "id": 1, "user_id": "u1", "username": "gadget_fan", "full_name": null
        }))
        .unwrap();
        assert_eq!(profile.display_name(), "gadget_fan");

        profile.full_name = Some("Grace".to_string());
        assert_eq!(profile.display_name(), "Grace");
    }

    #[test]
    fn test_patch_validation() {
        let long_bio = ProfilePatch {
            bio: Some("x".repeat(MAX_BIO_LEN + 1)),
            ..Default::default()
        };
        assert!(long_bio.validate().is_err());
        assert!(ProfilePatch::avatar("https://cdn/a.png").validate().is_ok());
    }
}
