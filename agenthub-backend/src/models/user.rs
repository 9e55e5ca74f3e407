use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered account. Email is the unique identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: String,
    pub profile_image_path: Option<String>,
    pub profile_updated_at: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Short display name: everything before the '@' when no full name is set.
    pub fn short_name(&self) -> &str {
        if !self.full_name.is_empty() {
            return &self.full_name;
        }
        self.email.split('@').next().unwrap_or(&self.email)
    }

    pub fn profile_image_url(&self) -> String {
        self.profile_image_path
            .clone()
            .unwrap_or_else(|| "/media/defaults/profile.png".to_string())
    }
}

/// Bearer-token session row. Tokens are opaque 32-byte hex strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub id: i64,
    pub token: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AuthSession {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_user(full_name: &str) -> User {
        let now = Utc::now();
        User {
            id: 1,
            email: "jordan@example.com".to_string(),
            password_hash: String::new(),
            full_name: full_name.to_string(),
            profile_image_path: None,
            profile_updated_at: now,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn short_name_falls_back_to_email_prefix() {
        assert_eq!(sample_user("").short_name(), "jordan");
        assert_eq!(sample_user("Jordan Li").short_name(), "Jordan Li");
    }

    #[test]
    fn session_expiry() {
        let now = Utc::now();
        let session = AuthSession {
            id: 1,
            token: "abc".to_string(),
            user_id: 1,
            created_at: now,
            expires_at: now + Duration::hours(1),
        };
        assert!(!session.is_expired(now));
        assert!(session.is_expired(now + Duration::hours(2)));
    }
}
