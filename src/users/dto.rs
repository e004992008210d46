use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::users::repo::User;

/// Sanitized user projection: the credential fields (password hash, refresh
/// token) never leave the server.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar_url: String,
    pub cover_image_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            full_name: u.full_name,
            avatar_url: u.avatar_url,
            cover_image_url: u.cover_image_url,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        let now = OffsetDateTime::now_utc();
        User {
            id: Uuid::new_v4(),
            username: "alice".into(),
            email: "a@x.com".into(),
            full_name: "Alice A".into(),
            password_hash: "$argon2id$stub".into(),
            avatar_url: "https://media.fake.local/avatars/a.jpg".into(),
            cover_image_url: Some("https://media.fake.local/covers/a.jpg".into()),
            refresh_token: Some("live-token".into()),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn public_user_omits_credential_fields() {
        let public: PublicUser = sample_user().into();
        let json = serde_json::to_value(&public).unwrap();
        let obj = json.as_object().unwrap();
        assert!(!obj.contains_key("password"));
        assert!(!obj.contains_key("passwordHash"));
        assert!(!obj.contains_key("refreshToken"));
        assert_eq!(json["username"], "alice");
        assert_eq!(json["fullName"], "Alice A");
        assert_eq!(json["avatarUrl"], "https://media.fake.local/avatars/a.jpg");
    }

    #[test]
    fn user_record_never_serializes_credentials() {
        // even the raw record strips them if it is ever serialized directly
        let json = serde_json::to_value(sample_user()).unwrap();
        let obj = json.as_object().unwrap();
        assert!(!obj.contains_key("password_hash"));
        assert!(!obj.contains_key("refresh_token"));
    }
}
