use bytes::Bytes;
use lazy_static::lazy_static;
use regex::Regex;
use sqlx::PgPool;
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    auth::password::hash_password,
    error::ApiError,
    state::AppState,
    users::{
        dto::PublicUser,
        repo::{NewUser, User},
    },
};

pub struct UploadItem {
    pub body: Bytes,
    pub content_type: String,
}

pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password: String,
    pub avatar: Option<UploadItem>,
    pub cover_image: Option<UploadItem>,
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

/// Push one asset to the media host and return its public URL.
async fn upload_media(st: &AppState, prefix: &str, item: UploadItem) -> Result<String, ApiError> {
    let ext = ext_from_mime(&item.content_type).unwrap_or("bin");
    let key = format!("{}/{}.{}", prefix, Uuid::new_v4(), ext);
    let url = st
        .storage
        .put_object(&key, item.body, &item.content_type)
        .await
        .map_err(|e| {
            error!(error = %e, key = %key, "media upload failed");
            ApiError::UploadFailed("media upload failed".into())
        })?;
    if url.is_empty() {
        return Err(ApiError::UploadFailed(
            "media store returned no retrievable url".into(),
        ));
    }
    Ok(url)
}

fn unique_violation_to_conflict(e: anyhow::Error) -> ApiError {
    match e.downcast_ref::<sqlx::Error>() {
        Some(sqlx::Error::Database(db)) if db.code().as_deref() == Some("23505") => {
            ApiError::Conflict("username or email already registered".into())
        }
        _ => ApiError::Internal(e),
    }
}

pub async fn register(st: &AppState, input: RegisterInput) -> Result<PublicUser, ApiError> {
    for (name, value) in [
        ("username", &input.username),
        ("email", &input.email),
        ("fullName", &input.full_name),
        ("password", &input.password),
    ] {
        if value.trim().is_empty() {
            return Err(ApiError::Validation(format!("{name} is required")));
        }
    }
    if !is_valid_email(input.email.trim()) {
        return Err(ApiError::Validation("email is invalid".into()));
    }
    if input.password.len() < 8 {
        return Err(ApiError::Validation("password is too short".into()));
    }
    // the primary asset is mandatory; reject before touching the store
    let avatar = input
        .avatar
        .ok_or_else(|| ApiError::Validation("avatar file is required".into()))?;

    let username = input.username.trim().to_lowercase();
    let email = input.email.trim().to_lowercase();

    if User::exists_with_username_or_email(&st.db, &username, &email).await? {
        return Err(ApiError::Conflict(
            "username or email already registered".into(),
        ));
    }

    let avatar_url = upload_media(st, "avatars", avatar).await?;
    let cover_image_url = match input.cover_image {
        Some(item) => Some(upload_media(st, "covers", item).await?),
        None => None,
    };

    let password_hash = hash_password(&input.password)?;
    let user = User::create(
        &st.db,
        NewUser {
            username: &username,
            email: &email,
            full_name: input.full_name.trim(),
            password_hash: &password_hash,
            avatar_url: &avatar_url,
            cover_image_url: cover_image_url.as_deref(),
        },
    )
    .await
    // racing registration can still trip the unique index
    .map_err(unique_violation_to_conflict)?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(user.into())
}

pub async fn current_user(db: &PgPool, user_id: Uuid) -> Result<PublicUser, ApiError> {
    let user = User::find_by_id(db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".into()))?;
    Ok(user.into())
}

pub async fn update_account(
    db: &PgPool,
    user_id: Uuid,
    full_name: Option<String>,
    email: Option<String>,
) -> Result<PublicUser, ApiError> {
    let full_name = full_name.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    let email = email
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty());

    if full_name.is_none() && email.is_none() {
        return Err(ApiError::Validation("fullName or email is required".into()));
    }
    if let Some(email) = &email {
        if !is_valid_email(email) {
            return Err(ApiError::Validation("email is invalid".into()));
        }
    }

    let user = User::update_profile(db, user_id, full_name.as_deref(), email.as_deref())
        .await
        .map_err(unique_violation_to_conflict)?
        .ok_or_else(|| ApiError::NotFound("user not found".into()))?;

    info!(user_id = %user.id, "account details updated");
    Ok(user.into())
}

pub async fn update_avatar(
    st: &AppState,
    user_id: Uuid,
    file: Option<UploadItem>,
) -> Result<PublicUser, ApiError> {
    let file = file.ok_or_else(|| ApiError::Validation("avatar file is required".into()))?;
    let url = upload_media(st, "avatars", file).await?;
    let user = User::set_avatar_url(&st.db, user_id, &url)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".into()))?;
    info!(user_id = %user.id, "avatar updated");
    Ok(user.into())
}

pub async fn update_cover_image(
    st: &AppState,
    user_id: Uuid,
    file: Option<UploadItem>,
) -> Result<PublicUser, ApiError> {
    let file = file.ok_or_else(|| ApiError::Validation("coverImage file is required".into()))?;
    let url = upload_media(st, "covers", file).await?;
    let user = User::set_cover_image_url(&st.db, user_id, &url)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".into()))?;
    info!(user_id = %user.id, "cover image updated");
    Ok(user.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;

    fn base_input() -> RegisterInput {
        RegisterInput {
            username: "Alice".into(),
            email: "a@x.com".into(),
            full_name: "Alice A".into(),
            password: "p1-long-enough".into(),
            avatar: Some(UploadItem {
                body: Bytes::from_static(b"fake-image"),
                content_type: "image/png".into(),
            }),
            cover_image: None,
        }
    }

    #[test]
    fn email_pattern() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last@sub.domain.org"));
        assert!(!is_valid_email("missing-at.com"));
        assert!(!is_valid_email("no@tld"));
        assert!(!is_valid_email("spaces in@x.com"));
    }

    #[test]
    fn ext_mapping() {
        assert_eq!(ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/jpg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/png"), Some("png"));
        assert_eq!(ext_from_mime("image/webp"), Some("webp"));
        assert_eq!(ext_from_mime("image/heic"), Some("heic"));
        assert_eq!(ext_from_mime("application/octet-stream"), None);
    }

    #[tokio::test]
    async fn register_names_the_missing_field() {
        let st = AppState::fake();
        let mut input = base_input();
        input.username = "  ".into();
        let err = register(&st, input).await.unwrap_err();
        match err {
            ApiError::Validation(msg) => assert!(msg.contains("username")),
            other => panic!("expected validation error, got {other:?}"),
        }

        let mut input = base_input();
        input.full_name = String::new();
        let err = register(&st, input).await.unwrap_err();
        match err {
            ApiError::Validation(msg) => assert!(msg.contains("fullName")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn register_rejects_invalid_email() {
        let st = AppState::fake();
        let mut input = base_input();
        input.email = "not-an-email".into();
        let err = register(&st, input).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn register_rejects_short_password() {
        let st = AppState::fake();
        let mut input = base_input();
        input.password = "short".into();
        let err = register(&st, input).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn register_requires_avatar_before_any_store_access() {
        let st = AppState::fake();
        let mut input = base_input();
        input.avatar = None;
        // the fake pool never connects, so reaching the db would error with
        // Internal instead of Validation
        let err = register(&st, input).await.unwrap_err();
        match err {
            ApiError::Validation(msg) => assert!(msg.contains("avatar")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn update_account_requires_some_field() {
        let st = AppState::fake();
        let err = update_account(&st.db, Uuid::new_v4(), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let err = update_account(&st.db, Uuid::new_v4(), Some("   ".into()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn update_avatar_requires_a_file() {
        let st = AppState::fake();
        let err = update_avatar(&st, Uuid::new_v4(), None).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn upload_media_builds_namespaced_key() {
        let st = AppState::fake();
        let url = upload_media(
            &st,
            "avatars",
            UploadItem {
                body: Bytes::from_static(b"img"),
                content_type: "image/webp".into(),
            },
        )
        .await
        .unwrap();
        assert!(url.starts_with("https://media.fake.local/avatars/"));
        assert!(url.ends_with(".webp"));
    }
}
