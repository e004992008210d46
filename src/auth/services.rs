//! Session lifecycle: login, refresh-token rotation, logout, password change.
//!
//! A user holds at most one live refresh token. Login and refresh overwrite
//! it unconditionally (single-session model); logout clears it. A presented
//! refresh token is only honored while it equals the stored value, so any
//! token superseded by a rotation is permanently dead.

use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        jwt::JwtKeys,
        password::{hash_password, verify_password},
    },
    error::ApiError,
    users::{dto::PublicUser, repo::User},
};

#[derive(Debug)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

pub struct LoginInput {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: String,
}

fn normalize(identifier: Option<String>) -> Option<String> {
    identifier
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
}

/// Sign a fresh access/refresh pair and persist the refresh token on the user
/// row, replacing whatever was there.
pub async fn issue_token_pair(
    db: &PgPool,
    keys: &JwtKeys,
    user: &User,
) -> Result<TokenPair, ApiError> {
    let access_token = keys.sign_access(user)?;
    let refresh_token = keys.sign_refresh(user.id)?;
    User::set_refresh_token(db, user.id, Some(&refresh_token)).await?;
    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

pub async fn login(
    db: &PgPool,
    keys: &JwtKeys,
    input: LoginInput,
) -> Result<(PublicUser, TokenPair), ApiError> {
    let username = normalize(input.username);
    let email = normalize(input.email);
    if username.is_none() && email.is_none() {
        return Err(ApiError::Validation("username or email is required".into()));
    }
    if input.password.is_empty() {
        return Err(ApiError::Validation("password is required".into()));
    }

    let user = User::find_by_identifier(db, username.as_deref(), email.as_deref())
        .await?
        .ok_or_else(|| {
            warn!("login: no matching user");
            ApiError::InvalidCredentials
        })?;

    if !verify_password(&input.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login: password mismatch");
        return Err(ApiError::InvalidCredentials);
    }

    let pair = issue_token_pair(db, keys, &user).await?;
    info!(user_id = %user.id, username = %user.username, "user logged in");
    Ok((user.into(), pair))
}

/// Exchange a presented refresh token for a new pair. The old token becomes
/// invalid the moment the new one is persisted.
pub async fn refresh_session(
    db: &PgPool,
    keys: &JwtKeys,
    presented: Option<String>,
) -> Result<TokenPair, ApiError> {
    let presented = presented
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("refresh token is required".into()))?;

    let claims = keys.verify_refresh(&presented).map_err(|_| {
        warn!("refresh: token failed verification");
        ApiError::TokenInvalid
    })?;

    let user = User::find_by_id(db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("unknown user".into()))?;

    // Must match the stored value exactly; a mismatch means the token was
    // rotated away, or the session was logged out.
    match user.refresh_token.as_deref() {
        Some(stored) if stored == presented => {}
        _ => {
            warn!(user_id = %user.id, "refresh: presented token does not match stored value");
            return Err(ApiError::TokenExpiredOrReused);
        }
    }

    let pair = issue_token_pair(db, keys, &user).await?;
    info!(user_id = %user.id, "refresh token rotated");
    Ok(pair)
}

/// Idempotent: clearing an already-clear token is still a success.
pub async fn logout(db: &PgPool, user_id: Uuid) -> Result<(), ApiError> {
    User::set_refresh_token(db, user_id, None).await?;
    info!(user_id = %user_id, "user logged out");
    Ok(())
}

/// Changing the password leaves the stored refresh token untouched, so an
/// existing session survives the change.
pub async fn change_password(
    db: &PgPool,
    user_id: Uuid,
    old_password: &str,
    new_password: &str,
) -> Result<(), ApiError> {
    if new_password.len() < 8 {
        return Err(ApiError::Validation("new password is too short".into()));
    }

    let user = User::find_by_id(db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".into()))?;

    if !verify_password(old_password, &user.password_hash)? {
        warn!(user_id = %user.id, "change password: old password mismatch");
        return Err(ApiError::InvalidCredentials);
    }

    let hash = hash_password(new_password)?;
    User::set_password_hash(db, user_id, &hash).await?;
    info!(user_id = %user_id, "password changed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;
    use axum::extract::FromRef;

    fn fixtures() -> (AppState, JwtKeys) {
        let state = AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        (state, keys)
    }

    #[tokio::test]
    async fn login_requires_an_identifier() {
        let (state, keys) = fixtures();
        let err = login(
            &state.db,
            &keys,
            LoginInput {
                username: None,
                email: None,
                password: "secret123".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn login_blank_identifier_counts_as_missing() {
        let (state, keys) = fixtures();
        let err = login(
            &state.db,
            &keys,
            LoginInput {
                username: Some("   ".into()),
                email: None,
                password: "secret123".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn login_requires_a_password() {
        let (state, keys) = fixtures();
        let err = login(
            &state.db,
            &keys,
            LoginInput {
                username: Some("alice".into()),
                email: None,
                password: String::new(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn refresh_without_token_is_unauthorized() {
        let (state, keys) = fixtures();
        let err = refresh_session(&state.db, &keys, None).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));

        let err = refresh_session(&state.db, &keys, Some(String::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn refresh_with_unverifiable_token_is_token_invalid() {
        let (state, keys) = fixtures();
        let err = refresh_session(&state.db, &keys, Some("garbage.token.value".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::TokenInvalid));
    }

    #[tokio::test]
    async fn change_password_rejects_short_replacement() {
        let (state, _) = fixtures();
        let err = change_password(&state.db, Uuid::new_v4(), "old-secret", "short")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
