use axum::{
    extract::{FromRef, State},
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        cookies::{self, ACCESS_COOKIE, REFRESH_COOKIE},
        dto::{
            ChangePasswordRequest, LoginRequest, LoginResponse, RefreshRequest, RefreshResponse,
        },
        jwt::{AuthUser, JwtKeys},
        services::{self, LoginInput, TokenPair},
    },
    error::ApiError,
    response::ApiResponse,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/refresh-token", post(refresh_token))
        .route("/change-password", post(change_password))
}

fn token_cookies(keys: &JwtKeys, pair: &TokenPair) -> HeaderMap {
    let mut headers = HeaderMap::new();
    cookies::append_set_cookie(
        &mut headers,
        &cookies::build_cookie(ACCESS_COOKIE, &pair.access_token, keys.access_ttl.as_secs() as i64),
    );
    cookies::append_set_cookie(
        &mut headers,
        &cookies::build_cookie(
            REFRESH_COOKIE,
            &pair.refresh_token,
            keys.refresh_ttl.as_secs() as i64,
        ),
    );
    headers
}

fn cleared_cookies() -> HeaderMap {
    let mut headers = HeaderMap::new();
    cookies::append_set_cookie(&mut headers, &cookies::clear_cookie(ACCESS_COOKIE));
    cookies::append_set_cookie(&mut headers, &cookies::clear_cookie(REFRESH_COOKIE));
    headers
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<(HeaderMap, ApiResponse<LoginResponse>), ApiError> {
    let keys = JwtKeys::from_ref(&state);
    let (user, pair) = services::login(
        &state.db,
        &keys,
        LoginInput {
            username: payload.username,
            email: payload.email,
            password: payload.password,
        },
    )
    .await?;

    let headers = token_cookies(&keys, &pair);
    Ok((
        headers,
        ApiResponse::ok(
            LoginResponse {
                user,
                access_token: pair.access_token,
                refresh_token: pair.refresh_token,
            },
            "user logged in successfully",
        ),
    ))
}

#[instrument(skip(state))]
pub async fn logout(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<(HeaderMap, ApiResponse<serde_json::Value>), ApiError> {
    services::logout(&state.db, user_id).await?;
    Ok((
        cleared_cookies(),
        ApiResponse::ok(serde_json::json!({}), "user logged out successfully"),
    ))
}

/// The refresh token may arrive in the cookie or the JSON body; the cookie
/// wins when both are present.
#[instrument(skip(state, headers, payload))]
pub async fn refresh_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Option<Json<RefreshRequest>>,
) -> Result<(HeaderMap, ApiResponse<RefreshResponse>), ApiError> {
    let presented = cookies::cookie_value(&headers, REFRESH_COOKIE)
        .or_else(|| payload.and_then(|Json(body)| body.refresh_token));

    let keys = JwtKeys::from_ref(&state);
    let pair = services::refresh_session(&state.db, &keys, presented).await?;

    let headers = token_cookies(&keys, &pair);
    Ok((
        headers,
        ApiResponse::ok(
            RefreshResponse {
                access_token: pair.access_token,
                refresh_token: pair.refresh_token,
            },
            "access token refreshed",
        ),
    ))
}

#[instrument(skip(state, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    services::change_password(
        &state.db,
        user_id,
        &payload.old_password,
        &payload.new_password,
    )
    .await?;
    Ok(ApiResponse::ok(
        serde_json::json!({}),
        "password updated successfully",
    ))
}
