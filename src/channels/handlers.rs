use axum::{
    extract::{Path, State},
    routing::get,
    Router,
};
use tracing::instrument;

use crate::{
    auth::jwt::AuthUser,
    channels::{
        dto::{ChannelProfile, WatchedVideo},
        repo,
    },
    error::ApiError,
    response::ApiResponse,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/c/:username", get(channel_profile))
        .route("/history", get(watch_history))
}

#[instrument(skip(state))]
pub async fn channel_profile(
    State(state): State<AppState>,
    AuthUser(requester_id): AuthUser,
    Path(username): Path<String>,
) -> Result<ApiResponse<ChannelProfile>, ApiError> {
    let username = username.trim().to_lowercase();
    if username.is_empty() {
        return Err(ApiError::NotFound("channel does not exist".into()));
    }

    let profile = repo::channel_profile(&state.db, &username, requester_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("channel does not exist".into()))?;

    Ok(ApiResponse::ok(
        profile.into(),
        "user channel fetched successfully",
    ))
}

#[instrument(skip(state))]
pub async fn watch_history(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<ApiResponse<Vec<WatchedVideo>>, ApiError> {
    let rows = repo::watch_history(&state.db, user_id).await?;
    let videos = rows.into_iter().map(WatchedVideo::from).collect();
    Ok(ApiResponse::ok(
        videos,
        "watch history fetched successfully",
    ))
}
