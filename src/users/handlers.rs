use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::{get, patch, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::jwt::AuthUser,
    error::ApiError,
    response::ApiResponse,
    state::AppState,
    users::{
        dto::{PublicUser, UpdateAccountRequest},
        services::{self, RegisterInput, UploadItem},
    },
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/update-avatar", patch(update_avatar))
        .route("/update-coverImage", patch(update_cover_image))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024)) // 20MB
        .route("/current-user", get(current_user))
        .route("/update-account", patch(update_account))
}

fn bad_multipart(e: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::Validation(format!("malformed multipart body: {e}"))
}

async fn read_file_field(
    field: axum::extract::multipart::Field<'_>,
) -> Result<UploadItem, ApiError> {
    let content_type = field
        .content_type()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "application/octet-stream".into());
    let body = field.bytes().await.map_err(bad_multipart)?;
    Ok(UploadItem { body, content_type })
}

/// Pull the one file out of a single-file multipart body, whatever the field
/// is named.
async fn single_file(mut mp: Multipart) -> Result<Option<UploadItem>, ApiError> {
    while let Some(field) = mp.next_field().await.map_err(bad_multipart)? {
        if field.file_name().is_some() || field.content_type().is_some() {
            return Ok(Some(read_file_field(field).await?));
        }
    }
    Ok(None)
}

#[instrument(skip(state, mp))]
pub async fn register(
    State(state): State<AppState>,
    mut mp: Multipart,
) -> Result<ApiResponse<PublicUser>, ApiError> {
    let mut input = RegisterInput {
        username: String::new(),
        email: String::new(),
        full_name: String::new(),
        password: String::new(),
        avatar: None,
        cover_image: None,
    };

    while let Some(field) = mp.next_field().await.map_err(bad_multipart)? {
        match field.name() {
            Some("username") => input.username = field.text().await.map_err(bad_multipart)?,
            Some("email") => input.email = field.text().await.map_err(bad_multipart)?,
            Some("fullName") => input.full_name = field.text().await.map_err(bad_multipart)?,
            Some("password") => input.password = field.text().await.map_err(bad_multipart)?,
            Some("avatar") => input.avatar = Some(read_file_field(field).await?),
            Some("coverImage") => input.cover_image = Some(read_file_field(field).await?),
            _ => {}
        }
    }

    let user = services::register(&state, input).await?;
    Ok(ApiResponse::ok(user, "user created successfully"))
}

#[instrument(skip(state))]
pub async fn current_user(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<ApiResponse<PublicUser>, ApiError> {
    let user = services::current_user(&state.db, user_id).await?;
    Ok(ApiResponse::ok(user, "current user fetched successfully"))
}

#[instrument(skip(state, payload))]
pub async fn update_account(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdateAccountRequest>,
) -> Result<ApiResponse<PublicUser>, ApiError> {
    let user =
        services::update_account(&state.db, user_id, payload.full_name, payload.email).await?;
    Ok(ApiResponse::ok(user, "account updated successfully"))
}

#[instrument(skip(state, mp))]
pub async fn update_avatar(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mp: Multipart,
) -> Result<ApiResponse<PublicUser>, ApiError> {
    let file = single_file(mp).await?;
    let user = services::update_avatar(&state, user_id, file).await?;
    Ok(ApiResponse::ok(user, "avatar updated successfully"))
}

#[instrument(skip(state, mp))]
pub async fn update_cover_image(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mp: Multipart,
) -> Result<ApiResponse<PublicUser>, ApiError> {
    let file = single_file(mp).await?;
    let user = services::update_cover_image(&state, user_id, file).await?;
    Ok(ApiResponse::ok(user, "cover image updated successfully"))
}
