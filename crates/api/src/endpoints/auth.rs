//! Account endpoints: registration, tokens and the caller's own profile.

use axum::{
    Json, Router,
    extract::{Multipart, State},
    routing::{get, post},
};
use buddy_common::{AppError, AppResult, MediaFolder};
use buddy_core::{RegisterInput, TokenKind, UpdateProfileInput};
use serde::{Deserialize, Serialize};

use super::users::{UserResponse, UserSummary};
use crate::{
    extractors::{AuthUser, MultipartForm},
    middleware::AppState,
    response::{ApiResponse, MessageResponse},
};

/// Registration response.
#[derive(Serialize)]
pub struct RegisterResponse {
    pub user: UserResponse,
    pub message: String,
}

/// Create a new account.
async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterInput>,
) -> AppResult<ApiResponse<RegisterResponse>> {
    let user = state.user_service.register(input).await?;
    let view = state.user_service.profile(&user.id.clone(), user).await?;

    Ok(ApiResponse::created(RegisterResponse {
        user: UserResponse::new(view, &state),
        message: "User registered successfully".to_string(),
    }))
}

/// Login request.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login response.
#[derive(Serialize)]
pub struct LoginResponse {
    pub access: String,
    pub refresh: String,
    pub user: UserSummary,
}

/// Exchange credentials for a token pair and mark the user online.
async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<ApiResponse<LoginResponse>> {
    let user = state
        .user_service
        .authenticate(&req.email, &req.password)
        .await?;

    let tokens = state.token_service.issue_pair(&user.id)?;
    state.presence_service.mark_online(&user.id).await?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(ApiResponse::ok(LoginResponse {
        access: tokens.access,
        refresh: tokens.refresh,
        user: UserSummary::new(&user, &state),
    }))
}

/// Token refresh request.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

/// Token refresh response.
#[derive(Serialize)]
pub struct RefreshResponse {
    pub access: String,
}

/// Issue a new access token for a valid refresh token.
async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> AppResult<ApiResponse<RefreshResponse>> {
    let claims = state.token_service.verify(&req.refresh, TokenKind::Refresh)?;
    let user = state.user_service.get_active(&claims.sub).await?;

    Ok(ApiResponse::ok(RefreshResponse {
        access: state.token_service.issue_access(&user.id)?,
    }))
}

/// Mark the caller offline.
async fn logout(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<MessageResponse>> {
    state.presence_service.mark_offline(&user.id).await?;
    Ok(ApiResponse::ok(MessageResponse::new("Logged out successfully")))
}

/// The caller's own profile.
async fn profile(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<UserResponse>> {
    let view = state.user_service.profile(&user.id.clone(), user).await?;
    Ok(ApiResponse::ok(UserResponse::new(view, &state)))
}

/// Update the caller's profile text fields.
async fn update_profile(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<UpdateProfileInput>,
) -> AppResult<ApiResponse<UserResponse>> {
    let updated = state.user_service.update_profile(user, input).await?;
    let view = state.user_service.profile(&updated.id.clone(), updated).await?;
    Ok(ApiResponse::ok(UserResponse::new(view, &state)))
}

async fn read_image(
    state: &AppState,
    user_id: &str,
    folder: MediaFolder,
    multipart: Multipart,
) -> AppResult<String> {
    let form = MultipartForm::read(multipart, "image").await?;
    let upload = form
        .image
        .ok_or_else(|| AppError::Validation("No file was submitted.".to_string()))?;
    let file = state
        .media_service
        .store_image(folder, user_id, &upload)
        .await?;
    Ok(file.key)
}

/// Upload a new profile picture.
async fn upload_picture(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<ApiResponse<UserResponse>> {
    let key = read_image(&state, &user.id, MediaFolder::ProfilePictures, multipart).await?;
    let (updated, previous) = state.user_service.set_profile_picture(user, key).await?;
    state.media_service.discard(previous.as_deref()).await;

    let view = state.user_service.profile(&updated.id.clone(), updated).await?;
    Ok(ApiResponse::ok(UserResponse::new(view, &state)))
}

/// Upload a new cover photo.
async fn upload_cover(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<ApiResponse<UserResponse>> {
    let key = read_image(&state, &user.id, MediaFolder::CoverPhotos, multipart).await?;
    let (updated, previous) = state.user_service.set_cover_photo(user, key).await?;
    state.media_service.discard(previous.as_deref()).await;

    let view = state.user_service.profile(&updated.id.clone(), updated).await?;
    Ok(ApiResponse::ok(UserResponse::new(view, &state)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/token/refresh", post(refresh))
        .route("/logout", post(logout))
        .route(
            "/profile",
            get(profile).put(update_profile).patch(update_profile),
        )
        .route("/profile/picture", post(upload_picture))
        .route("/profile/cover", post(upload_cover))
}
