//! User profile and search endpoints.

use axum::{
    Router,
    extract::{Path, Query, State},
    routing::get,
};
use buddy_common::AppResult;
use buddy_core::{FriendshipLabel, ProfileView};
use buddy_db::entities::user;
use serde::{Deserialize, Serialize};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Compact user, embedded in posts, comments, likes and friend requests.
#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub profile_picture_url: Option<String>,
}

impl UserSummary {
    pub fn new(user: &user::Model, state: &AppState) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            full_name: user.full_name(),
            profile_picture_url: user.profile_picture.as_deref().map(|k| state.media_url(k)),
        }
    }
}

/// Full profile.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub bio: String,
    pub profile_picture_url: Option<String>,
    pub cover_photo_url: Option<String>,
    pub location: String,
    pub website: String,
    pub is_online: bool,
    pub last_seen: Option<String>,
    pub date_joined: String,
    pub posts_count: u64,
    pub friends_count: u64,
    pub friendship_status: FriendshipLabel,
}

impl UserResponse {
    pub fn new(view: ProfileView, state: &AppState) -> Self {
        let user = view.user;
        Self {
            full_name: user.full_name(),
            profile_picture_url: user.profile_picture.as_deref().map(|k| state.media_url(k)),
            cover_photo_url: user.cover_photo.as_deref().map(|k| state.media_url(k)),
            last_seen: user.last_seen.map(|t| t.to_rfc3339()),
            date_joined: user.date_joined.to_rfc3339(),
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            bio: user.bio,
            location: user.location,
            website: user.website,
            is_online: user.is_online,
            posts_count: view.posts_count,
            friends_count: view.friends_count,
            friendship_status: view.friendship_status,
        }
    }
}

/// Build full profiles for a list of users as seen by `viewer_id`.
pub async fn profiles(
    state: &AppState,
    viewer_id: &str,
    users: Vec<user::Model>,
) -> AppResult<Vec<UserResponse>> {
    Ok(state
        .user_service
        .profiles(viewer_id, users)
        .await?
        .into_iter()
        .map(|view| UserResponse::new(view, state))
        .collect())
}

/// Get any user's profile.
async fn show(
    AuthUser(viewer): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<UserResponse>> {
    let subject = state.user_service.get(&id).await?;
    let view = state.user_service.profile(&viewer.id, subject).await?;
    Ok(ApiResponse::ok(UserResponse::new(view, &state)))
}

/// Search query.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// Search other users by name or email.
async fn search(
    AuthUser(viewer): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<ApiResponse<Vec<UserResponse>>> {
    let users = state.user_service.search(&viewer.id, &query.q).await?;
    Ok(ApiResponse::ok(profiles(&state, &viewer.id, users).await?))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/search", get(search))
        .route("/users/{id}", get(show))
}
