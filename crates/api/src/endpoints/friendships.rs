//! Friendship endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get, post},
};
use buddy_common::AppResult;
use buddy_core::FriendshipView;
use buddy_db::entities::friendship::FriendshipStatus;
use serde::{Deserialize, Serialize};

use super::users::{UserResponse, UserSummary, profiles};
use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{ApiResponse, MessageResponse},
};

/// Friendship response.
#[derive(Serialize)]
pub struct FriendshipResponse {
    pub id: String,
    pub from_user: UserSummary,
    pub to_user: UserSummary,
    pub status: FriendshipStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl FriendshipResponse {
    fn new(view: &FriendshipView, state: &AppState) -> Self {
        Self {
            id: view.friendship.id.clone(),
            from_user: UserSummary::new(&view.from_user, state),
            to_user: UserSummary::new(&view.to_user, state),
            status: view.friendship.status,
            created_at: view.friendship.created_at.to_rfc3339(),
            updated_at: view.friendship.updated_at.to_rfc3339(),
        }
    }
}

/// The caller's friends.
async fn list_friends(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<UserResponse>>> {
    let friends = state.friendship_service.list_friends(&user.id).await?;
    Ok(ApiResponse::ok(profiles(&state, &user.id, friends).await?))
}

/// Pending requests the caller received.
async fn list_requests(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<FriendshipResponse>>> {
    let requests = state.friendship_service.list_pending_received(&user).await?;
    Ok(ApiResponse::ok(
        requests
            .iter()
            .map(|view| FriendshipResponse::new(view, &state))
            .collect(),
    ))
}

/// Send a friend request.
async fn send_request(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<ApiResponse<FriendshipResponse>> {
    let view = state.friendship_service.send_request(&user, &user_id).await?;
    Ok(ApiResponse::created(FriendshipResponse::new(&view, &state)))
}

/// Respond request.
#[derive(Debug, Deserialize)]
pub struct RespondRequest {
    #[serde(default)]
    pub action: String,
}

/// Respond response.
#[derive(Serialize)]
pub struct RespondResponse {
    pub message: String,
    pub friendship: FriendshipResponse,
}

/// Accept or reject a request addressed to the caller.
async fn respond(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<RespondRequest>,
) -> AppResult<ApiResponse<RespondResponse>> {
    let view = state
        .friendship_service
        .respond(&id, &user, &req.action)
        .await?;

    let message = match view.friendship.status {
        FriendshipStatus::Accepted => "Friend request accepted",
        _ => "Friend request rejected",
    };

    Ok(ApiResponse::ok(RespondResponse {
        message: message.to_string(),
        friendship: FriendshipResponse::new(&view, &state),
    }))
}

/// Remove a friend.
async fn unfriend(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<ApiResponse<MessageResponse>> {
    state.friendship_service.unfriend(&user.id, &user_id).await?;
    Ok(ApiResponse::ok(MessageResponse::new("Unfriended successfully")))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/friends", get(list_friends))
        .route("/friend-requests", get(list_requests))
        .route("/friend-requests/send/{user_id}", post(send_request))
        .route("/friend-requests/{id}/respond", post(respond))
        .route("/unfriend/{user_id}", delete(unfriend))
}
