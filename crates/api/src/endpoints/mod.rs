//! API endpoints.

mod auth;
mod friendships;
mod posts;
mod users;

use axum::Router;

use crate::middleware::AppState;

pub use posts::{CommentResponse, LikerResponse, PostResponse};
pub use users::{UserResponse, UserSummary};

/// Create the API router.
pub fn router() -> Router<AppState> {
    let accounts = Router::new()
        .merge(auth::router())
        .merge(users::router())
        .merge(friendships::router());

    Router::new()
        .nest("/auth", accounts)
        .nest("/posts", posts::router())
}
