//! API middleware.

#![allow(missing_docs)]

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Request, header},
    middleware::Next,
    response::Response,
};
use buddy_core::{
    CommentService, FriendshipService, LikeService, MediaService, PostService, PresenceService,
    TokenKind, TokenService, UserService,
};
use buddy_db::entities::user;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub presence_service: PresenceService,
    pub token_service: TokenService,
    pub friendship_service: FriendshipService,
    pub post_service: PostService,
    pub comment_service: CommentService,
    pub like_service: LikeService,
    pub media_service: MediaService,
    /// Public base URL of the server, used to make media URLs absolute.
    pub public_url: Arc<str>,
}

impl AppState {
    /// Absolute URL of a stored media key.
    #[must_use]
    pub fn media_url(&self, key: &str) -> String {
        let url = self.media_service.url(key);
        if url.starts_with('/') {
            format!("{}{url}", self.public_url.trim_end_matches('/'))
        } else {
            url
        }
    }
}

/// Authentication middleware.
///
/// A valid bearer access token for an active user puts that user in the
/// request extensions. Anything else passes through anonymously and is
/// rejected by the `AuthUser` extractor where a user is required.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(auth_header) = req.headers().get(header::AUTHORIZATION)
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
        && let Ok(claims) = state.token_service.verify(token, TokenKind::Access)
    {
        match state.user_service.get_active(&claims.sub).await {
            Ok(user) => {
                req.extensions_mut().insert(user);
            }
            Err(e) => tracing::debug!(user_id = %claims.sub, error = %e, "Token user rejected"),
        }
    }

    next.run(req).await
}

/// Request logging middleware.
///
/// Logs method, path, user and duration, and reports the duration in an
/// `X-Response-Time` header.
pub async fn request_logger(req: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let user_id = req
        .extensions()
        .get::<user::Model>()
        .map_or_else(|| "anonymous".to_string(), |u| u.id.clone());

    let mut response = next.run(req).await;

    let elapsed = start.elapsed().as_secs_f64();
    tracing::info!(
        method = %method,
        path = %path,
        user = %user_id,
        status = response.status().as_u16(),
        duration = %format!("{elapsed:.3}s"),
        "Request handled"
    );

    if let Ok(value) = HeaderValue::from_str(&format!("{elapsed:.3}s")) {
        response.headers_mut().insert("x-response-time", value);
    }

    response
}
