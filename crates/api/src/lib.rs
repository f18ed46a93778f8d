//! HTTP API layer for buddy.
//!
//! - **Endpoints**: accounts, profiles, friendships, posts, comments, likes
//! - **Extractors**: authenticated user, multipart forms
//! - **Middleware**: bearer authentication, request logging
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
pub use middleware::{AppState, auth_middleware, request_logger};
