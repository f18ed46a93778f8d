//! Buddy server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, middleware};
use buddy_api::{AppState, auth_middleware, request_logger, router as api_router};
use buddy_common::{Config, LocalStorage, config::LogFormat};
use buddy_core::{
    CommentService, FriendshipService, LikeService, MediaService, PostService, PresenceService,
    StorageService, TokenService, UserService,
};
use buddy_db::repositories::{
    CommentRepository, FriendshipRepository, LikeRepository, PostRepository, UserRepository,
};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "buddy=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::load()?;
    init_tracing(config.logging.format);

    info!("Starting buddy server...");

    let db = Arc::new(buddy_db::init(&config).await?);
    info!("Connected to database");

    info!("Running database migrations...");
    buddy_db::migrate(&db).await?;
    info!("Migrations completed");

    // Repositories
    let user_repo = UserRepository::new(Arc::clone(&db));
    let friendship_repo = FriendshipRepository::new(Arc::clone(&db));
    let post_repo = PostRepository::new(Arc::clone(&db));
    let comment_repo = CommentRepository::new(Arc::clone(&db));
    let like_repo = LikeRepository::new(Arc::clone(&db));

    // Media
    let storage: StorageService = Arc::new(LocalStorage::new(
        config.storage.base_path.clone(),
        config.storage.base_url.clone(),
    ));
    let media_service = MediaService::new(storage, config.storage.max_image_bytes);

    // Services
    let user_service = UserService::new(
        user_repo.clone(),
        post_repo.clone(),
        friendship_repo.clone(),
    );
    let presence_service = PresenceService::new(user_repo.clone());
    let token_service = TokenService::new(&config.auth);
    let friendship_service = FriendshipService::new(friendship_repo, user_repo.clone());
    let post_service = PostService::new(
        post_repo.clone(),
        comment_repo.clone(),
        like_repo.clone(),
        user_repo.clone(),
        media_service.clone(),
    );
    let comment_service = CommentService::new(
        comment_repo,
        post_repo,
        like_repo.clone(),
        user_repo.clone(),
    );
    let like_service = LikeService::new(
        like_repo,
        user_repo,
        post_service.clone(),
        comment_service.clone(),
    );

    let state = AppState {
        user_service,
        presence_service,
        token_service,
        friendship_service,
        post_service,
        comment_service,
        like_service,
        media_service,
        public_url: Arc::from(config.server.url.as_str()),
    };

    let mut app = Router::new().nest("/api", api_router());

    // Uploaded media is served directly only when it lives under a local path.
    if config.storage.base_url.starts_with('/') {
        app = app.nest_service(
            &config.storage.base_url,
            ServeDir::new(&config.storage.base_path),
        );
    }

    let app = app
        .layer(middleware::from_fn(request_logger))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
