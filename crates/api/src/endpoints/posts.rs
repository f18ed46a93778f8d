//! Post, comment and like endpoints.

use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
};
use buddy_common::{AppResult, Page, PageParams, PageSpec};
use buddy_core::{
    CommentView, CreateCommentInput, CreatePostInput, LikeTarget, LikerView, PostView,
    ToggleResult, UpdateCommentInput, UpdatePostInput,
};
use buddy_db::entities::post::Visibility;
use serde::Serialize;

use super::users::UserSummary;
use crate::{
    extractors::{AuthUser, MultipartForm},
    middleware::AppState,
    response::{ApiResponse, no_content},
};

/// Post response.
#[derive(Serialize)]
pub struct PostResponse {
    pub id: String,
    pub author: UserSummary,
    pub content: String,
    pub image: Option<String>,
    pub image_url: Option<String>,
    pub visibility: Visibility,
    pub created_at: String,
    pub updated_at: String,
    pub likes_count: u64,
    pub comments_count: u64,
    pub is_liked: bool,
}

impl PostResponse {
    fn new(view: PostView, state: &AppState) -> Self {
        let post = view.post;
        Self {
            id: post.id,
            author: UserSummary::new(&view.author, state),
            image_url: post.image.as_deref().map(|k| state.media_url(k)),
            image: post.image,
            content: post.content,
            visibility: post.visibility,
            created_at: post.created_at.to_rfc3339(),
            updated_at: post.updated_at.to_rfc3339(),
            likes_count: view.likes_count,
            comments_count: view.comments_count,
            is_liked: view.is_liked,
        }
    }
}

/// Comment response.
#[derive(Serialize)]
pub struct CommentResponse {
    pub id: String,
    pub post: String,
    pub author: UserSummary,
    pub parent: Option<String>,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
    pub likes_count: u64,
    pub replies_count: u64,
    pub is_liked: bool,
    pub replies: Vec<CommentResponse>,
}

impl CommentResponse {
    fn new(view: CommentView, state: &AppState) -> Self {
        let comment = view.comment;
        Self {
            id: comment.id,
            post: comment.post_id,
            author: UserSummary::new(&view.author, state),
            parent: comment.parent_id,
            content: comment.content,
            created_at: comment.created_at.to_rfc3339(),
            updated_at: comment.updated_at.to_rfc3339(),
            likes_count: view.likes_count,
            replies_count: view.replies_count,
            is_liked: view.is_liked,
            replies: view
                .replies
                .into_iter()
                .map(|reply| Self::new(reply, state))
                .collect(),
        }
    }
}

/// A user who liked a post or comment.
#[derive(Serialize)]
pub struct LikerResponse {
    pub id: String,
    pub user: UserSummary,
    pub created_at: String,
}

impl LikerResponse {
    fn new(view: LikerView, state: &AppState) -> Self {
        Self {
            id: view.like.id,
            user: UserSummary::new(&view.user, state),
            created_at: view.like.created_at.to_rfc3339(),
        }
    }
}

// ==================== Posts ====================

/// Posts visible to the caller, newest first.
async fn list_posts(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> AppResult<ApiResponse<Page<PostResponse>>> {
    let request = params.resolve(PageSpec::POSTS)?;
    let page = state.post_service.list(&user.id, request).await?;
    Ok(ApiResponse::ok(page.map(|view| PostResponse::new(view, &state))))
}

/// Create a post from a multipart form.
async fn create_post(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<ApiResponse<PostResponse>> {
    let form = MultipartForm::read(multipart, "image").await?;
    let input = CreatePostInput {
        content: form.text("content").unwrap_or_default().to_string(),
        visibility: form.text("visibility").map(ToString::to_string),
        image: form.image,
    };

    let view = state.post_service.create(&user, input).await?;
    Ok(ApiResponse::created(PostResponse::new(view, &state)))
}

/// Get one post.
async fn get_post(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<PostResponse>> {
    let view = state.post_service.get(&user.id, &id).await?;
    Ok(ApiResponse::ok(PostResponse::new(view, &state)))
}

/// Update a post from a multipart form.
async fn update_post(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> AppResult<ApiResponse<PostResponse>> {
    let form = MultipartForm::read(multipart, "image").await?;
    let input = UpdatePostInput {
        content: form.text("content").map(ToString::to_string),
        visibility: form.text("visibility").map(ToString::to_string),
        image: form.image,
    };

    let view = state.post_service.update(&user.id, &id, input).await?;
    Ok(ApiResponse::ok(PostResponse::new(view, &state)))
}

/// Delete a post.
async fn delete_post(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.post_service.delete(&user.id, &id).await?;
    Ok(no_content())
}

// ==================== Comments ====================

/// Root comments of a post with their replies.
async fn list_comments(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<PageParams>,
) -> AppResult<ApiResponse<Page<CommentResponse>>> {
    let request = params.resolve(PageSpec::COMMENTS)?;
    let page = state.comment_service.list(&user.id, &id, request).await?;
    Ok(ApiResponse::ok(page.map(|view| CommentResponse::new(view, &state))))
}

/// Comment on a post.
async fn create_comment(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<CreateCommentInput>,
) -> AppResult<ApiResponse<CommentResponse>> {
    let view = state.comment_service.create(&user, &id, input).await?;
    Ok(ApiResponse::created(CommentResponse::new(view, &state)))
}

/// Get one comment.
async fn get_comment(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<CommentResponse>> {
    let view = state.comment_service.get(&user.id, &id).await?;
    Ok(ApiResponse::ok(CommentResponse::new(view, &state)))
}

/// Edit a comment.
async fn update_comment(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateCommentInput>,
) -> AppResult<ApiResponse<CommentResponse>> {
    let view = state.comment_service.update(&user.id, &id, input).await?;
    Ok(ApiResponse::ok(CommentResponse::new(view, &state)))
}

/// Delete a comment.
async fn delete_comment(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.comment_service.delete(&user.id, &id).await?;
    Ok(no_content())
}

// ==================== Likes ====================

async fn toggle(state: &AppState, user_id: &str, target: LikeTarget) -> AppResult<ToggleResult> {
    state.like_service.toggle(user_id, &target).await
}

async fn likers(
    state: &AppState,
    user_id: &str,
    target: LikeTarget,
    params: PageParams,
) -> AppResult<Page<LikerResponse>> {
    let request = params.resolve(PageSpec::LIKES)?;
    let page = state
        .like_service
        .list_likers(user_id, &target, request)
        .await?;
    Ok(page.map(|view| LikerResponse::new(view, state)))
}

/// Like or unlike a post.
async fn toggle_post_like(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<ToggleResult>> {
    Ok(ApiResponse::ok(
        toggle(&state, &user.id, LikeTarget::post(id)).await?,
    ))
}

/// Users who liked a post.
async fn post_likers(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<PageParams>,
) -> AppResult<ApiResponse<Page<LikerResponse>>> {
    Ok(ApiResponse::ok(
        likers(&state, &user.id, LikeTarget::post(id), params).await?,
    ))
}

/// Like or unlike a comment.
async fn toggle_comment_like(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<ToggleResult>> {
    Ok(ApiResponse::ok(
        toggle(&state, &user.id, LikeTarget::comment(id)).await?,
    ))
}

/// Users who liked a comment.
async fn comment_likers(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<PageParams>,
) -> AppResult<ApiResponse<Page<LikerResponse>>> {
    Ok(ApiResponse::ok(
        likers(&state, &user.id, LikeTarget::comment(id), params).await?,
    ))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_posts).post(create_post))
        .route(
            "/{id}",
            get(get_post)
                .put(update_post)
                .patch(update_post)
                .delete(delete_post),
        )
        .route("/{id}/like", post(toggle_post_like))
        .route("/{id}/likes", get(post_likers))
        .route("/{id}/comments", get(list_comments).post(create_comment))
        .route(
            "/comments/{id}",
            get(get_comment)
                .put(update_comment)
                .patch(update_comment)
                .delete(delete_comment),
        )
        .route("/comments/{id}/like", post(toggle_comment_like))
        .route("/comments/{id}/likes", get(comment_likers))
}
