//! Comment service.
//!
//! A comment is readable exactly when its post is. Replies nest one level deep.

use buddy_common::{AppError, AppResult, IdGenerator, Page, PageRequest};
use buddy_db::{
    entities::{comment, like::LikeTargetKind, post, user},
    repositories::{CommentRepository, LikeRepository, PostRepository, UserRepository},
};
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

use crate::policy;

/// Comment service for business logic.
#[derive(Clone)]
pub struct CommentService {
    comment_repo: CommentRepository,
    post_repo: PostRepository,
    like_repo: LikeRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

/// Input for creating a comment.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCommentInput {
    #[validate(length(max = 2000))]
    pub content: String,
    /// Root comment this one replies to.
    pub parent: Option<String>,
}

/// Input for editing a comment.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateCommentInput {
    #[validate(length(max = 2000))]
    pub content: Option<String>,
}

/// A comment with its author, counters and (for roots) its replies.
#[derive(Debug, Clone)]
pub struct CommentView {
    pub comment: comment::Model,
    pub author: user::Model,
    pub likes_count: u64,
    pub replies_count: u64,
    pub is_liked: bool,
    /// Replies, newest first. Always empty for replies.
    pub replies: Vec<CommentView>,
}

fn ensure_not_blank(content: &str) -> AppResult<()> {
    if content.trim().is_empty() {
        return Err(AppError::Validation("Content cannot be empty.".to_string()));
    }
    Ok(())
}

impl CommentService {
    /// Create a new comment service.
    #[must_use]
    pub fn new(
        comment_repo: CommentRepository,
        post_repo: PostRepository,
        like_repo: LikeRepository,
        user_repo: UserRepository,
    ) -> Self {
        Self {
            comment_repo,
            post_repo,
            like_repo,
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    async fn readable_post(&self, viewer_id: &str, post_id: &str) -> AppResult<post::Model> {
        let post = self.post_repo.get_by_id(post_id).await?;
        policy::ensure_readable(viewer_id, post)
    }

    /// Load a comment whose post the viewer may read.
    pub async fn get_readable(
        &self,
        viewer_id: &str,
        comment_id: &str,
    ) -> AppResult<comment::Model> {
        let comment = self.comment_repo.get_by_id(comment_id).await?;
        match self.post_repo.find_by_id(&comment.post_id).await? {
            Some(post) if policy::can_read(viewer_id, &post) => Ok(comment),
            _ => Err(AppError::CommentNotFound(comment.id)),
        }
    }

    /// Page through the root comments of a post, each with its replies.
    pub async fn list(
        &self,
        viewer_id: &str,
        post_id: &str,
        request: PageRequest,
    ) -> AppResult<Page<CommentView>> {
        let post = self.readable_post(viewer_id, post_id).await?;

        let count = self.comment_repo.count_roots(&post.id).await?;
        request.ensure_in_range(count)?;

        let roots = self
            .comment_repo
            .find_roots(&post.id, request.offset(), request.per_page)
            .await?;
        let views = self.views(viewer_id, roots).await?;

        Ok(Page::new(views, count, request))
    }

    /// Comment on a post the viewer may read.
    pub async fn create(
        &self,
        author: &user::Model,
        post_id: &str,
        input: CreateCommentInput,
    ) -> AppResult<CommentView> {
        input.validate()?;
        ensure_not_blank(&input.content)?;

        let post = self.readable_post(&author.id, post_id).await?;

        if let Some(parent_id) = &input.parent {
            let parent = self
                .comment_repo
                .find_by_id(parent_id)
                .await?
                .ok_or_else(|| {
                    AppError::Validation("Parent comment does not exist.".to_string())
                })?;
            if parent.post_id != post.id {
                return Err(AppError::Validation(
                    "Parent comment must belong to the same post.".to_string(),
                ));
            }
            if parent.parent_id.is_some() {
                return Err(AppError::Validation(
                    "Nested replies beyond one level are not allowed.".to_string(),
                ));
            }
        }

        let now = chrono::Utc::now();
        let model = comment::ActiveModel {
            id: Set(self.id_gen.generate()),
            post_id: Set(post.id),
            author_id: Set(author.id.clone()),
            parent_id: Set(input.parent),
            content: Set(input.content),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let comment = self.comment_repo.create(model).await?;
        tracing::info!(comment_id = %comment.id, post_id = %comment.post_id, "Created comment");

        Ok(CommentView {
            comment,
            author: author.clone(),
            likes_count: 0,
            replies_count: 0,
            is_liked: false,
            replies: vec![],
        })
    }

    /// Get a comment as seen by the viewer.
    pub async fn get(&self, viewer_id: &str, comment_id: &str) -> AppResult<CommentView> {
        let comment = self.get_readable(viewer_id, comment_id).await?;
        self.view(viewer_id, comment).await
    }

    /// Edit a comment the viewer wrote.
    pub async fn update(
        &self,
        viewer_id: &str,
        comment_id: &str,
        input: UpdateCommentInput,
    ) -> AppResult<CommentView> {
        let comment = self.get_readable(viewer_id, comment_id).await?;
        policy::authorize_write(viewer_id, &comment.author_id)?;

        input.validate()?;

        let comment = match input.content {
            Some(content) => {
                ensure_not_blank(&content)?;
                let mut active: comment::ActiveModel = comment.into();
                active.content = Set(content);
                active.updated_at = Set(chrono::Utc::now().into());
                self.comment_repo.update(active).await?
            }
            None => comment,
        };

        self.view(viewer_id, comment).await
    }

    /// Delete a comment the viewer wrote, its replies, and their likes.
    pub async fn delete(&self, viewer_id: &str, comment_id: &str) -> AppResult<()> {
        let comment = self.get_readable(viewer_id, comment_id).await?;
        policy::authorize_write(viewer_id, &comment.author_id)?;

        let mut ids: Vec<String> = self
            .comment_repo
            .find_replies(std::slice::from_ref(&comment.id))
            .await?
            .into_iter()
            .map(|reply| reply.id)
            .collect();
        ids.push(comment.id.clone());

        self.like_repo
            .delete_for_targets(LikeTargetKind::Comment, &ids)
            .await?;
        self.comment_repo.delete(comment).await?;

        tracing::info!(comment_id = %comment_id, "Deleted comment");
        Ok(())
    }

    async fn view(&self, viewer_id: &str, comment: comment::Model) -> AppResult<CommentView> {
        self.views(viewer_id, vec![comment])
            .await?
            .pop()
            .ok_or_else(|| AppError::Internal("Comment author is missing".to_string()))
    }

    /// Attach authors, counters and replies with a fixed number of queries.
    async fn views(
        &self,
        viewer_id: &str,
        comments: Vec<comment::Model>,
    ) -> AppResult<Vec<CommentView>> {
        if comments.is_empty() {
            return Ok(vec![]);
        }

        let root_ids: Vec<String> = comments
            .iter()
            .filter(|c| c.parent_id.is_none())
            .map(|c| c.id.clone())
            .collect();
        let replies = self.comment_repo.find_replies(&root_ids).await?;

        let all_ids: Vec<String> = comments
            .iter()
            .chain(replies.iter())
            .map(|c| c.id.clone())
            .collect();
        let mut author_ids: Vec<String> = comments
            .iter()
            .chain(replies.iter())
            .map(|c| c.author_id.clone())
            .collect();
        author_ids.sort();
        author_ids.dedup();

        let authors = self.user_repo.find_by_ids(&author_ids).await?;
        let likes = self
            .like_repo
            .count_many(LikeTargetKind::Comment, &all_ids)
            .await?;
        let liked = self
            .like_repo
            .liked_by(viewer_id, LikeTargetKind::Comment, &all_ids)
            .await?;
        let reply_counts = self.comment_repo.count_replies(&root_ids).await?;

        let build = |comment: comment::Model, replies: Vec<CommentView>| {
            let author = authors.iter().find(|u| u.id == comment.author_id)?.clone();
            Some(CommentView {
                likes_count: likes.get(&comment.id).copied().unwrap_or(0),
                replies_count: reply_counts.get(&comment.id).copied().unwrap_or(0),
                is_liked: liked.contains(&comment.id),
                author,
                comment,
                replies,
            })
        };

        Ok(comments
            .into_iter()
            .filter_map(|comment| {
                let nested = replies
                    .iter()
                    .filter(|r| r.parent_id.as_deref() == Some(comment.id.as_str()))
                    .filter_map(|r| build(r.clone(), vec![]))
                    .collect();
                build(comment, nested)
            })
            .collect())
    }
}
