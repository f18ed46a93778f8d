//! Like service.

use buddy_common::{AppResult, IdGenerator, Page, PageRequest};
use buddy_db::{
    entities::{
        like::{self, LikeTargetKind},
        user,
    },
    repositories::{LikeRepository, UserRepository},
};
use sea_orm::Set;
use serde::Serialize;

use crate::services::{comment::CommentService, post::PostService};

/// The post or comment a like points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikeTarget {
    pub kind: LikeTargetKind,
    pub id: String,
}

impl LikeTarget {
    /// A post.
    #[must_use]
    pub fn post(id: impl Into<String>) -> Self {
        Self {
            kind: LikeTargetKind::Post,
            id: id.into(),
        }
    }

    /// A comment.
    #[must_use]
    pub fn comment(id: impl Into<String>) -> Self {
        Self {
            kind: LikeTargetKind::Comment,
            id: id.into(),
        }
    }
}

/// Outcome of a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ToggleResult {
    pub liked: bool,
    pub likes_count: u64,
}

/// A like with the user who left it.
#[derive(Debug, Clone)]
pub struct LikerView {
    pub like: like::Model,
    pub user: user::Model,
}

/// Like service for business logic.
#[derive(Clone)]
pub struct LikeService {
    like_repo: LikeRepository,
    user_repo: UserRepository,
    posts: PostService,
    comments: CommentService,
    id_gen: IdGenerator,
}

impl LikeService {
    /// Create a new like service.
    #[must_use]
    pub fn new(
        like_repo: LikeRepository,
        user_repo: UserRepository,
        posts: PostService,
        comments: CommentService,
    ) -> Self {
        Self {
            like_repo,
            user_repo,
            posts,
            comments,
            id_gen: IdGenerator::new(),
        }
    }

    /// Fail with the matching not-found error unless the viewer may read the target.
    async fn ensure_readable(&self, viewer_id: &str, target: &LikeTarget) -> AppResult<()> {
        match target.kind {
            LikeTargetKind::Post => {
                self.posts.get_readable(viewer_id, &target.id).await?;
            }
            LikeTargetKind::Comment => {
                self.comments.get_readable(viewer_id, &target.id).await?;
            }
        }
        Ok(())
    }

    /// Like the target if the user has not, otherwise remove the like.
    pub async fn toggle(&self, user_id: &str, target: &LikeTarget) -> AppResult<ToggleResult> {
        self.ensure_readable(user_id, target).await?;

        let liked = match self.like_repo.find(user_id, target.kind, &target.id).await? {
            Some(existing) => {
                self.like_repo.delete(existing).await?;
                false
            }
            None => {
                let model = like::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    user_id: Set(user_id.to_string()),
                    target_kind: Set(target.kind),
                    target_id: Set(target.id.clone()),
                    created_at: Set(chrono::Utc::now().into()),
                };
                self.like_repo.create(model).await?;
                true
            }
        };

        let likes_count = self.like_repo.count(target.kind, &target.id).await?;
        tracing::debug!(
            user_id = %user_id,
            target_id = %target.id,
            kind = ?target.kind,
            liked,
            "Toggled like"
        );

        Ok(ToggleResult { liked, likes_count })
    }

    /// Page through the users who liked the target, newest first.
    pub async fn list_likers(
        &self,
        viewer_id: &str,
        target: &LikeTarget,
        request: PageRequest,
    ) -> AppResult<Page<LikerView>> {
        self.ensure_readable(viewer_id, target).await?;

        let count = self.like_repo.count(target.kind, &target.id).await?;
        request.ensure_in_range(count)?;

        let likes = self
            .like_repo
            .find_by_target(target.kind, &target.id, request.offset(), request.per_page)
            .await?;

        let user_ids: Vec<String> = likes.iter().map(|l| l.user_id.clone()).collect();
        let users = self.user_repo.find_by_ids(&user_ids).await?;

        let likers = likes
            .into_iter()
            .filter_map(|like| {
                let user = users.iter().find(|u| u.id == like.user_id)?.clone();
                Some(LikerView { like, user })
            })
            .collect();

        Ok(Page::new(likers, count, request))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::storage::{MediaService, NoOpStorage};
    use buddy_common::AppError;
    use buddy_db::entities::comment;
    use buddy_db::entities::post::{self, Visibility};
    use buddy_db::repositories::{CommentRepository, PostRepository};
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn create_test_post(visibility: Visibility) -> post::Model {
        post::Model {
            id: "p1".to_string(),
            author_id: "alice".to_string(),
            content: "Hello".to_string(),
            image: None,
            visibility,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    fn create_test_comment() -> comment::Model {
        comment::Model {
            id: "c1".to_string(),
            post_id: "p1".to_string(),
            author_id: "alice".to_string(),
            parent_id: None,
            content: "Nice".to_string(),
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    fn create_test_user(id: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            email: format!("{id}@example.com"),
            password_hash: "hash".to_string(),
            first_name: id.to_string(),
            last_name: "Test".to_string(),
            bio: String::new(),
            profile_picture: None,
            cover_photo: None,
            location: String::new(),
            website: String::new(),
            is_online: false,
            last_seen: None,
            is_active: true,
            date_joined: Utc::now().into(),
        }
    }

    fn create_test_like(user_id: &str) -> like::Model {
        like::Model {
            id: "l1".to_string(),
            user_id: user_id.to_string(),
            target_kind: LikeTargetKind::Post,
            target_id: "p1".to_string(),
            created_at: Utc::now().into(),
        }
    }

    fn create_comment_like(id: &str, user_id: &str) -> like::Model {
        like::Model {
            id: id.to_string(),
            user_id: user_id.to_string(),
            target_kind: LikeTargetKind::Comment,
            target_id: "c1".to_string(),
            created_at: Utc::now().into(),
        }
    }

    fn count(n: i64) -> std::collections::BTreeMap<&'static str, sea_orm::Value> {
        maplit::btreemap! {
            "num_items" => sea_orm::Value::BigInt(Some(n)),
        }
    }

    fn mock() -> MockDatabase {
        MockDatabase::new(DatabaseBackend::Postgres)
    }

    fn conn(db: MockDatabase) -> Arc<sea_orm::DatabaseConnection> {
        Arc::new(db.into_connection())
    }

    fn service(likes: MockDatabase, posts: MockDatabase) -> LikeService {
        service_with(likes, posts, mock(), mock())
    }

    fn service_with(
        likes: MockDatabase,
        posts: MockDatabase,
        comments: MockDatabase,
        users: MockDatabase,
    ) -> LikeService {
        let likes = conn(likes);
        let posts = conn(posts);
        let users = conn(users);
        let comments = conn(comments);

        let post_service = PostService::new(
            PostRepository::new(posts.clone()),
            CommentRepository::new(comments.clone()),
            LikeRepository::new(likes.clone()),
            UserRepository::new(users.clone()),
            MediaService::new(Arc::new(NoOpStorage::default()), 1024),
        );
        let comment_service = CommentService::new(
            CommentRepository::new(comments),
            PostRepository::new(posts),
            LikeRepository::new(likes.clone()),
            UserRepository::new(users.clone()),
        );

        LikeService::new(
            LikeRepository::new(likes),
            UserRepository::new(users),
            post_service,
            comment_service,
        )
    }

    #[tokio::test]
    async fn test_toggle_creates_like() {
        let svc = service(
            mock()
                .append_query_results([Vec::<like::Model>::new()])
                .append_query_results([[create_test_like("bob")]])
                .append_query_results([[count(1)]]),
            mock().append_query_results([[create_test_post(Visibility::Public)]]),
        );

        let result = svc.toggle("bob", &LikeTarget::post("p1")).await.unwrap();
        assert_eq!(
            result,
            ToggleResult {
                liked: true,
                likes_count: 1
            }
        );
    }

    #[tokio::test]
    async fn test_toggle_removes_existing_like() {
        let svc = service(
            mock()
                .append_query_results([[create_test_like("bob")]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .append_query_results([[count(0)]]),
            mock().append_query_results([[create_test_post(Visibility::Public)]]),
        );

        let result = svc.toggle("bob", &LikeTarget::post("p1")).await.unwrap();
        assert!(!result.liked);
        assert_eq!(result.likes_count, 0);
    }

    #[tokio::test]
    async fn test_toggle_on_invisible_post_is_not_found() {
        let svc = service(
            mock(),
            mock().append_query_results([[create_test_post(Visibility::Private)]]),
        );

        assert!(matches!(
            svc.toggle("bob", &LikeTarget::post("p1")).await,
            Err(AppError::PostNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_likers_rejects_page_past_the_end() {
        let svc = service(
            mock().append_query_results([[count(1)]]),
            mock().append_query_results([[create_test_post(Visibility::Public)]]),
        );

        let result = svc
            .list_likers(
                "alice",
                &LikeTarget::post("p1"),
                PageRequest {
                    page: 3,
                    per_page: 10,
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_toggle_comment_like_on_and_off() {
        let svc = service_with(
            mock()
                .append_query_results([Vec::<like::Model>::new()])
                .append_query_results([[create_comment_like("l1", "bob")]])
                .append_query_results([[count(1)]])
                .append_query_results([[create_comment_like("l1", "bob")]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .append_query_results([[count(0)]]),
            mock()
                .append_query_results([[create_test_post(Visibility::Public)]])
                .append_query_results([[create_test_post(Visibility::Public)]]),
            mock()
                .append_query_results([[create_test_comment()]])
                .append_query_results([[create_test_comment()]]),
            mock(),
        );
        let target = LikeTarget::comment("c1");

        let first = svc.toggle("bob", &target).await.unwrap();
        assert_eq!(
            first,
            ToggleResult {
                liked: true,
                likes_count: 1
            }
        );

        let second = svc.toggle("bob", &target).await.unwrap();
        assert_eq!(
            second,
            ToggleResult {
                liked: false,
                likes_count: 0
            }
        );
    }

    #[tokio::test]
    async fn test_toggle_comment_under_private_post_is_not_found() {
        let svc = service_with(
            mock(),
            mock().append_query_results([[create_test_post(Visibility::Private)]]),
            mock().append_query_results([[create_test_comment()]]),
            mock(),
        );

        assert!(matches!(
            svc.toggle("bob", &LikeTarget::comment("c1")).await,
            Err(AppError::CommentNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_comment_likers() {
        let svc = service_with(
            mock()
                .append_query_results([[count(12)]])
                .append_query_results([[
                    create_comment_like("l11", "bob"),
                    create_comment_like("l12", "carol"),
                ]]),
            mock().append_query_results([[create_test_post(Visibility::Public)]]),
            mock().append_query_results([[create_test_comment()]]),
            mock().append_query_results([[create_test_user("carol"), create_test_user("bob")]]),
        );

        let page = svc
            .list_likers(
                "alice",
                &LikeTarget::comment("c1"),
                PageRequest {
                    page: 2,
                    per_page: 10,
                },
            )
            .await
            .unwrap();

        assert_eq!(page.count, 12);
        assert_eq!(page.next, None);
        assert_eq!(page.previous, Some(1));
        let likers: Vec<(&str, &str)> = page
            .results
            .iter()
            .map(|v| (v.like.id.as_str(), v.user.id.as_str()))
            .collect();
        assert_eq!(likers, vec![("l11", "bob"), ("l12", "carol")]);
    }
}
