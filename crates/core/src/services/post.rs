//! Post service.

use buddy_common::{AppError, AppResult, IdGenerator, MediaFolder, Page, PageRequest};
use buddy_db::{
    entities::{
        like::LikeTargetKind,
        post::{self, Visibility},
        user,
    },
    repositories::{CommentRepository, LikeRepository, PostRepository, UserRepository},
};
use sea_orm::Set;

use crate::policy;
use crate::services::storage::{ImageUpload, MediaService};

/// Longest post body accepted from clients.
pub const MAX_POST_LENGTH: usize = 1000;

/// Post service for business logic.
#[derive(Clone)]
pub struct PostService {
    post_repo: PostRepository,
    comment_repo: CommentRepository,
    like_repo: LikeRepository,
    user_repo: UserRepository,
    media: MediaService,
    id_gen: IdGenerator,
}

/// Input for creating a post.
#[derive(Debug, Clone, Default)]
pub struct CreatePostInput {
    pub content: String,
    /// `"public"` or `"private"`; public when absent.
    pub visibility: Option<String>,
    pub image: Option<ImageUpload>,
}

/// Input for updating a post. Absent fields are left alone.
#[derive(Debug, Clone, Default)]
pub struct UpdatePostInput {
    pub content: Option<String>,
    pub visibility: Option<String>,
    pub image: Option<ImageUpload>,
}

/// A post with its author and viewer-relative counters.
#[derive(Debug, Clone)]
pub struct PostView {
    pub post: post::Model,
    pub author: user::Model,
    pub likes_count: u64,
    pub comments_count: u64,
    /// Whether the viewer has liked the post.
    pub is_liked: bool,
}

/// Parse a visibility choice.
pub fn parse_visibility(value: &str) -> AppResult<Visibility> {
    match value {
        "public" => Ok(Visibility::Public),
        "private" => Ok(Visibility::Private),
        other => Err(AppError::Validation(format!(
            "\"{other}\" is not a valid choice."
        ))),
    }
}

fn validate_content(content: &str) -> AppResult<()> {
    if content.trim().is_empty() {
        return Err(AppError::Validation("Content cannot be empty.".to_string()));
    }
    if content.chars().count() > MAX_POST_LENGTH {
        return Err(AppError::Validation(format!(
            "Content too long (max {MAX_POST_LENGTH} characters)."
        )));
    }
    Ok(())
}

impl PostService {
    /// Create a new post service.
    #[must_use]
    pub fn new(
        post_repo: PostRepository,
        comment_repo: CommentRepository,
        like_repo: LikeRepository,
        user_repo: UserRepository,
        media: MediaService,
    ) -> Self {
        Self {
            post_repo,
            comment_repo,
            like_repo,
            user_repo,
            media,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a post.
    pub async fn create(&self, author: &user::Model, input: CreatePostInput) -> AppResult<PostView> {
        validate_content(&input.content)?;
        let visibility = input
            .visibility
            .as_deref()
            .map_or(Ok(Visibility::Public), parse_visibility)?;

        let image = match &input.image {
            Some(upload) => Some(
                self.media
                    .store_image(MediaFolder::PostImages, &author.id, upload)
                    .await?
                    .key,
            ),
            None => None,
        };

        let now = chrono::Utc::now();
        let model = post::ActiveModel {
            id: Set(self.id_gen.generate()),
            author_id: Set(author.id.clone()),
            content: Set(input.content),
            image: Set(image.clone()),
            visibility: Set(visibility),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let post = match self.post_repo.create(model).await {
            Ok(post) => post,
            Err(e) => {
                self.media.discard(image.as_deref()).await;
                return Err(e);
            }
        };

        tracing::info!(post_id = %post.id, author_id = %author.id, "Created post");

        Ok(PostView {
            post,
            author: author.clone(),
            likes_count: 0,
            comments_count: 0,
            is_liked: false,
        })
    }

    /// Load a post the viewer may read. Invisible posts are reported as missing.
    pub async fn get_readable(&self, viewer_id: &str, post_id: &str) -> AppResult<post::Model> {
        let post = self.post_repo.get_by_id(post_id).await?;
        policy::ensure_readable(viewer_id, post)
    }

    /// Get a post as seen by the viewer.
    pub async fn get(&self, viewer_id: &str, post_id: &str) -> AppResult<PostView> {
        let post = self.get_readable(viewer_id, post_id).await?;
        self.view(viewer_id, post).await
    }

    /// Page through the posts visible to the viewer, newest first.
    pub async fn list(&self, viewer_id: &str, request: PageRequest) -> AppResult<Page<PostView>> {
        let count = self.post_repo.count_visible(viewer_id).await?;
        request.ensure_in_range(count)?;

        let posts = self
            .post_repo
            .find_visible(viewer_id, request.offset(), request.per_page)
            .await?;
        let views = self.views(viewer_id, posts).await?;

        Ok(Page::new(views, count, request))
    }

    /// Update a post the viewer wrote.
    pub async fn update(
        &self,
        viewer_id: &str,
        post_id: &str,
        input: UpdatePostInput,
    ) -> AppResult<PostView> {
        let post = self.get_readable(viewer_id, post_id).await?;
        policy::authorize_write(viewer_id, &post.author_id)?;

        if let Some(content) = &input.content {
            validate_content(content)?;
        }
        let visibility = input.visibility.as_deref().map(parse_visibility).transpose()?;

        let previous_image = post.image.clone();
        let mut active: post::ActiveModel = post.into();

        if let Some(content) = input.content {
            active.content = Set(content);
        }
        if let Some(visibility) = visibility {
            active.visibility = Set(visibility);
        }
        let new_image = if let Some(upload) = &input.image {
            let file = self
                .media
                .store_image(MediaFolder::PostImages, viewer_id, upload)
                .await?;
            active.image = Set(Some(file.key.clone()));
            Some(file.key)
        } else {
            None
        };
        active.updated_at = Set(chrono::Utc::now().into());

        let post = match self.post_repo.update(active).await {
            Ok(post) => post,
            Err(e) => {
                self.media.discard(new_image.as_deref()).await;
                return Err(e);
            }
        };
        if new_image.is_some() {
            self.media.discard(previous_image.as_deref()).await;
        }

        self.view(viewer_id, post).await
    }

    /// Delete a post the viewer wrote, together with its comments and every
    /// like on the post or its comments.
    pub async fn delete(&self, viewer_id: &str, post_id: &str) -> AppResult<()> {
        let post = self.get_readable(viewer_id, post_id).await?;
        policy::authorize_write(viewer_id, &post.author_id)?;

        let comment_ids = self.comment_repo.find_ids_by_post(&post.id).await?;
        self.like_repo
            .delete_for_targets(LikeTargetKind::Comment, &comment_ids)
            .await?;
        self.like_repo
            .delete_for_targets(LikeTargetKind::Post, std::slice::from_ref(&post.id))
            .await?;

        let image = post.image.clone();
        let id = post.id.clone();
        self.post_repo.delete(post).await?;
        self.media.discard(image.as_deref()).await;

        tracing::info!(post_id = %id, "Deleted post");
        Ok(())
    }

    async fn view(&self, viewer_id: &str, post: post::Model) -> AppResult<PostView> {
        self.views(viewer_id, vec![post])
            .await?
            .pop()
            .ok_or_else(|| AppError::Internal("Post author is missing".to_string()))
    }

    /// Attach authors and counters to posts with a fixed number of queries.
    async fn views(&self, viewer_id: &str, posts: Vec<post::Model>) -> AppResult<Vec<PostView>> {
        if posts.is_empty() {
            return Ok(vec![]);
        }

        let ids: Vec<String> = posts.iter().map(|p| p.id.clone()).collect();
        let mut author_ids: Vec<String> = posts.iter().map(|p| p.author_id.clone()).collect();
        author_ids.sort();
        author_ids.dedup();

        let authors = self.user_repo.find_by_ids(&author_ids).await?;
        let likes = self.like_repo.count_many(LikeTargetKind::Post, &ids).await?;
        let liked = self
            .like_repo
            .liked_by(viewer_id, LikeTargetKind::Post, &ids)
            .await?;
        let comments = self.comment_repo.count_by_posts(&ids).await?;

        Ok(posts
            .into_iter()
            .filter_map(|post| {
                let author = authors.iter().find(|u| u.id == post.author_id)?.clone();
                Some(PostView {
                    likes_count: likes.get(&post.id).copied().unwrap_or(0),
                    comments_count: comments.get(&post.id).copied().unwrap_or(0),
                    is_liked: liked.contains(&post.id),
                    author,
                    post,
                })
            })
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::storage::{NoOpStorage, StorageService};
    use buddy_common::{StorageBackend, UploadedFile};
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, DbErr, MockDatabase, MockExecResult};
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

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

    fn create_test_post(id: &str, author: &str, visibility: Visibility) -> post::Model {
        post::Model {
            id: id.to_string(),
            author_id: author.to_string(),
            content: "Hello".to_string(),
            image: None,
            visibility,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    fn count_row(key: &str, total: i64) -> BTreeMap<&'static str, sea_orm::Value> {
        maplit::btreemap! {
            "key" => sea_orm::Value::String(Some(Box::new(key.to_string()))),
            "total" => sea_orm::Value::BigInt(Some(total)),
        }
    }

    fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    fn mock() -> MockDatabase {
        MockDatabase::new(DatabaseBackend::Postgres)
    }

    struct Mocks {
        posts: MockDatabase,
        comments: MockDatabase,
        likes: MockDatabase,
        users: MockDatabase,
    }

    impl Default for Mocks {
        fn default() -> Self {
            Self {
                posts: mock(),
                comments: mock(),
                likes: mock(),
                users: mock(),
            }
        }
    }

    fn service(m: Mocks) -> PostService {
        service_with_storage(m, Arc::new(NoOpStorage::new("/media".to_string())))
    }

    fn service_with_storage(m: Mocks, storage: StorageService) -> PostService {
        PostService::new(
            PostRepository::new(Arc::new(m.posts.into_connection())),
            CommentRepository::new(Arc::new(m.comments.into_connection())),
            LikeRepository::new(Arc::new(m.likes.into_connection())),
            UserRepository::new(Arc::new(m.users.into_connection())),
            MediaService::new(storage, 1024),
        )
    }

    /// Storage that remembers which keys were deleted.
    #[derive(Default)]
    struct RecordingStorage {
        inner: NoOpStorage,
        deleted: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl StorageBackend for RecordingStorage {
        async fn upload(
            &self,
            key: &str,
            data: &[u8],
            content_type: &str,
        ) -> AppResult<UploadedFile> {
            self.inner.upload(key, data, content_type).await
        }

        async fn delete(&self, key: &str) -> AppResult<()> {
            self.deleted.lock().unwrap().push(key.to_string());
            Ok(())
        }

        fn public_url(&self, key: &str) -> String {
            self.inner.public_url(key)
        }

        async fn exists(&self, _key: &str) -> AppResult<bool> {
            Ok(false)
        }
    }

    #[test]
    fn test_parse_visibility() {
        assert_eq!(parse_visibility("public").unwrap(), Visibility::Public);
        assert_eq!(parse_visibility("private").unwrap(), Visibility::Private);
        assert!(matches!(
            parse_visibility("friends"),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_content() {
        assert!(validate_content("hi").is_ok());
        assert!(validate_content(&"é".repeat(MAX_POST_LENGTH)).is_ok());
        assert!(validate_content("   \n").is_err());
        assert!(validate_content(&"a".repeat(MAX_POST_LENGTH + 1)).is_err());
    }

    #[tokio::test]
    async fn test_create_post() {
        let alice = create_test_user("alice");
        let created = create_test_post("p1", "alice", Visibility::Private);

        let svc = service(Mocks {
            posts: mock().append_query_results([[created]]),
            ..Default::default()
        });

        let view = svc
            .create(
                &alice,
                CreatePostInput {
                    content: "Hello".to_string(),
                    visibility: Some("private".to_string()),
                    image: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(view.post.visibility, Visibility::Private);
        assert_eq!(view.author.id, "alice");
        assert_eq!(view.likes_count, 0);
        assert!(!view.is_liked);
    }

    #[tokio::test]
    async fn test_create_rejects_blank_content() {
        let alice = create_test_user("alice");
        let result = service(Mocks::default())
            .create(
                &alice,
                CreatePostInput {
                    content: "   ".to_string(),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_get_public_post_with_counters() {
        let post = create_test_post("p1", "alice", Visibility::Public);

        let svc = service(Mocks {
            posts: mock().append_query_results([[post]]),
            users: mock().append_query_results([[create_test_user("alice")]]),
            likes: mock()
                .append_query_results([[count_row("p1", 3)]])
                .append_query_results([[maplit::btreemap! {
                    "target_id" => sea_orm::Value::String(Some(Box::new("p1".to_string()))),
                }]]),
            comments: mock().append_query_results([[count_row("p1", 2)]]),
        });

        let view = svc.get("bob", "p1").await.unwrap();
        assert_eq!(view.likes_count, 3);
        assert_eq!(view.comments_count, 2);
        assert!(view.is_liked);
    }

    #[tokio::test]
    async fn test_private_post_is_not_found_for_others() {
        let post = create_test_post("p1", "alice", Visibility::Private);
        let svc = service(Mocks {
            posts: mock().append_query_results([[post]]),
            ..Default::default()
        });

        assert!(matches!(
            svc.get("bob", "p1").await,
            Err(AppError::PostNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_by_other_user_is_forbidden() {
        let post = create_test_post("p1", "alice", Visibility::Public);
        let svc = service(Mocks {
            posts: mock().append_query_results([[post]]),
            ..Default::default()
        });

        let result = svc
            .update(
                "bob",
                "p1",
                UpdatePostInput {
                    content: Some("mine now".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_update_private_post_of_other_user_is_not_found() {
        let post = create_test_post("p1", "alice", Visibility::Private);
        let svc = service(Mocks {
            posts: mock().append_query_results([[post]]),
            ..Default::default()
        });

        let result = svc.update("bob", "p1", UpdatePostInput::default()).await;
        assert!(matches!(result, Err(AppError::PostNotFound(_))));
    }

    #[tokio::test]
    async fn test_failed_update_discards_new_image() {
        let post = create_test_post("p1", "alice", Visibility::Public);
        let storage = Arc::new(RecordingStorage::default());
        let svc = service_with_storage(
            Mocks {
                posts: mock()
                    .append_query_results([[post]])
                    .append_query_errors([DbErr::Custom("connection lost".to_string())]),
                ..Default::default()
            },
            storage.clone(),
        );

        let result = svc
            .update(
                "alice",
                "p1",
                UpdatePostInput {
                    image: Some(ImageUpload {
                        filename: "new.png".to_string(),
                        content_type: "image/png".to_string(),
                        data: vec![0u8; 16],
                    }),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Database(_))));
        let deleted = storage.deleted.lock().unwrap();
        assert_eq!(deleted.len(), 1);
        assert!(deleted[0].starts_with("post_images/"));
        assert!(deleted[0].ends_with(".png"));
    }

    #[tokio::test]
    async fn test_delete_removes_likes_and_post() {
        let post = create_test_post("p1", "alice", Visibility::Public);
        let svc = service(Mocks {
            posts: mock()
                .append_query_results([[post]])
                .append_exec_results([exec(1)]),
            comments: mock().append_query_results([[maplit::btreemap! {
                "id" => sea_orm::Value::String(Some(Box::new("c1".to_string()))),
            }]]),
            likes: mock().append_exec_results([exec(2), exec(1)]),
            ..Default::default()
        });

        assert!(svc.delete("alice", "p1").await.is_ok());
    }

    #[tokio::test]
    async fn test_list_rejects_page_past_the_end() {
        let svc = service(Mocks {
            posts: mock().append_query_results([[maplit::btreemap! {
                "num_items" => sea_orm::Value::BigInt(Some(3)),
            }]]),
            ..Default::default()
        });

        let request = PageRequest {
            page: 2,
            per_page: 10,
        };
        assert!(matches!(
            svc.list("alice", request).await,
            Err(AppError::NotFound(msg)) if msg == "Invalid page"
        ));
    }

    #[tokio::test]
    async fn test_list_empty_first_page() {
        let svc = service(Mocks {
            posts: mock()
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(0)),
                }]])
                .append_query_results([Vec::<post::Model>::new()]),
            ..Default::default()
        });

        let page = svc
            .list(
                "alice",
                PageRequest {
                    page: 1,
                    per_page: 10,
                },
            )
            .await
            .unwrap();
        assert_eq!(page.count, 0);
        assert!(page.results.is_empty());
        assert_eq!(page.next, None);
    }
}
