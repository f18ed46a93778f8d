//! User service.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use buddy_common::{AppError, AppResult, IdGenerator};
use buddy_db::{
    entities::user,
    repositories::{FriendshipRepository, PostRepository, UserRepository},
};
use sea_orm::Set;
use serde::Deserialize;
use validator::{Validate, ValidateUrl, ValidationError};

use crate::policy::{self, FriendshipLabel};

/// Maximum number of users returned by a search.
pub const SEARCH_LIMIT: u64 = 20;

/// User service for business logic.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    post_repo: PostRepository,
    friendship_repo: FriendshipRepository,
    id_gen: IdGenerator,
}

/// Input for registering a new account.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterInput {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 1, max = 50))]
    pub first_name: String,

    #[validate(length(min = 1, max = 50))]
    pub last_name: String,

    #[validate(length(min = 8, max = 128))]
    pub password: String,

    /// Confirmation, must equal `password`.
    pub password2: String,
}

/// Input for updating the caller's own profile. Absent fields are left alone.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProfileInput {
    #[validate(length(min = 1, max = 50))]
    pub first_name: Option<String>,

    #[validate(length(min = 1, max = 50))]
    pub last_name: Option<String>,

    #[validate(length(max = 500))]
    pub bio: Option<String>,

    #[validate(length(max = 100))]
    pub location: Option<String>,

    #[validate(length(max = 200), custom(function = "validate_website"))]
    pub website: Option<String>,
}

fn validate_website(website: &str) -> Result<(), ValidationError> {
    if website.is_empty() || website.validate_url() {
        Ok(())
    } else {
        Err(ValidationError::new("url"))
    }
}

/// A user as seen by another user.
#[derive(Debug, Clone)]
pub struct ProfileView {
    pub user: user::Model,
    /// Number of posts the user has written, private ones included.
    pub posts_count: u64,
    /// Number of accepted friendships.
    pub friends_count: u64,
    /// Relationship from the viewer to this user.
    pub friendship_status: FriendshipLabel,
}

/// Lowercase the domain part of an email address.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{local}@{}", domain.to_lowercase()),
        None => email.to_string(),
    }
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub fn new(
        user_repo: UserRepository,
        post_repo: PostRepository,
        friendship_repo: FriendshipRepository,
    ) -> Self {
        Self {
            user_repo,
            post_repo,
            friendship_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Register a new account.
    pub async fn register(&self, input: RegisterInput) -> AppResult<user::Model> {
        input.validate()?;

        if input.password != input.password2 {
            return Err(AppError::Validation(
                "Password fields didn't match.".to_string(),
            ));
        }

        let email = normalize_email(&input.email);
        if self.user_repo.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict(
                "user with this email already exists.".to_string(),
            ));
        }

        let password_hash = hash_password(&input.password)?;

        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            email: Set(email),
            password_hash: Set(password_hash),
            first_name: Set(input.first_name.trim().to_string()),
            last_name: Set(input.last_name.trim().to_string()),
            bio: Set(String::new()),
            profile_picture: Set(None),
            cover_photo: Set(None),
            location: Set(String::new()),
            website: Set(String::new()),
            is_online: Set(false),
            last_seen: Set(None),
            is_active: Set(true),
            date_joined: Set(chrono::Utc::now().into()),
        };

        let user = self.user_repo.create(model).await?;
        tracing::info!(user_id = %user.id, "Registered user");
        Ok(user)
    }

    /// Check an email/password pair.
    ///
    /// Online state is not touched here; see `PresenceService`.
    pub async fn authenticate(&self, email: &str, password: &str) -> AppResult<user::Model> {
        let user = self
            .user_repo
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !user.is_active || !verify_password(password, &user.password_hash)? {
            return Err(AppError::Unauthorized);
        }

        Ok(user)
    }

    /// Get a user by ID.
    pub async fn get(&self, id: &str) -> AppResult<user::Model> {
        self.user_repo.get_by_id(id).await
    }

    /// Get a user that may still use the API.
    pub async fn get_active(&self, id: &str) -> AppResult<user::Model> {
        match self.user_repo.find_by_id(id).await? {
            Some(user) if user.is_active => Ok(user),
            _ => Err(AppError::Unauthorized),
        }
    }

    /// Update the text fields of a profile.
    pub async fn update_profile(
        &self,
        user: user::Model,
        input: UpdateProfileInput,
    ) -> AppResult<user::Model> {
        input.validate()?;

        let mut active: user::ActiveModel = user.into();

        if let Some(first_name) = input.first_name {
            active.first_name = Set(first_name.trim().to_string());
        }
        if let Some(last_name) = input.last_name {
            active.last_name = Set(last_name.trim().to_string());
        }
        if let Some(bio) = input.bio {
            active.bio = Set(bio);
        }
        if let Some(location) = input.location {
            active.location = Set(location);
        }
        if let Some(website) = input.website {
            active.website = Set(website);
        }

        self.user_repo.update(active).await
    }

    /// Point the profile picture at a stored image. Returns the updated user
    /// and the key of the image it replaced.
    pub async fn set_profile_picture(
        &self,
        user: user::Model,
        key: String,
    ) -> AppResult<(user::Model, Option<String>)> {
        let previous = user.profile_picture.clone();
        let mut active: user::ActiveModel = user.into();
        active.profile_picture = Set(Some(key));
        Ok((self.user_repo.update(active).await?, previous))
    }

    /// Point the cover photo at a stored image. Returns the updated user and
    /// the key of the image it replaced.
    pub async fn set_cover_photo(
        &self,
        user: user::Model,
        key: String,
    ) -> AppResult<(user::Model, Option<String>)> {
        let previous = user.cover_photo.clone();
        let mut active: user::ActiveModel = user.into();
        active.cover_photo = Set(Some(key));
        Ok((self.user_repo.update(active).await?, previous))
    }

    /// Search other users by name or email. A blank query matches nobody.
    pub async fn search(&self, viewer_id: &str, query: &str) -> AppResult<Vec<user::Model>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(vec![]);
        }
        self.user_repo.search(query, viewer_id, SEARCH_LIMIT).await
    }

    /// Build the profile of one user as seen by `viewer_id`.
    pub async fn profile(&self, viewer_id: &str, subject: user::Model) -> AppResult<ProfileView> {
        let mut views = self.profiles(viewer_id, vec![subject]).await?;
        views
            .pop()
            .ok_or_else(|| AppError::Internal("Profile lookup returned nothing".to_string()))
    }

    /// Build profiles for many users with a fixed number of queries.
    pub async fn profiles(
        &self,
        viewer_id: &str,
        users: Vec<user::Model>,
    ) -> AppResult<Vec<ProfileView>> {
        let ids: Vec<String> = users.iter().map(|u| u.id.clone()).collect();

        let posts = self.post_repo.count_by_authors(&ids).await?;
        let friends = self.friendship_repo.count_friends_many(&ids).await?;
        let rows = self.friendship_repo.find_between_many(viewer_id, &ids).await?;

        Ok(users
            .into_iter()
            .map(|user| {
                let friendship_status =
                    policy::friendship_status(viewer_id, &user.id, rows.get(&user.id));
                ProfileView {
                    posts_count: posts.get(&user.id).copied().unwrap_or(0),
                    friends_count: friends.get(&user.id).copied().unwrap_or(0),
                    friendship_status,
                    user,
                }
            })
            .collect())
    }
}

/// Hash a password with Argon2.
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn create_test_user(id: &str, email: &str, password: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            email: email.to_string(),
            password_hash: hash_password(password).unwrap(),
            first_name: "Alice".to_string(),
            last_name: "Smith".to_string(),
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

    fn service_with(user_db: MockDatabase) -> UserService {
        let empty = || Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        UserService::new(
            UserRepository::new(Arc::new(user_db.into_connection())),
            PostRepository::new(empty()),
            FriendshipRepository::new(empty()),
        )
    }

    fn register_input(password2: &str) -> RegisterInput {
        RegisterInput {
            email: "a@X.com".to_string(),
            first_name: "Alice".to_string(),
            last_name: "Smith".to_string(),
            password: "correct horse".to_string(),
            password2: password2.to_string(),
        }
    }

    #[test]
    fn test_hash_password() {
        let hash = hash_password("test_password_123").unwrap();
        assert!(hash.starts_with("$argon2"));
    }

    #[test]
    fn test_verify_password() {
        let hash = hash_password("test_password_123").unwrap();
        assert!(verify_password("test_password_123", &hash).unwrap());
        assert!(!verify_password("wrong_password", &hash).unwrap());
        assert!(verify_password("test", "invalid_hash").is_err());
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email(" Alice@Example.COM "), "Alice@example.com");
        assert_eq!(normalize_email("no-at-sign"), "no-at-sign");
    }

    #[test]
    fn test_update_profile_input_validation() {
        let input = UpdateProfileInput {
            bio: Some("x".repeat(501)),
            ..Default::default()
        };
        assert!(input.validate().is_err());

        let input = UpdateProfileInput {
            website: Some("not a url".to_string()),
            ..Default::default()
        };
        assert!(input.validate().is_err());

        let input = UpdateProfileInput {
            website: Some(String::new()),
            location: Some("Berlin".to_string()),
            ..Default::default()
        };
        assert!(input.validate().is_ok());
    }

    #[tokio::test]
    async fn test_register_password_mismatch() {
        let service = service_with(MockDatabase::new(DatabaseBackend::Postgres));
        let result = service.register(register_input("something else")).await;

        match result {
            Err(AppError::Validation(msg)) => assert!(msg.contains("didn't match")),
            _ => panic!("Expected Validation error"),
        }
    }

    #[tokio::test]
    async fn test_register_short_password() {
        let service = service_with(MockDatabase::new(DatabaseBackend::Postgres));
        let mut input = register_input("short");
        input.password = "short".to_string();

        assert!(matches!(
            service.register(input).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let existing = create_test_user("user1", "a@x.com", "correct horse");
        let service = service_with(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[existing]]),
        );

        let result = service.register(register_input("correct horse")).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_authenticate_success() {
        let user = create_test_user("user1", "a@x.com", "correct horse");
        let service =
            service_with(MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[user]]));

        let result = service.authenticate("a@X.COM", "correct horse").await.unwrap();
        assert_eq!(result.id, "user1");
        assert!(!result.is_online);
    }

    #[tokio::test]
    async fn test_authenticate_wrong_password() {
        let user = create_test_user("user1", "a@x.com", "correct horse");
        let service =
            service_with(MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[user]]));

        let result = service.authenticate("a@x.com", "battery staple").await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_authenticate_inactive_user() {
        let mut user = create_test_user("user1", "a@x.com", "correct horse");
        user.is_active = false;
        let service =
            service_with(MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[user]]));

        let result = service.authenticate("a@x.com", "correct horse").await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_search_blank_query_matches_nobody() {
        let service = service_with(MockDatabase::new(DatabaseBackend::Postgres));
        assert!(service.search("user1", "   ").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_active_rejects_missing_user() {
        let service = service_with(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()]),
        );
        assert!(matches!(
            service.get_active("ghost").await,
            Err(AppError::Unauthorized)
        ));
    }
}
