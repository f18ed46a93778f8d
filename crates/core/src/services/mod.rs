//! Business logic services.

pub mod auth;
pub mod comment;
pub mod friendship;
pub mod like;
pub mod post;
pub mod presence;
pub mod storage;
pub mod user;

pub use auth::{Claims, TokenKind, TokenPair, TokenService};
pub use comment::{CommentService, CommentView, CreateCommentInput, UpdateCommentInput};
pub use friendship::{FriendshipService, FriendshipView};
pub use like::{LikeService, LikeTarget, LikerView, ToggleResult};
pub use post::{CreatePostInput, PostService, PostView, UpdatePostInput};
pub use presence::PresenceService;
pub use storage::{ImageUpload, MediaService, NoOpStorage, StorageService};
pub use user::{ProfileView, RegisterInput, UpdateProfileInput, UserService};
