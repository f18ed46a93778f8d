//! Repositories wrapping entity queries.

mod comment;
mod friendship;
mod like;
mod post;
mod user;

pub use comment::CommentRepository;
pub use friendship::FriendshipRepository;
pub use like::LikeRepository;
pub use post::PostRepository;
pub use user::UserRepository;
