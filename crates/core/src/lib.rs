//! Core business logic for buddy.

pub mod policy;
pub mod services;

pub use policy::FriendshipLabel;
pub use services::*;
