//! Visibility and authorization rules for posts, comments and profiles.
//!
//! These are pure functions over loaded rows. Services call them after
//! fetching, so a private post is reported exactly like a missing one.

use buddy_common::{AppError, AppResult};
use buddy_db::entities::friendship::{self, FriendshipStatus};
use buddy_db::entities::post::{self, Visibility};
use serde::Serialize;

/// Whether `viewer_id` may read `post`.
#[must_use]
pub fn can_read(viewer_id: &str, post: &post::Model) -> bool {
    post.visibility == Visibility::Public || post.author_id == viewer_id
}

/// Return the post if readable, otherwise `PostNotFound`.
pub fn ensure_readable(viewer_id: &str, post: post::Model) -> AppResult<post::Model> {
    if can_read(viewer_id, &post) {
        Ok(post)
    } else {
        Err(AppError::PostNotFound(post.id))
    }
}

/// Only the author may change or delete what they wrote.
pub fn authorize_write(viewer_id: &str, author_id: &str) -> AppResult<()> {
    if viewer_id == author_id {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "You do not have permission to perform this action.".to_string(),
        ))
    }
}

/// Relationship between a viewer and the profile they are looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FriendshipLabel {
    /// Viewer is looking at their own profile.
    #[serde(rename = "self")]
    Myself,
    /// No friendship row between the two.
    None,
    /// Accepted friendship.
    Friends,
    /// Viewer sent a request that is not accepted.
    PendingSent,
    /// Subject sent the viewer a request that is not accepted.
    PendingReceived,
}

/// Label the relationship from `viewer_id` to `subject_id`.
///
/// `row` is the single friendship row between the two users, if any. A
/// rejected row keeps its direction label.
#[must_use]
pub fn friendship_status(
    viewer_id: &str,
    subject_id: &str,
    row: Option<&friendship::Model>,
) -> FriendshipLabel {
    if viewer_id == subject_id {
        return FriendshipLabel::Myself;
    }

    match row {
        None => FriendshipLabel::None,
        Some(f) if f.status == FriendshipStatus::Accepted => FriendshipLabel::Friends,
        Some(f) if f.from_user_id == viewer_id => FriendshipLabel::PendingSent,
        Some(_) => FriendshipLabel::PendingReceived,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn post(author: &str, visibility: Visibility) -> post::Model {
        post::Model {
            id: "p1".to_string(),
            author_id: author.to_string(),
            content: "hi".to_string(),
            image: None,
            visibility,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    fn row(from: &str, to: &str, status: FriendshipStatus) -> friendship::Model {
        friendship::Model {
            id: "f1".to_string(),
            from_user_id: from.to_string(),
            to_user_id: to.to_string(),
            status,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    #[test]
    fn test_public_post_is_readable_by_anyone() {
        assert!(can_read("bob", &post("alice", Visibility::Public)));
    }

    #[test]
    fn test_private_post_is_readable_by_author_only() {
        let p = post("alice", Visibility::Private);
        assert!(can_read("alice", &p));
        assert!(!can_read("bob", &p));
        assert!(matches!(
            ensure_readable("bob", p),
            Err(AppError::PostNotFound(id)) if id == "p1"
        ));
    }

    #[test]
    fn test_authorize_write() {
        assert!(authorize_write("alice", "alice").is_ok());
        assert!(matches!(
            authorize_write("bob", "alice"),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_friendship_status_labels() {
        assert_eq!(friendship_status("a", "a", None), FriendshipLabel::Myself);
        assert_eq!(friendship_status("a", "b", None), FriendshipLabel::None);

        let accepted = row("b", "a", FriendshipStatus::Accepted);
        assert_eq!(
            friendship_status("a", "b", Some(&accepted)),
            FriendshipLabel::Friends
        );

        let pending = row("a", "b", FriendshipStatus::Pending);
        assert_eq!(
            friendship_status("a", "b", Some(&pending)),
            FriendshipLabel::PendingSent
        );
        assert_eq!(
            friendship_status("b", "a", Some(&pending)),
            FriendshipLabel::PendingReceived
        );

        let rejected = row("a", "b", FriendshipStatus::Rejected);
        assert_eq!(
            friendship_status("a", "b", Some(&rejected)),
            FriendshipLabel::PendingSent
        );
    }

    #[test]
    fn test_label_serializes_as_snake_case() {
        assert_eq!(
            serde_json::to_string(&FriendshipLabel::Myself).unwrap(),
            "\"self\""
        );
        assert_eq!(
            serde_json::to_string(&FriendshipLabel::PendingReceived).unwrap(),
            "\"pending_received\""
        );
    }
}
