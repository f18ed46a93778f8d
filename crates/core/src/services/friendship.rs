//! Friendship service.

use buddy_common::{AppError, AppResult, IdGenerator};
use buddy_db::{
    entities::{
        friendship::{self, FriendshipStatus},
        user,
    },
    repositories::{FriendshipRepository, UserRepository},
};
use sea_orm::Set;

/// Friendship service for business logic.
#[derive(Clone)]
pub struct FriendshipService {
    friendship_repo: FriendshipRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

/// A friendship row with both users resolved.
#[derive(Debug, Clone)]
pub struct FriendshipView {
    pub friendship: friendship::Model,
    pub from_user: user::Model,
    pub to_user: user::Model,
}

/// Parse the action a recipient takes on a pending request.
fn parse_action(action: &str) -> AppResult<FriendshipStatus> {
    match action {
        "accept" => Ok(FriendshipStatus::Accepted),
        "reject" => Ok(FriendshipStatus::Rejected),
        _ => Err(AppError::Validation("Invalid action".to_string())),
    }
}

impl FriendshipService {
    /// Create a new friendship service.
    #[must_use]
    pub fn new(friendship_repo: FriendshipRepository, user_repo: UserRepository) -> Self {
        Self {
            friendship_repo,
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Send a friend request from `sender` to the user `to_user_id`.
    ///
    /// A previously rejected request between the two is reused: it is
    /// pointed from the sender to the recipient and reset to pending.
    pub async fn send_request(
        &self,
        sender: &user::Model,
        to_user_id: &str,
    ) -> AppResult<FriendshipView> {
        let target = self
            .user_repo
            .find_by_id(to_user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if target.id == sender.id {
            return Err(AppError::Conflict(
                "Cannot send friend request to yourself".to_string(),
            ));
        }

        let now = chrono::Utc::now();
        let friendship = match self.friendship_repo.find_between(&sender.id, &target.id).await? {
            Some(existing) if existing.status == FriendshipStatus::Accepted => {
                return Err(AppError::Conflict("Already friends".to_string()));
            }
            Some(existing) if existing.status == FriendshipStatus::Pending => {
                return Err(AppError::Conflict(
                    "Friend request already sent".to_string(),
                ));
            }
            Some(rejected) => {
                let mut active: friendship::ActiveModel = rejected.into();
                active.from_user_id = Set(sender.id.clone());
                active.to_user_id = Set(target.id.clone());
                active.status = Set(FriendshipStatus::Pending);
                active.created_at = Set(now.into());
                active.updated_at = Set(now.into());
                self.friendship_repo.update(active).await?
            }
            None => {
                let model = friendship::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    from_user_id: Set(sender.id.clone()),
                    to_user_id: Set(target.id.clone()),
                    status: Set(FriendshipStatus::Pending),
                    created_at: Set(now.into()),
                    updated_at: Set(now.into()),
                };
                self.friendship_repo.create(model).await?
            }
        };

        tracing::info!(
            friendship_id = %friendship.id,
            from = %sender.id,
            to = %target.id,
            "Friend request sent"
        );

        Ok(FriendshipView {
            friendship,
            from_user: sender.clone(),
            to_user: target,
        })
    }

    /// Accept or reject a pending request addressed to `responder`.
    pub async fn respond(
        &self,
        friendship_id: &str,
        responder: &user::Model,
        action: &str,
    ) -> AppResult<FriendshipView> {
        let request = self
            .friendship_repo
            .find_by_id(friendship_id)
            .await?
            .filter(|f| f.to_user_id == responder.id && f.status == FriendshipStatus::Pending)
            .ok_or_else(|| AppError::NotFound("Friend request not found".to_string()))?;

        let status = parse_action(action)?;

        let mut active: friendship::ActiveModel = request.into();
        active.status = Set(status);
        active.updated_at = Set(chrono::Utc::now().into());
        let friendship = self.friendship_repo.update(active).await?;

        tracing::info!(friendship_id = %friendship.id, status = ?status, "Friend request answered");

        let from_user = self.user_repo.get_by_id(&friendship.from_user_id).await?;
        Ok(FriendshipView {
            friendship,
            from_user,
            to_user: responder.clone(),
        })
    }

    /// Remove the accepted friendship between two users.
    pub async fn unfriend(&self, user_id: &str, other_id: &str) -> AppResult<()> {
        let friendship = self
            .friendship_repo
            .find_between_with_status(user_id, other_id, FriendshipStatus::Accepted)
            .await?
            .ok_or_else(|| AppError::NotFound("Friendship not found".to_string()))?;

        self.friendship_repo.delete(friendship).await?;
        tracing::info!(user_id = %user_id, other_id = %other_id, "Unfriended");
        Ok(())
    }

    /// Users with an accepted friendship with `user_id`, in either direction.
    pub async fn list_friends(&self, user_id: &str) -> AppResult<Vec<user::Model>> {
        let rows = self.friendship_repo.find_accepted(user_id).await?;

        let mut ids: Vec<String> = rows
            .iter()
            .map(|row| row.peer_of(user_id).to_string())
            .collect();
        ids.sort();
        ids.dedup();

        self.user_repo.find_by_ids(&ids).await
    }

    /// Pending requests received by `recipient`, newest first.
    pub async fn list_pending_received(
        &self,
        recipient: &user::Model,
    ) -> AppResult<Vec<FriendshipView>> {
        let rows = self.friendship_repo.find_pending_received(&recipient.id).await?;

        let sender_ids: Vec<String> = rows.iter().map(|r| r.from_user_id.clone()).collect();
        let senders = self.user_repo.find_by_ids(&sender_ids).await?;

        Ok(rows
            .into_iter()
            .filter_map(|friendship| {
                let from_user = senders
                    .iter()
                    .find(|u| u.id == friendship.from_user_id)?
                    .clone();
                Some(FriendshipView {
                    friendship,
                    from_user,
                    to_user: recipient.clone(),
                })
            })
            .collect())
    }
}
