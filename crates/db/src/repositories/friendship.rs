//! Friendship repository.

use std::collections::HashMap;
use std::sync::Arc;

use crate::entities::{Friendship, friendship};
use crate::entities::friendship::FriendshipStatus;
use crate::map_write_err;
use buddy_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder,
};

/// Friendship repository for database operations.
#[derive(Clone)]
pub struct FriendshipRepository {
    db: Arc<DatabaseConnection>,
}

/// Matches the row between `a` and `b`, whichever of them sent it.
fn between(a: &str, b: &str) -> Condition {
    Condition::any()
        .add(
            Condition::all()
                .add(friendship::Column::FromUserId.eq(a))
                .add(friendship::Column::ToUserId.eq(b)),
        )
        .add(
            Condition::all()
                .add(friendship::Column::FromUserId.eq(b))
                .add(friendship::Column::ToUserId.eq(a)),
        )
}

fn involving(user_id: &str) -> Condition {
    Condition::any()
        .add(friendship::Column::FromUserId.eq(user_id))
        .add(friendship::Column::ToUserId.eq(user_id))
}

impl FriendshipRepository {
    /// Create a new friendship repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a friendship by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<friendship::Model>> {
        Friendship::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the row between two users in either direction.
    pub async fn find_between(
        &self,
        a: &str,
        b: &str,
    ) -> AppResult<Option<friendship::Model>> {
        Friendship::find()
            .filter(between(a, b))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the row between two users with the given status, in either direction.
    pub async fn find_between_with_status(
        &self,
        a: &str,
        b: &str,
        status: FriendshipStatus,
    ) -> AppResult<Option<friendship::Model>> {
        Friendship::find()
            .filter(between(a, b))
            .filter(friendship::Column::Status.eq(status))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Rows between `viewer` and each of `others`, keyed by the other user's ID.
    pub async fn find_between_many(
        &self,
        viewer: &str,
        others: &[String],
    ) -> AppResult<HashMap<String, friendship::Model>> {
        if others.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = Friendship::find()
            .filter(
                Condition::any()
                    .add(
                        Condition::all()
                            .add(friendship::Column::FromUserId.eq(viewer))
                            .add(friendship::Column::ToUserId.is_in(others.to_vec())),
                    )
                    .add(
                        Condition::all()
                            .add(friendship::Column::ToUserId.eq(viewer))
                            .add(friendship::Column::FromUserId.is_in(others.to_vec())),
                    ),
            )
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|row| (row.peer_of(viewer).to_string(), row))
            .collect())
    }

    /// Create a new friendship row. A duplicate (from, to) pair surfaces as `Conflict`.
    pub async fn create(&self, model: friendship::ActiveModel) -> AppResult<friendship::Model> {
        model.insert(self.db.as_ref()).await.map_err(map_write_err)
    }

    /// Update a friendship row.
    pub async fn update(&self, model: friendship::ActiveModel) -> AppResult<friendship::Model> {
        model.update(self.db.as_ref()).await.map_err(map_write_err)
    }

    /// Delete a friendship row.
    pub async fn delete(&self, model: friendship::Model) -> AppResult<()> {
        model
            .delete(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Pending requests received by a user, newest first.
    pub async fn find_pending_received(
        &self,
        user_id: &str,
    ) -> AppResult<Vec<friendship::Model>> {
        Friendship::find()
            .filter(friendship::Column::ToUserId.eq(user_id))
            .filter(friendship::Column::Status.eq(FriendshipStatus::Pending))
            .order_by_desc(friendship::Column::CreatedAt)
            .order_by_desc(friendship::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Accepted friendships a user takes part in, in either direction.
    pub async fn find_accepted(&self, user_id: &str) -> AppResult<Vec<friendship::Model>> {
        Friendship::find()
            .filter(involving(user_id))
            .filter(friendship::Column::Status.eq(FriendshipStatus::Accepted))
            .order_by_desc(friendship::Column::UpdatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Number of friends for each of the given users.
    ///
    /// Users without friends are absent from the map.
    pub async fn count_friends_many(&self, user_ids: &[String]) -> AppResult<HashMap<String, u64>> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = Friendship::find()
            .filter(
                Condition::any()
                    .add(friendship::Column::FromUserId.is_in(user_ids.to_vec()))
                    .add(friendship::Column::ToUserId.is_in(user_ids.to_vec())),
            )
            .filter(friendship::Column::Status.eq(FriendshipStatus::Accepted))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut counts = HashMap::new();
        for row in rows {
            for side in [&row.from_user_id, &row.to_user_id] {
                if user_ids.contains(side) {
                    *counts.entry(side.clone()).or_insert(0) += 1;
                }
            }
        }
        Ok(counts)
    }
}
