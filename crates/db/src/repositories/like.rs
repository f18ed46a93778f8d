//! Like repository.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::entities::like::LikeTargetKind;
use crate::entities::{Like, like};
use crate::map_write_err;
use buddy_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};

/// Like repository for database operations.
#[derive(Clone)]
pub struct LikeRepository {
    db: Arc<DatabaseConnection>,
}

impl LikeRepository {
    /// Create a new like repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find the like a user left on a target.
    pub async fn find(
        &self,
        user_id: &str,
        kind: LikeTargetKind,
        target_id: &str,
    ) -> AppResult<Option<like::Model>> {
        Like::find()
            .filter(like::Column::UserId.eq(user_id))
            .filter(like::Column::TargetKind.eq(kind))
            .filter(like::Column::TargetId.eq(target_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a like. A second like by the same user surfaces as `Conflict`.
    pub async fn create(&self, model: like::ActiveModel) -> AppResult<like::Model> {
        model.insert(self.db.as_ref()).await.map_err(map_write_err)
    }

    /// Delete a like.
    pub async fn delete(&self, model: like::Model) -> AppResult<()> {
        model
            .delete(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete every like on the given targets.
    pub async fn delete_for_targets(
        &self,
        kind: LikeTargetKind,
        target_ids: &[String],
    ) -> AppResult<u64> {
        if target_ids.is_empty() {
            return Ok(0);
        }

        let result = Like::delete_many()
            .filter(like::Column::TargetKind.eq(kind))
            .filter(like::Column::TargetId.is_in(target_ids.to_vec()))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }

    /// Count likes on a target.
    pub async fn count(&self, kind: LikeTargetKind, target_id: &str) -> AppResult<u64> {
        Like::find()
            .filter(like::Column::TargetKind.eq(kind))
            .filter(like::Column::TargetId.eq(target_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count likes on each of the given targets.
    pub async fn count_many(
        &self,
        kind: LikeTargetKind,
        target_ids: &[String],
    ) -> AppResult<HashMap<String, u64>> {
        if target_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(String, i64)> = Like::find()
            .select_only()
            .column(like::Column::TargetId)
            .column_as(like::Column::Id.count(), "count")
            .filter(like::Column::TargetKind.eq(kind))
            .filter(like::Column::TargetId.is_in(target_ids.to_vec()))
            .group_by(like::Column::TargetId)
            .into_tuple()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|(id, count)| (id, count.max(0) as u64))
            .collect())
    }

    /// Which of the given targets the user has liked.
    pub async fn liked_by(
        &self,
        user_id: &str,
        kind: LikeTargetKind,
        target_ids: &[String],
    ) -> AppResult<HashSet<String>> {
        if target_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let ids: Vec<String> = Like::find()
            .select_only()
            .column(like::Column::TargetId)
            .filter(like::Column::UserId.eq(user_id))
            .filter(like::Column::TargetKind.eq(kind))
            .filter(like::Column::TargetId.is_in(target_ids.to_vec()))
            .into_tuple()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(ids.into_iter().collect())
    }

    /// Likes on a target, newest first.
    pub async fn find_by_target(
        &self,
        kind: LikeTargetKind,
        target_id: &str,
        offset: u64,
        limit: u64,
    ) -> AppResult<Vec<like::Model>> {
        Like::find()
            .filter(like::Column::TargetKind.eq(kind))
            .filter(like::Column::TargetId.eq(target_id))
            .order_by_desc(like::Column::CreatedAt)
            .order_by_desc(like::Column::Id)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_like(id: &str, user_id: &str, target_id: &str) -> like::Model {
        like::Model {
            id: id.to_string(),
            user_id: user_id.to_string(),
            target_kind: LikeTargetKind::Post,
            target_id: target_id.to_string(),
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_existing_like() {
        let like = create_test_like("l1", "bob", "post1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[like]])
                .into_connection(),
        );

        let repo = LikeRepository::new(db);
        let result = repo
            .find("bob", LikeTargetKind::Post, "post1")
            .await
            .unwrap();
        assert_eq!(result.unwrap().id, "l1");
    }

    #[tokio::test]
    async fn test_count() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(7)),
                }]])
                .into_connection(),
        );

        let repo = LikeRepository::new(db);
        assert_eq!(repo.count(LikeTargetKind::Comment, "c1").await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_delete_for_targets() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 4,
                }])
                .into_connection(),
        );

        let repo = LikeRepository::new(db);
        let deleted = repo
            .delete_for_targets(LikeTargetKind::Comment, &["c1".to_string(), "c2".to_string()])
            .await
            .unwrap();
        assert_eq!(deleted, 4);
        assert_eq!(
            repo.delete_for_targets(LikeTargetKind::Post, &[]).await.unwrap(),
            0
        );
    }
}
