//! Presence service.
//!
//! Online state changes only through these calls; authenticating a user
//! never touches it.

use buddy_common::AppResult;
use buddy_db::repositories::UserRepository;

/// Tracks whether users are online and when they were last seen.
#[derive(Clone)]
pub struct PresenceService {
    user_repo: UserRepository,
}

impl PresenceService {
    /// Create a new presence service.
    #[must_use]
    pub const fn new(user_repo: UserRepository) -> Self {
        Self { user_repo }
    }

    /// Mark a user online and stamp `last_seen`.
    pub async fn mark_online(&self, user_id: &str) -> AppResult<()> {
        self.user_repo.set_presence(user_id, true).await?;
        tracing::debug!(user_id = %user_id, "User is online");
        Ok(())
    }

    /// Mark a user offline and stamp `last_seen`.
    pub async fn mark_offline(&self, user_id: &str) -> AppResult<()> {
        self.user_repo.set_presence(user_id, false).await?;
        tracing::debug!(user_id = %user_id, "User is offline");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_mark_online_then_offline() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
            ])
            .into_connection();
        let db = Arc::new(db);

        let service = PresenceService::new(UserRepository::new(db));
        assert!(service.mark_online("user1").await.is_ok());
        assert!(service.mark_offline("user1").await.is_ok());
    }
}
