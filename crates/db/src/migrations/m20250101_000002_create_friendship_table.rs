//! Create friendship table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Friendship::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Friendship::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Friendship::FromUserId).string_len(32).not_null())
                    .col(ColumnDef::new(Friendship::ToUserId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Friendship::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Friendship::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Friendship::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_friendship_from_user")
                            .from(Friendship::Table, Friendship::FromUserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_friendship_to_user")
                            .from(Friendship::Table, Friendship::ToUserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (from_user_id, to_user_id) - one row per direction
        manager
            .create_index(
                Index::create()
                    .name("idx_friendship_from_to")
                    .table(Friendship::Table)
                    .col(Friendship::FromUserId)
                    .col(Friendship::ToUserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: (to_user_id, status) for incoming pending requests
        manager
            .create_index(
                Index::create()
                    .name("idx_friendship_to_status")
                    .table(Friendship::Table)
                    .col(Friendship::ToUserId)
                    .col(Friendship::Status)
                    .to_owned(),
            )
            .await?;

        // Index: (from_user_id, status) for friend lists
        manager
            .create_index(
                Index::create()
                    .name("idx_friendship_from_status")
                    .table(Friendship::Table)
                    .col(Friendship::FromUserId)
                    .col(Friendship::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Friendship::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Friendship {
    Table,
    Id,
    FromUserId,
    ToUserId,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
