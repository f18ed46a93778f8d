//! Create user table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(User::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(User::Email).string_len(254).not_null())
                    .col(ColumnDef::new(User::PasswordHash).string_len(256).not_null())
                    .col(ColumnDef::new(User::FirstName).string_len(50).not_null())
                    .col(ColumnDef::new(User::LastName).string_len(50).not_null())
                    .col(ColumnDef::new(User::Bio).text().not_null().default(""))
                    .col(ColumnDef::new(User::ProfilePicture).string_len(512))
                    .col(ColumnDef::new(User::CoverPhoto).string_len(512))
                    .col(ColumnDef::new(User::Location).string_len(100).not_null().default(""))
                    .col(ColumnDef::new(User::Website).string_len(200).not_null().default(""))
                    .col(ColumnDef::new(User::IsOnline).boolean().not_null().default(false))
                    .col(ColumnDef::new(User::LastSeen).timestamp_with_time_zone())
                    .col(ColumnDef::new(User::IsActive).boolean().not_null().default(true))
                    .col(
                        ColumnDef::new(User::DateJoined)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: email is the login identifier
        manager
            .create_index(
                Index::create()
                    .name("idx_user_email")
                    .table(User::Table)
                    .col(User::Email)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: first_name (search results are ordered by it)
        manager
            .create_index(
                Index::create()
                    .name("idx_user_first_name")
                    .table(User::Table)
                    .col(User::FirstName)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(User::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum User {
    Table,
    Id,
    Email,
    PasswordHash,
    FirstName,
    LastName,
    Bio,
    ProfilePicture,
    CoverPhoto,
    Location,
    Website,
    IsOnline,
    LastSeen,
    IsActive,
    DateJoined,
}
