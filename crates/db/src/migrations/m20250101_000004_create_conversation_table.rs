//! Create conversation table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Conversation::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Conversation::Id)
                            .string_len(257)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Conversation::ParticipantA).string_len(128).not_null())
                    .col(ColumnDef::new(Conversation::ParticipantB).string_len(128).not_null())
                    .col(ColumnDef::new(Conversation::RelatedListingId).string_len(32))
                    .col(ColumnDef::new(Conversation::LastMessage).text())
                    .col(ColumnDef::new(Conversation::LastMessageId).string_len(32))
                    .col(ColumnDef::new(Conversation::LastMessageAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Conversation::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .check(
                        Expr::col(Conversation::ParticipantA)
                            .lt(Expr::col(Conversation::ParticipantB)),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_conversation_participant_a")
                    .table(Conversation::Table)
                    .col(Conversation::ParticipantA)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_conversation_participant_b")
                    .table(Conversation::Table)
                    .col(Conversation::ParticipantB)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Conversation::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Conversation {
    Table,
    Id,
    ParticipantA,
    ParticipantB,
    RelatedListingId,
    LastMessage,
    LastMessageId,
    LastMessageAt,
    CreatedAt,
}
