//! Create chat message table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ChatMessage::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ChatMessage::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(ChatMessage::ConversationId).string_len(257).not_null())
                    .col(ColumnDef::new(ChatMessage::SenderId).string_len(128).not_null())
                    .col(ColumnDef::new(ChatMessage::SenderName).string_len(256))
                    .col(ColumnDef::new(ChatMessage::SenderAvatar).string_len(1024))
                    .col(ColumnDef::new(ChatMessage::Text).text().not_null())
                    .col(
                        ColumnDef::new(ChatMessage::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_chat_message_conversation")
                            .from(ChatMessage::Table, ChatMessage::ConversationId)
                            .to(Conversation::Table, Conversation::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Read order within a conversation
        manager
            .create_index(
                Index::create()
                    .name("idx_chat_message_conversation_created_at")
                    .table(ChatMessage::Table)
                    .col(ChatMessage::ConversationId)
                    .col(ChatMessage::CreatedAt)
                    .col(ChatMessage::Id)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ChatMessage::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum ChatMessage {
    Table,
    Id,
    ConversationId,
    SenderId,
    SenderName,
    SenderAvatar,
    Text,
    CreatedAt,
}

#[derive(Iden)]
enum Conversation {
    Table,
    Id,
}
