//! Chat message repository.

use std::sync::Arc;

use crate::entities::{ChatMessage, chat_message};
use resource_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};

/// Repository for chat message operations.
#[derive(Clone)]
pub struct ChatMessageRepository {
    db: Arc<DatabaseConnection>,
}

impl ChatMessageRepository {
    /// Create a new chat message repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Append a message.
    pub async fn create(&self, model: chat_message::ActiveModel) -> AppResult<chat_message::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All messages of a conversation in send order.
    ///
    /// Ties on `created_at` are broken by the time-ordered message ID.
    pub async fn find_by_conversation(
        &self,
        conversation_id: &str,
    ) -> AppResult<Vec<chat_message::Model>> {
        ChatMessage::find()
            .filter(chat_message::Column::ConversationId.eq(conversation_id))
            .order_by_asc(chat_message::Column::CreatedAt)
            .order_by_asc(chat_message::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
