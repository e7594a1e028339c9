//! Conversation repository.

use std::sync::Arc;

use crate::entities::{Conversation, conversation};
use chrono::{DateTime, FixedOffset};
use resource_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    sea_query::{Expr, NullOrdering, OnConflict, Order},
};

/// Conversation repository for database operations.
#[derive(Clone)]
pub struct ConversationRepository {
    db: Arc<DatabaseConnection>,
}

impl ConversationRepository {
    /// Create a new conversation repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a conversation by its pair key.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<conversation::Model>> {
        Conversation::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a conversation by its pair key, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<conversation::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::ConversationNotFound(id.to_string()))
    }

    /// Insert the conversation unless one with the same pair key exists.
    ///
    /// Returns whether a row was inserted. Two participants racing to start
    /// the same conversation both succeed and end up on one row.
    pub async fn create_if_absent(&self, model: conversation::ActiveModel) -> AppResult<bool> {
        let inserted = Conversation::insert(model)
            .on_conflict(
                OnConflict::column(conversation::Column::Id)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(inserted > 0)
    }

    /// Conversations the user takes part in, most recently active first.
    ///
    /// Conversations without messages sort last.
    pub async fn find_for_user(&self, user_id: &str) -> AppResult<Vec<conversation::Model>> {
        Conversation::find()
            .filter(
                Condition::any()
                    .add(conversation::Column::ParticipantA.eq(user_id))
                    .add(conversation::Column::ParticipantB.eq(user_id)),
            )
            .order_by_with_nulls(
                conversation::Column::LastMessageAt,
                Order::Desc,
                NullOrdering::Last,
            )
            .order_by_desc(conversation::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Tag the conversation with the listing it is currently about.
    pub async fn set_related_listing(&self, id: &str, listing_id: &str) -> AppResult<()> {
        Conversation::update_many()
            .col_expr(
                conversation::Column::RelatedListingId,
                Expr::value(listing_id.to_string()),
            )
            .filter(conversation::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Move the preview forward to the given message.
    ///
    /// The update only applies when the stored preview is not newer than
    /// `sent_at`, so a late retry can never roll the preview back. Returns
    /// whether the row was changed.
    pub async fn update_preview(
        &self,
        id: &str,
        text: &str,
        message_id: &str,
        sent_at: DateTime<FixedOffset>,
    ) -> AppResult<bool> {
        let result = Conversation::update_many()
            .col_expr(conversation::Column::LastMessage, Expr::value(text.to_string()))
            .col_expr(
                conversation::Column::LastMessageId,
                Expr::value(message_id.to_string()),
            )
            .col_expr(conversation::Column::LastMessageAt, Expr::value(sent_at))
            .filter(conversation::Column::Id.eq(id))
            .filter(
                Condition::any()
                    .add(conversation::Column::LastMessageAt.is_null())
                    .add(conversation::Column::LastMessageAt.lte(sent_at)),
            )
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }
}
