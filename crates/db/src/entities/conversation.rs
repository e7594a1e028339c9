//! Conversation entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "conversation")]
pub struct Model {
    /// Canonical pair key, `{participant_a}_{participant_b}`.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Lower of the two participant ids.
    #[sea_orm(indexed)]
    pub participant_a: String,

    /// Higher of the two participant ids.
    #[sea_orm(indexed)]
    pub participant_b: String,

    /// Listing the conversation was started from, if any.
    #[sea_orm(nullable)]
    pub related_listing_id: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub last_message: Option<String>,

    #[sea_orm(nullable)]
    pub last_message_id: Option<String>,

    #[sea_orm(nullable)]
    pub last_message_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    /// Whether `user_id` is one of the two participants.
    #[must_use]
    pub fn has_participant(&self, user_id: &str) -> bool {
        self.participant_a == user_id || self.participant_b == user_id
    }

    /// The participant that is not `user_id`.
    #[must_use]
    pub fn other_participant(&self, user_id: &str) -> &str {
        if self.participant_a == user_id {
            &self.participant_b
        } else {
            &self.participant_a
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::chat_message::Entity")]
    Messages,
}

impl Related<super::chat_message::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Messages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
