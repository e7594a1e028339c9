//! Listing entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Listing category.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum Category {
    #[sea_orm(string_value = "Textbooks")]
    Textbooks,
    #[sea_orm(string_value = "Notes")]
    Notes,
    #[sea_orm(string_value = "Study Aids")]
    #[serde(rename = "Study Aids", alias = "StudyAids")]
    StudyAids,
    #[sea_orm(string_value = "Equipment")]
    Equipment,
}

impl Category {
    /// Human readable label, as stored.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Textbooks => "Textbooks",
            Self::Notes => "Notes",
            Self::StudyAids => "Study Aids",
            Self::Equipment => "Equipment",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "listing")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Owner. Never changes after creation.
    #[sea_orm(indexed)]
    pub user_id: String,

    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub description: String,

    pub category: Category,

    pub department: String,

    pub semester: i16,

    /// Price in minor currency units.
    pub price_cents: i64,

    /// Array of absolute image URLs.
    #[sea_orm(column_type = "JsonBinary")]
    pub image_urls: Json,

    #[sea_orm(default_value = true)]
    pub is_approved: bool,

    /// Owner display name at creation time.
    #[sea_orm(nullable)]
    pub seller_name: Option<String>,

    #[sea_orm(nullable)]
    pub seller_avatar_url: Option<String>,

    #[sea_orm(indexed)]
    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    /// Image URLs as plain strings. Non-string entries are skipped.
    #[must_use]
    pub fn image_url_list(&self) -> Vec<String> {
        self.image_urls
            .as_array()
            .map(|urls| {
                urls.iter()
                    .filter_map(|u| u.as_str().map(ToString::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Price as a decimal amount.
    #[must_use]
    pub fn price(&self) -> f64 {
        self.price_cents as f64 / 100.0
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Owner,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
