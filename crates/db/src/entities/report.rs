//! Report entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Report status. Only `Pending -> Resolved` is allowed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    #[sea_orm(string_value = "pending")]
    #[default]
    Pending,
    #[sea_orm(string_value = "resolved")]
    Resolved,
}

/// Report model.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "report")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// The user who filed the report.
    pub reporter_id: String,
    /// The reported listing.
    pub listing_id: String,
    /// Owner of the reported listing.
    pub reported_user_id: String,
    /// Listing title at filing time.
    pub listing_title: String,
    #[sea_orm(column_type = "Text")]
    pub reason: String,
    /// Summary produced for moderators.
    #[sea_orm(column_type = "Text")]
    pub summary: String,
    #[sea_orm(indexed)]
    pub status: ReportStatus,
    /// Administrator who resolved the report.
    pub resolved_by: Option<String>,
    pub resolved_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
