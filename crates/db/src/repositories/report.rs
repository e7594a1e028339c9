//! Report repository.

use std::sync::Arc;

use crate::entities::{
    Report,
    report::{self, ReportStatus},
};
use chrono::{DateTime, FixedOffset};
use resource_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, sea_query::Expr,
};

/// Report repository for database operations.
#[derive(Clone)]
pub struct ReportRepository {
    db: Arc<DatabaseConnection>,
}

impl ReportRepository {
    /// Create a new report repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Insert a report.
    pub async fn create(&self, model: report::ActiveModel) -> AppResult<report::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a report by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<report::Model>> {
        Report::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a report by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<report::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Report {id}")))
    }

    /// Reports, newest first, optionally restricted to one status.
    pub async fn find(
        &self,
        status: Option<ReportStatus>,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<report::Model>> {
        let mut query = Report::find();
        if let Some(status) = status {
            query = query.filter(report::Column::Status.eq(status));
        }

        query
            .order_by_desc(report::Column::CreatedAt)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Move a pending report to resolved.
    ///
    /// Reports that are already resolved are left untouched. Returns whether
    /// the row changed.
    pub async fn mark_resolved(
        &self,
        id: &str,
        resolved_by: &str,
        resolved_at: DateTime<FixedOffset>,
    ) -> AppResult<bool> {
        let result = Report::update_many()
            .col_expr(report::Column::Status, Expr::value(ReportStatus::Resolved))
            .col_expr(report::Column::ResolvedBy, Expr::value(resolved_by.to_string()))
            .col_expr(report::Column::ResolvedAt, Expr::value(resolved_at))
            .filter(report::Column::Id.eq(id))
            .filter(report::Column::Status.eq(ReportStatus::Pending))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }

    /// Number of reports with the given status.
    pub async fn count_by_status(&self, status: ReportStatus) -> AppResult<u64> {
        Report::find()
            .filter(report::Column::Status.eq(status))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
