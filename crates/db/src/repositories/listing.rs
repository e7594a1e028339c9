//! Listing repository.

use std::sync::Arc;

use crate::entities::{
    Listing,
    listing::{self, Category},
};
use resource_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    sea_query::{Expr, Func},
};
use serde::Serialize;

/// Browse/feed query. Every filter is optional.
#[derive(Debug, Clone, Default)]
pub struct ListingQuery {
    pub limit: u64,
    pub category: Option<Category>,
    pub department: Option<String>,
    pub semester: Option<i16>,
    /// Case-insensitive substring of the title.
    pub search: Option<String>,
}

/// Number of listings in one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromQueryResult)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

/// Listing repository for database operations.
#[derive(Clone)]
pub struct ListingRepository {
    db: Arc<DatabaseConnection>,
}

impl ListingRepository {
    /// Create a new listing repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Insert a listing.
    pub async fn create(&self, model: listing::ActiveModel) -> AppResult<listing::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a listing by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<listing::Model>> {
        Listing::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a listing by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<listing::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::ListingNotFound(id.to_string()))
    }

    /// Find listings by IDs, newest first. Unknown IDs are skipped.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<listing::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        Listing::find()
            .filter(listing::Column::Id.is_in(ids.to_vec()))
            .order_by_desc(listing::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Newest listings matching the query.
    pub async fn find_recent(&self, query: &ListingQuery) -> AppResult<Vec<listing::Model>> {
        let mut select = Listing::find();

        if let Some(category) = query.category {
            select = select.filter(listing::Column::Category.eq(category));
        }
        if let Some(department) = &query.department {
            select = select.filter(listing::Column::Department.eq(department.as_str()));
        }
        if let Some(semester) = query.semester {
            select = select.filter(listing::Column::Semester.eq(semester));
        }
        if let Some(search) = query.search.as_deref().map(str::trim)
            && !search.is_empty()
        {
            let pattern = format!("%{}%", escape_like(&search.to_lowercase()));
            select = select
                .filter(Expr::expr(Func::lower(Expr::col(listing::Column::Title))).like(pattern));
        }

        select
            .order_by_desc(listing::Column::CreatedAt)
            .order_by_desc(listing::Column::Id)
            .limit(query.limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Listings owned by a user, newest first.
    pub async fn find_by_owner(&self, user_id: &str) -> AppResult<Vec<listing::Model>> {
        Listing::find()
            .filter(listing::Column::UserId.eq(user_id))
            .order_by_desc(listing::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Newest listings other than `exclude_id`.
    pub async fn find_others(
        &self,
        exclude_id: &str,
        limit: u64,
    ) -> AppResult<Vec<listing::Model>> {
        Listing::find()
            .filter(listing::Column::Id.ne(exclude_id))
            .order_by_desc(listing::Column::CreatedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Total number of listings.
    pub async fn count(&self) -> AppResult<u64> {
        Listing::find()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Sum of all listing prices in minor units.
    pub async fn sum_price_cents(&self) -> AppResult<i64> {
        #[derive(FromQueryResult)]
        struct SumResult {
            total: Option<i64>,
        }

        let result = Listing::find()
            .select_only()
            .column_as(
                Expr::cust("CAST(COALESCE(SUM(\"price_cents\"), 0) AS BIGINT)"),
                "total",
            )
            .into_model::<SumResult>()
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.and_then(|r| r.total).unwrap_or(0))
    }

    /// Listing counts grouped by category.
    pub async fn count_by_category(&self) -> AppResult<Vec<CategoryCount>> {
        Listing::find()
            .select_only()
            .column(listing::Column::Category)
            .column_as(Expr::col(listing::Column::Id).count(), "count")
            .group_by(listing::Column::Category)
            .order_by_asc(listing::Column::Category)
            .into_model::<CategoryCount>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
