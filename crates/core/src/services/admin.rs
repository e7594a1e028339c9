//! Administrator dashboard.

use resource_common::AppResult;
use resource_db::{
    entities::{report::ReportStatus, user},
    repositories::{CategoryCount, ListingRepository, ReportRepository, UserRepository},
};
use serde::Serialize;

use super::user::UserService;

/// Marketplace totals shown to administrators.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_users: u64,
    pub total_listings: u64,
    /// Sum of all listing prices, in currency units.
    pub total_revenue: f64,
    pub listings_by_category: Vec<CategoryCount>,
    pub pending_reports: u64,
    pub resolved_reports: u64,
}

/// Admin service.
#[derive(Clone)]
pub struct AdminService {
    users: UserService,
    user_repo: UserRepository,
    listing_repo: ListingRepository,
    report_repo: ReportRepository,
}

impl AdminService {
    /// Create a new admin service.
    #[must_use]
    pub const fn new(
        users: UserService,
        user_repo: UserRepository,
        listing_repo: ListingRepository,
        report_repo: ReportRepository,
    ) -> Self {
        Self {
            users,
            user_repo,
            listing_repo,
            report_repo,
        }
    }

    /// Aggregate statistics.
    pub async fn dashboard(&self, admin_id: &str) -> AppResult<DashboardStats> {
        self.users.require_administrator(admin_id).await?;

        let total_users = self.user_repo.count().await?;
        let total_listings = self.listing_repo.count().await?;
        let revenue_cents = self.listing_repo.sum_price_cents().await?;
        let listings_by_category = self.listing_repo.count_by_category().await?;
        let pending_reports = self
            .report_repo
            .count_by_status(ReportStatus::Pending)
            .await?;
        let resolved_reports = self
            .report_repo
            .count_by_status(ReportStatus::Resolved)
            .await?;

        Ok(DashboardStats {
            total_users,
            total_listings,
            total_revenue: revenue_cents as f64 / 100.0,
            listings_by_category,
            pending_reports,
            resolved_reports,
        })
    }

    /// Registered users, newest first.
    pub async fn list_users(
        &self,
        admin_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<user::Model>> {
        self.users.require_administrator(admin_id).await?;
        self.user_repo.find_all(limit, offset).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::fixtures;
    use resource_common::AppError;
    use sea_orm::{DatabaseConnection, Value};
    use std::sync::Arc;

    fn service(
        users: Arc<DatabaseConnection>,
        listings: Arc<DatabaseConnection>,
        reports: Arc<DatabaseConnection>,
    ) -> AdminService {
        AdminService::new(
            UserService::new(UserRepository::new(users.clone())),
            UserRepository::new(users),
            ListingRepository::new(listings),
            ReportRepository::new(reports),
        )
    }

    #[tokio::test]
    async fn test_dashboard_requires_admin() {
        let users = fixtures::conn(fixtures::mock().append_query_results([[fixtures::user("bob")]]));
        let listings = fixtures::unused();

        let result = service(users, listings.clone(), fixtures::unused())
            .dashboard("bob")
            .await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
        assert_eq!(fixtures::statement_count(listings), 0);
    }

    #[tokio::test]
    async fn test_dashboard_totals() {
        let users = fixtures::conn(
            fixtures::mock()
                .append_query_results([[fixtures::admin("root")]])
                .append_query_results([[fixtures::count_row(12)]]),
        );
        let listings = fixtures::conn(
            fixtures::mock()
                .append_query_results([[fixtures::count_row(3)]])
                .append_query_results([[maplit::btreemap! {
                    "total" => Value::BigInt(Some(125_050)),
                }]])
                .append_query_results([[
                    maplit::btreemap! {
                        "category" => Value::String(Some(Box::new("Textbooks".to_string()))),
                        "count" => Value::BigInt(Some(2)),
                    },
                    maplit::btreemap! {
                        "category" => Value::String(Some(Box::new("Notes".to_string()))),
                        "count" => Value::BigInt(Some(1)),
                    },
                ]]),
        );
        let reports = fixtures::conn(
            fixtures::mock()
                .append_query_results([[fixtures::count_row(4)]])
                .append_query_results([[fixtures::count_row(7)]]),
        );

        let stats = service(users, listings, reports).dashboard("root").await.unwrap();

        assert_eq!(stats.total_users, 12);
        assert_eq!(stats.total_listings, 3);
        assert!((stats.total_revenue - 1250.5).abs() < f64::EPSILON);
        assert_eq!(stats.listings_by_category.len(), 2);
        assert_eq!(stats.pending_reports, 4);
        assert_eq!(stats.resolved_reports, 7);
    }
}
