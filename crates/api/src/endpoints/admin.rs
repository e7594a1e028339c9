//! Admin endpoints. Every handler requires the administrator role.

use axum::{
    Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use resource_common::AppResult;
use resource_core::{DashboardStats, ReportStatus};
use serde::{Deserialize, Serialize};

use super::{reports::ReportResponse, users::UserResponse};
use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

const fn default_limit() -> u64 {
    20
}

/// Largest page an admin list returns.
const MAX_LIMIT: u64 = 100;

/// List reports query.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListReportsQuery {
    pub status: Option<ReportStatus>,
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

/// Reports, newest first.
async fn list_reports(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListReportsQuery>,
) -> AppResult<ApiResponse<Vec<ReportResponse>>> {
    let reports = state
        .moderation_service
        .list_reports(
            &user.id,
            query.status,
            query.limit.clamp(1, MAX_LIMIT),
            query.offset,
        )
        .await?;

    Ok(ApiResponse::ok(
        reports.into_iter().map(ReportResponse::from).collect(),
    ))
}

/// Mark a report as resolved.
async fn resolve_report(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<ReportResponse>> {
    let report = state.moderation_service.resolve_report(&user.id, &id).await?;
    Ok(ApiResponse::ok(report.into()))
}

/// Pending count response.
#[derive(Debug, Serialize)]
pub struct PendingCountResponse {
    pub count: u64,
}

/// Reports awaiting a decision.
async fn pending_count(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<PendingCountResponse>> {
    let count = state
        .moderation_service
        .count_pending_reports(&user.id)
        .await?;
    Ok(ApiResponse::ok(PendingCountResponse { count }))
}

/// Marketplace totals.
async fn dashboard(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<DashboardStats>> {
    let stats = state.admin_service.dashboard(&user.id).await?;
    Ok(ApiResponse::ok(stats))
}

/// List users query.
#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

/// Registered users, newest first.
async fn list_users(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
) -> AppResult<ApiResponse<Vec<UserResponse>>> {
    let users = state
        .admin_service
        .list_users(&user.id, query.limit.clamp(1, MAX_LIMIT), query.offset)
        .await?;

    Ok(ApiResponse::ok(
        users.into_iter().map(UserResponse::from).collect(),
    ))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/reports", get(list_reports))
        .route("/reports/pending/count", get(pending_count))
        .route("/reports/{id}/resolve", post(resolve_report))
        .route("/dashboard", get(dashboard))
        .route("/users", get(list_users))
}
