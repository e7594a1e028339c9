//! Report endpoints.

use axum::{Json, Router, extract::State, routing::post};
use resource_common::AppResult;
use resource_core::ReportStatus;
use resource_db::entities::report;
use serde::{Deserialize, Serialize};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Report response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    pub id: String,
    pub reporter_id: String,
    pub listing_id: String,
    pub reported_user_id: String,
    pub listing_title: String,
    pub reason: String,
    pub summary: String,
    pub status: ReportStatus,
    pub resolved_by: Option<String>,
    pub resolved_at: Option<String>,
    pub created_at: String,
}

impl From<report::Model> for ReportResponse {
    fn from(report: report::Model) -> Self {
        Self {
            id: report.id,
            reporter_id: report.reporter_id,
            listing_id: report.listing_id,
            reported_user_id: report.reported_user_id,
            listing_title: report.listing_title,
            reason: report.reason,
            summary: report.summary,
            status: report.status,
            resolved_by: report.resolved_by,
            resolved_at: report.resolved_at.map(|t| t.to_rfc3339()),
            created_at: report.created_at.to_rfc3339(),
        }
    }
}

/// File report request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReportRequest {
    pub listing_id: String,
    pub reason: String,
}

/// Report a listing to the administrators.
async fn file_report(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<FileReportRequest>,
) -> AppResult<ApiResponse<ReportResponse>> {
    let report = state
        .moderation_service
        .file_report(&user.id, &req.listing_id, &req.reason)
        .await?;

    Ok(ApiResponse::created(report.into()))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(file_report))
}
