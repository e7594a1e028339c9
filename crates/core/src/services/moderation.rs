//! Moderation service for listing reports.

use chrono::{DateTime, FixedOffset, Utc};
use resource_common::{AppError, AppResult, IdGenerator};
use resource_db::{
    entities::report,
    repositories::{ListingRepository, ReportRepository},
};
use sea_orm::Set;
use tracing::{info, warn};

use super::{
    summarizer::{ContentType, ReportDigest, SummarizerService},
    user::UserService,
};

pub use resource_db::entities::report::ReportStatus;

/// Longest accepted report reason, in characters.
pub const MAX_REASON_LENGTH: usize = 2000;

/// Stored in place of a summary the summarizer could not produce.
pub const SUMMARY_PLACEHOLDER: &str = "Summary unavailable.";

/// Moderation service for filing and resolving reports.
#[derive(Clone)]
pub struct ModerationService {
    report_repo: ReportRepository,
    listing_repo: ListingRepository,
    users: UserService,
    summarizer: SummarizerService,
    id_gen: IdGenerator,
}

impl ModerationService {
    /// Create a new moderation service.
    #[must_use]
    pub const fn new(
        report_repo: ReportRepository,
        listing_repo: ListingRepository,
        users: UserService,
        summarizer: SummarizerService,
    ) -> Self {
        Self {
            report_repo,
            listing_repo,
            users,
            summarizer,
            id_gen: IdGenerator::new(),
        }
    }

    /// File a report against a listing.
    ///
    /// The report is stored even when no summary can be produced; it then
    /// carries [`SUMMARY_PLACEHOLDER`].
    pub async fn file_report(
        &self,
        reporter_id: &str,
        listing_id: &str,
        reason: &str,
    ) -> AppResult<report::Model> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::Validation("Reason must not be empty".to_string()));
        }
        if reason.chars().count() > MAX_REASON_LENGTH {
            return Err(AppError::Validation(format!(
                "Reason must be at most {MAX_REASON_LENGTH} characters"
            )));
        }

        let listing = self.listing_repo.get_by_id(listing_id).await?;
        if listing.user_id == reporter_id {
            return Err(AppError::BadRequest(
                "Cannot report your own listing".to_string(),
            ));
        }

        let digest = ReportDigest {
            reporter_id: reporter_id.to_string(),
            reported_content_id: listing.id.clone(),
            content_type: ContentType::Listing,
            reason: reason.to_string(),
        };
        let summary = match self.summarizer.summarize(&[digest]).await {
            Ok(summary) => summary.summary,
            Err(e) => {
                warn!(error = %e, listing_id = %listing.id, "Report summary unavailable");
                SUMMARY_PLACEHOLDER.to_string()
            }
        };

        let model = report::ActiveModel {
            id: Set(self.id_gen.generate()),
            reporter_id: Set(reporter_id.to_string()),
            listing_id: Set(listing.id),
            reported_user_id: Set(listing.user_id),
            listing_title: Set(listing.title),
            reason: Set(reason.to_string()),
            summary: Set(summary),
            status: Set(ReportStatus::Pending),
            resolved_by: Set(None),
            resolved_at: Set(None),
            created_at: Set(Utc::now().into()),
        };

        let report = self.report_repo.create(model).await?;
        info!(report_id = %report.id, listing_id = %report.listing_id, "Report filed");
        Ok(report)
    }

    /// Mark a pending report as resolved.
    ///
    /// Resolving a resolved report returns it unchanged.
    pub async fn resolve_report(&self, admin_id: &str, report_id: &str) -> AppResult<report::Model> {
        self.users.require_administrator(admin_id).await?;

        let mut report = self.report_repo.get_by_id(report_id).await?;
        if report.status == ReportStatus::Resolved {
            return Ok(report);
        }

        let resolved_at: DateTime<FixedOffset> = Utc::now().into();
        if !self
            .report_repo
            .mark_resolved(report_id, admin_id, resolved_at)
            .await?
        {
            // Someone else got there first.
            return self.report_repo.get_by_id(report_id).await;
        }

        report.status = ReportStatus::Resolved;
        report.resolved_by = Some(admin_id.to_string());
        report.resolved_at = Some(resolved_at);
        info!(report_id = %report.id, admin_id = %admin_id, "Report resolved");
        Ok(report)
    }

    /// Reports, newest first.
    pub async fn list_reports(
        &self,
        admin_id: &str,
        status: Option<ReportStatus>,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<report::Model>> {
        self.users.require_administrator(admin_id).await?;
        self.report_repo.find(status, limit, offset).await
    }

    /// Number of reports awaiting a decision.
    pub async fn count_pending_reports(&self, admin_id: &str) -> AppResult<u64> {
        self.users.require_administrator(admin_id).await?;
        self.report_repo.count_by_status(ReportStatus::Pending).await
    }
}
