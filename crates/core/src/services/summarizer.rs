//! Moderation summarizer.
//!
//! Turns a batch of report digests into a short text for administrators.
//! The call is stateless and never retried here; callers decide what a
//! failure means.

use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use resource_common::{AppError, AppResult, config::AiConfig};
use serde::{Deserialize, Serialize};

use super::llm::ChatCompletionClient;

/// What a report points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Listing,
    User,
}

/// One report as seen by the summarizer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDigest {
    pub reporter_id: String,
    pub reported_content_id: String,
    pub content_type: ContentType,
    pub reason: String,
}

/// Summarizer output.
#[derive(Debug, Clone, Deserialize)]
pub struct Summary {
    pub summary: String,
}

/// Remote text collaborator producing moderation summaries.
#[async_trait]
pub trait ModerationSummarizer: Send + Sync {
    /// Summarize the reports and suggest actions.
    async fn summarize(&self, reports: &[ReportDigest]) -> AppResult<Summary>;
}

/// Type alias for a shared summarizer.
pub type SummarizerService = Arc<dyn ModerationSummarizer>;

const SYSTEM_PROMPT: &str = "You are an assistant specializing in content moderation for a \
student marketplace. Summarize the user reports, identify potential issues and recommend \
actions for the administrator. Be concise and objective. Reply with a JSON object of the \
form {\"summary\": string}.";

/// Render the report batch as the user prompt.
fn render_reports(reports: &[ReportDigest]) -> String {
    let mut prompt = String::from("Reports:\n");
    for report in reports {
        let content_type = match report.content_type {
            ContentType::Listing => "listing",
            ContentType::User => "user",
        };
        let _ = writeln!(
            prompt,
            "- Reporter ID: {}\n  Reported Content ID: {}\n  Content Type: {}\n  Reason: {}",
            report.reporter_id, report.reported_content_id, content_type, report.reason
        );
    }
    prompt
}

/// Summarizer backed by a chat-completions endpoint.
pub struct HttpModerationSummarizer {
    client: ChatCompletionClient,
}

impl HttpModerationSummarizer {
    /// Create a new summarizer.
    #[must_use]
    pub const fn new(client: ChatCompletionClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ModerationSummarizer for HttpModerationSummarizer {
    async fn summarize(&self, reports: &[ReportDigest]) -> AppResult<Summary> {
        let summary: Summary = self
            .client
            .complete_json(SYSTEM_PROMPT, &render_reports(reports))
            .await?;

        if summary.summary.trim().is_empty() {
            return Err(AppError::ExternalService("Empty summary".to_string()));
        }
        Ok(summary)
    }
}

/// Summarizer used when no language model is configured. Always fails.
#[derive(Clone, Default)]
pub struct DisabledSummarizer;

#[async_trait]
impl ModerationSummarizer for DisabledSummarizer {
    async fn summarize(&self, _reports: &[ReportDigest]) -> AppResult<Summary> {
        Err(AppError::ExternalService(
            "Moderation summarizer is disabled".to_string(),
        ))
    }
}

/// Pick the summarizer for the given configuration.
pub fn summarizer_from_config(config: &AiConfig) -> AppResult<SummarizerService> {
    if config.enabled {
        let client = ChatCompletionClient::from_config(config)?;
        Ok(Arc::new(HttpModerationSummarizer::new(client)))
    } else {
        Ok(Arc::new(DisabledSummarizer))
    }
}
