//! Listing recommendations from a remote text collaborator.

use std::sync::Arc;

use async_trait::async_trait;
use resource_common::{AppError, AppResult, config::AiConfig};
use resource_db::{entities::listing, repositories::ListingRepository};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::llm::ChatCompletionClient;

/// Listings considered as candidates for one request.
const MAX_CATALOG_SIZE: u64 = 100;

/// What the engine is asked.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationRequest {
    /// One sentence describing what the user is doing.
    pub user_activity: String,
    /// Newline-separated catalog of candidate listings.
    pub available_resources: String,
}

/// What the engine answers.
#[derive(Debug, Clone, Deserialize)]
pub struct Recommendations {
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub reasoning: String,
}

/// Listings picked for a user.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationResult {
    pub listings: Vec<listing::Model>,
    pub reasoning: Option<String>,
}

/// Remote text collaborator producing recommendations.
#[async_trait]
pub trait RecommendationEngine: Send + Sync {
    /// Pick catalog entries that match the activity.
    async fn recommend(&self, request: &RecommendationRequest) -> AppResult<Recommendations>;
}

/// Type alias for a shared recommendation engine.
pub type RecommendationEngineService = Arc<dyn RecommendationEngine>;

const SYSTEM_PROMPT: &str = "You are an assistant that recommends study resources to \
students. Analyze the user's activity and the available resources and pick the relevant \
ones. Each recommendation must repeat the resource title exactly as listed. Reply with a \
JSON object of the form {\"recommendations\": [string], \"reasoning\": string}.";

/// Engine backed by a chat-completions endpoint.
pub struct HttpRecommendationEngine {
    client: ChatCompletionClient,
}

impl HttpRecommendationEngine {
    /// Create a new engine.
    #[must_use]
    pub const fn new(client: ChatCompletionClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RecommendationEngine for HttpRecommendationEngine {
    async fn recommend(&self, request: &RecommendationRequest) -> AppResult<Recommendations> {
        let prompt = format!(
            "User Activity: {}\nAvailable Resources:\n{}",
            request.user_activity, request.available_resources
        );
        self.client.complete_json(SYSTEM_PROMPT, &prompt).await
    }
}

/// Engine used when no language model is configured. Always fails.
#[derive(Clone, Default)]
pub struct DisabledRecommendationEngine;

#[async_trait]
impl RecommendationEngine for DisabledRecommendationEngine {
    async fn recommend(&self, _request: &RecommendationRequest) -> AppResult<Recommendations> {
        Err(AppError::ExternalService(
            "Recommendation engine is disabled".to_string(),
        ))
    }
}

/// Pick the engine for the given configuration.
pub fn engine_from_config(config: &AiConfig) -> AppResult<RecommendationEngineService> {
    if config.enabled {
        let client = ChatCompletionClient::from_config(config)?;
        Ok(Arc::new(HttpRecommendationEngine::new(client)))
    } else {
        Ok(Arc::new(DisabledRecommendationEngine))
    }
}

/// Recommendation service.
#[derive(Clone)]
pub struct RecommendationService {
    listing_repo: ListingRepository,
    engine: RecommendationEngineService,
}

impl RecommendationService {
    /// Create a new recommendation service.
    #[must_use]
    pub const fn new(listing_repo: ListingRepository, engine: RecommendationEngineService) -> Self {
        Self {
            listing_repo,
            engine,
        }
    }

    /// Listings to suggest to someone viewing `listing_id`.
    ///
    /// Engine failures yield an empty result rather than an error.
    pub async fn recommend_for_listing(&self, listing_id: &str) -> AppResult<RecommendationResult> {
        let viewed = self.listing_repo.get_by_id(listing_id).await?;
        let catalog = self
            .listing_repo
            .find_others(&viewed.id, MAX_CATALOG_SIZE)
            .await?;
        if catalog.is_empty() {
            return Ok(RecommendationResult::default());
        }

        let request = RecommendationRequest {
            user_activity: format!(
                "The user is currently viewing the listing '{}' in the '{}' department.",
                viewed.title, viewed.department
            ),
            available_resources: catalog
                .iter()
                .map(catalog_line)
                .collect::<Vec<_>>()
                .join("\n"),
        };

        let answer = match self.engine.recommend(&request).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!(error = %e, listing_id = %viewed.id, "Recommendations unavailable");
                return Ok(RecommendationResult::default());
            }
        };

        let listings: Vec<_> = catalog
            .into_iter()
            .filter(|candidate| {
                answer
                    .recommendations
                    .iter()
                    .any(|rec| rec.contains(candidate.title.as_str()))
            })
            .collect();
        debug!(listing_id = %viewed.id, matched = listings.len(), "Recommendations matched");

        Ok(RecommendationResult {
            listings,
            reasoning: Some(answer.reasoning).filter(|r| !r.trim().is_empty()),
        })
    }
}

/// `Title (Category, Department, Sem N, ₹price)`
fn catalog_line(listing: &listing::Model) -> String {
    format!(
        "{} ({}, {}, Sem {}, ₹{})",
        listing.title,
        listing.category.label(),
        listing.department,
        listing.semester,
        format_price(listing.price_cents)
    )
}

fn format_price(cents: i64) -> String {
    if cents % 100 == 0 {
        (cents / 100).to_string()
    } else {
        format!("{}.{:02}", cents / 100, cents % 100)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::fixtures;
    use std::sync::Mutex;

    struct ScriptedEngine {
        answer: Vec<String>,
        seen: Mutex<Option<RecommendationRequest>>,
    }

    impl ScriptedEngine {
        fn new(answer: &[&str]) -> Self {
            Self {
                answer: answer.iter().map(ToString::to_string).collect(),
                seen: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl RecommendationEngine for ScriptedEngine {
        async fn recommend(&self, request: &RecommendationRequest) -> AppResult<Recommendations> {
            *self.seen.lock().unwrap() = Some(request.clone());
            Ok(Recommendations {
                recommendations: self.answer.clone(),
                reasoning: "Same department".to_string(),
            })
        }
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(25_000), "250");
        assert_eq!(format_price(1999), "19.99");
        assert_eq!(format_price(5), "0.05");
        assert_eq!(format_price(0), "0");
    }

    #[test]
    fn test_catalog_line() {
        let mut item = fixtures::listing("l2", "bob", "Organic Chemistry Notes");
        item.category = listing::Category::StudyAids;
        assert_eq!(
            catalog_line(&item),
            "Organic Chemistry Notes (Study Aids, Computer Science, Sem 3, ₹250)"
        );
    }

    #[tokio::test]
    async fn test_recommend_keeps_title_matches() {
        let db = fixtures::conn(
            fixtures::mock()
                .append_query_results([[fixtures::listing("l1", "alice", "Algorithms")]])
                .append_query_results([[
                    fixtures::listing("l2", "bob", "Discrete Math"),
                    fixtures::listing("l3", "carol", "Lab Coat"),
                ]]),
        );
        let engine = Arc::new(ScriptedEngine::new(&["Discrete Math (Textbooks, ...)"]));
        let svc = RecommendationService::new(ListingRepository::new(db), engine.clone());

        let result = svc.recommend_for_listing("l1").await.unwrap();

        let ids: Vec<_> = result.listings.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["l2"]);
        assert_eq!(result.reasoning.as_deref(), Some("Same department"));

        let seen = engine.seen.lock().unwrap().clone().unwrap();
        assert_eq!(
            seen.user_activity,
            "The user is currently viewing the listing 'Algorithms' in the 'Computer Science' department."
        );
        assert_eq!(seen.available_resources.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_zero_matches_is_valid() {
        let db = fixtures::conn(
            fixtures::mock()
                .append_query_results([[fixtures::listing("l1", "alice", "Algorithms")]])
                .append_query_results([[fixtures::listing("l2", "bob", "Discrete Math")]]),
        );
        let svc = RecommendationService::new(
            ListingRepository::new(db),
            Arc::new(ScriptedEngine::new(&["Something else entirely"])),
        );

        assert!(svc.recommend_for_listing("l1").await.unwrap().listings.is_empty());
    }

    #[tokio::test]
    async fn test_engine_failure_degrades_to_empty() {
        let db = fixtures::conn(
            fixtures::mock()
                .append_query_results([[fixtures::listing("l1", "alice", "Algorithms")]])
                .append_query_results([[fixtures::listing("l2", "bob", "Discrete Math")]]),
        );
        let svc = RecommendationService::new(
            ListingRepository::new(db),
            Arc::new(DisabledRecommendationEngine),
        );

        let result = svc.recommend_for_listing("l1").await.unwrap();
        assert!(result.listings.is_empty());
        assert!(result.reasoning.is_none());
    }

    #[tokio::test]
    async fn test_unknown_listing() {
        let db = fixtures::conn(
            fixtures::mock().append_query_results([Vec::<listing::Model>::new()]),
        );
        let svc = RecommendationService::new(
            ListingRepository::new(db),
            Arc::new(DisabledRecommendationEngine),
        );

        let result = svc.recommend_for_listing("missing").await;
        assert!(matches!(result, Err(AppError::ListingNotFound(_))));
    }
}
