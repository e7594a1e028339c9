//! Listing service.

use chrono::Utc;
use resource_common::{AppError, AppResult, IdGenerator};
use resource_db::{
    entities::listing::{self, Category},
    repositories::{ListingQuery, ListingRepository, UserRepository},
};
use sea_orm::Set;
use serde::Deserialize;
use tracing::info;
use validator::Validate;

/// Default page size for the feed.
pub const DEFAULT_LISTING_LIMIT: u64 = 20;
/// Largest page size a caller may ask for.
pub const MAX_LISTING_LIMIT: u64 = 100;
/// Highest accepted price, in currency units.
pub const MAX_PRICE: f64 = 10_000_000.0;

/// Input for creating a listing.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateListingInput {
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[validate(length(max = 5000))]
    pub description: String,

    pub category: Category,

    #[validate(length(min = 1, max = 100))]
    pub department: String,

    #[validate(range(min = 1, max = 8))]
    pub semester: i16,

    /// Decimal price; zero is allowed.
    pub price: f64,

    #[validate(length(min = 1, max = 10))]
    pub image_urls: Vec<String>,
}

/// Browse filters. All optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingFilter {
    pub limit: Option<u64>,
    pub category: Option<Category>,
    pub department: Option<String>,
    pub semester: Option<i16>,
    pub search: Option<String>,
}

/// Listing service for business logic.
#[derive(Clone)]
pub struct ListingService {
    listing_repo: ListingRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl ListingService {
    /// Create a new listing service.
    #[must_use]
    pub const fn new(listing_repo: ListingRepository, user_repo: UserRepository) -> Self {
        Self {
            listing_repo,
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Publish a listing owned by `owner_id`.
    ///
    /// Every field is checked before the store is touched. The owner's
    /// current display name and avatar are copied onto the listing.
    pub async fn create_listing(
        &self,
        owner_id: &str,
        input: CreateListingInput,
    ) -> AppResult<listing::Model> {
        let input = normalize(input);
        input.validate()?;
        let price_cents = price_to_cents(input.price)?;
        validate_image_urls(&input.image_urls)?;

        let owner = self.user_repo.get_by_id(owner_id).await?;

        let model = listing::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(owner.id),
            title: Set(input.title),
            description: Set(input.description),
            category: Set(input.category),
            department: Set(input.department),
            semester: Set(input.semester),
            price_cents: Set(price_cents),
            image_urls: Set(serde_json::json!(input.image_urls)),
            is_approved: Set(true),
            seller_name: Set(owner.display_name),
            seller_avatar_url: Set(owner.photo_url),
            created_at: Set(Utc::now().into()),
        };

        let listing = self.listing_repo.create(model).await?;
        info!(listing_id = %listing.id, owner_id = %listing.user_id, "Listing created");
        Ok(listing)
    }

    /// Get a listing by ID.
    pub async fn get_listing(&self, id: &str) -> AppResult<listing::Model> {
        self.listing_repo.get_by_id(id).await
    }

    /// Newest listings, optionally filtered.
    pub async fn list_listings(&self, filter: ListingFilter) -> AppResult<Vec<listing::Model>> {
        if let Some(semester) = filter.semester
            && !(1..=8).contains(&semester)
        {
            return Err(AppError::Validation(
                "semester must be between 1 and 8".to_string(),
            ));
        }

        let query = ListingQuery {
            limit: filter
                .limit
                .unwrap_or(DEFAULT_LISTING_LIMIT)
                .clamp(1, MAX_LISTING_LIMIT),
            category: filter.category,
            department: filter.department.filter(|d| !d.trim().is_empty()),
            semester: filter.semester,
            search: filter.search,
        };

        self.listing_repo.find_recent(&query).await
    }

    /// Listings of one owner, newest first.
    pub async fn list_listings_by_owner(&self, owner_id: &str) -> AppResult<Vec<listing::Model>> {
        self.listing_repo.find_by_owner(owner_id).await
    }
}

fn normalize(mut input: CreateListingInput) -> CreateListingInput {
    input.title = input.title.trim().to_string();
    input.description = input.description.trim().to_string();
    input.department = input.department.trim().to_string();
    input.image_urls = input
        .image_urls
        .into_iter()
        .map(|u| u.trim().to_string())
        .collect();
    input
}

/// Convert a decimal price to minor units.
pub fn price_to_cents(price: f64) -> AppResult<i64> {
    if !price.is_finite() || price < 0.0 {
        return Err(AppError::Validation(
            "price must be a non-negative number".to_string(),
        ));
    }
    if price > MAX_PRICE {
        return Err(AppError::Validation(format!(
            "price must not exceed {MAX_PRICE}"
        )));
    }
    Ok((price * 100.0).round() as i64)
}

fn validate_image_urls(urls: &[String]) -> AppResult<()> {
    for raw in urls {
        let parsed = url::Url::parse(raw)
            .map_err(|_| AppError::Validation(format!("invalid image URL: {raw}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AppError::Validation(format!(
                "image URL must use http or https: {raw}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::fixtures;
    use std::sync::Arc;

    fn input() -> CreateListingInput {
        CreateListingInput {
            title: "Linear Algebra, 4th ed.".to_string(),
            description: "Some highlighting".to_string(),
            category: Category::Textbooks,
            department: "Mathematics".to_string(),
            semester: 2,
            price: 250.0,
            image_urls: vec!["https://cdn.example.com/la.jpg".to_string()],
        }
    }

    fn service(
        listing_db: Arc<sea_orm::DatabaseConnection>,
        user_db: Arc<sea_orm::DatabaseConnection>,
    ) -> ListingService {
        ListingService::new(
            ListingRepository::new(listing_db),
            UserRepository::new(user_db),
        )
    }

    #[test]
    fn test_price_to_cents() {
        assert_eq!(price_to_cents(0.0).unwrap(), 0);
        assert_eq!(price_to_cents(19.99).unwrap(), 1999);
        assert!(price_to_cents(-1.0).is_err());
        assert!(price_to_cents(f64::NAN).is_err());
        assert!(price_to_cents(f64::INFINITY).is_err());
    }

    #[tokio::test]
    async fn test_create_listing_success() {
        let stored = fixtures::listing("l1", "alice", "Linear Algebra, 4th ed.");

        let listing_db = fixtures::conn(fixtures::mock().append_query_results([[stored.clone()]]));
        let user_db = fixtures::conn(fixtures::mock().append_query_results([[fixtures::user("alice")]]));

        let created = service(listing_db, user_db)
            .create_listing("alice", input())
            .await
            .unwrap();

        assert_eq!(created.id, "l1");
        assert!(created.is_approved);
        assert_eq!(created.image_url_list().len(), 1);
    }

    #[tokio::test]
    async fn test_create_listing_rejects_bad_input_without_writes() {
        let cases: Vec<Box<dyn Fn(&mut CreateListingInput)>> = vec![
            Box::new(|i| i.title = "   ".to_string()),
            Box::new(|i| i.price = -5.0),
            Box::new(|i| i.image_urls.clear()),
            Box::new(|i| i.image_urls = vec!["ftp://x/y.jpg".to_string()]),
            Box::new(|i| i.semester = 9),
            Box::new(|i| i.department = String::new()),
        ];

        for mutate in cases {
            let listing_db = fixtures::unused();
            let user_db = fixtures::unused();
            let svc = service(listing_db.clone(), user_db.clone());

            let mut bad = input();
            mutate(&mut bad);
            let result = svc.create_listing("alice", bad).await;

            assert!(matches!(result, Err(AppError::Validation(_))));
            drop(svc);
            assert_eq!(fixtures::statement_count(listing_db), 0);
            assert_eq!(fixtures::statement_count(user_db), 0);
        }
    }

    #[tokio::test]
    async fn test_create_then_get_returns_same_fields() {
        let stored = fixtures::listing("l1", "alice", "Linear Algebra, 4th ed.");

        let listing_db = fixtures::conn(
            fixtures::mock().append_query_results([[stored.clone()], [stored.clone()]]),
        );
        let user_db = fixtures::conn(fixtures::mock().append_query_results([[fixtures::user("alice")]]));
        let svc = service(listing_db, user_db);

        let created = svc.create_listing("alice", input()).await.unwrap();
        let fetched = svc.get_listing(&created.id).await.unwrap();

        assert_eq!(created, fetched);
        assert!(fetched.price_cents >= 0);
    }

    #[tokio::test]
    async fn test_list_listings_rejects_bad_semester() {
        let svc = service(fixtures::unused(), fixtures::unused());
        let result = svc
            .list_listings(ListingFilter {
                semester: Some(0),
                ..Default::default()
            })
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
