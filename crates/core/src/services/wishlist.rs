//! Wishlist service.

use std::collections::HashMap;

use chrono::Utc;
use resource_common::{AppResult, IdGenerator};
use resource_db::{
    entities::{listing, wishlist_item},
    repositories::{ListingRepository, WishlistRepository},
};
use sea_orm::Set;
use tracing::debug;

/// Wishlist service for business logic.
#[derive(Clone)]
pub struct WishlistService {
    wishlist_repo: WishlistRepository,
    listing_repo: ListingRepository,
    id_gen: IdGenerator,
}

impl WishlistService {
    /// Create a new wishlist service.
    #[must_use]
    pub const fn new(wishlist_repo: WishlistRepository, listing_repo: ListingRepository) -> Self {
        Self {
            wishlist_repo,
            listing_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Flip membership of the listing. Returns whether it is now wishlisted.
    pub async fn toggle(&self, user_id: &str, listing_id: &str) -> AppResult<bool> {
        if self.wishlist_repo.contains(user_id, listing_id).await? {
            self.remove(user_id, listing_id).await?;
            Ok(false)
        } else {
            self.add(user_id, listing_id).await?;
            Ok(true)
        }
    }

    /// Add the listing. Adding a present listing is a no-op.
    pub async fn add(&self, user_id: &str, listing_id: &str) -> AppResult<()> {
        self.listing_repo.get_by_id(listing_id).await?;

        let inserted = self
            .wishlist_repo
            .add(wishlist_item::ActiveModel {
                id: Set(self.id_gen.generate()),
                user_id: Set(user_id.to_string()),
                listing_id: Set(listing_id.to_string()),
                created_at: Set(Utc::now().into()),
            })
            .await?;
        debug!(user_id = %user_id, listing_id = %listing_id, inserted, "Wishlist add");
        Ok(())
    }

    /// Remove the listing. Removing an absent listing is a no-op.
    pub async fn remove(&self, user_id: &str, listing_id: &str) -> AppResult<()> {
        let removed = self.wishlist_repo.remove(user_id, listing_id).await?;
        debug!(user_id = %user_id, listing_id = %listing_id, removed, "Wishlist remove");
        Ok(())
    }

    /// Whether the listing is wishlisted.
    pub async fn contains(&self, user_id: &str, listing_id: &str) -> AppResult<bool> {
        self.wishlist_repo.contains(user_id, listing_id).await
    }

    /// Wishlisted listings, most recently added first.
    ///
    /// Listings that no longer exist are skipped.
    pub async fn list_wishlisted_listings(&self, user_id: &str) -> AppResult<Vec<listing::Model>> {
        let ids = self.wishlist_repo.find_listing_ids(user_id).await?;
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let position: HashMap<&str, usize> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();

        let mut listings = self.listing_repo.find_by_ids(&ids).await?;
        listings.sort_by_key(|l| position.get(l.id.as_str()).copied().unwrap_or(usize::MAX));
        Ok(listings)
    }
}
