//! Wishlist repository.
//!
//! A wishlist is the set of `wishlist_item` rows for one user. Adds and
//! removes are single statements so concurrent toggles never lose another
//! writer's entries.

use std::sync::Arc;

use crate::entities::{WishlistItem, wishlist_item};
use resource_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, sea_query::OnConflict,
};

/// Wishlist repository for database operations.
#[derive(Clone)]
pub struct WishlistRepository {
    db: Arc<DatabaseConnection>,
}

impl WishlistRepository {
    /// Create a new wishlist repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Whether the listing is in the user's wishlist.
    pub async fn contains(&self, user_id: &str, listing_id: &str) -> AppResult<bool> {
        let count = WishlistItem::find()
            .filter(wishlist_item::Column::UserId.eq(user_id))
            .filter(wishlist_item::Column::ListingId.eq(listing_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(count > 0)
    }

    /// Set-union: insert the pair unless it is already present.
    ///
    /// Returns whether a row was inserted.
    pub async fn add(&self, model: wishlist_item::ActiveModel) -> AppResult<bool> {
        let inserted = WishlistItem::insert(model)
            .on_conflict(
                OnConflict::columns([
                    wishlist_item::Column::UserId,
                    wishlist_item::Column::ListingId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(inserted > 0)
    }

    /// Set-remove: delete the pair if present.
    ///
    /// Returns whether a row was removed.
    pub async fn remove(&self, user_id: &str, listing_id: &str) -> AppResult<bool> {
        let result = WishlistItem::delete_many()
            .filter(wishlist_item::Column::UserId.eq(user_id))
            .filter(wishlist_item::Column::ListingId.eq(listing_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }

    /// Listing IDs in the user's wishlist, most recently added first.
    pub async fn find_listing_ids(&self, user_id: &str) -> AppResult<Vec<String>> {
        WishlistItem::find()
            .filter(wishlist_item::Column::UserId.eq(user_id))
            .order_by_desc(wishlist_item::Column::CreatedAt)
            .select_only()
            .column(wishlist_item::Column::ListingId)
            .into_tuple::<String>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
