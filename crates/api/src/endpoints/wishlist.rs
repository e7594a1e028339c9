//! Wishlist endpoints.

use axum::{
    Router,
    extract::{Path, State},
    routing::{get, post},
};
use resource_common::AppResult;
use serde::Serialize;

use super::listings::{ListingResponse, listing_responses};
use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Membership response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistStatusResponse {
    pub listing_id: String,
    pub in_wishlist: bool,
}

/// Add the listing if absent, remove it if present.
async fn toggle(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(listing_id): Path<String>,
) -> AppResult<ApiResponse<WishlistStatusResponse>> {
    let in_wishlist = state.wishlist_service.toggle(&user.id, &listing_id).await?;
    Ok(ApiResponse::ok(WishlistStatusResponse {
        listing_id,
        in_wishlist,
    }))
}

/// Whether the listing is wishlisted.
async fn status(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(listing_id): Path<String>,
) -> AppResult<ApiResponse<WishlistStatusResponse>> {
    let in_wishlist = state
        .wishlist_service
        .contains(&user.id, &listing_id)
        .await?;
    Ok(ApiResponse::ok(WishlistStatusResponse {
        listing_id,
        in_wishlist,
    }))
}

/// The caller's wishlisted listings.
async fn list(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<ListingResponse>>> {
    let listings = state
        .wishlist_service
        .list_wishlisted_listings(&user.id)
        .await?;
    Ok(ApiResponse::ok(listing_responses(listings)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/{listing_id}", get(status))
        .route("/{listing_id}/toggle", post(toggle))
}
