//! Listing endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use resource_common::AppResult;
use resource_core::{CreateListingInput, ListingFilter};
use resource_db::entities::listing::{self, Category};
use serde::{Deserialize, Serialize};

use super::conversations::{ConversationResponse, MessageResponse};
use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Listing response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingResponse {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub department: String,
    pub semester: i16,
    pub price: f64,
    pub image_urls: Vec<String>,
    pub is_approved: bool,
    pub seller_name: Option<String>,
    pub seller_avatar_url: Option<String>,
    pub created_at: String,
}

impl From<listing::Model> for ListingResponse {
    fn from(listing: listing::Model) -> Self {
        Self {
            price: listing.price(),
            image_urls: listing.image_url_list(),
            id: listing.id,
            user_id: listing.user_id,
            title: listing.title,
            description: listing.description,
            category: listing.category,
            department: listing.department,
            semester: listing.semester,
            is_approved: listing.is_approved,
            seller_name: listing.seller_name,
            seller_avatar_url: listing.seller_avatar_url,
            created_at: listing.created_at.to_rfc3339(),
        }
    }
}

/// Convert a list of models.
pub fn listing_responses(listings: Vec<listing::Model>) -> Vec<ListingResponse> {
    listings.into_iter().map(ListingResponse::from).collect()
}

/// Publish a listing.
async fn create_listing(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateListingInput>,
) -> AppResult<ApiResponse<ListingResponse>> {
    let listing = state.listing_service.create_listing(&user.id, input).await?;
    Ok(ApiResponse::created(listing.into()))
}

/// Browse the newest listings.
async fn list_listings(
    State(state): State<AppState>,
    Query(filter): Query<ListingFilter>,
) -> AppResult<ApiResponse<Vec<ListingResponse>>> {
    let listings = state.listing_service.list_listings(filter).await?;
    Ok(ApiResponse::ok(listing_responses(listings)))
}

/// Get one listing.
async fn get_listing(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<ListingResponse>> {
    let listing = state.listing_service.get_listing(&id).await?;
    Ok(ApiResponse::ok(listing.into()))
}

/// Recommendations response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationsResponse {
    pub listings: Vec<ListingResponse>,
    pub reasoning: Option<String>,
}

/// Listings related to the one being viewed.
async fn recommendations(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<RecommendationsResponse>> {
    let result = state
        .recommendation_service
        .recommend_for_listing(&id)
        .await?;

    Ok(ApiResponse::ok(RecommendationsResponse {
        listings: listing_responses(result.listings),
        reasoning: result.reasoning,
    }))
}

/// Contact seller request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactSellerRequest {
    pub text: String,
}

/// Contact seller response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactSellerResponse {
    pub conversation: ConversationResponse,
    pub message: MessageResponse,
}

/// Message the owner of a listing.
async fn contact_seller(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ContactSellerRequest>,
) -> AppResult<ApiResponse<ContactSellerResponse>> {
    let (conversation, message) = state
        .messaging_service
        .contact_seller(&user, &id, &req.text)
        .await?;

    Ok(ApiResponse::created(ContactSellerResponse {
        conversation: ConversationResponse::for_viewer(conversation, &user.id),
        message: message.into(),
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_listing).get(list_listings))
        .route("/{id}", get(get_listing))
        .route("/{id}/recommendations", get(recommendations))
        .route("/{id}/contact", post(contact_seller))
}
