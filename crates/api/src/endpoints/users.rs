//! Users endpoints.

use axum::{
    Router,
    extract::{Path, State},
    routing::get,
};
use resource_common::AppResult;
use resource_db::entities::user;
use serde::Serialize;

use super::listings::{ListingResponse, listing_responses};
use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// User response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub is_admin: bool,
    pub created_at: String,
}

impl From<user::Model> for UserResponse {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            email: user.email,
            display_name: user.display_name,
            photo_url: user.photo_url,
            is_admin: user.is_admin,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

/// Profile as other students see it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUserResponse {
    pub id: String,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

impl From<user::Model> for PublicUserResponse {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            display_name: user.display_name,
            photo_url: user.photo_url,
        }
    }
}

/// Get current user.
async fn me(AuthUser(user): AuthUser) -> ApiResponse<UserResponse> {
    ApiResponse::ok(user.into())
}

/// Public profile of a user.
async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<PublicUserResponse>> {
    let user = state.user_service.get_profile(&id).await?;
    Ok(ApiResponse::ok(user.into()))
}

/// Listings of one user, newest first.
async fn user_listings(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Vec<ListingResponse>>> {
    let listings = state.listing_service.list_listings_by_owner(&id).await?;
    Ok(ApiResponse::ok(listing_responses(listings)))
}

/// Routes for the signed-in user.
pub fn me_router() -> Router<AppState> {
    Router::new().route("/", get(me))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(show))
        .route("/{id}/listings", get(user_listings))
}
