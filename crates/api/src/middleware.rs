//! API middleware.

#![allow(missing_docs)]

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use resource_common::StorageBackend;
use resource_core::{
    AdminService, ListingService, MessagingService, ModerationService, RecommendationService,
    UserService, WishlistService,
};

use crate::sse::SseBroadcaster;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub listing_service: ListingService,
    pub wishlist_service: WishlistService,
    pub messaging_service: MessagingService,
    pub moderation_service: ModerationService,
    pub recommendation_service: RecommendationService,
    pub admin_service: AdminService,
    pub storage: Arc<dyn StorageBackend>,
    /// Largest accepted image upload in bytes.
    pub max_upload_bytes: usize,
    /// Secret the identity provider must present; sync is off when unset.
    pub identity_sync_secret: Option<String>,
    pub sse_broadcaster: SseBroadcaster,
}

/// Authentication middleware.
///
/// Attaches the user behind a valid `Authorization: Bearer` token to the
/// request. Requests without one pass through anonymously.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(auth_header) = req.headers().get(header::AUTHORIZATION)
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
        && let Ok(user) = state.user_service.authenticate_by_token(token.trim()).await
    {
        req.extensions_mut().insert(user);
    }

    next.run(req).await
}
