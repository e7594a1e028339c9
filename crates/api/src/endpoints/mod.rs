//! API endpoints.

mod admin;
mod auth;
mod conversations;
mod drive;
mod listings;
mod reports;
mod users;
mod wishlist;

use axum::{Router, middleware::from_fn_with_state};

use crate::middleware::{AppState, auth_middleware};

/// Create the API router.
///
/// `max_upload_bytes` bounds image uploads.
pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .nest("/i", users::me_router())
        .nest("/users", users::router())
        .nest("/drive", drive::router(max_upload_bytes))
        .nest("/listings", listings::router())
        .nest("/wishlist", wishlist::router())
        .nest("/conversations", conversations::router())
        .nest("/reports", reports::router())
        .nest("/admin", admin::router())
}

/// [`router`] behind bearer-token authentication.
///
/// Only requests under this router pay for the token lookup.
pub fn authenticated_router(state: &AppState, max_upload_bytes: usize) -> Router<AppState> {
    router(max_upload_bytes).layer(from_fn_with_state(state.clone(), auth_middleware))
}
