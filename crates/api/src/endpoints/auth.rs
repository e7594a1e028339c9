//! Authentication endpoints.

use axum::{
    Json, Router,
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
    routing::post,
};
use resource_common::{AppError, AppResult};
use resource_core::{SignUpInput, SyncIdentityInput};
use resource_db::entities::user;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{self, ApiResponse},
};

/// Header carrying the identity provider's shared secret.
pub const IDENTITY_SECRET_HEADER: &str = "x-identity-secret";

/// Signup request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
}

/// Session response returned by every sign-in flavour.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub is_admin: bool,
    pub token: String,
}

impl From<user::Model> for SessionResponse {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            email: user.email,
            display_name: user.display_name,
            photo_url: user.photo_url,
            is_admin: user.is_admin,
            token: user.token.unwrap_or_default(),
        }
    }
}

/// Create a new account.
async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> AppResult<ApiResponse<SessionResponse>> {
    let user = state
        .user_service
        .sign_up(SignUpInput {
            email: req.email,
            password: req.password,
            display_name: req.display_name,
        })
        .await?;

    Ok(ApiResponse::created(user.into()))
}

/// Signin request.
#[derive(Debug, Deserialize)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

/// Sign in to an existing account.
async fn signin(
    State(state): State<AppState>,
    Json(req): Json<SigninRequest>,
) -> AppResult<ApiResponse<SessionResponse>> {
    let user = state
        .user_service
        .sign_in(&req.email, &req.password)
        .await?;

    Ok(ApiResponse::ok(user.into()))
}

/// Sign out by invalidating the current token.
async fn signout(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    state.user_service.sign_out(&user.id).await?;
    Ok(response::ok())
}

/// Identity sync request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncIdentityRequest {
    pub uid: Option<String>,
    pub email: String,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

/// Create or merge an account asserted by the trusted identity provider.
async fn sync_identity(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SyncIdentityRequest>,
) -> AppResult<ApiResponse<SessionResponse>> {
    let Some(expected) = state.identity_sync_secret.as_deref() else {
        return Err(AppError::Forbidden(
            "Identity sync is not enabled".to_string(),
        ));
    };
    let presented = headers
        .get(IDENTITY_SECRET_HEADER)
        .and_then(|v| v.to_str().ok());
    if presented != Some(expected) {
        warn!("Identity sync with a wrong or missing secret");
        return Err(AppError::Forbidden("Invalid identity secret".to_string()));
    }

    let user = state
        .user_service
        .sync_identity(SyncIdentityInput {
            uid: req.uid,
            email: req.email,
            display_name: req.display_name,
            photo_url: req.photo_url,
        })
        .await?;

    Ok(ApiResponse::ok(user.into()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/signin", post(signin))
        .route("/signout", post(signout))
        .route("/identity/sync", post(sync_identity))
}
