//! API integration tests.
//!
//! These tests drive the full router against a mock database.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::redundant_clone)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    Extension,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    response::Response,
    routing::get,
};
use chrono::Utc;
use resource_api::{SseBroadcaster, authenticated_router, middleware::AppState};
use resource_common::{LocalStorage, config::AiConfig};
use resource_core::{
    AdminService, ListingService, MessagingService, ModerationService, RecommendationService,
    UserService, WishlistService, engine_from_config, summarizer_from_config,
};
use resource_db::{
    entities::{chat_message, conversation, listing, user},
    repositories::{
        ChatMessageRepository, ConversationRepository, ListingRepository, ReportRepository,
        UserRepository, WishlistRepository,
    },
};
use sea_orm::{DatabaseBackend, MockDatabase};
use serde_json::Value;
use tower::ServiceExt;

const MAX_UPLOAD_BYTES: usize = 1024 * 1024;

fn student(id: &str, is_admin: bool) -> user::Model {
    user::Model {
        id: id.to_string(),
        email: format!("{id}@campus.edu"),
        display_name: Some(id.to_string()),
        photo_url: None,
        password_hash: None,
        token: Some(format!("token-{id}")),
        is_admin,
        created_at: Utc::now().into(),
        updated_at: None,
    }
}

/// Build the state around one shared mock database.
fn create_test_state(db: MockDatabase, identity_sync_secret: Option<&str>) -> AppState {
    let db = Arc::new(db.into_connection());

    let user_repo = UserRepository::new(Arc::clone(&db));
    let listing_repo = ListingRepository::new(Arc::clone(&db));
    let wishlist_repo = WishlistRepository::new(Arc::clone(&db));
    let conversation_repo = ConversationRepository::new(Arc::clone(&db));
    let message_repo = ChatMessageRepository::new(Arc::clone(&db));
    let report_repo = ReportRepository::new(Arc::clone(&db));

    let ai = AiConfig::default();
    let sse_broadcaster = SseBroadcaster::new();

    let user_service = UserService::new(user_repo.clone());
    let mut messaging_service = MessagingService::new(
        conversation_repo,
        message_repo,
        user_repo.clone(),
        listing_repo.clone(),
    );
    messaging_service.set_event_publisher(Arc::new(sse_broadcaster.clone()));

    AppState {
        listing_service: ListingService::new(listing_repo.clone(), user_repo.clone()),
        wishlist_service: WishlistService::new(wishlist_repo, listing_repo.clone()),
        messaging_service,
        moderation_service: ModerationService::new(
            report_repo.clone(),
            listing_repo.clone(),
            user_service.clone(),
            summarizer_from_config(&ai).unwrap(),
        ),
        recommendation_service: RecommendationService::new(
            listing_repo.clone(),
            engine_from_config(&ai).unwrap(),
        ),
        admin_service: AdminService::new(
            user_service.clone(),
            user_repo,
            listing_repo,
            report_repo,
        ),
        user_service,
        storage: Arc::new(LocalStorage::new(
            PathBuf::from("/tmp/resource-test-files"),
            "/files".to_string(),
        )),
        max_upload_bytes: MAX_UPLOAD_BYTES,
        identity_sync_secret: identity_sync_secret.map(str::to_string),
        sse_broadcaster,
    }
}

fn create_test_app(db: MockDatabase) -> Router {
    app_with_state(create_test_state(db, None))
}

fn app_with_state(state: AppState) -> Router {
    Router::new()
        .nest("/api", authenticated_router(&state, MAX_UPLOAD_BYTES))
        .with_state(state)
}

fn empty_db() -> MockDatabase {
    MockDatabase::new(DatabaseBackend::Postgres)
}

fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_unknown_endpoint_returns_404() {
    let app = create_test_app(empty_db());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/nonexistent")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_listing_requires_authentication() {
    let app = create_test_app(empty_db());

    let body = serde_json::json!({
        "title": "Calculus",
        "description": "Barely used",
        "category": "Textbooks",
        "department": "Mathematics",
        "semester": 1,
        "price": 150.0,
        "imageUrls": ["https://cdn.example.com/1.jpg"],
    });
    let response = app
        .oneshot(json_request("POST", "/api/listings", &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "AUTHENTICATION_REQUIRED");
}

#[tokio::test]
async fn test_signup_with_invalid_json_returns_error() {
    let app = create_test_app(empty_db());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/signup")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(
        response.status().is_client_error(),
        "Expected client error, got {}",
        response.status()
    );
}

#[tokio::test]
async fn test_get_missing_listing_returns_404() {
    let db = empty_db().append_query_results([Vec::<listing::Model>::new()]);
    let app = create_test_app(db);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/listings/missing")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_browse_rejects_out_of_range_semester() {
    let app = create_test_app(empty_db());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/listings?semester=9")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_identity_sync_disabled_without_secret() {
    let app = create_test_app(empty_db());

    let body = serde_json::json!({ "email": "alice@campus.edu" });
    let response = app
        .oneshot(json_request("POST", "/api/identity/sync", &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_identity_sync_rejects_wrong_secret() {
    let app = app_with_state(create_test_state(empty_db(), Some("s3cret")));

    let mut request = json_request(
        "POST",
        "/api/identity/sync",
        &serde_json::json!({ "email": "alice@campus.edu" }),
    );
    request
        .headers_mut()
        .insert("x-identity-secret", "guess".parse().unwrap());

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_me_with_bearer_token() {
    let db = empty_db().append_query_results([vec![student("alice", false)]]);
    let app = create_test_app(db);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/i")
                .header(header::AUTHORIZATION, "Bearer token-alice")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["email"], "alice@campus.edu");
    assert_eq!(json["data"]["isAdmin"], false);
}

#[tokio::test]
async fn test_unknown_token_is_anonymous() {
    let db = empty_db().append_query_results([Vec::<user::Model>::new()]);
    let app = create_test_app(db);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/i")
                .header(header::AUTHORIZATION, "Bearer stale")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_dashboard_forbidden_for_students() {
    let alice = student("alice", false);
    let db = empty_db()
        .append_query_results([vec![alice.clone()]])
        .append_query_results([vec![alice]]);
    let app = create_test_app(db);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/admin/dashboard")
                .header(header::AUTHORIZATION, "Bearer token-alice")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_conversation_stream_returns_event_stream() {
    let db = empty_db()
        .append_query_results([vec![student("alice", false)]])
        .append_query_results([vec![conversation::Model {
            id: "alice_bob".to_string(),
            participant_a: "alice".to_string(),
            participant_b: "bob".to_string(),
            related_listing_id: None,
            last_message: None,
            last_message_id: None,
            last_message_at: None,
            created_at: Utc::now().into(),
        }]])
        .append_query_results([Vec::<chat_message::Model>::new()]);
    let state = create_test_state(db, None);
    let broadcaster = state.sse_broadcaster.clone();
    let app = app_with_state(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/conversations/alice_bob/stream")
                .header(header::AUTHORIZATION, "Bearer token-alice")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    assert!(content_type.unwrap().contains("text/event-stream"));
    assert_eq!(broadcaster.channel_count().await, 1);
}

#[tokio::test]
async fn test_conversation_stream_hidden_from_outsiders() {
    let db = empty_db()
        .append_query_results([vec![student("carol", false)]])
        .append_query_results([vec![conversation::Model {
            id: "alice_bob".to_string(),
            participant_a: "alice".to_string(),
            participant_b: "bob".to_string(),
            related_listing_id: None,
            last_message: None,
            last_message_id: None,
            last_message_at: None,
            created_at: Utc::now().into(),
        }]]);
    let app = create_test_app(db);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/conversations/alice_bob/stream")
                .header(header::AUTHORIZATION, "Bearer token-carol")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_upload_requires_authentication() {
    let app = create_test_app(empty_db());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/drive/upload")
                .header(
                    header::CONTENT_TYPE,
                    "multipart/form-data; boundary=XBOUNDARY",
                )
                .body(Body::from("--XBOUNDARY--\r\n"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_routes_outside_api_skip_token_lookup() {
    let db = empty_db().append_query_results([vec![student("alice", false)]]);
    let state = create_test_state(db, None);
    let app = Router::new()
        .nest("/api", authenticated_router(&state, MAX_UPLOAD_BYTES))
        .route(
            "/files/{*key}",
            get(|viewer: Option<Extension<user::Model>>| async move {
                viewer.map_or_else(|| "anonymous".to_string(), |Extension(u)| u.id)
            }),
        )
        .with_state(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/files/listings/alice/1_a.png")
                .header(header::AUTHORIZATION, "Bearer token-alice")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"anonymous");
}

const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01";

fn upload_request(file_name: &str, content_type: &str, data: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(b"--XBOUNDARY\r\n");
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
             Content-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(b"\r\n--XBOUNDARY--\r\n");

    Request::builder()
        .method("POST")
        .uri("/api/drive/upload")
        .header(header::AUTHORIZATION, "Bearer token-alice")
        .header(
            header::CONTENT_TYPE,
            "multipart/form-data; boundary=XBOUNDARY",
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_upload_key_ignores_client_file_name() {
    let db = empty_db().append_query_results([vec![student("alice", false)]]);
    let app = create_test_app(db);

    let response = app
        .oneshot(upload_request("payload.html", "image/png", PNG_BYTES))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    let key = json["data"]["key"].as_str().unwrap();
    assert!(key.starts_with("listings/alice/"));
    assert!(key.ends_with(".png"), "unexpected key {key}");
    assert_eq!(json["data"]["type"], "image/png");
}

#[tokio::test]
async fn test_upload_rejects_markup_declared_as_image() {
    let db = empty_db().append_query_results([vec![student("alice", false)]]);
    let app = create_test_app(db);

    let response = app
        .oneshot(upload_request(
            "payload.html",
            "image/png",
            b"<html><script>alert(document.cookie)</script></html>",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_upload_rejects_type_mismatch() {
    let db = empty_db().append_query_results([vec![student("alice", false)]]);
    let app = create_test_app(db);

    let response = app
        .oneshot(upload_request("photo.jpg", "image/jpeg", PNG_BYTES))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
