//! Re-Source server entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use resource_api::{SseBroadcaster, authenticated_router, middleware::AppState};
use resource_common::{Config, LocalStorage, StorageBackend};
use resource_core::{
    AdminService, ListingService, MessagingService, ModerationService, RecommendationService,
    RetryConfig, UserService, WishlistService, engine_from_config, summarizer_from_config,
};
use resource_db::repositories::{
    ChatMessageRepository, ConversationRepository, ListingRepository, ReportRepository,
    UserRepository, WishlistRepository,
};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Path uploaded files are served from.
const FILES_ROUTE: &str = "/files";

/// How often idle conversation channels are dropped.
const SSE_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

/// Install the global subscriber. `RESOURCE_LOG_FORMAT=json` switches to
/// one JSON object per line.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "resource=debug,tower_http=debug".into());

    let json = std::env::var("RESOURCE_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer())
            .with(filter)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    init_tracing();

    info!("Starting Re-Source server...");

    // Load configuration
    let config = Config::load()?;

    // Connect to database
    let db = resource_db::init(&config).await?;
    info!("Connected to database");

    info!("Running database migrations...");
    resource_db::migrate(&db).await?;
    info!("Migrations completed");

    let db = Arc::new(db);

    // Initialize repositories
    let user_repo = UserRepository::new(Arc::clone(&db));
    let listing_repo = ListingRepository::new(Arc::clone(&db));
    let wishlist_repo = WishlistRepository::new(Arc::clone(&db));
    let conversation_repo = ConversationRepository::new(Arc::clone(&db));
    let message_repo = ChatMessageRepository::new(Arc::clone(&db));
    let report_repo = ReportRepository::new(Arc::clone(&db));

    // Remote text collaborators
    let summarizer = summarizer_from_config(&config.ai)?;
    let engine = engine_from_config(&config.ai)?;
    if config.ai.enabled {
        info!(model = %config.ai.model, "Language-model features enabled");
    } else {
        info!("Language-model features disabled");
    }

    let sse_broadcaster = SseBroadcaster::new();

    // Initialize services
    let user_service = UserService::new(user_repo.clone());
    let listing_service = ListingService::new(listing_repo.clone(), user_repo.clone());
    let wishlist_service = WishlistService::new(wishlist_repo, listing_repo.clone());

    let mut messaging_service = MessagingService::new(
        conversation_repo,
        message_repo,
        user_repo.clone(),
        listing_repo.clone(),
    )
    .with_retry(RetryConfig::from_messaging(&config.messaging));
    messaging_service.set_event_publisher(Arc::new(sse_broadcaster.clone()));

    let moderation_service = ModerationService::new(
        report_repo.clone(),
        listing_repo.clone(),
        user_service.clone(),
        summarizer,
    );
    let recommendation_service = RecommendationService::new(listing_repo.clone(), engine);
    let admin_service =
        AdminService::new(user_service.clone(), user_repo, listing_repo, report_repo);

    let storage: Arc<dyn StorageBackend> = Arc::new(LocalStorage::new(
        config.storage.base_path.clone(),
        config.storage.base_url.clone(),
    ));

    if config.server.identity_sync_secret.is_none() {
        info!("Identity sync disabled: no shared secret configured");
    }

    let state = AppState {
        user_service,
        listing_service,
        wishlist_service,
        messaging_service,
        moderation_service,
        recommendation_service,
        admin_service,
        storage,
        max_upload_bytes: config.storage.max_upload_bytes,
        identity_sync_secret: config.server.identity_sync_secret.clone(),
        sse_broadcaster: sse_broadcaster.clone(),
    };

    // Build router
    let app = Router::new()
        .nest(
            "/api",
            authenticated_router(&state, config.storage.max_upload_bytes),
        )
        .nest_service(FILES_ROUTE, ServeDir::new(&config.storage.base_path))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Drop channels whose listeners have all disconnected
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SSE_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            sse_broadcaster.cleanup().await;
        }
    });

    // Start server with graceful shutdown
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
