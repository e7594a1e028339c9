//! Business logic services.

#![allow(missing_docs)]

pub mod admin;
pub mod event_publisher;
pub mod listing;
pub mod llm;
pub mod messaging;
pub mod moderation;
pub mod recommendation;
pub mod retry;
pub mod summarizer;
pub mod user;
pub mod wishlist;

pub use admin::{AdminService, DashboardStats};
pub use event_publisher::{EventPublisher, EventPublisherService, NoOpEventPublisher, StreamEvent};
pub use listing::{CreateListingInput, ListingFilter, ListingService};
pub use llm::ChatCompletionClient;
pub use messaging::{ConversationSummary, MessagingService};
pub use moderation::{ModerationService, ReportStatus};
pub use recommendation::{
    RecommendationEngine, RecommendationEngineService, RecommendationResult,
    RecommendationService, engine_from_config,
};
pub use retry::RetryConfig;
pub use summarizer::{ModerationSummarizer, SummarizerService, summarizer_from_config};
pub use user::{SignUpInput, SyncIdentityInput, UserService};
pub use wishlist::WishlistService;
