//! Repository layer for database operations.

mod chat_message;
mod conversation;
mod listing;
mod report;
mod user;
mod wishlist;

pub use chat_message::ChatMessageRepository;
pub use conversation::ConversationRepository;
pub use listing::{CategoryCount, ListingQuery, ListingRepository};
pub use report::ReportRepository;
pub use user::UserRepository;
pub use wishlist::WishlistRepository;
