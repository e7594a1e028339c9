//! Database entities.

pub mod chat_message;
pub mod conversation;
pub mod listing;
pub mod report;
pub mod user;
pub mod wishlist_item;

pub use chat_message::Entity as ChatMessage;
pub use conversation::Entity as Conversation;
pub use listing::Entity as Listing;
pub use report::Entity as Report;
pub use user::Entity as User;
pub use wishlist_item::Entity as WishlistItem;
