//! Event publisher service.
//!
//! Lets core services announce real-time events without depending on the
//! transport. The API crate provides the Server-Sent Events implementation.

use async_trait::async_trait;
use resource_common::AppResult;
use resource_db::entities::chat_message;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Event types for real-time updates.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// A message was appended to a conversation.
    MessageCreated(chat_message::Model),
}

impl StreamEvent {
    /// Conversation the event belongs to.
    #[must_use]
    pub fn conversation_id(&self) -> &str {
        match self {
            Self::MessageCreated(message) => &message.conversation_id,
        }
    }

    /// SSE event name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::MessageCreated(_) => "message",
        }
    }
}

/// Trait for publishing real-time events.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a message-created event to the conversation's subscribers.
    async fn publish_message_created(&self, message: &chat_message::Model) -> AppResult<()>;

    /// Receive the conversation's events from now on.
    ///
    /// Publishers without a live channel return `None`.
    async fn subscribe(&self, _conversation_id: &str) -> Option<broadcast::Receiver<StreamEvent>> {
        None
    }
}

/// Type alias for a shared event publisher.
pub type EventPublisherService = Arc<dyn EventPublisher>;

/// Publisher that drops every event.
#[derive(Clone, Default)]
pub struct NoOpEventPublisher;

#[async_trait]
impl EventPublisher for NoOpEventPublisher {
    async fn publish_message_created(&self, _message: &chat_message::Model) -> AppResult<()> {
        Ok(())
    }
}
