//! Server-Sent Events (SSE) for live conversations.
//!
//! Each conversation with at least one listener owns a broadcast channel.
//! A lagging listener misses events instead of slowing down senders.

#![allow(missing_docs)]

use std::collections::{HashMap, HashSet};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::response::sse::{Event, KeepAlive, Sse};
use chrono::{DateTime, Utc};
use futures::stream::{self, Stream};
use resource_common::AppResult;
use resource_core::{EventPublisher, StreamEvent};
use resource_db::entities::chat_message;
use serde::Serialize;
use tokio::sync::{RwLock, broadcast};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;

/// Buffered events per conversation before slow listeners start lagging.
const CHANNEL_CAPACITY: usize = 100;

/// SSE payloads.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum SseEvent {
    /// New message in the conversation.
    Message {
        id: String,
        conversation_id: String,
        sender_id: String,
        sender_name: Option<String>,
        sender_avatar: Option<String>,
        text: String,
        created_at: DateTime<Utc>,
    },
    /// Connection established.
    Connected,
}

impl From<StreamEvent> for SseEvent {
    fn from(event: StreamEvent) -> Self {
        match event {
            StreamEvent::MessageCreated(message) => Self::Message {
                id: message.id,
                conversation_id: message.conversation_id,
                sender_id: message.sender_id,
                sender_name: message.sender_name,
                sender_avatar: message.sender_avatar,
                text: message.text,
                created_at: message.created_at.into(),
            },
        }
    }
}

/// Broadcast channels keyed by conversation id.
#[derive(Clone, Default)]
pub struct SseBroadcaster {
    conversations: Arc<RwLock<HashMap<String, broadcast::Sender<StreamEvent>>>>,
}

impl SseBroadcaster {
    /// Create a new SSE broadcaster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the channel of a conversation.
    pub async fn conversation_channel(&self, conversation_id: &str) -> broadcast::Sender<StreamEvent> {
        let mut channels = self.conversations.write().await;

        if let Some(sender) = channels.get(conversation_id)
            && sender.receiver_count() > 0
        {
            return sender.clone();
        }

        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        channels.insert(conversation_id.to_string(), sender.clone());
        sender
    }

    /// Send an event to the conversation's listeners, if any.
    pub async fn broadcast(&self, event: StreamEvent) {
        let channels = self.conversations.read().await;
        if let Some(sender) = channels.get(event.conversation_id()) {
            let _ = sender.send(event);
        }
    }

    /// Drop channels nobody listens to anymore.
    pub async fn cleanup(&self) {
        let mut channels = self.conversations.write().await;
        channels.retain(|_, sender| sender.receiver_count() > 0);
    }

    /// Number of open conversation channels.
    pub async fn channel_count(&self) -> usize {
        self.conversations.read().await.len()
    }
}

#[async_trait]
impl EventPublisher for SseBroadcaster {
    async fn publish_message_created(&self, message: &chat_message::Model) -> AppResult<()> {
        self.broadcast(StreamEvent::MessageCreated(message.clone()))
            .await;
        Ok(())
    }

    async fn subscribe(&self, conversation_id: &str) -> Option<broadcast::Receiver<StreamEvent>> {
        Some(self.conversation_channel(conversation_id).await.subscribe())
    }
}

/// Stored messages followed by live ones.
///
/// `rx` must be opened before `history` is read. Live messages already in
/// `history` are skipped, so nothing sent in between is lost or repeated.
pub fn message_events(
    history: Vec<chat_message::Model>,
    rx: broadcast::Receiver<StreamEvent>,
) -> impl Stream<Item = StreamEvent> {
    let mut seen: HashSet<String> = history.iter().map(|m| m.id.clone()).collect();
    let stored = stream::iter(history.into_iter().map(StreamEvent::MessageCreated));
    let live = BroadcastStream::new(rx).filter_map(move |result| {
        let event = result.ok()?;
        match &event {
            StreamEvent::MessageCreated(message) if seen.remove(&message.id) => None,
            StreamEvent::MessageCreated(_) => Some(event),
        }
    });
    stored.chain(live)
}

/// Turn a subscription into an SSE response.
///
/// The stream opens with a `connected` event, replays `history` oldest
/// first, then follows `rx`. A `ping` comment goes out every 30 seconds.
pub fn event_stream(
    history: Vec<chat_message::Model>,
    rx: broadcast::Receiver<StreamEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = message_events(history, rx).map(|event| {
        let name = event.name();
        Ok(Event::default()
            .event(name)
            .json_data(SseEvent::from(event))
            .unwrap_or_else(|_| Event::default().data("error")))
    });

    let initial = stream::once(async {
        Ok(Event::default()
            .json_data(&SseEvent::Connected)
            .unwrap_or_else(|_| Event::default().data("connected")))
    });

    Sse::new(initial.chain(events)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("ping"),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn message(id: &str, conversation_id: &str) -> chat_message::Model {
        chat_message::Model {
            id: id.to_string(),
            conversation_id: conversation_id.to_string(),
            sender_id: "alice".to_string(),
            sender_name: Some("Alice".to_string()),
            sender_avatar: None,
            text: "Still available?".to_string(),
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_publish_reaches_only_that_conversation() {
        let broadcaster = SseBroadcaster::new();
        let mut ours = broadcaster.subscribe("alice_bob").await.unwrap();
        let mut theirs = broadcaster.subscribe("carol_dave").await.unwrap();

        broadcaster
            .publish_message_created(&message("m1", "alice_bob"))
            .await
            .unwrap();

        let StreamEvent::MessageCreated(received) = ours.recv().await.unwrap();
        assert_eq!(received.id, "m1");
        assert!(theirs.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_publish_without_listeners_is_ok() {
        let broadcaster = SseBroadcaster::new();
        broadcaster
            .publish_message_created(&message("m1", "alice_bob"))
            .await
            .unwrap();
        assert_eq!(broadcaster.channel_count().await, 0);
    }

    #[tokio::test]
    async fn test_cleanup_drops_idle_channels() {
        let broadcaster = SseBroadcaster::new();
        let rx = broadcaster.subscribe("alice_bob").await.unwrap();
        let _kept = broadcaster.subscribe("carol_dave").await.unwrap();
        assert_eq!(broadcaster.channel_count().await, 2);

        drop(rx);
        broadcaster.cleanup().await;
        assert_eq!(broadcaster.channel_count().await, 1);
    }

    #[tokio::test]
    async fn test_listeners_share_a_channel() {
        let broadcaster = SseBroadcaster::new();
        let _first = broadcaster.subscribe("alice_bob").await.unwrap();
        let second = broadcaster.conversation_channel("alice_bob").await;

        assert_eq!(second.receiver_count(), 1);
    }

    fn ids(events: &[StreamEvent]) -> Vec<&str> {
        events
            .iter()
            .map(|StreamEvent::MessageCreated(m)| m.id.as_str())
            .collect()
    }

    #[tokio::test]
    async fn test_message_events_replay_history_then_live() {
        let broadcaster = SseBroadcaster::new();
        let rx = broadcaster.subscribe("alice_bob").await.unwrap();

        // m2 lands after the subscription but before the history read.
        broadcaster
            .publish_message_created(&message("m2", "alice_bob"))
            .await
            .unwrap();
        let history = vec![message("m1", "alice_bob"), message("m2", "alice_bob")];
        broadcaster
            .publish_message_created(&message("m3", "alice_bob"))
            .await
            .unwrap();

        let events: Vec<StreamEvent> = message_events(history, rx).take(3).collect().await;
        assert_eq!(ids(&events), ["m1", "m2", "m3"]);
    }

    #[tokio::test]
    async fn test_message_events_keep_message_missing_from_history() {
        let broadcaster = SseBroadcaster::new();
        let rx = broadcaster.subscribe("alice_bob").await.unwrap();

        broadcaster
            .publish_message_created(&message("m2", "alice_bob"))
            .await
            .unwrap();

        let events: Vec<StreamEvent> = message_events(vec![message("m1", "alice_bob")], rx)
            .take(2)
            .collect()
            .await;
        assert_eq!(ids(&events), ["m1", "m2"]);
    }

    #[test]
    fn test_message_event_serialization() {
        let event = SseEvent::from(StreamEvent::MessageCreated(message("m1", "alice_bob")));

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"message\""));
        assert!(json.contains("\"conversationId\":\"alice_bob\""));
        assert!(json.contains("\"senderName\":\"Alice\""));
    }
}
