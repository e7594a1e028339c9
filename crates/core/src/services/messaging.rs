//! Messaging service: conversations between two users and their messages.

use std::collections::HashMap;

use crate::services::{
    event_publisher::{EventPublisherService, StreamEvent},
    retry::RetryConfig,
};
use chrono::Utc;
use resource_common::{AppError, AppResult, IdGenerator};
use resource_db::{
    entities::{chat_message, conversation, user},
    repositories::{ChatMessageRepository, ConversationRepository, ListingRepository, UserRepository},
};
use sea_orm::Set;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Longest accepted message, in characters.
pub const MAX_MESSAGE_LENGTH: usize = 2000;

/// A conversation as seen by one of its participants.
#[derive(Debug, Clone)]
pub struct ConversationSummary {
    pub conversation: conversation::Model,
    pub other_user_id: String,
    pub other_display_name: Option<String>,
    pub other_photo_url: Option<String>,
}

/// Messaging service.
#[derive(Clone)]
pub struct MessagingService {
    conversation_repo: ConversationRepository,
    message_repo: ChatMessageRepository,
    user_repo: UserRepository,
    listing_repo: ListingRepository,
    event_publisher: Option<EventPublisherService>,
    retry: RetryConfig,
    id_gen: IdGenerator,
}

impl MessagingService {
    /// Create a new messaging service.
    #[must_use]
    pub fn new(
        conversation_repo: ConversationRepository,
        message_repo: ChatMessageRepository,
        user_repo: UserRepository,
        listing_repo: ListingRepository,
    ) -> Self {
        Self {
            conversation_repo,
            message_repo,
            user_repo,
            listing_repo,
            event_publisher: None,
            retry: RetryConfig::default(),
            id_gen: IdGenerator::new(),
        }
    }

    /// Use a different retry policy for preview updates.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Set the event publisher.
    pub fn set_event_publisher(&mut self, event_publisher: EventPublisherService) {
        self.event_publisher = Some(event_publisher);
    }

    /// Get or create the conversation between `user_id` and `other_id`.
    ///
    /// When a listing is given the conversation is tagged with it, also if
    /// the conversation already existed.
    pub async fn start_conversation(
        &self,
        user_id: &str,
        other_id: &str,
        related_listing_id: Option<&str>,
    ) -> AppResult<conversation::Model> {
        if user_id == other_id {
            return Err(AppError::BadRequest(
                "Cannot start a conversation with yourself".to_string(),
            ));
        }

        self.user_repo.get_by_id(other_id).await?;
        if let Some(listing_id) = related_listing_id {
            self.listing_repo.get_by_id(listing_id).await?;
        }

        self.open_conversation(user_id, other_id, related_listing_id)
            .await
    }

    /// Message the seller of a listing.
    ///
    /// Returns the conversation with its preview moved to the new message.
    pub async fn contact_seller(
        &self,
        buyer: &user::Model,
        listing_id: &str,
        text: &str,
    ) -> AppResult<(conversation::Model, chat_message::Model)> {
        let text = validate_text(text)?;
        let listing = self.listing_repo.get_by_id(listing_id).await?;

        if listing.user_id == buyer.id {
            return Err(AppError::BadRequest(
                "Cannot contact yourself about your own listing".to_string(),
            ));
        }

        let mut conversation = self
            .open_conversation(&buyer.id, &listing.user_id, Some(&listing.id))
            .await?;
        let message = self.deliver(&conversation, buyer, text).await?;

        if conversation
            .last_message_at
            .is_none_or(|at| at <= message.created_at)
        {
            conversation.last_message = Some(message.text.clone());
            conversation.last_message_id = Some(message.id.clone());
            conversation.last_message_at = Some(message.created_at);
        }

        Ok((conversation, message))
    }

    /// Append a message to a conversation the sender takes part in.
    ///
    /// The message is stored before the conversation preview is touched.
    /// A preview update that keeps failing is logged and does not fail
    /// the send.
    pub async fn send_message(
        &self,
        conversation_id: &str,
        sender: &user::Model,
        text: &str,
    ) -> AppResult<chat_message::Model> {
        let text = validate_text(text)?;
        let conversation = self.authorize(conversation_id, &sender.id).await?;
        self.deliver(&conversation, sender, text).await
    }

    /// Messages of a conversation in send order.
    pub async fn list_messages(
        &self,
        conversation_id: &str,
        caller_id: &str,
    ) -> AppResult<Vec<chat_message::Model>> {
        self.authorize(conversation_id, caller_id).await?;
        self.message_repo.find_by_conversation(conversation_id).await
    }

    /// Get a conversation the caller takes part in.
    pub async fn get_conversation(
        &self,
        conversation_id: &str,
        caller_id: &str,
    ) -> AppResult<conversation::Model> {
        self.authorize(conversation_id, caller_id).await
    }

    /// Live feed of the conversation's new messages.
    pub async fn subscribe(
        &self,
        conversation_id: &str,
        caller_id: &str,
    ) -> AppResult<broadcast::Receiver<StreamEvent>> {
        self.authorize(conversation_id, caller_id).await?;

        let receiver = match &self.event_publisher {
            Some(publisher) => publisher.subscribe(conversation_id).await,
            None => None,
        };
        receiver.ok_or_else(|| AppError::Internal("Live updates are not enabled".to_string()))
    }

    /// Live feed plus the messages stored so far, oldest first.
    ///
    /// The feed is opened before the history is read, so a message sent in
    /// between shows up in at least one of the two.
    pub async fn subscribe_with_history(
        &self,
        conversation_id: &str,
        caller_id: &str,
    ) -> AppResult<(Vec<chat_message::Model>, broadcast::Receiver<StreamEvent>)> {
        let receiver = self.subscribe(conversation_id, caller_id).await?;
        let history = self.message_repo.find_by_conversation(conversation_id).await?;
        Ok((history, receiver))
    }

    /// The user's conversations, most recently active first.
    pub async fn list_conversations_for_user(
        &self,
        user_id: &str,
    ) -> AppResult<Vec<ConversationSummary>> {
        let conversations = self.conversation_repo.find_for_user(user_id).await?;
        if conversations.is_empty() {
            return Ok(vec![]);
        }

        let other_ids: Vec<String> = conversations
            .iter()
            .map(|c| c.other_participant(user_id).to_string())
            .collect();
        let users: HashMap<String, user::Model> = self
            .user_repo
            .find_by_ids(&other_ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();

        Ok(conversations
            .into_iter()
            .map(|conversation| {
                let other_user_id = conversation.other_participant(user_id).to_string();
                let other = users.get(&other_user_id);
                ConversationSummary {
                    other_display_name: other.and_then(|u| u.display_name.clone()),
                    other_photo_url: other.and_then(|u| u.photo_url.clone()),
                    other_user_id,
                    conversation,
                }
            })
            .collect())
    }

    async fn authorize(
        &self,
        conversation_id: &str,
        caller_id: &str,
    ) -> AppResult<conversation::Model> {
        let conversation = self.conversation_repo.get_by_id(conversation_id).await?;
        if !conversation.has_participant(caller_id) {
            return Err(AppError::Forbidden(
                "Not a participant in this conversation".to_string(),
            ));
        }
        Ok(conversation)
    }

    async fn open_conversation(
        &self,
        user_id: &str,
        other_id: &str,
        related_listing_id: Option<&str>,
    ) -> AppResult<conversation::Model> {
        let id = self.id_gen.pair_key(user_id, other_id);
        let (participant_a, participant_b) = if user_id <= other_id {
            (user_id, other_id)
        } else {
            (other_id, user_id)
        };

        let created = self
            .conversation_repo
            .create_if_absent(conversation::ActiveModel {
                id: Set(id.clone()),
                participant_a: Set(participant_a.to_string()),
                participant_b: Set(participant_b.to_string()),
                related_listing_id: Set(related_listing_id.map(str::to_string)),
                last_message: Set(None),
                last_message_id: Set(None),
                last_message_at: Set(None),
                created_at: Set(Utc::now().into()),
            })
            .await?;

        let mut conversation = self.conversation_repo.get_by_id(&id).await?;
        if conversation.participant_a != participant_a || conversation.participant_b != participant_b
        {
            warn!(conversation_id = %id, "Pair key belongs to another pair of users");
            return Err(AppError::Conflict(
                "Conversation key is taken by another pair".to_string(),
            ));
        }

        if created {
            info!(conversation_id = %id, "Conversation started");
        } else if let Some(listing_id) = related_listing_id {
            self.conversation_repo
                .set_related_listing(&id, listing_id)
                .await?;
            conversation.related_listing_id = Some(listing_id.to_string());
        }

        Ok(conversation)
    }

    async fn deliver(
        &self,
        conversation: &conversation::Model,
        sender: &user::Model,
        text: String,
    ) -> AppResult<chat_message::Model> {
        let message = self
            .message_repo
            .create(chat_message::ActiveModel {
                id: Set(self.id_gen.generate()),
                conversation_id: Set(conversation.id.clone()),
                sender_id: Set(sender.id.clone()),
                sender_name: Set(sender.display_name.clone()),
                sender_avatar: Set(sender.photo_url.clone()),
                text: Set(text),
                created_at: Set(Utc::now().into()),
            })
            .await?;

        info!(
            message_id = %message.id,
            conversation_id = %message.conversation_id,
            sender_id = %message.sender_id,
            "Message sent"
        );

        self.update_preview(&message).await;

        if let Some(publisher) = &self.event_publisher
            && let Err(e) = publisher.publish_message_created(&message).await
        {
            warn!(error = %e, message_id = %message.id, "Failed to publish message event");
        }

        Ok(message)
    }

    async fn update_preview(&self, message: &chat_message::Model) {
        let mut attempts = 0;
        loop {
            let result = self
                .conversation_repo
                .update_preview(
                    &message.conversation_id,
                    &message.text,
                    &message.id,
                    message.created_at,
                )
                .await;
            attempts += 1;

            match result {
                Ok(changed) => {
                    if !changed {
                        debug!(message_id = %message.id, "Preview already holds a newer message");
                    }
                    return;
                }
                Err(e) if self.retry.should_retry(attempts) => {
                    let delay = self.retry.delay_for_attempt(attempts - 1);
                    warn!(
                        error = %e,
                        attempt = attempts,
                        delay_ms = delay.as_millis() as u64,
                        conversation_id = %message.conversation_id,
                        "Preview update failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        attempts,
                        conversation_id = %message.conversation_id,
                        message_id = %message.id,
                        "Giving up on preview update"
                    );
                    return;
                }
            }
        }
    }
}

fn validate_text(text: &str) -> AppResult<String> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::Validation(
            "Message text must not be empty".to_string(),
        ));
    }
    if text.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(AppError::Validation(format!(
            "Message text must be at most {MAX_MESSAGE_LENGTH} characters"
        )));
    }
    Ok(text.to_string())
}
