//! Conversation endpoints: one-to-one chat between buyers and sellers.

use std::convert::Infallible;

use axum::{
    Json, Router,
    extract::{Path, State},
    response::sse::{Event, Sse},
    routing::get,
};
use futures::Stream;
use resource_common::AppResult;
use resource_core::ConversationSummary;
use resource_db::entities::{chat_message, conversation};
use serde::{Deserialize, Serialize};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse, sse};

/// Create conversations router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_conversations).post(start_conversation))
        .route("/{id}", get(get_conversation))
        .route("/{id}/messages", get(list_messages).post(send_message))
        .route("/{id}/stream", get(stream_messages))
}

/// Message response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub sender_name: Option<String>,
    pub sender_avatar: Option<String>,
    pub text: String,
    pub created_at: String,
}

impl From<chat_message::Model> for MessageResponse {
    fn from(msg: chat_message::Model) -> Self {
        Self {
            id: msg.id,
            conversation_id: msg.conversation_id,
            sender_id: msg.sender_id,
            sender_name: msg.sender_name,
            sender_avatar: msg.sender_avatar,
            text: msg.text,
            created_at: msg.created_at.to_rfc3339(),
        }
    }
}

/// Conversation response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationResponse {
    pub id: String,
    pub participants: [String; 2],
    pub other_user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub other_display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub other_photo_url: Option<String>,
    pub related_listing_id: Option<String>,
    pub last_message: Option<String>,
    pub last_message_at: Option<String>,
    pub created_at: String,
}

impl ConversationResponse {
    /// Render a conversation for one of its participants.
    pub fn for_viewer(conversation: conversation::Model, viewer_id: &str) -> Self {
        let other_user_id = conversation.other_participant(viewer_id).to_string();
        Self {
            id: conversation.id,
            participants: [conversation.participant_a, conversation.participant_b],
            other_user_id,
            other_display_name: None,
            other_photo_url: None,
            related_listing_id: conversation.related_listing_id,
            last_message: conversation.last_message,
            last_message_at: conversation.last_message_at.map(|t| t.to_rfc3339()),
            created_at: conversation.created_at.to_rfc3339(),
        }
    }
}

impl From<ConversationSummary> for ConversationResponse {
    fn from(summary: ConversationSummary) -> Self {
        let conversation = summary.conversation;
        Self {
            id: conversation.id,
            participants: [conversation.participant_a, conversation.participant_b],
            other_user_id: summary.other_user_id,
            other_display_name: summary.other_display_name,
            other_photo_url: summary.other_photo_url,
            related_listing_id: conversation.related_listing_id,
            last_message: conversation.last_message,
            last_message_at: conversation.last_message_at.map(|t| t.to_rfc3339()),
            created_at: conversation.created_at.to_rfc3339(),
        }
    }
}

/// Start conversation request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartConversationRequest {
    pub other_user_id: String,
    pub related_listing_id: Option<String>,
}

/// Get or create the conversation with another user.
async fn start_conversation(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<StartConversationRequest>,
) -> AppResult<ApiResponse<ConversationResponse>> {
    let conversation = state
        .messaging_service
        .start_conversation(&user.id, &req.other_user_id, req.related_listing_id.as_deref())
        .await?;

    Ok(ApiResponse::ok(ConversationResponse::for_viewer(
        conversation,
        &user.id,
    )))
}

/// List the caller's conversations, most recent first.
async fn list_conversations(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<ConversationResponse>>> {
    let summaries = state
        .messaging_service
        .list_conversations_for_user(&user.id)
        .await?;

    Ok(ApiResponse::ok(
        summaries.into_iter().map(ConversationResponse::from).collect(),
    ))
}

/// Get a conversation.
async fn get_conversation(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<ConversationResponse>> {
    let conversation = state
        .messaging_service
        .get_conversation(&id, &user.id)
        .await?;

    Ok(ApiResponse::ok(ConversationResponse::for_viewer(
        conversation,
        &user.id,
    )))
}

/// Messages in send order.
async fn list_messages(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Vec<MessageResponse>>> {
    let messages = state.messaging_service.list_messages(&id, &user.id).await?;

    Ok(ApiResponse::ok(
        messages.into_iter().map(MessageResponse::from).collect(),
    ))
}

/// Send message request.
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
}

/// Append a message.
async fn send_message(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SendMessageRequest>,
) -> AppResult<ApiResponse<MessageResponse>> {
    let message = state
        .messaging_service
        .send_message(&id, &user, &req.text)
        .await?;

    Ok(ApiResponse::created(message.into()))
}

/// Stored messages followed by live ones.
async fn stream_messages(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let (history, rx) = state
        .messaging_service
        .subscribe_with_history(&id, &user.id)
        .await?;
    Ok(sse::event_stream(history, rx))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_conversation_response_for_viewer() {
        let conversation = conversation::Model {
            id: "alice_bob".to_string(),
            participant_a: "alice".to_string(),
            participant_b: "bob".to_string(),
            related_listing_id: Some("l1".to_string()),
            last_message: None,
            last_message_id: None,
            last_message_at: None,
            created_at: Utc::now().into(),
        };

        let response = ConversationResponse::for_viewer(conversation, "bob");
        assert_eq!(response.other_user_id, "alice");

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["relatedListingId"], "l1");
        assert!(json.get("otherDisplayName").is_none());
    }
}
