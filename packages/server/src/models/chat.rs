use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::shared::UserRef;

/// Request body for sending a direct message.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct SendMessageRequest {
    #[schema(example = "Hey, did you read my latest story?")]
    pub content: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct MessageResponse {
    pub id: i32,
    pub sender_id: i32,
    pub receiver_id: i32,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

impl From<crate::entity::message::Model> for MessageResponse {
    fn from(msg: crate::entity::message::Model) -> Self {
        Self {
            id: msg.id,
            sender_id: msg.sender_id,
            receiver_id: msg.receiver_id,
            content: msg.content,
            sent_at: msg.sent_at,
        }
    }
}

/// One inbox row: a conversation partner and the most recent message
/// exchanged with them.
#[derive(Serialize, utoipa::ToSchema)]
pub struct InboxEntry {
    pub partner: UserRef,
    pub last_message: String,
    pub last_sent_at: DateTime<Utc>,
}

/// Inbox: conversation partners ordered by most recent message descending.
#[derive(Serialize, utoipa::ToSchema)]
pub struct InboxResponse {
    pub conversations: Vec<InboxEntry>,
}

/// A full two-party conversation, oldest message first.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ConversationResponse {
    pub partner: UserRef,
    pub messages: Vec<MessageResponse>,
}
