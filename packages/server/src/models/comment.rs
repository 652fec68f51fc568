use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::shared::UserRef;

/// Request body for creating or editing a comment or reply.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CommentRequest {
    #[schema(example = "Loved the ending.")]
    pub text: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CommentResponse {
    pub id: i32,
    pub story_id: i32,
    pub user: UserRef,
    pub text: String,
    /// Replies oldest-first. One level deep; replies cannot be replied to.
    pub replies: Vec<ReplyResponse>,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ReplyResponse {
    pub id: i32,
    pub comment_id: i32,
    pub user: UserRef,
    pub text: String,
    pub created_at: DateTime<Utc>,
}
