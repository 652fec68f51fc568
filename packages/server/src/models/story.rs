use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub use super::shared::{Pagination, UserRef};
use super::comment::CommentResponse;

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct StoryListQuery {
    /// Page number (1-based, default 1).
    pub page: Option<u64>,
    /// Items per page (default 20, max 100).
    pub per_page: Option<u64>,
    /// Restrict the feed to one category.
    pub category_id: Option<i32>,
    /// Restrict the feed to one author's stories.
    pub author: Option<String>,
}

/// Feed entry: a story without its description or comments.
#[derive(Serialize, utoipa::ToSchema)]
pub struct StoryListItem {
    pub id: i32,
    pub title: String,
    pub author: UserRef,
    /// Whether the author has an avatar, so the feed can render one
    /// without a request per row.
    pub author_has_avatar: bool,
    /// Category name, when the story is categorized.
    pub category: Option<String>,
    pub file_name: String,
    pub like_count: u64,
    pub comment_count: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct StoryListResponse {
    pub data: Vec<StoryListItem>,
    pub pagination: Pagination,
}

/// Full story detail, including its comment thread.
#[derive(Serialize, utoipa::ToSchema)]
pub struct StoryResponse {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub author: UserRef,
    pub category: Option<String>,
    pub file_name: String,
    pub content_type: Option<String>,
    pub file_size: i64,
    /// Whether the requesting user has liked this story. Always `false`
    /// for anonymous requests.
    pub liked: bool,
    pub like_count: u64,
    /// Comments newest-first, each with its replies oldest-first.
    pub comments: Vec<CommentResponse>,
    pub created_at: DateTime<Utc>,
}

/// Result of a like toggle. This shape is relied on by the feed page's
/// like button, so keep it stable.
#[derive(Serialize, utoipa::ToSchema)]
pub struct LikeToggleResponse {
    pub liked: bool,
    pub count: u64,
}

pub fn validate_story_title(title: &str) -> Result<(), AppError> {
    let title = title.trim();
    if title.is_empty() || title.chars().count() > 255 {
        return Err(AppError::Validation(
            "Title must be 1-255 characters".into(),
        ));
    }
    Ok(())
}

pub fn validate_story_description(description: &str) -> Result<(), AppError> {
    let description = description.trim();
    if description.is_empty() {
        return Err(AppError::Validation("Description must not be empty".into()));
    }
    if description.chars().count() > 10_000 {
        return Err(AppError::Validation(
            "Description must be at most 10000 characters".into(),
        ));
    }
    Ok(())
}
