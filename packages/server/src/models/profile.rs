use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

use super::shared::double_option;

/// A user's public profile with social-graph counts.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ProfileResponse {
    /// User ID.
    #[schema(example = 42)]
    pub id: i32,
    #[schema(example = "alice_wonder")]
    pub username: String,
    #[schema(example = "I write short fiction.")]
    pub bio: Option<String>,
    /// Whether an avatar has been uploaded.
    pub has_avatar: bool,
    pub joined_at: DateTime<Utc>,
    pub stories_count: u64,
    pub followers_count: u64,
    pub following_count: u64,
    /// Whether the requesting user follows this profile. `null` when
    /// viewing your own profile.
    pub is_following: Option<bool>,
}

/// PATCH body for profile edits.
#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct UpdateProfileRequest {
    /// New bio text; `null` clears the bio.
    #[serde(default, deserialize_with = "double_option")]
    pub bio: Option<Option<String>>,
}

pub fn validate_update_profile(payload: &UpdateProfileRequest) -> Result<(), AppError> {
    if let Some(Some(bio)) = &payload.bio
        && bio.chars().count() > 500
    {
        return Err(AppError::Validation(
            "Bio must be at most 500 characters".into(),
        ));
    }
    Ok(())
}

/// Result of a follow toggle.
#[derive(Serialize, utoipa::ToSchema)]
pub struct FollowToggleResponse {
    /// Whether the requesting user now follows the target.
    pub following: bool,
    /// The target's follower count after the toggle.
    pub followers_count: u64,
}
