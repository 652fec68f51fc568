use axum::Json;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::HeaderMap;
use axum::response::Response;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{follow, profile, story, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::profile::{
    FollowToggleResponse, ProfileResponse, UpdateProfileRequest, validate_update_profile,
};
use crate::state::AppState;
use crate::utils::filename::validate_upload_filename;
use crate::utils::upload::{blob_response, stream_field_to_store};

pub fn avatar_body_limit() -> DefaultBodyLimit {
    DefaultBodyLimit::max(8 * 1024 * 1024) // 8 MB
}

#[utoipa::path(
    get,
    path = "/profile",
    tag = "Profiles",
    operation_id = "getMyProfile",
    summary = "Get the authenticated user's profile",
    responses(
        (status = 200, description = "Profile", body = ProfileResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn get_my_profile(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ProfileResponse>, AppError> {
    let user = find_user_by_id(&state.db, auth_user.user_id).await?;
    let response = build_profile_response(&state.db, user, None).await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/users/{username}",
    tag = "Profiles",
    operation_id = "getProfile",
    summary = "Get a profile by username",
    description = "Includes `is_following` when viewing another user.",
    params(("username" = String, Path, description = "Username")),
    responses(
        (status = 200, description = "Profile", body = ProfileResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(username = %username))]
pub async fn get_profile(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<ProfileResponse>, AppError> {
    let user = find_user_by_username(&state.db, &username).await?;
    let viewer = (user.id != auth_user.user_id).then_some(auth_user.user_id);
    let response = build_profile_response(&state.db, user, viewer).await?;
    Ok(Json(response))
}

#[utoipa::path(
    patch,
    path = "/profile",
    tag = "Profiles",
    operation_id = "updateProfile",
    summary = "Edit the authenticated user's profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated profile", body = ProfileResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn update_profile(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, AppError> {
    validate_update_profile(&payload)?;

    let user = find_user_by_id(&state.db, auth_user.user_id).await?;
    let profile_model = find_profile(&state.db, user.id).await?;

    let mut active: profile::ActiveModel = profile_model.into();
    if let Some(bio) = payload.bio {
        active.bio = Set(bio.map(|b| b.trim().to_string()).filter(|b| !b.is_empty()));
    }
    active.updated_at = Set(chrono::Utc::now());
    active.update(&state.db).await?;

    let response = build_profile_response(&state.db, user, None).await?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/profile/avatar",
    tag = "Profiles",
    operation_id = "uploadAvatar",
    summary = "Upload an avatar image",
    description = "The `file` multipart field is required. Re-uploading \
        replaces the previous avatar.",
    request_body(content_type = "multipart/form-data", description = "Avatar file upload"),
    responses(
        (status = 200, description = "Updated profile", body = ProfileResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart), fields(user_id = auth_user.user_id))]
pub async fn upload_avatar(
    auth_user: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ProfileResponse>, AppError> {
    let user = find_user_by_id(&state.db, auth_user.user_id).await?;
    let profile_model = find_profile(&state.db, user.id).await?;

    let mut uploaded = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        if field.name() == Some("file") {
            let file_name = field.file_name().map(|s| s.to_string());
            let (hash, size) = stream_field_to_store(
                field,
                &*state.blob_store,
                state.config.storage.max_blob_size,
            )
            .await?;
            uploaded = Some((hash, size, file_name));
        }
    }

    let (hash, size, file_name) =
        uploaded.ok_or_else(|| AppError::Validation("Missing 'file' field".into()))?;
    let file_name =
        file_name.ok_or_else(|| AppError::Validation("File field must have a filename".into()))?;
    let file_name = validate_upload_filename(&file_name)
        .map_err(|e| AppError::Validation(e.message().into()))?
        .to_string();

    let mut active: profile::ActiveModel = profile_model.into();
    active.avatar_hash = Set(Some(hash.to_hex()));
    active.avatar_filename = Set(Some(file_name));
    active.avatar_size = Set(Some(size));
    active.updated_at = Set(chrono::Utc::now());
    active.update(&state.db).await?;

    let response = build_profile_response(&state.db, user, None).await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/users/{username}/avatar",
    tag = "Profiles",
    operation_id = "getAvatar",
    summary = "Download a user's avatar",
    description = "Streams the avatar image. Supports ETag-based caching via If-None-Match.",
    params(("username" = String, Path, description = "Username")),
    responses(
        (status = 200, description = "Avatar content"),
        (status = 304, description = "Not Modified (ETag match)"),
        (status = 404, description = "User or avatar not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, headers), fields(username = %username))]
pub async fn get_avatar(
    State(state): State<AppState>,
    Path(username): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let user = find_user_by_username(&state.db, &username).await?;
    let profile_model = find_profile(&state.db, user.id).await?;

    let (Some(hash), Some(file_name), Some(size)) = (
        profile_model.avatar_hash,
        profile_model.avatar_filename,
        profile_model.avatar_size,
    ) else {
        return Err(AppError::NotFound("Avatar not found".into()));
    };

    let content_type = mime_guess::from_path(&file_name)
        .first()
        .map(|m| m.to_string());

    blob_response(
        &hash,
        &file_name,
        content_type.as_deref(),
        size,
        &headers,
        &*state.blob_store,
    )
    .await
}

#[utoipa::path(
    post,
    path = "/users/{username}/follow",
    tag = "Profiles",
    operation_id = "toggleFollow",
    summary = "Follow or unfollow a user",
    description = "Creates the follow edge if absent, removes it if present. \
        Following yourself is rejected.",
    params(("username" = String, Path, description = "Username of the user to follow")),
    responses(
        (status = 200, description = "Toggle result", body = FollowToggleResponse),
        (status = 400, description = "Self-follow (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(follower_id = auth_user.user_id, username = %username))]
pub async fn toggle_follow(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<FollowToggleResponse>, AppError> {
    let target = find_user_by_username(&state.db, &username).await?;

    if target.id == auth_user.user_id {
        return Err(AppError::Validation("You cannot follow yourself".into()));
    }

    let txn = state.db.begin().await?;

    let existing = follow::Entity::find_by_id((auth_user.user_id, target.id))
        .one(&txn)
        .await?;

    let following = match existing {
        Some(edge) => {
            let active: follow::ActiveModel = edge.into();
            active.delete(&txn).await?;
            false
        }
        None => {
            let new_edge = follow::ActiveModel {
                follower_id: Set(auth_user.user_id),
                following_id: Set(target.id),
                created_at: Set(chrono::Utc::now()),
            };
            match new_edge.insert(&txn).await {
                Ok(_) => {}
                // Lost a toggle race; the edge exists either way.
                Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {}
                Err(e) => return Err(e.into()),
            }
            true
        }
    };

    txn.commit().await?;

    let followers_count = follow::Entity::find()
        .filter(follow::Column::FollowingId.eq(target.id))
        .count(&state.db)
        .await?;

    Ok(Json(FollowToggleResponse {
        following,
        followers_count,
    }))
}

pub(crate) async fn find_user_by_id<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<user::Model, AppError> {
    user::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

pub(crate) async fn find_user_by_username<C: ConnectionTrait>(
    db: &C,
    username: &str,
) -> Result<user::Model, AppError> {
    user::Entity::find()
        .filter(user::Column::Username.eq(username))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

async fn find_profile<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<profile::Model, AppError> {
    profile::Entity::find()
        .filter(profile::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::Internal(format!("Profile missing for user {user_id}")))
}

/// Assemble a profile response with social-graph counts. `viewer` is the
/// requesting user's ID when viewing someone else's profile.
async fn build_profile_response(
    db: &DatabaseConnection,
    user: user::Model,
    viewer: Option<i32>,
) -> Result<ProfileResponse, AppError> {
    let profile_model = find_profile(db, user.id).await?;

    let stories_count = story::Entity::find()
        .filter(story::Column::AuthorId.eq(user.id))
        .count(db)
        .await?;

    let followers_count = follow::Entity::find()
        .filter(follow::Column::FollowingId.eq(user.id))
        .count(db)
        .await?;

    let following_count = follow::Entity::find()
        .filter(follow::Column::FollowerId.eq(user.id))
        .count(db)
        .await?;

    let is_following = match viewer {
        Some(viewer_id) => Some(
            follow::Entity::find_by_id((viewer_id, user.id))
                .one(db)
                .await?
                .is_some(),
        ),
        None => None,
    };

    Ok(ProfileResponse {
        id: user.id,
        username: user.username,
        bio: profile_model.bio,
        has_avatar: profile_model.avatar_hash.is_some(),
        joined_at: user.created_at,
        stories_count,
        followers_count,
        following_count,
        is_following,
    })
}
