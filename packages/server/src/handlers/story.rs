use std::collections::HashMap;

use axum::Json;
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use sea_orm::*;
use tracing::instrument;

use crate::entity::{category, comment, like, profile, reply, story, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::{AuthUser, OptionalAuthUser};
use crate::extractors::json::AppJson;
use crate::handlers::comment::load_comment_thread;
use crate::handlers::profile::find_user_by_username;
use crate::models::shared::{Pagination, UserRef};
use crate::models::story::{
    LikeToggleResponse, StoryListItem, StoryListQuery, StoryListResponse, StoryResponse,
    validate_story_description, validate_story_title,
};
use crate::state::AppState;
use crate::utils::filename::validate_upload_filename;
use crate::utils::upload::{blob_response, stream_field_to_store};

const DEFAULT_PER_PAGE: u64 = 20;
const MAX_PER_PAGE: u64 = 100;

pub fn upload_body_limit() -> DefaultBodyLimit {
    DefaultBodyLimit::max(64 * 1024 * 1024) // 64 MB
}

#[utoipa::path(
    get,
    path = "",
    tag = "Stories",
    operation_id = "listStories",
    summary = "Browse the story feed",
    description = "Newest-first, paginated. Optionally filtered by category or author.",
    params(StoryListQuery),
    responses(
        (status = 200, description = "A page of stories", body = StoryListResponse),
        (status = 404, description = "Unknown author filter (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn list_stories(
    State(state): State<AppState>,
    Query(query): Query<StoryListQuery>,
) -> Result<Json<StoryListResponse>, AppError> {
    let page = Ord::max(query.page.unwrap_or(1), 1);
    let per_page = query
        .per_page
        .unwrap_or(DEFAULT_PER_PAGE)
        .clamp(1, MAX_PER_PAGE);

    let mut select = story::Entity::find();
    if let Some(category_id) = query.category_id {
        select = select.filter(story::Column::CategoryId.eq(category_id));
    }
    if let Some(author) = &query.author {
        let author = find_user_by_username(&state.db, author).await?;
        select = select.filter(story::Column::AuthorId.eq(author.id));
    }

    let paginator = select
        .order_by_desc(story::Column::CreatedAt)
        .paginate(&state.db, per_page);

    let total = paginator.num_items().await?;
    let total_pages = total.div_ceil(per_page);
    let stories = paginator.fetch_page(page - 1).await?;

    let story_ids: Vec<i32> = stories.iter().map(|s| s.id).collect();

    let authors = load_users(
        &state.db,
        stories.iter().map(|s| s.author_id).collect::<Vec<_>>(),
    )
    .await?;
    let categories = load_category_names(&state.db).await?;

    let author_ids: Vec<i32> = authors.keys().copied().collect();
    let avatar_owners: std::collections::HashSet<i32> = profile::Entity::find()
        .filter(profile::Column::UserId.is_in(author_ids))
        .all(&state.db)
        .await?
        .into_iter()
        .filter(|p| p.avatar_hash.is_some())
        .map(|p| p.user_id)
        .collect();

    let mut like_counts: HashMap<i32, u64> = HashMap::new();
    for row in like::Entity::find()
        .filter(like::Column::StoryId.is_in(story_ids.clone()))
        .all(&state.db)
        .await?
    {
        *like_counts.entry(row.story_id).or_default() += 1;
    }

    let mut comment_counts: HashMap<i32, u64> = HashMap::new();
    for row in comment::Entity::find()
        .filter(comment::Column::StoryId.is_in(story_ids))
        .all(&state.db)
        .await?
    {
        *comment_counts.entry(row.story_id).or_default() += 1;
    }

    let data = stories
        .into_iter()
        .map(|s| StoryListItem {
            id: s.id,
            title: s.title,
            author: authors
                .get(&s.author_id)
                .cloned()
                .unwrap_or_else(|| UserRef {
                    id: s.author_id,
                    username: String::new(),
                }),
            author_has_avatar: avatar_owners.contains(&s.author_id),
            category: s.category_id.and_then(|id| categories.get(&id).cloned()),
            file_name: s.file_name,
            like_count: like_counts.get(&s.id).copied().unwrap_or(0),
            comment_count: comment_counts.get(&s.id).copied().unwrap_or(0),
            created_at: s.created_at,
        })
        .collect();

    Ok(Json(StoryListResponse {
        data,
        pagination: Pagination {
            page,
            per_page,
            total,
            total_pages,
        },
    }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Stories",
    operation_id = "getStory",
    summary = "Story detail with its comment thread",
    params(("id" = i32, Path, description = "Story ID")),
    responses(
        (status = 200, description = "Story detail", body = StoryResponse),
        (status = 404, description = "Story not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, auth_user))]
pub async fn get_story(
    OptionalAuthUser(auth_user): OptionalAuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<StoryResponse>, AppError> {
    let story = find_story(&state.db, id).await?;
    let response = build_story_response(&state.db, story, auth_user.map(|u| u.user_id)).await?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "",
    tag = "Stories",
    operation_id = "createStory",
    summary = "Upload a new story",
    description = "Multipart form with `title`, `description`, optional \
        `category_id`, and a `file` field carrying the story document.",
    request_body(content_type = "multipart/form-data", description = "Story upload"),
    responses(
        (status = 201, description = "Story created", body = StoryResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart), fields(user_id = auth_user.user_id))]
pub async fn create_story(
    auth_user: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut title = None;
    let mut description = None;
    let mut category_id: Option<i32> = None;
    let mut uploaded = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        match field.name() {
            Some("title") => {
                title = Some(read_text_field(field, "title").await?);
            }
            Some("description") => {
                description = Some(read_text_field(field, "description").await?);
            }
            Some("category_id") => {
                let raw = read_text_field(field, "category_id").await?;
                if !raw.trim().is_empty() {
                    category_id = Some(raw.trim().parse().map_err(|_| {
                        AppError::Validation("category_id must be an integer".into())
                    })?);
                }
            }
            Some("file") => {
                let file_name = field.file_name().map(|s| s.to_string());
                let (hash, size) = stream_field_to_store(
                    field,
                    &*state.blob_store,
                    state.config.storage.max_blob_size,
                )
                .await?;
                uploaded = Some((hash, size, file_name));
            }
            _ => {}
        }
    }

    let title = title.ok_or_else(|| AppError::Validation("Missing 'title' field".into()))?;
    let description =
        description.ok_or_else(|| AppError::Validation("Missing 'description' field".into()))?;
    validate_story_title(&title)?;
    validate_story_description(&description)?;

    let (hash, size, file_name) =
        uploaded.ok_or_else(|| AppError::Validation("Missing 'file' field".into()))?;
    let file_name =
        file_name.ok_or_else(|| AppError::Validation("File field must have a filename".into()))?;
    let file_name = validate_upload_filename(&file_name)
        .map_err(|e| AppError::Validation(e.message().into()))?
        .to_string();

    if let Some(category_id) = category_id
        && category::Entity::find_by_id(category_id)
            .one(&state.db)
            .await?
            .is_none()
    {
        return Err(AppError::Validation(format!(
            "Unknown category {category_id}"
        )));
    }

    let content_type = mime_guess::from_path(&file_name)
        .first()
        .map(|m| m.to_string());

    let new_story = story::ActiveModel {
        author_id: Set(auth_user.user_id),
        title: Set(title.trim().to_string()),
        description: Set(description.trim().to_string()),
        file_hash: Set(hash.to_hex()),
        file_name: Set(file_name),
        content_type: Set(content_type),
        file_size: Set(size),
        category_id: Set(category_id),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    let story = new_story.insert(&state.db).await?;

    tracing::info!(story_id = story.id, "story created");

    let response = build_story_response(&state.db, story, Some(auth_user.user_id)).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Stories",
    operation_id = "updateStory",
    summary = "Edit a story's metadata",
    description = "Title, description, and category only. The uploaded file \
        is immutable; upload a new story to replace it.",
    params(("id" = i32, Path, description = "Story ID")),
    request_body = UpdateStoryRequest,
    responses(
        (status = 200, description = "Updated story", body = StoryResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the author (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Story not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn update_story(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateStoryRequest>,
) -> Result<Json<StoryResponse>, AppError> {
    let story = find_story(&state.db, id).await?;
    auth_user.require_owner(story.author_id)?;

    if let Some(title) = &payload.title {
        validate_story_title(title)?;
    }
    if let Some(description) = &payload.description {
        validate_story_description(description)?;
    }
    if let Some(Some(category_id)) = payload.category_id
        && category::Entity::find_by_id(category_id)
            .one(&state.db)
            .await?
            .is_none()
    {
        return Err(AppError::Validation(format!(
            "Unknown category {category_id}"
        )));
    }

    let mut active: story::ActiveModel = story.into();
    if let Some(title) = payload.title {
        active.title = Set(title.trim().to_string());
    }
    if let Some(description) = payload.description {
        active.description = Set(description.trim().to_string());
    }
    if let Some(category_id) = payload.category_id {
        active.category_id = Set(category_id);
    }
    let story = active.update(&state.db).await?;

    let response = build_story_response(&state.db, story, Some(auth_user.user_id)).await?;
    Ok(Json(response))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Stories",
    operation_id = "deleteStory",
    summary = "Delete a story",
    description = "Also removes its likes, comments, and replies.",
    params(("id" = i32, Path, description = "Story ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the author (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Story not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn delete_story(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let story = find_story(&state.db, id).await?;
    auth_user.require_owner(story.author_id)?;

    let txn = state.db.begin().await?;

    let comment_ids: Vec<i32> = comment::Entity::find()
        .filter(comment::Column::StoryId.eq(story.id))
        .all(&txn)
        .await?
        .into_iter()
        .map(|c| c.id)
        .collect();

    if !comment_ids.is_empty() {
        reply::Entity::delete_many()
            .filter(reply::Column::CommentId.is_in(comment_ids))
            .exec(&txn)
            .await?;
    }
    comment::Entity::delete_many()
        .filter(comment::Column::StoryId.eq(story.id))
        .exec(&txn)
        .await?;
    like::Entity::delete_many()
        .filter(like::Column::StoryId.eq(story.id))
        .exec(&txn)
        .await?;

    // The blob stays: storage is content-addressed and another story may
    // reference the same file.
    story::Entity::delete_by_id(story.id).exec(&txn).await?;

    txn.commit().await?;

    tracing::info!(story_id = id, "story deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/{id}/file",
    tag = "Stories",
    operation_id = "downloadStoryFile",
    summary = "Download the story's file",
    description = "Streams the document. Supports ETag-based caching via If-None-Match.",
    params(("id" = i32, Path, description = "Story ID")),
    responses(
        (status = 200, description = "File content"),
        (status = 304, description = "Not Modified (ETag match)"),
        (status = 404, description = "Story or file not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, headers))]
pub async fn download_story_file(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let story = find_story(&state.db, id).await?;

    blob_response(
        &story.file_hash,
        &story.file_name,
        story.content_type.as_deref(),
        story.file_size,
        &headers,
        &*state.blob_store,
    )
    .await
}

#[utoipa::path(
    post,
    path = "/{id}/like",
    tag = "Stories",
    operation_id = "toggleLike",
    summary = "Like or unlike a story",
    description = "Creates the like if absent, removes it if present, and \
        returns the story's new like count.",
    params(("id" = i32, Path, description = "Story ID")),
    responses(
        (status = 200, description = "Toggle result", body = LikeToggleResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Story not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id, story_id = id))]
pub async fn toggle_like(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<LikeToggleResponse>, AppError> {
    let story = find_story(&state.db, id).await?;

    let txn = state.db.begin().await?;

    let existing = like::Entity::find_by_id((auth_user.user_id, story.id))
        .one(&txn)
        .await?;

    let liked = match existing {
        Some(row) => {
            let active: like::ActiveModel = row.into();
            active.delete(&txn).await?;
            false
        }
        None => {
            let new_like = like::ActiveModel {
                user_id: Set(auth_user.user_id),
                story_id: Set(story.id),
                created_at: Set(chrono::Utc::now()),
            };
            match new_like.insert(&txn).await {
                Ok(_) => {}
                // Lost a toggle race; the like exists either way.
                Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {}
                Err(e) => return Err(e.into()),
            }
            true
        }
    };

    txn.commit().await?;

    let count = like::Entity::find()
        .filter(like::Column::StoryId.eq(story.id))
        .count(&state.db)
        .await?;

    Ok(Json(LikeToggleResponse { liked, count }))
}

/// PATCH body for story metadata edits.
#[derive(serde::Deserialize, Default, utoipa::ToSchema)]
pub struct UpdateStoryRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    /// New category; `null` makes the story uncategorized.
    #[serde(default, deserialize_with = "crate::models::shared::double_option")]
    pub category_id: Option<Option<i32>>,
}

async fn read_text_field(
    field: axum::extract::multipart::Field<'_>,
    name: &str,
) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid '{name}' field: {e}")))
}

pub(crate) async fn find_story<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<story::Model, AppError> {
    story::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Story not found".into()))
}

pub(crate) async fn load_users<C: ConnectionTrait>(
    db: &C,
    ids: Vec<i32>,
) -> Result<HashMap<i32, UserRef>, AppError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let users = user::Entity::find()
        .filter(user::Column::Id.is_in(ids))
        .all(db)
        .await?;
    Ok(users.into_iter().map(|u| (u.id, UserRef::from(u))).collect())
}

async fn load_category_names<C: ConnectionTrait>(
    db: &C,
) -> Result<HashMap<i32, String>, AppError> {
    let categories = category::Entity::find().all(db).await?;
    Ok(categories.into_iter().map(|c| (c.id, c.name)).collect())
}

async fn build_story_response(
    db: &DatabaseConnection,
    story: story::Model,
    viewer: Option<i32>,
) -> Result<StoryResponse, AppError> {
    let author = user::Entity::find_by_id(story.author_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::Internal(format!("Author missing for story {}", story.id)))?;

    let category = match story.category_id {
        Some(category_id) => category::Entity::find_by_id(category_id)
            .one(db)
            .await?
            .map(|c| c.name),
        None => None,
    };

    let like_count = like::Entity::find()
        .filter(like::Column::StoryId.eq(story.id))
        .count(db)
        .await?;

    let liked = match viewer {
        Some(viewer_id) => like::Entity::find_by_id((viewer_id, story.id))
            .one(db)
            .await?
            .is_some(),
        None => false,
    };

    let comments = load_comment_thread(db, story.id).await?;

    Ok(StoryResponse {
        id: story.id,
        title: story.title,
        description: story.description,
        author: UserRef::from(author),
        category,
        file_name: story.file_name,
        content_type: story.content_type,
        file_size: story.file_size,
        liked,
        like_count,
        comments,
        created_at: story.created_at,
    })
}
