use std::collections::HashMap;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{comment, reply};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::comment::{CommentRequest, CommentResponse, ReplyResponse};
use crate::models::shared::{UserRef, validate_body_text};
use crate::state::AppState;

const MAX_COMMENT_CHARS: usize = 2000;

#[utoipa::path(
    post,
    path = "/stories/{story_id}/comments",
    tag = "Comments",
    operation_id = "addComment",
    summary = "Comment on a story",
    params(("story_id" = i32, Path, description = "Story ID")),
    request_body = CommentRequest,
    responses(
        (status = 201, description = "Comment created", body = CommentResponse),
        (status = 400, description = "Empty text (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Story not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, story_id))]
pub async fn add_comment(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(story_id): Path<i32>,
    AppJson(payload): AppJson<CommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let text = validate_body_text(&payload.text, "Comment text", MAX_COMMENT_CHARS)?;
    let story = super::story::find_story(&state.db, story_id).await?;

    let new_comment = comment::ActiveModel {
        user_id: Set(auth_user.user_id),
        story_id: Set(story.id),
        text: Set(text),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    let comment = new_comment.insert(&state.db).await?;

    let response = CommentResponse {
        id: comment.id,
        story_id: comment.story_id,
        user: UserRef {
            id: auth_user.user_id,
            username: auth_user.username,
        },
        text: comment.text,
        replies: Vec::new(),
        created_at: comment.created_at,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    patch,
    path = "/comments/{id}",
    tag = "Comments",
    operation_id = "updateComment",
    summary = "Edit a comment",
    params(("id" = i32, Path, description = "Comment ID")),
    request_body = CommentRequest,
    responses(
        (status = 200, description = "Updated comment", body = CommentResponse),
        (status = 400, description = "Empty text (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the comment's author (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Comment not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, comment_id = id))]
pub async fn update_comment(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<CommentRequest>,
) -> Result<Json<CommentResponse>, AppError> {
    let text = validate_body_text(&payload.text, "Comment text", MAX_COMMENT_CHARS)?;
    let comment = find_comment(&state.db, id).await?;
    auth_user.require_owner(comment.user_id)?;

    let mut active: comment::ActiveModel = comment.into();
    active.text = Set(text);
    let comment = active.update(&state.db).await?;

    let replies = load_replies(&state.db, vec![comment.id]).await?;
    let response = CommentResponse {
        id: comment.id,
        story_id: comment.story_id,
        user: UserRef {
            id: auth_user.user_id,
            username: auth_user.username,
        },
        text: comment.text,
        replies: replies.into_iter().flat_map(|(_, r)| r).collect(),
        created_at: comment.created_at,
    };
    Ok(Json(response))
}

#[utoipa::path(
    delete,
    path = "/comments/{id}",
    tag = "Comments",
    operation_id = "deleteComment",
    summary = "Delete a comment and its replies",
    params(("id" = i32, Path, description = "Comment ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the comment's author (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Comment not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id, comment_id = id))]
pub async fn delete_comment(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let comment = find_comment(&state.db, id).await?;
    auth_user.require_owner(comment.user_id)?;

    let txn = state.db.begin().await?;
    reply::Entity::delete_many()
        .filter(reply::Column::CommentId.eq(comment.id))
        .exec(&txn)
        .await?;
    comment::Entity::delete_by_id(comment.id).exec(&txn).await?;
    txn.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/comments/{comment_id}/replies",
    tag = "Comments",
    operation_id = "addReply",
    summary = "Reply to a comment",
    description = "Replies are one level deep; a reply cannot be replied to.",
    params(("comment_id" = i32, Path, description = "Comment ID")),
    request_body = CommentRequest,
    responses(
        (status = 201, description = "Reply created", body = ReplyResponse),
        (status = 400, description = "Empty text (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Comment not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, comment_id))]
pub async fn add_reply(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(comment_id): Path<i32>,
    AppJson(payload): AppJson<CommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let text = validate_body_text(&payload.text, "Reply text", MAX_COMMENT_CHARS)?;
    let comment = find_comment(&state.db, comment_id).await?;

    let new_reply = reply::ActiveModel {
        comment_id: Set(comment.id),
        user_id: Set(auth_user.user_id),
        text: Set(text),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    let reply = new_reply.insert(&state.db).await?;

    let response = ReplyResponse {
        id: reply.id,
        comment_id: reply.comment_id,
        user: UserRef {
            id: auth_user.user_id,
            username: auth_user.username,
        },
        text: reply.text,
        created_at: reply.created_at,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    patch,
    path = "/replies/{id}",
    tag = "Comments",
    operation_id = "updateReply",
    summary = "Edit a reply",
    params(("id" = i32, Path, description = "Reply ID")),
    request_body = CommentRequest,
    responses(
        (status = 200, description = "Updated reply", body = ReplyResponse),
        (status = 400, description = "Empty text (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the reply's author (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Reply not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, reply_id = id))]
pub async fn update_reply(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<CommentRequest>,
) -> Result<Json<ReplyResponse>, AppError> {
    let text = validate_body_text(&payload.text, "Reply text", MAX_COMMENT_CHARS)?;
    let reply = find_reply(&state.db, id).await?;
    auth_user.require_owner(reply.user_id)?;

    let mut active: reply::ActiveModel = reply.into();
    active.text = Set(text);
    let reply = active.update(&state.db).await?;

    let response = ReplyResponse {
        id: reply.id,
        comment_id: reply.comment_id,
        user: UserRef {
            id: auth_user.user_id,
            username: auth_user.username,
        },
        text: reply.text,
        created_at: reply.created_at,
    };
    Ok(Json(response))
}

#[utoipa::path(
    delete,
    path = "/replies/{id}",
    tag = "Comments",
    operation_id = "deleteReply",
    summary = "Delete a reply",
    params(("id" = i32, Path, description = "Reply ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the reply's author (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Reply not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id, reply_id = id))]
pub async fn delete_reply(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let reply = find_reply(&state.db, id).await?;
    auth_user.require_owner(reply.user_id)?;

    reply::Entity::delete_by_id(reply.id).exec(&state.db).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn find_comment<C: ConnectionTrait>(db: &C, id: i32) -> Result<comment::Model, AppError> {
    comment::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Comment not found".into()))
}

async fn find_reply<C: ConnectionTrait>(db: &C, id: i32) -> Result<reply::Model, AppError> {
    reply::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Reply not found".into()))
}

/// Replies for a set of comments, grouped by comment and ordered oldest-first.
async fn load_replies<C: ConnectionTrait>(
    db: &C,
    comment_ids: Vec<i32>,
) -> Result<HashMap<i32, Vec<ReplyResponse>>, AppError> {
    if comment_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let replies = reply::Entity::find()
        .filter(reply::Column::CommentId.is_in(comment_ids))
        .order_by_asc(reply::Column::CreatedAt)
        .order_by_asc(reply::Column::Id)
        .all(db)
        .await?;

    let users =
        super::story::load_users(db, replies.iter().map(|r| r.user_id).collect::<Vec<_>>()).await?;

    let mut grouped: HashMap<i32, Vec<ReplyResponse>> = HashMap::new();
    for reply in replies {
        let user = users.get(&reply.user_id).cloned().unwrap_or(UserRef {
            id: reply.user_id,
            username: String::new(),
        });
        grouped.entry(reply.comment_id).or_default().push(ReplyResponse {
            id: reply.id,
            comment_id: reply.comment_id,
            user,
            text: reply.text,
            created_at: reply.created_at,
        });
    }
    Ok(grouped)
}

/// A story's full comment thread: comments newest-first, each carrying
/// its replies oldest-first.
pub(crate) async fn load_comment_thread<C: ConnectionTrait>(
    db: &C,
    story_id: i32,
) -> Result<Vec<CommentResponse>, AppError> {
    let comments = comment::Entity::find()
        .filter(comment::Column::StoryId.eq(story_id))
        .order_by_desc(comment::Column::CreatedAt)
        .order_by_desc(comment::Column::Id)
        .all(db)
        .await?;

    let mut replies = load_replies(db, comments.iter().map(|c| c.id).collect()).await?;
    let users =
        super::story::load_users(db, comments.iter().map(|c| c.user_id).collect::<Vec<_>>())
            .await?;

    Ok(comments
        .into_iter()
        .map(|c| {
            let user = users.get(&c.user_id).cloned().unwrap_or(UserRef {
                id: c.user_id,
                username: String::new(),
            });
            CommentResponse {
                id: c.id,
                story_id: c.story_id,
                user,
                text: c.text,
                replies: replies.remove(&c.id).unwrap_or_default(),
                created_at: c.created_at,
            }
        })
        .collect())
}
