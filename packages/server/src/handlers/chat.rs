use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::*;
use tracing::instrument;

use crate::entity::message;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::handlers::profile::find_user_by_username;
use crate::handlers::story::load_users;
use crate::models::chat::{
    ConversationResponse, InboxEntry, InboxResponse, MessageResponse, SendMessageRequest,
};
use crate::models::shared::{UserRef, validate_body_text};
use crate::state::AppState;

const MAX_MESSAGE_CHARS: usize = 5000;

#[utoipa::path(
    get,
    path = "",
    tag = "Chat",
    operation_id = "inbox",
    summary = "List conversations",
    description = "One entry per conversation partner, carrying the most \
        recent message exchanged with them, newest conversation first.",
    responses(
        (status = 200, description = "Inbox", body = InboxResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn inbox(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<InboxResponse>, AppError> {
    let me = auth_user.user_id;

    // Newest first, then keep the first occurrence of each partner. That
    // gives one entry per conversation, ordered by latest activity.
    let messages = message::Entity::find()
        .filter(
            Condition::any()
                .add(message::Column::SenderId.eq(me))
                .add(message::Column::ReceiverId.eq(me)),
        )
        .order_by_desc(message::Column::SentAt)
        .order_by_desc(message::Column::Id)
        .all(&state.db)
        .await?;

    let mut seen = std::collections::HashSet::new();
    let mut latest = Vec::new();
    for msg in messages {
        let partner_id = if msg.sender_id == me {
            msg.receiver_id
        } else {
            msg.sender_id
        };
        if seen.insert(partner_id) {
            latest.push((partner_id, msg));
        }
    }

    let partners = load_users(
        &state.db,
        latest.iter().map(|(id, _)| *id).collect::<Vec<_>>(),
    )
    .await?;

    let conversations = latest
        .into_iter()
        .map(|(partner_id, msg)| InboxEntry {
            partner: partners.get(&partner_id).cloned().unwrap_or(UserRef {
                id: partner_id,
                username: String::new(),
            }),
            last_message: msg.content,
            last_sent_at: msg.sent_at,
        })
        .collect();

    Ok(Json(InboxResponse { conversations }))
}

#[utoipa::path(
    get,
    path = "/{username}",
    tag = "Chat",
    operation_id = "getConversation",
    summary = "Full conversation with one user",
    description = "All messages exchanged with the named user, oldest first.",
    params(("username" = String, Path, description = "Conversation partner's username")),
    responses(
        (status = 200, description = "Conversation", body = ConversationResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id, partner = %username))]
pub async fn get_conversation(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<ConversationResponse>, AppError> {
    let partner = find_user_by_username(&state.db, &username).await?;
    let me = auth_user.user_id;

    let messages = message::Entity::find()
        .filter(
            Condition::any()
                .add(
                    Condition::all()
                        .add(message::Column::SenderId.eq(me))
                        .add(message::Column::ReceiverId.eq(partner.id)),
                )
                .add(
                    Condition::all()
                        .add(message::Column::SenderId.eq(partner.id))
                        .add(message::Column::ReceiverId.eq(me)),
                ),
        )
        .order_by_asc(message::Column::SentAt)
        .order_by_asc(message::Column::Id)
        .all(&state.db)
        .await?;

    Ok(Json(ConversationResponse {
        partner: UserRef::from(partner),
        messages: messages.into_iter().map(MessageResponse::from).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/{username}",
    tag = "Chat",
    operation_id = "sendMessage",
    summary = "Send a direct message",
    description = "Messaging yourself is rejected.",
    params(("username" = String, Path, description = "Recipient's username")),
    request_body = SendMessageRequest,
    responses(
        (status = 201, description = "Message sent", body = MessageResponse),
        (status = 400, description = "Empty text or self-send (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, recipient = %username))]
pub async fn send_message(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
    AppJson(payload): AppJson<SendMessageRequest>,
) -> Result<impl IntoResponse, AppError> {
    let content = validate_body_text(&payload.content, "Message content", MAX_MESSAGE_CHARS)?;
    let recipient = find_user_by_username(&state.db, &username).await?;

    if recipient.id == auth_user.user_id {
        return Err(AppError::Validation(
            "You cannot message yourself".into(),
        ));
    }

    let new_message = message::ActiveModel {
        sender_id: Set(auth_user.user_id),
        receiver_id: Set(recipient.id),
        content: Set(content),
        sent_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    let message = new_message.insert(&state.db).await?;

    Ok((StatusCode::CREATED, Json(MessageResponse::from(message))))
}
