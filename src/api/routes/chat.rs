//! Chat Routes
//!
//! - GET /api/v1/chat/messages - Recent messages, rendered for the caller
//! - POST /api/v1/chat/messages - Send a message

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use std::sync::Arc;

use crate::api::dto::{ListMessagesQuery, PostMessageRequest};
use crate::api::error::ApiResult;
use crate::api::routes::session_from_headers;
use crate::api::state::AppState;
use crate::chat::{render_message, send_message, RenderedMessage};

/// GET /api/v1/chat/messages
///
/// Oldest first. Anonymous callers can read; no message is marked as theirs.
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListMessagesQuery>,
) -> ApiResult<Json<Vec<RenderedMessage>>> {
    let session = session_from_headers(&headers);
    let limit = query
        .limit
        .unwrap_or(state.config.message_page_size)
        .clamp(1, state.config.message_page_size.max(1));

    let messages = state.chat.list_messages(limit).await?;

    Ok(Json(
        messages
            .iter()
            .map(|m| render_message(m, session.user_id()))
            .collect(),
    ))
}

/// POST /api/v1/chat/messages
pub async fn post_message(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<PostMessageRequest>,
) -> ApiResult<(StatusCode, Json<RenderedMessage>)> {
    let session = session_from_headers(&headers);
    let stored = send_message(state.chat.as_ref(), &session, &req.content).await?;

    Ok((
        StatusCode::CREATED,
        Json(render_message(&stored, session.user_id())),
    ))
}
