//! Announcement Routes
//!
//! Unread badge for the caller. The first request for a user starts that
//! user's reconciler; it keeps polling until released.
//!
//! - GET /api/v1/announcements/unread
//! - POST /api/v1/announcements/read-all
//! - DELETE /api/v1/announcements/tracking

use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};
use std::sync::Arc;

use crate::announcements::UnreadState;
use crate::api::dto::{MarkAllReadResponse, UnreadResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::routes::require_user;
use crate::api::state::AppState;

/// GET /api/v1/announcements/unread
///
/// Returns the latest published count. While the reconciler is still
/// loading, a recompute is awaited so the first response carries a number.
pub async fn get_unread(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<UnreadResponse>> {
    let user_id = require_user(&headers)?;
    let reconciler = state.unread.get_or_activate(&user_id).await;

    let count = match reconciler.state() {
        UnreadState::Count(n) => n,
        UnreadState::Loading => reconciler.recompute().await,
    };

    Ok(Json(UnreadResponse { user_id, count }))
}

/// POST /api/v1/announcements/read-all
///
/// Marks every announcement read for the caller. The badge only drops to
/// zero once the store confirms the write.
pub async fn read_all(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<MarkAllReadResponse>> {
    let user_id = require_user(&headers)?;
    let reconciler = state.unread.get_or_activate(&user_id).await;

    let marked = reconciler.mark_all_read().await?;

    Ok(Json(MarkAllReadResponse {
        marked,
        count: reconciler.state().count().unwrap_or(0),
    }))
}

/// DELETE /api/v1/announcements/tracking
///
/// Stops polling for the caller, e.g. on sign-out.
pub async fn stop_tracking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<StatusCode> {
    let user_id = require_user(&headers)?;

    if state.unread.release(&user_id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!(
            "No unread tracking for user {}",
            user_id
        )))
    }
}
