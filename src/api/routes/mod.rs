//! API Routes
//!
//! Route handlers organized by functionality.

pub mod announcements;
pub mod chat;
pub mod health;
pub mod render;

use axum::http::HeaderMap;

use crate::api::error::{ApiError, ApiResult};
use crate::chat::Session;
use crate::store::UserId;

/// Header carrying the signed-in user's id, set by the auth proxy
pub const USER_ID_HEADER: &str = "x-user-id";

/// Build the caller's session from request headers.
///
/// A missing or blank header yields an anonymous session.
pub fn session_from_headers(headers: &HeaderMap) -> Session {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| Session::authenticated(UserId::new(v)))
        .unwrap_or_else(Session::anonymous)
}

/// Caller's user id, or 401
pub fn require_user(headers: &HeaderMap) -> ApiResult<UserId> {
    session_from_headers(headers)
        .user_id()
        .cloned()
        .ok_or_else(|| ApiError::Unauthorized(format!("missing {} header", USER_ID_HEADER)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_session_from_headers() {
        let mut headers = HeaderMap::new();
        assert!(session_from_headers(&headers).user_id().is_none());

        headers.insert(USER_ID_HEADER, HeaderValue::from_static("  "));
        assert!(session_from_headers(&headers).user_id().is_none());
        assert!(require_user(&headers).is_err());

        headers.insert(USER_ID_HEADER, HeaderValue::from_static("u-42"));
        assert_eq!(require_user(&headers).unwrap(), UserId::new("u-42"));
    }
}
