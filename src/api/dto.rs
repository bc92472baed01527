//! Data Transfer Objects
//!
//! Request and response types for the API endpoints.
//! These types are serialized/deserialized to/from JSON.

use serde::{Deserialize, Serialize};

use crate::content::DisplayUnit;
use crate::store::UserId;

// ============================================
// RENDER DTOs
// ============================================

/// Chat text render request
#[derive(Debug, Deserialize)]
pub struct RenderChatRequest {
    pub content: String,
    /// Author of the message
    #[serde(default)]
    pub sender_id: Option<UserId>,
    /// User the message is rendered for
    #[serde(default)]
    pub viewer_id: Option<UserId>,
}

/// Chat text render response
#[derive(Debug, Serialize, Deserialize)]
pub struct RenderChatResponse {
    pub own: bool,
    pub units: Vec<DisplayUnit>,
}

/// Blog post render request
#[derive(Debug, Deserialize)]
pub struct RenderBlogRequest {
    #[serde(default)]
    pub title: String,
    pub content: String,
    /// Output format: json or html
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_format() -> String {
    "json".to_string()
}

// ============================================
// CHAT DTOs
// ============================================

/// Message list query parameters
#[derive(Debug, Deserialize)]
pub struct ListMessagesQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

/// New chat message
#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub content: String,
}

// ============================================
// ANNOUNCEMENT DTOs
// ============================================

/// Unread announcement count
#[derive(Debug, Serialize, Deserialize)]
pub struct UnreadResponse {
    pub user_id: UserId,
    pub count: usize,
}

/// Mark-all-read result
#[derive(Debug, Serialize, Deserialize)]
pub struct MarkAllReadResponse {
    /// Read records submitted
    pub marked: usize,
    /// Unread count after marking
    pub count: usize,
}

// ============================================
// HEALTH DTOs
// ============================================

/// Full health status
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall status: healthy or degraded
    pub status: String,
    /// Store status: ok or error
    pub store: String,
    /// Users with active unread polling
    pub tracked_users: usize,
    pub uptime_seconds: u64,
    pub version: String,
}
