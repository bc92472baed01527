//! Remote Table Store
//!
//! Abstraction over the hosted backend-as-a-service tables the dashboard
//! reads and writes. Everything persistent lives there; this crate only
//! holds transient snapshots.
//!
//! - [`RestStore`]: PostgREST-style HTTP client
//! - [`MemoryStore`]: in-process tables for local development and tests

mod memory;
mod rest;

pub use memory::MemoryStore;
pub use rest::{RestStore, RestStoreConfig};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Accepts ids stored either as text or as integer columns
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Int(i64),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            RawId::Text(s) => s,
            RawId::Int(n) => n.to_string(),
        }
    }
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                RawId::deserialize(deserializer).map(|raw| Self(raw.into_string()))
            }
        }
    };
}

string_id!(
    /// Identifier of an announcement row
    AnnouncementId
);
string_id!(
    /// Identifier of an authenticated user
    UserId
);
string_id!(
    /// Identifier of a chat message row
    MessageId
);

/// Marks one announcement as read by one user.
///
/// Unique on `(user_id, announcement_id)`; records are never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReadRecord {
    pub user_id: UserId,
    pub announcement_id: AnnouncementId,
}

impl ReadRecord {
    pub fn new(user_id: UserId, announcement_id: AnnouncementId) -> Self {
        Self {
            user_id,
            announcement_id,
        }
    }
}

/// A stored chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub sender_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A chat message ready to be inserted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewChatMessage {
    pub sender_id: UserId,
    pub content: String,
}

/// Announcement tables
#[async_trait]
pub trait AnnouncementStore: Send + Sync {
    /// Ids of every announcement
    async fn list_all(&self) -> StoreResult<Vec<AnnouncementId>>;

    /// Ids of announcements the user has read
    async fn list_read_by_user(&self, user_id: &UserId) -> StoreResult<Vec<AnnouncementId>>;

    /// Insert read records, ignoring ones that already exist
    async fn upsert_reads(&self, records: Vec<ReadRecord>) -> StoreResult<()>;
}

/// Chat message table
#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn insert_message(&self, message: NewChatMessage) -> StoreResult<ChatMessage>;

    /// The most recent `limit` messages, oldest first
    async fn list_messages(&self, limit: usize) -> StoreResult<Vec<ChatMessage>>;
}

/// Errors from the remote store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store unavailable")]
    Unavailable,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Request timeout")]
    Timeout,

    #[error("Rate limited")]
    RateLimited,

    #[error("Invalid response: {0}")]
    Decode(String),
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;
