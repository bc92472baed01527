//! In-memory store
//!
//! Tables held in process. Used when no hosted backend is configured and as
//! the test double for everything that talks to a store.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use tokio::sync::RwLock;

use super::*;

/// In-process announcement, read-record and message tables
#[derive(Default)]
pub struct MemoryStore {
    announcements: RwLock<Vec<AnnouncementId>>,
    reads: RwLock<BTreeSet<ReadRecord>>,
    messages: RwLock<Vec<ChatMessage>>,
    next_message_id: AtomicU64,
    pending_failures: AtomicU32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with announcement ids
    pub fn with_announcements<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            announcements: RwLock::new(ids.into_iter().map(AnnouncementId::new).collect()),
            ..Self::default()
        }
    }

    pub async fn add_announcement(&self, id: impl Into<String>) -> AnnouncementId {
        let id = AnnouncementId::new(id);
        self.announcements.write().await.push(id.clone());
        id
    }

    /// All read records held for a user
    pub async fn reads_for(&self, user_id: &UserId) -> Vec<ReadRecord> {
        self.reads
            .read()
            .await
            .iter()
            .filter(|r| &r.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Make the next `count` store calls fail with [`StoreError::Unavailable`]
    pub fn fail_next(&self, count: u32) {
        self.pending_failures.store(count, Ordering::SeqCst);
    }

    fn check_failure(&self) -> StoreResult<()> {
        let injected = self
            .pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            Err(StoreError::Unavailable)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl AnnouncementStore for MemoryStore {
    async fn list_all(&self) -> StoreResult<Vec<AnnouncementId>> {
        self.check_failure()?;
        Ok(self.announcements.read().await.clone())
    }

    async fn list_read_by_user(&self, user_id: &UserId) -> StoreResult<Vec<AnnouncementId>> {
        self.check_failure()?;
        Ok(self
            .reads
            .read()
            .await
            .iter()
            .filter(|r| &r.user_id == user_id)
            .map(|r| r.announcement_id.clone())
            .collect())
    }

    async fn upsert_reads(&self, records: Vec<ReadRecord>) -> StoreResult<()> {
        self.check_failure()?;
        self.reads.write().await.extend(records);
        Ok(())
    }
}

#[async_trait]
impl ChatStore for MemoryStore {
    async fn insert_message(&self, message: NewChatMessage) -> StoreResult<ChatMessage> {
        self.check_failure()?;
        let id = self.next_message_id.fetch_add(1, Ordering::SeqCst) + 1;
        let stored = ChatMessage {
            id: MessageId::new(id.to_string()),
            sender_id: message.sender_id,
            content: message.content,
            created_at: Utc::now(),
        };
        self.messages.write().await.push(stored.clone());
        Ok(stored)
    }

    async fn list_messages(&self, limit: usize) -> StoreResult<Vec<ChatMessage>> {
        self.check_failure()?;
        let messages = self.messages.read().await;
        let skip = messages.len().saturating_sub(limit);
        Ok(messages[skip..].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_ignores_duplicates() {
        let store = MemoryStore::with_announcements(["1", "2"]);
        let user = UserId::new("u1");
        let records = vec![
            ReadRecord::new(user.clone(), AnnouncementId::new("1")),
            ReadRecord::new(user.clone(), AnnouncementId::new("1")),
        ];

        store.upsert_reads(records.clone()).await.unwrap();
        store.upsert_reads(records).await.unwrap();

        assert_eq!(store.reads_for(&user).await.len(), 1);
        assert_eq!(
            store.list_read_by_user(&user).await.unwrap(),
            vec![AnnouncementId::new("1")]
        );
    }

    #[tokio::test]
    async fn test_reads_are_per_user() {
        let store = MemoryStore::with_announcements(["1"]);
        store
            .upsert_reads(vec![ReadRecord::new(UserId::new("a"), AnnouncementId::new("1"))])
            .await
            .unwrap();

        assert!(store
            .list_read_by_user(&UserId::new("b"))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_fail_next() {
        let store = MemoryStore::with_announcements(["1"]);
        store.fail_next(1);

        assert!(matches!(store.list_all().await, Err(StoreError::Unavailable)));
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_messages_keeps_latest() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store
                .insert_message(NewChatMessage {
                    sender_id: UserId::new("u1"),
                    content: format!("msg {}", i),
                })
                .await
                .unwrap();
        }

        let latest = store.list_messages(2).await.unwrap();
        let contents: Vec<_> = latest.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["msg 3", "msg 4"]);
        assert_eq!(latest[1].id, MessageId::new("5"));
    }
}
