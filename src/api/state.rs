//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use std::sync::Arc;
use std::time::Instant;

use crate::announcements::ReconcilerRegistry;
use crate::config::{ApiConfig, NotificationsConfig};
use crate::store::{AnnouncementStore, ChatStore};

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Announcement tables, read for unread counts and health checks
    pub announcements: Arc<dyn AnnouncementStore>,
    /// Chat message table
    pub chat: Arc<dyn ChatStore>,
    /// Per-user unread reconcilers
    pub unread: Arc<ReconcilerRegistry>,
    /// API configuration
    pub config: Arc<ApiConfig>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    /// Create state backed by a single store serving every table
    pub fn new<S>(store: Arc<S>, config: ApiConfig, notifications: &NotificationsConfig) -> Self
    where
        S: AnnouncementStore + ChatStore + 'static,
    {
        let announcements: Arc<dyn AnnouncementStore> = store.clone();
        let unread = ReconcilerRegistry::new(
            Arc::clone(&announcements),
            notifications.poll_interval(),
        )
        .with_limits(
            notifications.idle_timeout(),
            notifications.max_tracked_users,
        );
        Self {
            unread: Arc::new(unread),
            announcements,
            chat: store,
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
