//! Reconciler Registry
//!
//! Keeps one polling [`UnreadReconciler`] per user seen by the API, so every
//! signed-in user gets the same lifecycle a single dashboard session has.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::reconciler::UnreadReconciler;
use crate::store::{AnnouncementStore, UserId};

/// Release reconcilers not requested for this long
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// Most users polled at once
pub const DEFAULT_MAX_TRACKED_USERS: usize = 1000;

struct Tracked {
    reconciler: Arc<UnreadReconciler>,
    last_seen: Mutex<Instant>,
}

impl Tracked {
    fn touch(&self) {
        *self.last_seen.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    fn last_seen(&self) -> Instant {
        *self.last_seen.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Lazily created reconcilers keyed by user.
///
/// Users not seen for the idle timeout are released by [`evict_idle`],
/// which the sweeper task runs once per timeout. When the cap is reached,
/// the least recently seen user makes room for a new one.
///
/// [`evict_idle`]: ReconcilerRegistry::evict_idle
pub struct ReconcilerRegistry {
    store: Arc<dyn AnnouncementStore>,
    poll_interval: Duration,
    idle_timeout: Duration,
    max_users: usize,
    reconcilers: RwLock<HashMap<UserId, Tracked>>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl ReconcilerRegistry {
    pub fn new(store: Arc<dyn AnnouncementStore>, poll_interval: Duration) -> Self {
        Self {
            store,
            poll_interval,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            max_users: DEFAULT_MAX_TRACKED_USERS,
            reconcilers: RwLock::new(HashMap::new()),
            sweeper: Mutex::new(None),
        }
    }

    /// Set the idle timeout and the cap on tracked users
    pub fn with_limits(mut self, idle_timeout: Duration, max_users: usize) -> Self {
        self.idle_timeout = idle_timeout.max(Duration::from_secs(1));
        self.max_users = max_users.max(1);
        self
    }

    /// Get the reconciler for `user_id`, creating and activating it on first use
    pub async fn get_or_activate(&self, user_id: &UserId) -> Arc<UnreadReconciler> {
        if let Some(existing) = self.reconcilers.read().await.get(user_id) {
            existing.touch();
            return Arc::clone(&existing.reconciler);
        }

        let mut reconcilers = self.reconcilers.write().await;
        // Another request may have won the race for the write lock
        if let Some(existing) = reconcilers.get(user_id) {
            existing.touch();
            return Arc::clone(&existing.reconciler);
        }

        let mut evicted = Vec::new();
        if reconcilers.len() >= self.max_users {
            evicted = self.drain_idle(&mut reconcilers);
        }
        if reconcilers.len() >= self.max_users {
            let oldest = reconcilers
                .iter()
                .min_by_key(|(_, tracked)| tracked.last_seen())
                .map(|(id, _)| id.clone());
            if let Some(oldest) = oldest.and_then(|id| reconcilers.remove_entry(&id)) {
                tracing::warn!(user = %oldest.0, cap = self.max_users, "Unread tracking full, releasing least recent user");
                evicted.push(oldest);
            }
        }

        let reconciler = Arc::new(UnreadReconciler::new(
            Arc::clone(&self.store),
            self.poll_interval,
        ));
        reconciler.activate(user_id.clone()).await;
        reconcilers.insert(
            user_id.clone(),
            Tracked {
                reconciler: Arc::clone(&reconciler),
                last_seen: Mutex::new(Instant::now()),
            },
        );

        tracing::info!(user = %user_id, active = reconcilers.len(), "Activated unread tracking");
        drop(reconcilers);

        for (_, tracked) in evicted {
            tracked.reconciler.deactivate().await;
        }
        reconciler
    }

    /// Stop tracking a user. Returns false if the user was not tracked.
    pub async fn release(&self, user_id: &UserId) -> bool {
        let removed = self.reconcilers.write().await.remove(user_id);
        match removed {
            Some(tracked) => {
                tracked.reconciler.deactivate().await;
                tracing::info!(user = %user_id, "Released unread tracking");
                true
            }
            None => false,
        }
    }

    /// Release every user not seen within the idle timeout. Returns how many
    /// were released.
    pub async fn evict_idle(&self) -> usize {
        let evicted = {
            let mut reconcilers = self.reconcilers.write().await;
            self.drain_idle(&mut reconcilers)
        };

        for (user_id, tracked) in &evicted {
            tracked.reconciler.deactivate().await;
            tracing::debug!(user = %user_id, "Released idle unread tracking");
        }
        if !evicted.is_empty() {
            tracing::info!(released = evicted.len(), "Evicted idle unread tracking");
        }
        evicted.len()
    }

    fn drain_idle(&self, reconcilers: &mut HashMap<UserId, Tracked>) -> Vec<(UserId, Tracked)> {
        let idle: Vec<UserId> = reconcilers
            .iter()
            .filter(|(_, tracked)| tracked.last_seen().elapsed() > self.idle_timeout)
            .map(|(id, _)| id.clone())
            .collect();

        idle.into_iter()
            .filter_map(|id| reconcilers.remove_entry(&id))
            .collect()
    }

    /// Run [`evict_idle`](Self::evict_idle) once per idle timeout until
    /// shutdown or drop
    pub fn spawn_sweeper(self: &Arc<Self>) {
        let registry: Weak<Self> = Arc::downgrade(self);
        let period = self.idle_timeout;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            loop {
                ticker.tick().await;
                let Some(registry) = registry.upgrade() else {
                    break;
                };
                registry.evict_idle().await;
            }
        });

        let mut sweeper = self.sweeper.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(old) = sweeper.replace(handle) {
            old.abort();
        }
    }

    pub async fn active_count(&self) -> usize {
        self.reconcilers.read().await.len()
    }

    /// Stop the sweeper and deactivate every reconciler
    pub async fn shutdown(&self) {
        self.stop_sweeper();
        let drained: Vec<_> = self.reconcilers.write().await.drain().collect();
        for (_, tracked) in &drained {
            tracked.reconciler.deactivate().await;
        }
        tracing::info!(released = drained.len(), "Unread tracking shut down");
    }

    fn stop_sweeper(&self) {
        let handle = self
            .sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}

impl Drop for ReconcilerRegistry {
    fn drop(&mut self) {
        self.stop_sweeper();
    }
}
