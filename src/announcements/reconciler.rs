//! Unread Reconciler
//!
//! Derives the unread-announcement count for one user from two remote id
//! sets and keeps it fresh by polling. The count is published through a
//! `watch` channel so indicators can subscribe to it.
//!
//! Read failures degrade to a zero count and are only logged. Recomputes are
//! independent tasks: a slow fetch never holds back the next tick, and
//! whichever recompute finishes last wins.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::ReconcileError;
use crate::store::{AnnouncementStore, ReadRecord, StoreResult, UserId};

/// Default time between recomputes
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Shortest accepted poll interval; `tokio::time::interval` rejects zero
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Observable unread state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnreadState {
    /// No recompute has resolved yet for the active user
    Loading,
    Count(usize),
}

impl UnreadState {
    pub fn count(&self) -> Option<usize> {
        match self {
            UnreadState::Loading => None,
            UnreadState::Count(n) => Some(*n),
        }
    }
}

#[derive(Debug, Clone)]
struct ActiveUser {
    user_id: UserId,
    generation: u64,
}

/// Polled unread-announcement counter for a single user at a time
pub struct UnreadReconciler {
    store: Arc<dyn AnnouncementStore>,
    poll_interval: Duration,
    active: RwLock<Option<ActiveUser>>,
    generation: AtomicU64,
    state: watch::Sender<UnreadState>,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl UnreadReconciler {
    /// Intervals below [`MIN_POLL_INTERVAL`] are raised to it.
    pub fn new(store: Arc<dyn AnnouncementStore>, poll_interval: Duration) -> Self {
        let (state, _) = watch::channel(UnreadState::Loading);
        Self {
            store,
            poll_interval: poll_interval.max(MIN_POLL_INTERVAL),
            active: RwLock::new(None),
            generation: AtomicU64::new(0),
            state,
            poller: Mutex::new(None),
        }
    }

    pub fn with_default_interval(store: Arc<dyn AnnouncementStore>) -> Self {
        Self::new(store, DEFAULT_POLL_INTERVAL)
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Current state
    pub fn state(&self) -> UnreadState {
        *self.state.borrow()
    }

    /// Subscribe to state changes
    pub fn subscribe(&self) -> watch::Receiver<UnreadState> {
        self.state.subscribe()
    }

    pub async fn active_user(&self) -> Option<UserId> {
        self.active.read().await.as_ref().map(|a| a.user_id.clone())
    }

    pub fn is_polling(&self) -> bool {
        self.lock_poller()
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Start tracking `user_id`.
    ///
    /// Replaces any running poll, then recomputes immediately and every
    /// poll interval after that. Concurrent calls leave exactly one poll
    /// task: the one belonging to the latest activation.
    pub async fn activate(self: &Arc<Self>, user_id: UserId) {
        let generation = {
            let mut active = self.active.write().await;
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            let previous = active.replace(ActiveUser {
                user_id: user_id.clone(),
                generation,
            });
            if previous.map(|p| p.user_id) != Some(user_id.clone()) {
                self.state.send_replace(UnreadState::Loading);
            }
            generation
        };

        tracing::debug!(user = %user_id, interval_ms = self.poll_interval.as_millis() as u64, "Starting unread poll");

        let reconciler = Arc::downgrade(self);
        let interval = self.poll_interval;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                let Some(reconciler) = reconciler.upgrade() else {
                    break;
                };
                tokio::spawn(async move {
                    reconciler.recompute().await;
                });
            }
        });

        let mut poller = self.lock_poller();
        if self.generation.load(Ordering::SeqCst) != generation {
            // A later activate or deactivate already owns the slot
            handle.abort();
        } else if let Some(old) = poller.replace(handle) {
            old.abort();
        }
    }

    /// Stop polling and forget the active user.
    ///
    /// Fetches already in flight run to completion but their results are
    /// discarded.
    pub async fn deactivate(&self) {
        {
            let mut active = self.active.write().await;
            self.generation.fetch_add(1, Ordering::SeqCst);
            if let Some(previous) = active.take() {
                tracing::debug!(user = %previous.user_id, "Stopped unread poll");
            }
        }
        self.stop_polling();
        self.state.send_replace(UnreadState::Loading);
    }

    fn lock_poller(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.poller.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn stop_polling(&self) {
        if let Some(handle) = self.lock_poller().take() {
            handle.abort();
        }
    }

    /// Recompute the unread count for the active user.
    ///
    /// Store failures publish a zero count instead of an error. Returns 0
    /// without touching state when no user is active.
    pub async fn recompute(&self) -> usize {
        let Some(active) = self.active.read().await.clone() else {
            tracing::debug!("Unread recompute skipped, no active user");
            return 0;
        };

        let count = match self.fetch_unread(&active.user_id).await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(user = %active.user_id, error = %e, "Unread recompute failed, showing zero");
                0
            }
        };

        self.publish_if_current(active.generation, UnreadState::Count(count))
            .await;
        count
    }

    async fn fetch_unread(&self, user_id: &UserId) -> StoreResult<usize> {
        let all: HashSet<_> = self.store.list_all().await?.into_iter().collect();
        let read: HashSet<_> = self
            .store
            .list_read_by_user(user_id)
            .await?
            .into_iter()
            .collect();

        Ok(all.difference(&read).count())
    }

    /// Mark every announcement read for the active user.
    ///
    /// The zero count is published only after both the listing and the
    /// upsert succeed. On failure the error is logged, returned, and the
    /// current count is left as is. Returns the number of records submitted.
    pub async fn mark_all_read(&self) -> Result<usize, ReconcileError> {
        let active = self
            .active
            .read()
            .await
            .clone()
            .ok_or(ReconcileError::NotActive)?;

        match self.submit_all_read(&active.user_id).await {
            Ok(submitted) => {
                self.publish_if_current(active.generation, UnreadState::Count(0))
                    .await;
                tracing::info!(user = %active.user_id, submitted, "Marked all announcements read");
                Ok(submitted)
            }
            Err(e) => {
                tracing::error!(user = %active.user_id, error = %e, "Mark all read failed");
                Err(e.into())
            }
        }
    }

    async fn submit_all_read(&self, user_id: &UserId) -> StoreResult<usize> {
        let ids: HashSet<_> = self.store.list_all().await?.into_iter().collect();
        if ids.is_empty() {
            return Ok(0);
        }

        let records: Vec<_> = ids
            .into_iter()
            .map(|id| ReadRecord::new(user_id.clone(), id))
            .collect();
        let submitted = records.len();
        self.store.upsert_reads(records).await?;
        Ok(submitted)
    }

    async fn publish_if_current(&self, generation: u64, state: UnreadState) {
        let current = self.active.read().await.as_ref().map(|a| a.generation);
        if current == Some(generation) {
            self.state.send_replace(state);
        } else {
            tracing::debug!(generation, "Discarding unread result for inactive user");
        }
    }
}

impl Drop for UnreadReconciler {
    fn drop(&mut self) {
        self.stop_polling();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{AnnouncementId, MemoryStore, StoreError};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    /// Wraps a store, counting listings. With `hold_first` set, the first
    /// listing waits until the gate is notified.
    struct CountingStore {
        inner: MemoryStore,
        list_calls: AtomicUsize,
        hold_first: Option<Notify>,
        read_users: Mutex<Vec<UserId>>,
    }

    impl CountingStore {
        fn new(inner: MemoryStore) -> Self {
            Self {
                inner,
                list_calls: AtomicUsize::new(0),
                hold_first: None,
                read_users: Mutex::new(Vec::new()),
            }
        }

        fn holding_first(inner: MemoryStore) -> Self {
            Self {
                hold_first: Some(Notify::new()),
                ..Self::new(inner)
            }
        }

        fn release_first(&self) {
            if let Some(gate) = &self.hold_first {
                gate.notify_one();
            }
        }

        fn calls(&self) -> usize {
            self.list_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AnnouncementStore for CountingStore {
        async fn list_all(&self) -> StoreResult<Vec<AnnouncementId>> {
            let call = self.list_calls.fetch_add(1, Ordering::SeqCst);
            if let (Some(gate), 0) = (&self.hold_first, call) {
                gate.notified().await;
            }
            self.inner.list_all().await
        }

        async fn list_read_by_user(&self, user_id: &UserId) -> StoreResult<Vec<AnnouncementId>> {
            self.read_users.lock().unwrap().push(user_id.clone());
            self.inner.list_read_by_user(user_id).await
        }

        async fn upsert_reads(&self, records: Vec<ReadRecord>) -> Result<(), StoreError> {
            self.inner.upsert_reads(records).await
        }
    }

    fn user(id: &str) -> UserId {
        UserId::new(id)
    }

    async fn seeded(user_id: &UserId) -> MemoryStore {
        let store = MemoryStore::with_announcements(["1", "2", "3"]);
        store
            .upsert_reads(vec![ReadRecord::new(
                user_id.clone(),
                AnnouncementId::new("2"),
            )])
            .await
            .unwrap();
        store
    }

    async fn active_reconciler(
        store: Arc<dyn AnnouncementStore>,
        user_id: &UserId,
    ) -> Arc<UnreadReconciler> {
        let reconciler = Arc::new(UnreadReconciler::with_default_interval(store));
        *reconciler.active.write().await = Some(ActiveUser {
            user_id: user_id.clone(),
            generation: 0,
        });
        reconciler
    }

    #[tokio::test]
    async fn test_recompute_counts_difference() {
        let alice = user("alice");
        let store = Arc::new(seeded(&alice).await);
        let reconciler = active_reconciler(store, &alice).await;

        assert_eq!(reconciler.state(), UnreadState::Loading);
        assert_eq!(reconciler.recompute().await, 2);
        assert_eq!(reconciler.state(), UnreadState::Count(2));
    }

    #[tokio::test]
    async fn test_recompute_ignores_duplicate_and_unknown_ids() {
        let alice = user("alice");
        let store = Arc::new(MemoryStore::with_announcements(["1", "1", "2"]));
        store
            .upsert_reads(vec![ReadRecord::new(alice.clone(), AnnouncementId::new("gone"))])
            .await
            .unwrap();
        let reconciler = active_reconciler(store, &alice).await;

        assert_eq!(reconciler.recompute().await, 2);
    }

    #[tokio::test]
    async fn test_recompute_without_user_is_noop() {
        let store = Arc::new(MemoryStore::with_announcements(["1"]));
        let reconciler = UnreadReconciler::with_default_interval(store);

        assert_eq!(reconciler.recompute().await, 0);
        assert_eq!(reconciler.state(), UnreadState::Loading);
    }

    #[tokio::test]
    async fn test_recompute_failure_resets_to_zero() {
        let alice = user("alice");
        let store = Arc::new(seeded(&alice).await);
        let reconciler = active_reconciler(store.clone(), &alice).await;

        assert_eq!(reconciler.recompute().await, 2);
        store.fail_next(1);
        assert_eq!(reconciler.recompute().await, 0);
        assert_eq!(reconciler.state(), UnreadState::Count(0));
    }

    #[tokio::test]
    async fn test_mark_all_read_then_recompute() {
        let alice = user("alice");
        let store = Arc::new(seeded(&alice).await);
        let reconciler = active_reconciler(store.clone(), &alice).await;
        reconciler.recompute().await;

        assert_eq!(reconciler.mark_all_read().await.unwrap(), 3);
        assert_eq!(reconciler.state(), UnreadState::Count(0));
        assert_eq!(reconciler.recompute().await, 0);
    }

    #[tokio::test]
    async fn test_mark_all_read_is_idempotent() {
        let alice = user("alice");
        let store = Arc::new(seeded(&alice).await);
        let reconciler = active_reconciler(store.clone(), &alice).await;

        reconciler.mark_all_read().await.unwrap();
        reconciler.mark_all_read().await.unwrap();

        assert_eq!(store.reads_for(&alice).await.len(), 3);
        assert_eq!(reconciler.state(), UnreadState::Count(0));
        assert_eq!(reconciler.recompute().await, 0);
    }

    #[tokio::test]
    async fn test_mark_all_read_failure_keeps_count() {
        let alice = user("alice");
        let store = Arc::new(seeded(&alice).await);
        let reconciler = active_reconciler(store.clone(), &alice).await;
        reconciler.recompute().await;

        store.fail_next(1);
        let result = reconciler.mark_all_read().await;

        assert!(matches!(result, Err(ReconcileError::Store(StoreError::Unavailable))));
        assert_eq!(reconciler.state(), UnreadState::Count(2));
        assert_eq!(store.reads_for(&alice).await.len(), 1);
    }

    #[tokio::test]
    async fn test_mark_all_read_requires_user() {
        let store = Arc::new(MemoryStore::with_announcements(["1"]));
        let reconciler = UnreadReconciler::with_default_interval(store);

        assert!(matches!(
            reconciler.mark_all_read().await,
            Err(ReconcileError::NotActive)
        ));
    }

    #[tokio::test]
    async fn test_mark_all_read_with_no_announcements() {
        let alice = user("alice");
        let store = Arc::new(MemoryStore::new());
        let reconciler = active_reconciler(store, &alice).await;

        assert_eq!(reconciler.mark_all_read().await.unwrap(), 0);
        assert_eq!(reconciler.state(), UnreadState::Count(0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_activate_polls_immediately_then_on_interval() {
        let alice = user("alice");
        let store = Arc::new(CountingStore::new(seeded(&alice).await));
        let reconciler = Arc::new(UnreadReconciler::with_default_interval(store.clone()));
        let mut rx = reconciler.subscribe();

        reconciler.activate(alice.clone()).await;
        rx.wait_for(|s| *s == UnreadState::Count(2)).await.unwrap();
        assert_eq!(store.calls(), 1);
        assert!(reconciler.is_polling());

        tokio::time::sleep(Duration::from_millis(30_500)).await;
        assert_eq!(store.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reactivate_keeps_single_poller() {
        let alice = user("alice");
        let bob = user("bob");
        let store = Arc::new(CountingStore::new(seeded(&alice).await));
        let reconciler = Arc::new(UnreadReconciler::with_default_interval(store.clone()));
        let mut rx = reconciler.subscribe();

        reconciler.activate(alice.clone()).await;
        rx.wait_for(|s| *s == UnreadState::Count(2)).await.unwrap();

        reconciler.activate(bob.clone()).await;
        assert_eq!(reconciler.state(), UnreadState::Loading);
        rx.wait_for(|s| *s == UnreadState::Count(3)).await.unwrap();
        let baseline = store.calls();

        tokio::time::sleep(Duration::from_millis(30_500)).await;
        assert_eq!(store.calls(), baseline + 3);
        assert_eq!(store.read_users.lock().unwrap().last(), Some(&bob));
        assert_eq!(reconciler.active_user().await, Some(bob));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deactivate_stops_polling() {
        let alice = user("alice");
        let store = Arc::new(CountingStore::new(seeded(&alice).await));
        let reconciler = Arc::new(UnreadReconciler::with_default_interval(store.clone()));
        let mut rx = reconciler.subscribe();

        reconciler.activate(alice).await;
        rx.wait_for(|s| *s == UnreadState::Count(2)).await.unwrap();
        reconciler.deactivate().await;
        let baseline = store.calls();

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(store.calls(), baseline);
        assert!(!reconciler.is_polling());
        assert_eq!(reconciler.state(), UnreadState::Loading);
        assert_eq!(reconciler.active_user().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_fetch_does_not_block_ticks() {
        let alice = user("alice");
        let store = Arc::new(CountingStore::holding_first(seeded(&alice).await));
        let reconciler = Arc::new(UnreadReconciler::with_default_interval(store.clone()));

        reconciler.activate(alice).await;
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(store.calls(), 1);
        assert_eq!(reconciler.state(), UnreadState::Loading);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(store.calls(), 2);
        assert_eq!(reconciler.state(), UnreadState::Count(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_ends_poll_task() {
        let alice = user("alice");
        let store = Arc::new(CountingStore::new(seeded(&alice).await));
        let reconciler = Arc::new(UnreadReconciler::with_default_interval(store.clone()));
        let mut rx = reconciler.subscribe();

        reconciler.activate(alice).await;
        rx.wait_for(|s| matches!(s, UnreadState::Count(_))).await.unwrap();
        drop(reconciler);
        let baseline = store.calls();

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(store.calls(), baseline);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_activate_keeps_single_poller() {
        let alice = user("alice");
        let store = Arc::new(CountingStore::new(seeded(&alice).await));
        let reconciler = Arc::new(UnreadReconciler::with_default_interval(store.clone()));

        // Park both activations on the user lock so they overlap
        let guard = reconciler.active.read().await;
        let first = tokio::spawn({
            let reconciler = Arc::clone(&reconciler);
            let alice = alice.clone();
            async move { reconciler.activate(alice).await }
        });
        let second = tokio::spawn({
            let reconciler = Arc::clone(&reconciler);
            let alice = alice.clone();
            async move { reconciler.activate(alice).await }
        });
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }
        drop(guard);
        first.await.unwrap();
        second.await.unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        let baseline = store.calls();
        assert!(reconciler.is_polling());

        tokio::time::sleep(Duration::from_millis(30_000)).await;
        assert_eq!(store.calls(), baseline + 3);

        reconciler.deactivate().await;
        let stopped = store.calls();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(store.calls(), stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_result_for_previous_user_is_discarded() {
        let alice = user("alice");
        let bob = user("bob");
        let store = Arc::new(CountingStore::holding_first(seeded(&alice).await));
        let reconciler = Arc::new(UnreadReconciler::with_default_interval(store.clone()));
        let mut rx = reconciler.subscribe();

        // Alice's first fetch is held open
        reconciler.activate(alice.clone()).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(store.calls(), 1);

        reconciler.activate(bob.clone()).await;
        rx.wait_for(|s| *s == UnreadState::Count(3)).await.unwrap();

        store.release_first();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(store.read_users.lock().unwrap().contains(&alice));
        assert!(!rx.has_changed().unwrap());
        assert_eq!(reconciler.state(), UnreadState::Count(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_result_after_deactivate_is_discarded() {
        let alice = user("alice");
        let store = Arc::new(CountingStore::holding_first(seeded(&alice).await));
        let reconciler = Arc::new(UnreadReconciler::with_default_interval(store.clone()));

        reconciler.activate(alice.clone()).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        reconciler.deactivate().await;

        store.release_first();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(store.read_users.lock().unwrap().contains(&alice));
        assert_eq!(reconciler.state(), UnreadState::Loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_is_raised() {
        let alice = user("alice");
        let store = Arc::new(CountingStore::new(seeded(&alice).await));
        let reconciler = Arc::new(UnreadReconciler::new(store.clone(), Duration::ZERO));
        assert_eq!(reconciler.poll_interval(), MIN_POLL_INTERVAL);

        let mut rx = reconciler.subscribe();
        reconciler.activate(alice).await;
        rx.wait_for(|s| *s == UnreadState::Count(2)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(reconciler.is_polling());
        assert!(store.calls() > 1);
        reconciler.deactivate().await;
    }
}
