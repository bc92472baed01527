//! Announcements
//!
//! Unread-announcement tracking:
//! - [`reconciler`]: per-user unread count, polled from the store
//! - [`registry`]: one reconciler per signed-in user for the API

pub mod reconciler;
pub mod registry;

pub use reconciler::{UnreadReconciler, UnreadState, DEFAULT_POLL_INTERVAL, MIN_POLL_INTERVAL};
pub use registry::{ReconcilerRegistry, DEFAULT_IDLE_TIMEOUT, DEFAULT_MAX_TRACKED_USERS};

use thiserror::Error;

use crate::store::StoreError;

/// Errors surfaced by reconciler write operations
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// Called before a user was activated
    #[error("No active user")]
    NotActive,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
