//! # Hackboard
//!
//! Backend for a hackathon community site: link-aware rendering of chat
//! messages and blog posts, plus the unread-announcements badge kept in
//! sync with a hosted REST backend.
//!
//! ## Modules
//!
//! - [`content`]: Link scanner and display renderer
//! - [`announcements`]: Unread count reconciler and per-user registry
//! - [`store`]: Store traits with REST and in-memory implementations
//! - [`chat`]: Message composition and display
//! - [`blog`]: Blog post rendering
//! - [`api`]: REST API server with Axum
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hackboard::announcements::UnreadReconciler;
//! use hackboard::content::{render, scan, LinkVariant};
//! use hackboard::store::{MemoryStore, UserId};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let units = render(&scan("Slides at www.hack.dev"), LinkVariant::Default);
//!     println!("{:?}", units);
//!
//!     let store = Arc::new(MemoryStore::with_announcements(["kickoff", "judging"]));
//!     let reconciler = Arc::new(UnreadReconciler::with_default_interval(store));
//!     reconciler.activate(UserId::new("alice")).await;
//!
//!     println!("unread: {}", reconciler.recompute().await);
//!     reconciler.deactivate().await;
//! }
//! ```

pub mod announcements;
pub mod api;
pub mod blog;
pub mod chat;
pub mod config;
pub mod content;
pub mod logging;
pub mod store;

pub use announcements::{ReconcileError, ReconcilerRegistry, UnreadReconciler, UnreadState};
pub use content::{render, scan, scan_document, DisplayUnit, LinkVariant, Segment};
pub use store::{AnnouncementStore, ChatStore, MemoryStore, RestStore, StoreError};
