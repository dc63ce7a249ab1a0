//! Best-effort operator notification.
//!
//! This crate provides:
//! - `DeliveryChannel` trait for pluggable delivery backends
//! - Telegram Bot API channel with topic-thread support
//! - Delivery targets parsed out of session identifiers
//! - Fire-and-forget router that never surfaces a delivery failure
//! - Last-primary-session tracking with a durable single-record store

pub mod router;
pub mod session;
pub mod target;
pub mod telegram;
pub mod traits;

pub use router::NotificationRouter;
pub use session::{FileStateStore, MemoryStateStore, SessionTracker, StateStore};
pub use target::DeliveryTarget;
pub use telegram::TelegramChannel;
pub use traits::{DeliveryChannel, NotifyError};
