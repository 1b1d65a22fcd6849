//! Per-client subscriptions to path and non-path changes.
//!
//! A [`SubscriptionManager`] keeps one client's subscriptions:
//! - Path subscriptions, bucketed by folder-branch and cleaned in-TLF path
//! - Non-path subscriptions, bucketed by [`Topic`](crate::Topic)
//!
//! It registers with the change source once per watched folder-branch and
//! fans incoming changes out to the matching subscriptions, each through its
//! own debounced delivery.
//!
//! # Example
//!
//! ```ignore
//! let manager = SubscriptionManager::new(ClientId::from("gui-1"), collaborators);
//! let subscriber = manager.subscriber(notifier);
//!
//! subscriber.subscribe_path(
//!     "sid-1",
//!     "/keybase/private/alice/docs",
//!     PathTopic::Children,
//!     Some(Duration::from_millis(100)),
//! )?;
//! subscriber.subscribe_non_path("sid-2", Topic::JournalStatus, None)?;
//!
//! // Later
//! subscriber.unsubscribe("sid-1");
//! ```

mod index;
mod manager;
mod types;

pub use manager::SubscriptionManager;
pub use types::{PathSubscriptionRef, Subscriber, SubscriptionKind, SubscriptionTarget};
