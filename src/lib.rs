//! # Subscription Hub
//!
//! In-process change notifications for a filesystem client. Many consumers
//! (GUI windows, a prefetcher, tooling) subscribe to paths or to global
//! topics without each registering with the low-level change source, and
//! without being flooded by redundant callbacks.
//!
//! ## Core Concepts
//!
//! - **Subscriptions**: caller-named, either on a path or on a [`Topic`]
//! - **Managers**: one [`SubscriptionManager`] per client, registering with
//!   the change source once per watched folder-branch
//! - **Debouncing**: each subscription delivers through its own rate-limited
//!   [`Debounced`] slot
//! - **Registry**: [`SubscriptionManagerRegistry`] hands out managers by
//!   client ID and caps short-lived clients
//!
//! ## Example
//!
//! ```ignore
//! use subscription_hub::{ClientId, PathTopic, SubscriptionManagerRegistry, SubscriptionPublisher, Topic};
//!
//! let registry = SubscriptionManagerRegistry::new(collaborators);
//! let manager = registry.get(&ClientId::from("gui-1"), true);
//! let subscriber = manager.subscriber(notifier);
//!
//! subscriber.subscribe_path("1", "/keybase/private/alice/doc.txt", PathTopic::Stat, None)?;
//! subscriber.subscribe_non_path("2", Topic::OverallSyncStatus, None)?;
//!
//! // Any component can broadcast a topic change.
//! registry.publish_change(Topic::OverallSyncStatus);
//! ```

pub mod debounce;
pub mod error;
pub mod interfaces;
pub mod path;
pub mod registry;
pub mod subscriptions;
pub mod types;

// Re-exports
pub use debounce::{debounce, Debounced, RateLimit};
pub use error::{Result, SubscriptionError};
pub use interfaces::{
    ChangeObserver, ChangeRegistrar, Collaborators, OnlineStatusCallback, OnlineStatusSource,
    OnlineStatusTracker, PathResolver, SubscriptionNotifier, SubscriptionPublisher,
};
pub use path::{CleanPath, ParsedPath, TlfName, TlfType, UserPath};
pub use registry::{RegistryConfig, SubscriptionManagerRegistry, DEFAULT_MAX_PURGEABLE_CLIENTS};
pub use subscriptions::{
    PathSubscriptionRef, Subscriber, SubscriptionKind, SubscriptionManager, SubscriptionTarget,
};
pub use types::*;
