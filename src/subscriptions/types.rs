//! Subscription keys and the per-client subscriber façade.

use crate::error::Result;
use crate::interfaces::SubscriptionNotifier;
use crate::path::{CleanPath, UserPath};
use crate::types::{FolderBranch, PathTopic, SubscriptionId, Topic};
use std::sync::Arc;
use std::time::Duration;

use super::manager::SubscriptionManager;

/// Bucket key of path subscriptions.
///
/// Subscriptions with equal refs share a bucket but keep independent
/// delivery.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PathSubscriptionRef {
    pub folder_branch: FolderBranch,
    pub path: CleanPath,
}

impl PathSubscriptionRef {
    pub fn new(folder_branch: FolderBranch, path: CleanPath) -> Self {
        Self {
            folder_branch,
            path,
        }
    }
}

/// What a subscription is keyed by.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubscriptionTarget {
    Path(PathSubscriptionRef),
    NonPath(Topic),
}

impl SubscriptionTarget {
    pub fn kind(&self) -> SubscriptionKind {
        match self {
            SubscriptionTarget::Path(_) => SubscriptionKind::Path,
            SubscriptionTarget::NonPath(_) => SubscriptionKind::NonPath,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SubscriptionKind {
    Path,
    NonPath,
}

/// Subscribe/unsubscribe handle for one client, delivering to one notifier.
#[derive(Clone)]
pub struct Subscriber {
    manager: Arc<SubscriptionManager>,
    notifier: Arc<dyn SubscriptionNotifier>,
}

impl Subscriber {
    pub(crate) fn new(
        manager: Arc<SubscriptionManager>,
        notifier: Arc<dyn SubscriptionNotifier>,
    ) -> Self {
        Self { manager, notifier }
    }

    /// Subscribe to changes of `path`.
    ///
    /// `deduplicate_interval` is the minimum spacing between deliveries;
    /// `None` delivers every change. Subscribing to a path in a TLF that
    /// does not exist yet succeeds without creating a subscription.
    pub fn subscribe_path(
        &self,
        sid: impl Into<SubscriptionId>,
        path: impl Into<UserPath>,
        topic: PathTopic,
        deduplicate_interval: Option<Duration>,
    ) -> Result<()> {
        self.manager.subscribe_path(
            sid.into(),
            path.into(),
            topic,
            deduplicate_interval,
            Arc::clone(&self.notifier),
        )
    }

    /// Subscribe to a non-path topic.
    pub fn subscribe_non_path(
        &self,
        sid: impl Into<SubscriptionId>,
        topic: Topic,
        deduplicate_interval: Option<Duration>,
    ) -> Result<()> {
        self.manager.subscribe_non_path(
            sid.into(),
            topic,
            deduplicate_interval,
            Arc::clone(&self.notifier),
        )
    }

    /// Cancel a subscription of either kind. Unknown IDs are ignored.
    pub fn unsubscribe(&self, sid: impl Into<SubscriptionId>) {
        let sid = sid.into();
        self.manager.unsubscribe_path(&sid);
        self.manager.unsubscribe_non_path(&sid);
    }

    pub fn manager(&self) -> &Arc<SubscriptionManager> {
        &self.manager
    }
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber")
            .field("client_id", self.manager.client_id())
            .finish_non_exhaustive()
    }
}
