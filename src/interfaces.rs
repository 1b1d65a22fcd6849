//! Collaborators a subscription manager talks to.
//!
//! Path resolution, the change source and online-status tracking live
//! outside this crate. Managers only see them through these traits.

use crate::error::Result;
use crate::path::{ParsedPath, UserPath};
use crate::types::{
    ChangedNode, ClientId, FolderBranch, NodeChange, NodeId, PathTopic, SubscriptionId,
    TlfHandle, Topic, WriteRange,
};
use std::sync::Arc;

/// Resolves the TLF named by a parsed path to a folder-branch.
pub trait PathResolver: Send + Sync {
    /// Only called for paths that name a TLF. Returns `Ok(None)` when the
    /// TLF does not exist yet.
    fn folder_branch(&self, path: &ParsedPath) -> Result<Option<FolderBranch>>;
}

/// Receives raw change events from the change source.
pub trait ChangeObserver: Send + Sync {
    /// A single local write to `node`.
    fn local_change(&self, node: &ChangedNode, write: WriteRange);

    /// A batch of changes, e.g. from a merged remote update.
    fn batch_changes(&self, changes: &[NodeChange], affected_node_ids: &[NodeId]);

    /// The identity of a TLF changed.
    fn tlf_handle_change(&self, handle: &TlfHandle);
}

/// The change source that observers register with, per folder-branch.
///
/// Observers are identified by the address of their allocation, so
/// unregistering must pass the same `Arc` that was registered.
pub trait ChangeRegistrar: Send + Sync {
    fn register_for_changes(
        &self,
        folder_branches: &[FolderBranch],
        observer: Arc<dyn ChangeObserver>,
    ) -> Result<()>;

    fn unregister_from_changes(
        &self,
        folder_branches: &[FolderBranch],
        observer: Arc<dyn ChangeObserver>,
    ) -> Result<()>;
}

/// Callback an online-status tracker invokes when the status changes.
pub type OnlineStatusCallback = Box<dyn Fn() + Send + Sync>;

/// A running online-status tracker owned by one manager.
pub trait OnlineStatusTracker: Send + Sync {
    fn shutdown(&self);
}

/// Starts online-status trackers.
pub trait OnlineStatusSource: Send + Sync {
    fn track(&self, on_change: OnlineStatusCallback) -> Box<dyn OnlineStatusTracker>;
}

/// Delivery target of one client's subscriptions.
pub trait SubscriptionNotifier: Send + Sync {
    fn on_path_change(
        &self,
        client_id: &ClientId,
        sid: &SubscriptionId,
        path: &UserPath,
        topic: PathTopic,
    );

    fn on_non_path_change(&self, client_id: &ClientId, sid: &SubscriptionId, topic: Topic);
}

/// Anything that can broadcast a non-path topic change.
pub trait SubscriptionPublisher: Send + Sync {
    fn publish_change(&self, topic: Topic);
}

/// The external collaborators every manager is built with.
#[derive(Clone)]
pub struct Collaborators {
    pub resolver: Arc<dyn PathResolver>,
    pub registrar: Arc<dyn ChangeRegistrar>,
    pub online_status: Arc<dyn OnlineStatusSource>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
