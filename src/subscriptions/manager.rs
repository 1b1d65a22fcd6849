//! Per-client subscription manager.

use crate::debounce::{debounce, RateLimit};
use crate::error::Result;
use crate::interfaces::{
    ChangeObserver, Collaborators, OnlineStatusTracker, SubscriptionNotifier,
    SubscriptionPublisher,
};
use crate::path::{CleanPath, UserPath};
use crate::types::{
    ChangedNode, ClientId, FolderBranch, NodeChange, NodeId, PathTopic, SubscriptionId,
    TlfHandle, Topic, WriteRange,
};
use parking_lot::{Mutex, RwLock};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, trace, warn};

use super::index::SubscriptionIndex;
use super::types::{PathSubscriptionRef, Subscriber, SubscriptionKind, SubscriptionTarget};

/// Manages the path and non-path subscriptions of one client.
///
/// Path subscriptions follow changes to a specific path (directory children,
/// stat). Non-path subscriptions follow global state such as journal
/// flushing or online status. Every subscription gets its own debounced
/// delivery, so one client's slow or rate-limited subscriptions never hold
/// up another's.
///
/// The manager registers itself with the change source once per watched
/// folder-branch and receives change events through [`ChangeObserver`].
pub struct SubscriptionManager {
    client_id: ClientId,
    collaborators: Collaborators,
    /// All indices and counters; structural changes take the write lock.
    state: RwLock<SubscriptionIndex>,
    online_status: Mutex<Option<Arc<dyn OnlineStatusTracker>>>,
    /// Handle to ourselves, passed to the change source as the observer.
    this: Weak<SubscriptionManager>,
}

impl SubscriptionManager {
    /// Create a manager and start its online-status tracker.
    pub fn new(client_id: ClientId, collaborators: Collaborators) -> Arc<Self> {
        let manager = Arc::new_cyclic(|this| Self {
            client_id,
            collaborators,
            state: RwLock::new(SubscriptionIndex::default()),
            online_status: Mutex::new(None),
            this: this.clone(),
        });

        let weak = Arc::downgrade(&manager);
        let tracker = manager
            .collaborators
            .online_status
            .track(Box::new(move || {
                if let Some(manager) = weak.upgrade() {
                    manager.notify_online_status();
                }
            }));
        *manager.online_status.lock() = Some(Arc::from(tracker));

        debug!(client_id = %manager.client_id, "subscription manager created");
        manager
    }

    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    /// Façade for subscribing on behalf of this client.
    pub fn subscriber(self: &Arc<Self>, notifier: Arc<dyn SubscriptionNotifier>) -> Subscriber {
        Subscriber::new(Arc::clone(self), notifier)
    }

    /// Number of active subscriptions of both kinds.
    pub fn subscription_count(&self) -> usize {
        self.state.read().len()
    }

    pub fn has_subscription(&self, sid: &SubscriptionId) -> bool {
        self.state.read().contains(sid)
    }

    /// Folder-branches currently registered with the change source.
    pub fn watched_folder_branches(&self) -> Vec<FolderBranch> {
        self.state.read().watched_folder_branches()
    }

    /// The online-status tracker feeding [`Topic::OnlineStatus`] deliveries.
    ///
    /// `None` once the manager has been shut down.
    pub fn online_status_tracker(&self) -> Option<Arc<dyn OnlineStatusTracker>> {
        self.online_status.lock().clone()
    }

    /// Cancel every subscription and stop online-status tracking.
    pub fn shutdown(&self) {
        if let Some(tracker) = self.online_status.lock().take() {
            tracker.shutdown();
        }

        let mut state = self.state.write();
        for sid in state.sids(SubscriptionKind::Path) {
            self.remove_locked(&mut state, &sid, SubscriptionKind::Path);
        }
        for sid in state.sids(SubscriptionKind::NonPath) {
            self.remove_locked(&mut state, &sid, SubscriptionKind::NonPath);
        }
        debug!(client_id = %self.client_id, "subscription manager shut down");
    }

    pub(crate) fn subscribe_path(
        &self,
        sid: SubscriptionId,
        path: UserPath,
        topic: PathTopic,
        deduplicate_interval: Option<Duration>,
        notifier: Arc<dyn SubscriptionNotifier>,
    ) -> Result<()> {
        let parsed = path.parse()?;
        let folder_branch = match parsed.tlf {
            Some(_) => self.collaborators.resolver.folder_branch(&parsed)?,
            None => None,
        };
        let Some(folder_branch) = folder_branch else {
            // TODO: retry once the TLF shows up instead of dropping the
            // subscription on the floor.
            debug!(client_id = %self.client_id, %sid, %path, "ignoring subscription to unresolved TLF");
            return Ok(());
        };
        let subscription_ref = PathSubscriptionRef::new(folder_branch, parsed.clean_in_tlf_path());

        let mut state = self.state.write();
        state.ensure_available(&sid)?;

        let client_id = self.client_id.clone();
        let callback_sid = sid.clone();
        let callback_path = path.clone();
        let delivery = debounce(
            move || notifier.on_path_change(&client_id, &callback_sid, &callback_path, topic),
            RateLimit::from_interval(deduplicate_interval),
        )?;

        debug!(
            client_id = %self.client_id,
            %sid,
            ?subscription_ref,
            ?topic,
            "path subscription added"
        );
        if let Some(folder_branch) =
            state.insert(sid, SubscriptionTarget::Path(subscription_ref), delivery)
        {
            self.register_for_changes(folder_branch);
        }
        Ok(())
    }

    pub(crate) fn subscribe_non_path(
        &self,
        sid: SubscriptionId,
        topic: Topic,
        deduplicate_interval: Option<Duration>,
        notifier: Arc<dyn SubscriptionNotifier>,
    ) -> Result<()> {
        let mut state = self.state.write();
        state.ensure_available(&sid)?;

        let client_id = self.client_id.clone();
        let callback_sid = sid.clone();
        let delivery = debounce(
            move || notifier.on_non_path_change(&client_id, &callback_sid, topic),
            RateLimit::from_interval(deduplicate_interval),
        )?;

        debug!(client_id = %self.client_id, %sid, ?topic, "non-path subscription added");
        state.insert(sid, SubscriptionTarget::NonPath(topic), delivery);
        Ok(())
    }

    pub(crate) fn unsubscribe_path(&self, sid: &SubscriptionId) {
        let mut state = self.state.write();
        self.remove_locked(&mut state, sid, SubscriptionKind::Path);
    }

    pub(crate) fn unsubscribe_non_path(&self, sid: &SubscriptionId) {
        let mut state = self.state.write();
        self.remove_locked(&mut state, sid, SubscriptionKind::NonPath);
    }

    fn remove_locked(
        &self,
        state: &mut SubscriptionIndex,
        sid: &SubscriptionId,
        kind: SubscriptionKind,
    ) {
        let Some(removed) = state.remove(sid, kind) else {
            return;
        };
        removed.notifier.shutdown();
        debug!(client_id = %self.client_id, %sid, ?kind, "subscription removed");
        if let Some(folder_branch) = removed.unwatched {
            self.unregister_from_changes(folder_branch);
        }
    }

    fn observer(&self) -> Option<Arc<dyn ChangeObserver>> {
        self.this
            .upgrade()
            .map(|manager| manager as Arc<dyn ChangeObserver>)
    }

    fn register_for_changes(&self, folder_branch: FolderBranch) {
        let Some(observer) = self.observer() else {
            return;
        };
        debug!(client_id = %self.client_id, ?folder_branch, "registering for changes");
        if let Err(err) = self
            .collaborators
            .registrar
            .register_for_changes(std::slice::from_ref(&folder_branch), observer)
        {
            warn!(client_id = %self.client_id, ?folder_branch, error = %err, "change registration failed");
        }
    }

    fn unregister_from_changes(&self, folder_branch: FolderBranch) {
        let Some(observer) = self.observer() else {
            return;
        };
        debug!(client_id = %self.client_id, ?folder_branch, "unregistering from changes");
        if let Err(err) = self
            .collaborators
            .registrar
            .unregister_from_changes(std::slice::from_ref(&folder_branch), observer)
        {
            warn!(client_id = %self.client_id, ?folder_branch, error = %err, "change unregistration failed");
        }
    }

    fn notify_online_status(&self) {
        let state = self.state.read();
        state.notify_topic(Topic::OnlineStatus);
    }

    /// Notify subscribers of the changed node's path and of its parent, so
    /// a `Children` subscription on a directory fires when an entry changes.
    fn node_change_locked(&self, state: &SubscriptionIndex, node: &ChangedNode) {
        let Some(path) = node.path.as_deref() else {
            return;
        };
        let path = CleanPath::new(path);
        let parent = path.parent();

        let mut notified = state.notify_ref(&PathSubscriptionRef::new(
            node.folder_branch.clone(),
            path,
        ));
        if let Some(parent) = parent {
            notified += state.notify_ref(&PathSubscriptionRef::new(
                node.folder_branch.clone(),
                parent,
            ));
        }
        trace!(client_id = %self.client_id, node = ?node.id, notified, "node change");
    }
}

impl SubscriptionPublisher for SubscriptionManager {
    fn publish_change(&self, topic: Topic) {
        let state = self.state.read();

        // Sync status changes can alter the prefetch status shown on any
        // path, and there is no per-path sync tracking, so every path
        // subscription reloads.
        let mut notified = 0;
        if topic == Topic::OverallSyncStatus {
            notified += state.notify_all_paths();
        }
        notified += state.notify_topic(topic);
        trace!(client_id = %self.client_id, ?topic, notified, "published change");
    }
}

impl ChangeObserver for SubscriptionManager {
    fn local_change(&self, node: &ChangedNode, _write: WriteRange) {
        let state = self.state.read();
        self.node_change_locked(&state, node);
    }

    fn batch_changes(&self, changes: &[NodeChange], _affected_node_ids: &[NodeId]) {
        let state = self.state.read();
        for change in changes {
            self.node_change_locked(&state, &change.node);
        }
    }

    fn tlf_handle_change(&self, _handle: &TlfHandle) {}
}

impl std::fmt::Debug for SubscriptionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionManager")
            .field("client_id", &self.client_id)
            .field("subscriptions", &self.subscription_count())
            .finish_non_exhaustive()
    }
}
