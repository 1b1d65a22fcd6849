//! In-memory index of one manager's subscriptions.
//!
//! A single table keyed by subscription ID owns every subscription and its
//! delivery handle. Buckets by path ref and by topic only hold IDs, so the
//! table and the buckets are updated together in [`SubscriptionIndex::insert`]
//! and [`SubscriptionIndex::remove`] and nowhere else.

use crate::debounce::Debounced;
use crate::error::{Result, SubscriptionError};
use crate::types::{FolderBranch, SubscriptionId, Topic};
use std::collections::{HashMap, HashSet};

use super::types::{PathSubscriptionRef, SubscriptionKind, SubscriptionTarget};

/// Internal subscription state.
struct Subscription {
    target: SubscriptionTarget,
    notifier: Debounced,
}

/// A subscription that was just removed.
pub(crate) struct Removed {
    pub notifier: Debounced,
    /// Set when the last subscription in this folder-branch went away.
    pub unwatched: Option<FolderBranch>,
}

#[derive(Default)]
pub(crate) struct SubscriptionIndex {
    subscriptions: HashMap<SubscriptionId, Subscription>,
    by_path: HashMap<PathSubscriptionRef, HashSet<SubscriptionId>>,
    /// Buckets stay around when empty; there are only a handful of topics.
    by_topic: HashMap<Topic, HashSet<SubscriptionId>>,
    count_by_folder_branch: HashMap<FolderBranch, usize>,
}

impl SubscriptionIndex {
    pub fn ensure_available(&self, sid: &SubscriptionId) -> Result<()> {
        if self.subscriptions.contains_key(sid) {
            return Err(SubscriptionError::DuplicateSubscription(sid.clone()));
        }
        Ok(())
    }

    /// Add a subscription whose ID was checked with `ensure_available`.
    ///
    /// Returns the folder-branch if this is its first path subscription.
    pub fn insert(
        &mut self,
        sid: SubscriptionId,
        target: SubscriptionTarget,
        notifier: Debounced,
    ) -> Option<FolderBranch> {
        let mut newly_watched = None;
        match &target {
            SubscriptionTarget::Path(subscription_ref) => {
                let count = self
                    .count_by_folder_branch
                    .entry(subscription_ref.folder_branch.clone())
                    .or_insert(0);
                if *count == 0 {
                    newly_watched = Some(subscription_ref.folder_branch.clone());
                }
                *count += 1;
                self.by_path
                    .entry(subscription_ref.clone())
                    .or_default()
                    .insert(sid.clone());
            }
            SubscriptionTarget::NonPath(topic) => {
                self.by_topic.entry(*topic).or_default().insert(sid.clone());
            }
        }
        self.subscriptions
            .insert(sid, Subscription { target, notifier });
        newly_watched
    }

    /// Remove `sid` if it is a subscription of the given kind.
    pub fn remove(&mut self, sid: &SubscriptionId, kind: SubscriptionKind) -> Option<Removed> {
        if self.subscriptions.get(sid)?.target.kind() != kind {
            return None;
        }
        let Subscription { target, notifier } = self.subscriptions.remove(sid)?;

        let mut unwatched = None;
        match target {
            SubscriptionTarget::Path(subscription_ref) => {
                if let Some(bucket) = self.by_path.get_mut(&subscription_ref) {
                    bucket.remove(sid);
                    if bucket.is_empty() {
                        self.by_path.remove(&subscription_ref);
                    }
                }
                let folder_branch = subscription_ref.folder_branch;
                if let Some(count) = self.count_by_folder_branch.get_mut(&folder_branch) {
                    *count -= 1;
                    if *count == 0 {
                        self.count_by_folder_branch.remove(&folder_branch);
                        unwatched = Some(folder_branch);
                    }
                }
            }
            SubscriptionTarget::NonPath(topic) => {
                if let Some(bucket) = self.by_topic.get_mut(&topic) {
                    bucket.remove(sid);
                }
            }
        }

        Some(Removed {
            notifier,
            unwatched,
        })
    }

    /// IDs of every subscription of the given kind.
    pub fn sids(&self, kind: SubscriptionKind) -> Vec<SubscriptionId> {
        self.subscriptions
            .iter()
            .filter(|(_, sub)| sub.target.kind() == kind)
            .map(|(sid, _)| sid.clone())
            .collect()
    }

    /// Notify every subscription keyed by `subscription_ref`.
    pub fn notify_ref(&self, subscription_ref: &PathSubscriptionRef) -> usize {
        self.by_path
            .get(subscription_ref)
            .map_or(0, |bucket| self.notify_all(bucket))
    }

    /// Notify every subscription to `topic`.
    pub fn notify_topic(&self, topic: Topic) -> usize {
        self.by_topic
            .get(&topic)
            .map_or(0, |bucket| self.notify_all(bucket))
    }

    /// Notify every path subscription regardless of path.
    pub fn notify_all_paths(&self) -> usize {
        self.by_path
            .values()
            .map(|bucket| self.notify_all(bucket))
            .sum()
    }

    fn notify_all(&self, sids: &HashSet<SubscriptionId>) -> usize {
        let mut notified = 0;
        for sid in sids {
            if let Some(sub) = self.subscriptions.get(sid) {
                sub.notifier.notify();
                notified += 1;
            }
        }
        notified
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn contains(&self, sid: &SubscriptionId) -> bool {
        self.subscriptions.contains_key(sid)
    }

    pub fn watched_folder_branches(&self) -> Vec<FolderBranch> {
        self.count_by_folder_branch.keys().cloned().collect()
    }

    pub fn path_bucket_count(&self) -> usize {
        self.by_path.len()
    }
}
