//! Fake collaborators shared by the integration tests.

#![allow(dead_code)]

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use subscription_hub::{
    ChangeObserver, ChangeRegistrar, ChangedNode, ClientId, Collaborators, FolderBranch,
    NodeChange, NodeId, OnlineStatusCallback, OnlineStatusSource, OnlineStatusTracker,
    ParsedPath, PathResolver, PathTopic, Result, SubscriptionError, SubscriptionId,
    SubscriptionNotifier, Topic, UserPath, WriteRange,
};

/// Install a log subscriber writing through the test harness.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Resolves every TLF to `FolderBranch::master(<name>)`, except `missing`
/// (not created yet) and `broken` (resolution error).
pub struct FakeResolver;

impl PathResolver for FakeResolver {
    fn folder_branch(&self, path: &ParsedPath) -> Result<Option<FolderBranch>> {
        let Some(tlf) = &path.tlf else {
            return Ok(None);
        };
        match tlf.name.as_str() {
            "missing" => Ok(None),
            "broken" => Err(SubscriptionError::Resolution(format!(
                "cannot resolve {}",
                tlf.name
            ))),
            name => Ok(Some(FolderBranch::master(name))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistrarCall {
    Register(FolderBranch),
    Unregister(FolderBranch),
}

/// Change source fake: records registration calls and forwards simulated
/// changes to whoever is registered for the folder-branch.
#[derive(Default)]
pub struct FakeChangeSource {
    calls: Mutex<Vec<RegistrarCall>>,
    observers: Mutex<Vec<(FolderBranch, Arc<dyn ChangeObserver>)>>,
    fail: AtomicBool,
}

fn same_observer(a: &Arc<dyn ChangeObserver>, b: &Arc<dyn ChangeObserver>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

impl FakeChangeSource {
    pub fn calls(&self) -> Vec<RegistrarCall> {
        self.calls.lock().clone()
    }

    pub fn registrations(&self, folder_branch: &FolderBranch) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| **call == RegistrarCall::Register(folder_branch.clone()))
            .count()
    }

    pub fn unregistrations(&self, folder_branch: &FolderBranch) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| **call == RegistrarCall::Unregister(folder_branch.clone()))
            .count()
    }

    pub fn observer_count(&self, folder_branch: &FolderBranch) -> usize {
        self.observers
            .lock()
            .iter()
            .filter(|(fb, _)| fb == folder_branch)
            .count()
    }

    /// Make every registration call fail from now on.
    pub fn fail_calls(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    fn observers_for(&self, folder_branch: &FolderBranch) -> Vec<Arc<dyn ChangeObserver>> {
        self.observers
            .lock()
            .iter()
            .filter(|(fb, _)| fb == folder_branch)
            .map(|(_, observer)| Arc::clone(observer))
            .collect()
    }

    pub fn local_change(&self, tlf: &str, path: &str) {
        let folder_branch = FolderBranch::master(tlf);
        let node = ChangedNode::new(NodeId(1), folder_branch.clone(), path);
        for observer in self.observers_for(&folder_branch) {
            observer.local_change(&node, WriteRange { offset: 0, len: 1 });
        }
    }

    pub fn batch_changes(&self, tlf: &str, paths: &[&str]) {
        let folder_branch = FolderBranch::master(tlf);
        let changes: Vec<NodeChange> = paths
            .iter()
            .enumerate()
            .map(|(i, path)| {
                NodeChange::new(ChangedNode::new(
                    NodeId(i as u64),
                    folder_branch.clone(),
                    *path,
                ))
            })
            .collect();
        let affected: Vec<NodeId> = changes.iter().map(|c| c.node.id).collect();
        for observer in self.observers_for(&folder_branch) {
            observer.batch_changes(&changes, &affected);
        }
    }
}

impl ChangeRegistrar for FakeChangeSource {
    fn register_for_changes(
        &self,
        folder_branches: &[FolderBranch],
        observer: Arc<dyn ChangeObserver>,
    ) -> Result<()> {
        let mut calls = self.calls.lock();
        let mut observers = self.observers.lock();
        for fb in folder_branches {
            calls.push(RegistrarCall::Register(fb.clone()));
            observers.push((fb.clone(), Arc::clone(&observer)));
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(SubscriptionError::Registration("change source offline".into()));
        }
        Ok(())
    }

    fn unregister_from_changes(
        &self,
        folder_branches: &[FolderBranch],
        observer: Arc<dyn ChangeObserver>,
    ) -> Result<()> {
        let mut calls = self.calls.lock();
        let mut observers = self.observers.lock();
        for fb in folder_branches {
            calls.push(RegistrarCall::Unregister(fb.clone()));
            observers.retain(|(registered, o)| !(registered == fb && same_observer(o, &observer)));
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(SubscriptionError::Registration("change source offline".into()));
        }
        Ok(())
    }
}

/// Online-status source whose trackers can be fired by hand.
#[derive(Default)]
pub struct FakeOnlineStatus {
    callbacks: Mutex<Vec<Arc<OnlineStatusCallback>>>,
    shutdowns: Arc<AtomicUsize>,
}

impl FakeOnlineStatus {
    /// Simulate an online-status change seen by every tracker.
    pub fn fire(&self) {
        let callbacks: Vec<_> = self.callbacks.lock().iter().cloned().collect();
        for callback in callbacks {
            (**callback)();
        }
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

struct FakeTracker {
    shutdowns: Arc<AtomicUsize>,
}

impl OnlineStatusTracker for FakeTracker {
    fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

impl OnlineStatusSource for FakeOnlineStatus {
    fn track(&self, on_change: OnlineStatusCallback) -> Box<dyn OnlineStatusTracker> {
        self.callbacks.lock().push(Arc::new(on_change));
        Box::new(FakeTracker {
            shutdowns: Arc::clone(&self.shutdowns),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Delivery {
    Path {
        client_id: ClientId,
        sid: SubscriptionId,
        path: UserPath,
        topic: PathTopic,
    },
    NonPath {
        client_id: ClientId,
        sid: SubscriptionId,
        topic: Topic,
    },
}

impl Delivery {
    pub fn sid(&self) -> &SubscriptionId {
        match self {
            Delivery::Path { sid, .. } | Delivery::NonPath { sid, .. } => sid,
        }
    }
}

/// Notifier that records every delivery.
#[derive(Default)]
pub struct RecordingNotifier {
    deliveries: Mutex<Vec<Delivery>>,
    delivered_at: Mutex<Vec<(SubscriptionId, Instant)>>,
}

impl RecordingNotifier {
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().clone()
    }

    /// When each delivery to `sid` happened, in order.
    pub fn delivery_times(&self, sid: &str) -> Vec<Instant> {
        self.delivered_at
            .lock()
            .iter()
            .filter(|(delivered, _)| delivered.as_str() == sid)
            .map(|(_, at)| *at)
            .collect()
    }

    fn record(&self, delivery: Delivery) {
        self.delivered_at
            .lock()
            .push((delivery.sid().clone(), Instant::now()));
        self.deliveries.lock().push(delivery);
    }

    pub fn count_for(&self, sid: &str) -> usize {
        self.deliveries
            .lock()
            .iter()
            .filter(|d| d.sid().as_str() == sid)
            .count()
    }

    pub fn total(&self) -> usize {
        self.deliveries.lock().len()
    }

    /// Wait until `sid` has at least `expected` deliveries.
    pub fn wait_for(&self, sid: &str, expected: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.count_for(sid) >= expected {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(5));
        }
    }
}

impl SubscriptionNotifier for RecordingNotifier {
    fn on_path_change(
        &self,
        client_id: &ClientId,
        sid: &SubscriptionId,
        path: &UserPath,
        topic: PathTopic,
    ) {
        self.record(Delivery::Path {
            client_id: client_id.clone(),
            sid: sid.clone(),
            path: path.clone(),
            topic,
        });
    }

    fn on_non_path_change(&self, client_id: &ClientId, sid: &SubscriptionId, topic: Topic) {
        self.record(Delivery::NonPath {
            client_id: client_id.clone(),
            sid: sid.clone(),
            topic,
        });
    }
}

/// Fakes plus the collaborators bundle built from them.
pub struct Harness {
    pub source: Arc<FakeChangeSource>,
    pub online: Arc<FakeOnlineStatus>,
    pub collaborators: Collaborators,
}

impl Harness {
    pub fn new() -> Self {
        init_tracing();
        let source = Arc::new(FakeChangeSource::default());
        let online = Arc::new(FakeOnlineStatus::default());
        let collaborators = Collaborators {
            resolver: Arc::new(FakeResolver),
            registrar: source.clone(),
            online_status: online.clone(),
        };
        Self {
            source,
            online,
            collaborators,
        }
    }
}

/// Time to give background delivery threads to settle.
pub const SETTLE: Duration = Duration::from_millis(100);

/// Generous timeout for deliveries that must happen.
pub const DELIVERY_TIMEOUT: Duration = Duration::from_secs(2);
