//! Registry of subscription managers, one per client.

use crate::interfaces::{Collaborators, SubscriptionPublisher};
use crate::subscriptions::SubscriptionManager;
use crate::types::{ClientId, Topic};
use lru::LruCache;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::{debug, info};

/// Default number of purgeable clients kept alive at once.
pub const DEFAULT_MAX_PURGEABLE_CLIENTS: usize = 3;

/// Registry configuration.
#[derive(Clone, Debug)]
pub struct RegistryConfig {
    /// Purgeable clients kept before the oldest is evicted.
    /// Default: 3
    pub max_purgeable_clients: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_purgeable_clients: DEFAULT_MAX_PURGEABLE_CLIENTS,
        }
    }
}

struct RegistryState {
    managers: HashMap<ClientId, Arc<SubscriptionManager>>,
    /// Purgeable client IDs, oldest first. Entries are never promoted, so
    /// eviction order is creation order.
    purgeable: LruCache<ClientId, ()>,
}

/// Maps client IDs to their subscription managers.
///
/// Managers are created on first use. Purgeable clients (short-lived GUI
/// windows, for instance) are capped; creating one more than the cap shuts
/// down and evicts the oldest. Other clients live until [`shutdown`].
///
/// [`shutdown`]: SubscriptionManagerRegistry::shutdown
pub struct SubscriptionManagerRegistry {
    collaborators: Collaborators,
    config: RegistryConfig,
    state: RwLock<RegistryState>,
}

impl SubscriptionManagerRegistry {
    pub fn new(collaborators: Collaborators) -> Self {
        Self::with_config(collaborators, RegistryConfig::default())
    }

    pub fn with_config(collaborators: Collaborators, config: RegistryConfig) -> Self {
        let capacity =
            NonZeroUsize::new(config.max_purgeable_clients).unwrap_or(NonZeroUsize::MIN);
        Self {
            collaborators,
            config,
            state: RwLock::new(RegistryState {
                managers: HashMap::new(),
                purgeable: LruCache::new(capacity),
            }),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Get the manager for `client_id`, creating it if needed.
    ///
    /// `purgeable` only matters when the manager is created. When the
    /// purgeable queue is full, the oldest purgeable manager is shut down
    /// before the new one is admitted.
    pub fn get(&self, client_id: &ClientId, purgeable: bool) -> Arc<SubscriptionManager> {
        if let Some(manager) = self.state.read().managers.get(client_id) {
            return Arc::clone(manager);
        }

        loop {
            let evicted = {
                let mut state = self.state.write();
                // Someone else may have created it between the two locks.
                if let Some(manager) = state.managers.get(client_id) {
                    return Arc::clone(manager);
                }

                let full = state.purgeable.len() >= state.purgeable.cap().get();
                if purgeable && full && !state.purgeable.contains(client_id) {
                    let oldest = state.purgeable.pop_lru().map(|(oldest, ())| oldest);
                    oldest.and_then(|oldest| state.managers.remove(&oldest))
                } else {
                    if purgeable {
                        state.purgeable.put(client_id.clone(), ());
                    }
                    let manager =
                        SubscriptionManager::new(client_id.clone(), self.collaborators.clone());
                    state
                        .managers
                        .insert(client_id.clone(), Arc::clone(&manager));
                    debug!(%client_id, purgeable, "subscription client registered");
                    return manager;
                }
            };

            // Shut down outside our lock; shutdown takes the manager's own
            // lock. The newcomer is admitted on the next pass.
            if let Some(evicted) = evicted {
                info!(
                    evicted = %evicted.client_id(),
                    admitted = %client_id,
                    "evicting oldest purgeable subscription client"
                );
                evicted.shutdown();
            }
        }
    }

    /// Shut down and forget one client. Returns whether it existed.
    pub fn remove(&self, client_id: &ClientId) -> bool {
        let removed = {
            let mut state = self.state.write();
            state.purgeable.pop(client_id);
            state.managers.remove(client_id)
        };
        match removed {
            Some(manager) => {
                manager.shutdown();
                true
            }
            None => false,
        }
    }

    /// Shut down every manager and empty the registry.
    pub fn shutdown(&self) {
        let managers: Vec<Arc<SubscriptionManager>> = {
            let mut state = self.state.write();
            state.purgeable.clear();
            state.managers.drain().map(|(_, manager)| manager).collect()
        };
        info!(clients = managers.len(), "shutting down subscription registry");
        for manager in managers {
            manager.shutdown();
        }
    }

    pub fn contains(&self, client_id: &ClientId) -> bool {
        self.state.read().managers.contains_key(client_id)
    }

    pub fn len(&self) -> usize {
        self.state.read().managers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> Vec<Arc<SubscriptionManager>> {
        self.state.read().managers.values().cloned().collect()
    }
}

impl SubscriptionPublisher for SubscriptionManagerRegistry {
    fn publish_change(&self, topic: Topic) {
        for manager in self.snapshot() {
            manager.publish_change(topic);
        }
    }
}

impl std::fmt::Debug for SubscriptionManagerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionManagerRegistry")
            .field("config", &self.config)
            .field("clients", &self.len())
            .finish_non_exhaustive()
    }
}
