//! Lazy, ref-counted client lifecycle management.
//!
//! One [`ClientLookup`] exists per `(index, cluster)` pair; all consumers of
//! that pair share it. The underlying store is constructed at most once, on
//! first use, and never while holding a lock across network I/O. Ref
//! counting is advisory: [`RemoteClientRegistry::try_remove_unused`] closes
//! an entry only if its count is zero at that instant, and a new acquirer
//! racing that check can keep a closed-out entry alive until process
//! restart. That race is accepted; fixing it would put a global lock on the
//! hot path.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use ahash::AHashMap;
use log::{debug, warn};
use parking_lot::RwLock;

use crate::config::{ClusterConfig, RemoraConfig};
use crate::error::{RemoraError, Result};
use crate::remote::client::RespStore;
use crate::remote::store::RemoteStore;

type StoreFactory = dyn Fn(&ClusterConfig) -> Arc<dyn RemoteStore> + Send + Sync;

/// A shared, lazily-constructed handle to one cluster's store.
pub struct ClientLookup {
    cluster: String,
    config: ClusterConfig,
    factory: Arc<StoreFactory>,
    store: OnceLock<Arc<dyn RemoteStore>>,
    closed: AtomicBool,
    ref_count: AtomicU32,
}

impl ClientLookup {
    fn new(cluster: String, config: ClusterConfig, factory: Arc<StoreFactory>) -> Self {
        ClientLookup {
            cluster,
            config,
            factory,
            store: OnceLock::new(),
            closed: AtomicBool::new(false),
            ref_count: AtomicU32::new(0),
        }
    }

    /// Get the store, constructing it on first use. Exactly one caller
    /// constructs; the rest block only on the cell guard, never on I/O of
    /// their own.
    pub fn get_or_create(&self) -> Result<Arc<dyn RemoteStore>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(RemoraError::already_closed(format!(
                "client for cluster {:?}",
                self.cluster
            )));
        }
        Ok(self
            .store
            .get_or_init(|| (self.factory)(&self.config))
            .clone())
    }

    pub fn incref(&self) -> u32 {
        self.ref_count.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Saturates at zero; the count is advisory, so an unbalanced call must
    /// not poison the process.
    pub fn decref(&self) -> u32 {
        self.ref_count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                count.checked_sub(1)
            })
            .map(|previous| previous - 1)
            .unwrap_or(0)
    }

    pub fn ref_count(&self) -> u32 {
        self.ref_count.load(Ordering::Acquire)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Idempotent. Close-time failures are logged, not propagated, so the
    /// entry is always released.
    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(store) = self.store.get() {
            if let Err(e) = store.close() {
                warn!("failed to close client for cluster {:?}: {e}", self.cluster);
            }
        }
    }
}

/// Registry of one [`ClientLookup`] per `(index, cluster)` key.
pub struct RemoteClientRegistry {
    index: String,
    config: Arc<RemoraConfig>,
    factory: Arc<StoreFactory>,
    clients: RwLock<AHashMap<String, Arc<ClientLookup>>>,
}

impl RemoteClientRegistry {
    /// Registry whose clients speak RESP over TCP.
    pub fn new(config: Arc<RemoraConfig>) -> Self {
        Self::with_factory(
            config,
            Arc::new(|cluster_config: &ClusterConfig| {
                Arc::new(RespStore::new(cluster_config)) as Arc<dyn RemoteStore>
            }),
        )
    }

    /// Registry with a custom store constructor, e.g. an in-process
    /// [`MemoryStore`](crate::remote::memory::MemoryStore) for tests.
    pub fn with_factory(config: Arc<RemoraConfig>, factory: Arc<StoreFactory>) -> Self {
        RemoteClientRegistry {
            index: config.index.clone(),
            config,
            factory,
            clients: RwLock::new(AHashMap::new()),
        }
    }

    fn key(&self, cluster: &str) -> String {
        format!("{}_{}", self.index, cluster)
    }

    /// Get or lazily register the lookup for `cluster`. Fails with a
    /// configuration error when the cluster has no endpoint settings.
    pub fn get_or_create(&self, cluster: &str) -> Result<Arc<ClientLookup>> {
        let key = self.key(cluster);
        if let Some(lookup) = self.clients.read().get(&key) {
            return Ok(lookup.clone());
        }

        let cluster_config = self
            .config
            .clusters
            .get(cluster)
            .ok_or_else(|| {
                RemoraError::config(format!("no remote cluster settings found for cluster: {cluster}"))
            })?
            .clone();
        if cluster_config.seed.is_empty() {
            return Err(RemoraError::config(format!(
                "no seed endpoint configured for cluster: {cluster}"
            )));
        }

        let mut clients = self.clients.write();
        let lookup = clients.entry(key).or_insert_with(|| {
            Arc::new(ClientLookup::new(
                cluster.to_string(),
                cluster_config,
                self.factory.clone(),
            ))
        });
        Ok(lookup.clone())
    }

    /// Close and evict the entry for `cluster` if nothing references it at
    /// this moment. Best effort; see the module docs for the accepted race.
    pub fn try_remove_unused(&self, cluster: &str) {
        let key = self.key(cluster);
        let removed = {
            let mut clients = self.clients.write();
            match clients.get(&key) {
                Some(lookup) if lookup.ref_count() == 0 => clients.remove(&key),
                _ => None,
            }
        };
        if let Some(lookup) = removed {
            debug!("evicting unused client for cluster {cluster:?}");
            lookup.close();
        }
    }

    /// Number of live lookups.
    pub fn len(&self) -> usize {
        self.clients.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.read().is_empty()
    }

    /// Close every registered client, swallowing close-time failures.
    pub fn close(&self) {
        let clients = std::mem::take(&mut *self.clients.write());
        for lookup in clients.values() {
            lookup.close();
        }
    }
}
