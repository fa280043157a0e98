use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::{future::ready, StreamExt};
use kube::runtime::{reflector, watcher, WatchStreamExt};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("informer cache for {0} is not synced")]
    NotSynced(String),
    #[error("watch for {0} stopped before its cache was synced")]
    WatchStopped(String),
}

/// Read access to an informer cache.
pub trait KubeStore<K: 'static + Clone + reflector::Lookup>: Send + Sync
where
    K::DynamicType: Eq + Hash + Clone + Default,
{
    fn get(&self, key: &reflector::ObjectRef<K>) -> Option<Arc<K>>;

    fn list(&self) -> Vec<Arc<K>>;

    /// True once the initial list has been received.
    fn has_synced(&self) -> bool;
}

pub struct KubeStoreImpl<K: 'static + Clone + reflector::Lookup>
where
    K::DynamicType: Eq + Hash + Clone + Default,
{
    store: reflector::Store<K>,
    synced: Arc<AtomicBool>,
}

impl<K: 'static + Clone + reflector::Lookup> KubeStore<K> for KubeStoreImpl<K>
where
    K: Send + Sync,
    K::DynamicType: Eq + Hash + Clone + Default + Send + Sync,
{
    fn get(&self, key: &reflector::ObjectRef<K>) -> Option<Arc<K>> {
        self.store.get(key)
    }

    fn list(&self) -> Vec<Arc<K>> {
        self.store.state()
    }

    fn has_synced(&self) -> bool {
        self.synced.load(Ordering::Acquire)
    }
}

impl<
        K: 'static
            + Clone
            + reflector::Lookup
            + kube::Resource
            + DeserializeOwned
            + Debug
            + Send
            + Sync,
    > KubeStoreImpl<K>
where
    <K as reflector::Lookup>::DynamicType: Eq + Hash + Clone + Default + Send + Sync,
{
    /// Starts a watch feeding a new store. The watch runs until `token` is cancelled.
    pub fn new(obj_client: kube::Api<K>, token: CancellationToken) -> Self {
        let (store, writer) = reflector::store();
        let kind = <K as reflector::Lookup>::kind(&Default::default()).to_string();

        tokio::spawn(async move {
            let obj_watcher = watcher(obj_client, watcher::Config::default())
                .default_backoff()
                .take_until(token.cancelled());
            reflector(writer, obj_watcher)
                .applied_objects()
                .for_each(|_| ready(()))
                .await;
        });

        let synced = Arc::new(AtomicBool::new(false));
        let readiness = store.clone();
        let flag = synced.clone();
        tokio::spawn(async move {
            match readiness.wait_until_ready().await {
                Ok(()) => {
                    debug!(%kind, "informer cache synced");
                    flag.store(true, Ordering::Release);
                }
                Err(_) => warn!("{}", StoreError::WatchStopped(kind)),
            }
        });

        Self { store, synced }
    }
}

/// An in-memory store for tests.
pub struct TestKubeStore<K: 'static + Clone + reflector::Lookup>
where
    K::DynamicType: Eq + Hash + Clone + Default,
{
    store: HashMap<reflector::ObjectRef<K>, Arc<K>>,
    synced: bool,
}

impl<K: 'static + Clone + reflector::Lookup> KubeStore<K> for TestKubeStore<K>
where
    K: Send + Sync,
    K::DynamicType: Eq + Hash + Clone + Default + Send + Sync,
{
    fn get(&self, key: &reflector::ObjectRef<K>) -> Option<Arc<K>> {
        self.store.get(key).cloned()
    }

    fn list(&self) -> Vec<Arc<K>> {
        self.store.values().cloned().collect()
    }

    fn has_synced(&self) -> bool {
        self.synced
    }
}

impl<K: 'static + Clone + reflector::Lookup + kube::Resource> TestKubeStore<K>
where
    <K as reflector::Lookup>::DynamicType: Eq + Hash + Clone + Default,
{
    pub fn new(objects: Vec<K>) -> Self {
        let store = objects
            .into_iter()
            .map(|o| ((&o).into(), Arc::new(o)))
            .collect();
        Self {
            store,
            synced: true,
        }
    }

    /// A store whose initial list never arrived.
    pub fn unsynced() -> Self {
        Self {
            store: HashMap::new(),
            synced: false,
        }
    }
}
