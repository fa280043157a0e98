use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::{CatalogClient, KubeStore, KubeStoreImpl, StoreError, TestKubeStore};
use crate::apis::{ClusterServiceClass, ClusterServicePlan, ServiceClass, ServiceInstance, ServicePlan};

/// The informer caches shared by the admission plugins.
#[derive(Clone)]
pub struct Informers {
    pub cluster_service_classes: Arc<dyn KubeStore<ClusterServiceClass>>,
    pub cluster_service_plans: Arc<dyn KubeStore<ClusterServicePlan>>,
    pub service_classes: Arc<dyn KubeStore<ServiceClass>>,
    pub service_plans: Arc<dyn KubeStore<ServicePlan>>,
    pub service_instances: Arc<dyn KubeStore<ServiceInstance>>,
}

impl Informers {
    /// Starts one watch per kind, limited to `namespace` for the namespaced kinds when set.
    pub fn start(client: &CatalogClient, namespace: Option<&str>, token: CancellationToken) -> Self {
        Self {
            cluster_service_classes: Arc::new(KubeStoreImpl::new(
                client.cluster_service_classes(),
                token.clone(),
            )),
            cluster_service_plans: Arc::new(KubeStoreImpl::new(
                client.cluster_service_plans(),
                token.clone(),
            )),
            service_classes: Arc::new(KubeStoreImpl::new(
                client.service_classes(namespace),
                token.clone(),
            )),
            service_plans: Arc::new(KubeStoreImpl::new(
                client.service_plans(namespace),
                token.clone(),
            )),
            service_instances: Arc::new(KubeStoreImpl::new(
                client.service_instances(namespace),
                token,
            )),
        }
    }

    /// In-memory caches holding exactly the given objects.
    pub fn fake(
        cluster_service_classes: Vec<ClusterServiceClass>,
        cluster_service_plans: Vec<ClusterServicePlan>,
        service_classes: Vec<ServiceClass>,
        service_plans: Vec<ServicePlan>,
        service_instances: Vec<ServiceInstance>,
    ) -> Self {
        Self {
            cluster_service_classes: Arc::new(TestKubeStore::new(cluster_service_classes)),
            cluster_service_plans: Arc::new(TestKubeStore::new(cluster_service_plans)),
            service_classes: Arc::new(TestKubeStore::new(service_classes)),
            service_plans: Arc::new(TestKubeStore::new(service_plans)),
            service_instances: Arc::new(TestKubeStore::new(service_instances)),
        }
    }

    /// Ok once every cache received its initial list, otherwise names the first that has not.
    pub fn check_synced(&self) -> Result<(), StoreError> {
        let caches = [
            ("ClusterServiceClass", self.cluster_service_classes.has_synced()),
            ("ClusterServicePlan", self.cluster_service_plans.has_synced()),
            ("ServiceClass", self.service_classes.has_synced()),
            ("ServicePlan", self.service_plans.has_synced()),
            ("ServiceInstance", self.service_instances.has_synced()),
        ];
        match caches.iter().find(|(_, synced)| !synced) {
            Some((kind, _)) => Err(StoreError::NotSynced(kind.to_string())),
            None => Ok(()),
        }
    }
}
