//! Typed access to the catalog resources: `kube::Api` handles per kind, and the informer
//! caches the admission plugins and controllers read from.

mod informers;
mod lookup;
mod store;

pub use informers::*;
pub use lookup::*;
pub use store::*;

use std::fmt::Debug;

use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, Patch, PatchParams, PostParams};
use kube::{Client, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::apis::{
    ClusterServiceBroker, ClusterServiceClass, ClusterServicePlan, ServiceBinding, ServiceBroker,
    ServiceClass, ServiceInstance, ServicePlan,
};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("object has no {0}")]
    MissingMetadata(&'static str),
    #[error("failed to encode object: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Kube(#[from] kube::Error),
}

macro_rules! cluster_api {
    ($fn:ident, $kind:ty) => {
        pub fn $fn(&self) -> Api<$kind> {
            Api::all(self.client.clone())
        }
    };
}

macro_rules! namespaced_api {
    ($fn:ident, $kind:ty) => {
        /// Scoped to `namespace`, or across all namespaces when `None`.
        pub fn $fn(&self, namespace: Option<&str>) -> Api<$kind> {
            match namespace {
                Some(ns) => Api::namespaced(self.client.clone(), ns),
                None => Api::all(self.client.clone()),
            }
        }
    };
}

#[derive(Clone)]
pub struct CatalogClient {
    client: Client,
}

impl CatalogClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    cluster_api!(cluster_service_brokers, ClusterServiceBroker);
    cluster_api!(cluster_service_classes, ClusterServiceClass);
    cluster_api!(cluster_service_plans, ClusterServicePlan);
    namespaced_api!(service_brokers, ServiceBroker);
    namespaced_api!(service_classes, ServiceClass);
    namespaced_api!(service_plans, ServicePlan);
    namespaced_api!(service_instances, ServiceInstance);
    namespaced_api!(service_bindings, ServiceBinding);

    /// Broker auth secrets.
    pub fn secrets(&self, namespace: &str) -> Api<Secret> {
        Api::namespaced(self.client.clone(), namespace)
    }

    /// Writes the class and plan references the controller resolved for `instance`.
    ///
    /// The references travel on the main resource; the webhook recognizes an update that
    /// only sets them and applies the reference rules instead of the user update rules.
    pub async fn update_instance_references(
        &self,
        instance: &ServiceInstance,
    ) -> Result<ServiceInstance, ClientError> {
        let (namespace, name) = namespaced_name(&instance.metadata)?;
        Ok(self
            .service_instances(Some(namespace))
            .replace(name, &PostParams::default(), instance)
            .await?)
    }
}

/// Merge-patches the status subresource of `name`.
pub async fn patch_status<K, S>(api: &Api<K>, name: &str, status: &S) -> Result<K, ClientError>
where
    K: Clone + DeserializeOwned + Debug,
    S: Serialize,
{
    let status = serde_json::to_value(status)?;
    let patch = Patch::Merge(serde_json::json!({ "status": status }));
    Ok(api.patch_status(name, &PatchParams::default(), &patch).await?)
}

/// Replaces the status subresource with the status of `obj`. Fields left unset are cleared,
/// and a stale resource version is rejected.
pub async fn replace_status<K>(api: &Api<K>, obj: &K) -> Result<K, ClientError>
where
    K: Resource + Clone + DeserializeOwned + Serialize + Debug,
{
    let name = obj
        .meta()
        .name
        .as_deref()
        .ok_or(ClientError::MissingMetadata("name"))?;
    let data = serde_json::to_vec(obj)?;
    Ok(api.replace_status(name, &PostParams::default(), data).await?)
}

fn namespaced_name(
    meta: &k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta,
) -> Result<(&str, &str), ClientError> {
    let namespace = meta
        .namespace
        .as_deref()
        .ok_or(ClientError::MissingMetadata("namespace"))?;
    let name = meta
        .name
        .as_deref()
        .ok_or(ClientError::MissingMetadata("name"))?;
    Ok((namespace, name))
}

#[cfg(test)]
mod test {
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    use super::*;

    #[test]
    fn test_namespaced_name() {
        let meta = ObjectMeta {
            name: Some("name".to_string()),
            namespace: Some("ns".to_string()),
            ..Default::default()
        };
        assert_eq!(namespaced_name(&meta).unwrap(), ("ns", "name"));

        let err = namespaced_name(&ObjectMeta {
            name: Some("name".to_string()),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "object has no namespace");
    }
}
