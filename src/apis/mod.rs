//! Custom resource types of the `servicecatalog.k8s.io` API group.

mod binding;
mod broker;
mod class;
mod duration;
mod instance;
mod plan;

pub use binding::*;
pub use broker::*;
pub use class::*;
pub use duration::*;
pub use instance::*;
pub use plan::*;

use std::collections::BTreeMap;

use kube::CustomResourceExt;
use schemars::gen::SchemaGenerator;
use schemars::schema::{Schema, SchemaObject};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;

pub const GROUP_NAME: &str = "servicecatalog.k8s.io";
pub const VERSION: &str = "v1beta1";

/// Finalizer placed on every catalog object at creation.
pub const FINALIZER_SERVICE_CATALOG: &str = "kubernetes-incubator/service-catalog";

/// Key of the username in a basic auth secret.
pub const BASIC_AUTH_USERNAME_KEY: &str = "username";
/// Key of the password in a basic auth secret.
pub const BASIC_AUTH_PASSWORD_KEY: &str = "password";
/// Key of the token in a bearer token secret.
pub const BEARER_TOKEN_KEY: &str = "token";

// Legacy kind names still accepted by older clients.
pub type Broker = ClusterServiceBroker;
pub type Instance = ServiceInstance;
pub type Binding = ServiceBinding;

/// Common accessors over every catalog kind, used by the generic strategies and stores.
pub trait CatalogResource:
    kube::Resource<DynamicType = ()>
    + Clone
    + std::fmt::Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    type Spec: Serialize + Clone + PartialEq + std::fmt::Debug;
    type Status: Serialize + Clone + Default + PartialEq + std::fmt::Debug;

    const NAMESPACED: bool;

    fn spec(&self) -> &Self::Spec;
    fn spec_mut(&mut self) -> &mut Self::Spec;
    fn status(&self) -> Option<&Self::Status>;
    fn status_mut(&mut self) -> &mut Option<Self::Status>;
}

macro_rules! catalog_resource {
    ($kind:ty, $spec:ty, $status:ty, $namespaced:expr) => {
        impl $crate::apis::CatalogResource for $kind {
            type Spec = $spec;
            type Status = $status;

            const NAMESPACED: bool = $namespaced;

            fn spec(&self) -> &Self::Spec {
                &self.spec
            }
            fn spec_mut(&mut self) -> &mut Self::Spec {
                &mut self.spec
            }
            fn status(&self) -> Option<&Self::Status> {
                self.status.as_ref()
            }
            fn status_mut(&mut self) -> &mut Option<Self::Status> {
                &mut self.status
            }
        }
    };
}
pub(crate) use catalog_resource;

/// All custom resource definitions served by the catalog, in install order.
pub fn crds() -> Vec<CustomResourceDefinition> {
    vec![
        ClusterServiceBroker::crd(),
        ServiceBroker::crd(),
        ClusterServiceClass::crd(),
        ServiceClass::crd(),
        ClusterServicePlan::crd(),
        ServicePlan::crd(),
        ServiceInstance::crd(),
        ServiceBinding::crd(),
    ]
}

// ConditionStatus represents a condition's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum ConditionStatus {
    True,
    False,
    #[default]
    Unknown,
}

/// Reference to an object in a specific namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ObjectReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Reference to an object in the same namespace as the referrer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LocalObjectReference {
    #[serde(default)]
    pub name: String,
}

/// Reference to a cluster-scoped object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ClusterObjectReference {
    #[serde(default)]
    pub name: String,
}

/// The user that last changed a resource's spec, as reported by the apiserver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct UserInfo {
    pub username: String,
    #[serde(default)]
    pub uid: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Vec<String>>,
}

/// A source of parameters for a provision or bind request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParametersFromSource {
    // The Secret key to select from. The value must be a JSON object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key_ref: Option<SecretKeyReference>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SecretKeyReference {
    pub name: String,
    pub key: String,
}

/// Schema for free-form JSON blobs (parameters, metadata, parameter schemas).
pub(crate) fn preserve_unknown_fields(_: &mut SchemaGenerator) -> Schema {
    let mut schema = SchemaObject::default();
    schema.extensions.insert(
        "x-kubernetes-preserve-unknown-fields".to_string(),
        serde_json::Value::Bool(true),
    );
    Schema::Object(schema)
}
