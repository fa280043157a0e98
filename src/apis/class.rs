use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{catalog_resource, CatalogResource};

/// Fields shared by cluster-scoped and namespaced service classes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommonServiceClassSpec {
    /// ExternalName is the name the broker exposed this class as. Mutable.
    #[serde(default)]
    pub external_name: String,

    /// ExternalID is the identity of this object for use with the OSB API. Immutable.
    #[serde(default, rename = "externalID")]
    pub external_id: String,

    #[serde(default)]
    pub description: String,

    /// Bindable indicates whether instances of this class can be bound. Plans may override it.
    #[serde(default)]
    pub bindable: bool,

    /// PlanUpdatable indicates whether instances may change plans after being provisioned.
    #[serde(default)]
    pub plan_updatable: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "crate::apis::preserve_unknown_fields")]
    pub external_metadata: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<String>,
}

/// ClusterServiceClass is an offering of a ClusterServiceBroker.
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "servicecatalog.k8s.io",
    version = "v1beta1",
    kind = "ClusterServiceClass",
    plural = "clusterserviceclasses",
    status = "ServiceClassStatus",
    derive = "Default",
    derive = "PartialEq",
    printcolumn = r#"{"name":"External-Name", "type":"string", "jsonPath":".spec.externalName"}"#,
    printcolumn = r#"{"name":"Broker", "type":"string", "jsonPath":".spec.clusterServiceBrokerName"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterServiceClassSpec {
    #[serde(flatten)]
    pub common: CommonServiceClassSpec,

    /// The broker that provides this class. Immutable.
    #[serde(default)]
    pub cluster_service_broker_name: String,
}

/// ServiceClass is an offering of a namespaced ServiceBroker.
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "servicecatalog.k8s.io",
    version = "v1beta1",
    kind = "ServiceClass",
    plural = "serviceclasses",
    namespaced,
    status = "ServiceClassStatus",
    derive = "Default",
    derive = "PartialEq",
    printcolumn = r#"{"name":"External-Name", "type":"string", "jsonPath":".spec.externalName"}"#,
    printcolumn = r#"{"name":"Broker", "type":"string", "jsonPath":".spec.serviceBrokerName"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ServiceClassSpec {
    #[serde(flatten)]
    pub common: CommonServiceClassSpec,

    #[serde(default)]
    pub service_broker_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceClassStatus {
    /// The broker removed the class from its catalog.
    #[serde(default)]
    pub removed_from_broker_catalog: bool,
}

/// Operations shared by both class kinds.
pub trait ClassResource: CatalogResource<Status = ServiceClassStatus> {
    fn common(&self) -> &CommonServiceClassSpec;
    fn broker_name(&self) -> &str;
}

impl ClassResource for ClusterServiceClass {
    fn common(&self) -> &CommonServiceClassSpec {
        &self.spec.common
    }
    fn broker_name(&self) -> &str {
        &self.spec.cluster_service_broker_name
    }
}

impl ClassResource for ServiceClass {
    fn common(&self) -> &CommonServiceClassSpec {
        &self.spec.common
    }
    fn broker_name(&self) -> &str {
        &self.spec.service_broker_name
    }
}

catalog_resource!(ClusterServiceClass, ClusterServiceClassSpec, ServiceClassStatus, false);
catalog_resource!(ServiceClass, ServiceClassSpec, ServiceClassStatus, true);
