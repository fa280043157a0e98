use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{catalog_resource, CatalogResource, ClusterObjectReference, LocalObjectReference};

/// Fields shared by cluster-scoped and namespaced service plans.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommonServicePlanSpec {
    /// ExternalName is the name the broker exposed this plan as. Mutable.
    #[serde(default)]
    pub external_name: String,

    /// ExternalID is the identity of this object for use with the OSB API. Immutable.
    #[serde(default, rename = "externalID")]
    pub external_id: String,

    #[serde(default)]
    pub description: String,

    /// Overrides the class-level bindable flag when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bindable: Option<bool>,

    #[serde(default)]
    pub free: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "crate::apis::preserve_unknown_fields")]
    pub external_metadata: Option<serde_json::Value>,

    /// JSON schema for the parameters accepted when provisioning an instance of this plan.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "crate::apis::preserve_unknown_fields")]
    pub instance_create_parameter_schema: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "crate::apis::preserve_unknown_fields")]
    pub instance_update_parameter_schema: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "crate::apis::preserve_unknown_fields")]
    pub service_binding_create_parameter_schema: Option<serde_json::Value>,
}

/// ClusterServicePlan is a tier of a ClusterServiceClass.
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "servicecatalog.k8s.io",
    version = "v1beta1",
    kind = "ClusterServicePlan",
    plural = "clusterserviceplans",
    status = "ServicePlanStatus",
    derive = "Default",
    derive = "PartialEq",
    printcolumn = r#"{"name":"External-Name", "type":"string", "jsonPath":".spec.externalName"}"#,
    printcolumn = r#"{"name":"Class", "type":"string", "jsonPath":".spec.clusterServiceClassRef.name"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterServicePlanSpec {
    #[serde(flatten)]
    pub common: CommonServicePlanSpec,

    #[serde(default)]
    pub cluster_service_broker_name: String,

    /// The class this plan belongs to. Immutable.
    #[serde(default)]
    pub cluster_service_class_ref: ClusterObjectReference,
}

/// ServicePlan is a tier of a namespaced ServiceClass.
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "servicecatalog.k8s.io",
    version = "v1beta1",
    kind = "ServicePlan",
    plural = "serviceplans",
    namespaced,
    status = "ServicePlanStatus",
    derive = "Default",
    derive = "PartialEq",
    printcolumn = r#"{"name":"External-Name", "type":"string", "jsonPath":".spec.externalName"}"#,
    printcolumn = r#"{"name":"Class", "type":"string", "jsonPath":".spec.serviceClassRef.name"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ServicePlanSpec {
    #[serde(flatten)]
    pub common: CommonServicePlanSpec,

    #[serde(default)]
    pub service_broker_name: String,

    #[serde(default)]
    pub service_class_ref: LocalObjectReference,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServicePlanStatus {
    #[serde(default)]
    pub removed_from_broker_catalog: bool,
}

/// Operations shared by both plan kinds.
pub trait PlanResource: CatalogResource<Status = ServicePlanStatus> {
    fn common(&self) -> &CommonServicePlanSpec;
    fn broker_name(&self) -> &str;
    /// Name of the class this plan belongs to.
    fn class_name(&self) -> &str;
    /// JSON path of the class reference, for error reporting.
    fn class_ref_field() -> &'static str;
}

impl PlanResource for ClusterServicePlan {
    fn common(&self) -> &CommonServicePlanSpec {
        &self.spec.common
    }
    fn broker_name(&self) -> &str {
        &self.spec.cluster_service_broker_name
    }
    fn class_name(&self) -> &str {
        &self.spec.cluster_service_class_ref.name
    }
    fn class_ref_field() -> &'static str {
        "clusterServiceClassRef"
    }
}

impl PlanResource for ServicePlan {
    fn common(&self) -> &CommonServicePlanSpec {
        &self.spec.common
    }
    fn broker_name(&self) -> &str {
        &self.spec.service_broker_name
    }
    fn class_name(&self) -> &str {
        &self.spec.service_class_ref.name
    }
    fn class_ref_field() -> &'static str {
        "serviceClassRef"
    }
}

catalog_resource!(ClusterServicePlan, ClusterServicePlanSpec, ServicePlanStatus, false);
catalog_resource!(ServicePlan, ServicePlanSpec, ServicePlanStatus, true);
