use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{
    catalog_resource, ClusterObjectReference, ConditionStatus, LocalObjectReference,
    ParametersFromSource, UserInfo,
};

/// Selects the class and plan of an instance, either by the names the broker gave them
/// (`*ExternalName`) or by their Kubernetes object names (`*Name`). Cluster and namespaced
/// fields are mutually exclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlanReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_service_class_external_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_service_plan_external_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_service_class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_service_plan_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_class_external_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_plan_external_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_plan_name: Option<String>,
}

fn set(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}

impl PlanReference {
    pub fn cluster_class_specified(&self) -> bool {
        set(&self.cluster_service_class_external_name) || set(&self.cluster_service_class_name)
    }

    pub fn cluster_plan_specified(&self) -> bool {
        set(&self.cluster_service_plan_external_name) || set(&self.cluster_service_plan_name)
    }

    pub fn namespaced_class_specified(&self) -> bool {
        set(&self.service_class_external_name) || set(&self.service_class_name)
    }

    pub fn namespaced_plan_specified(&self) -> bool {
        set(&self.service_plan_external_name) || set(&self.service_plan_name)
    }

    pub fn class_specified(&self) -> bool {
        self.cluster_class_specified() || self.namespaced_class_specified()
    }

    pub fn plan_specified(&self) -> bool {
        self.cluster_plan_specified() || self.namespaced_plan_specified()
    }

    /// Human readable form used in log and error messages.
    pub fn class_description(&self) -> String {
        let pick = [
            ("ClusterServiceClass", "externalName", &self.cluster_service_class_external_name),
            ("ClusterServiceClass", "name", &self.cluster_service_class_name),
            ("ServiceClass", "externalName", &self.service_class_external_name),
            ("ServiceClass", "name", &self.service_class_name),
        ]
        .into_iter()
        .find(|(_, _, v)| set(v));
        match pick {
            Some((kind, field, Some(v))) => format!("{kind} ({field}): \"{v}\""),
            _ => "<unspecified class>".to_string(),
        }
    }
}

/// ServiceInstance is a provisioned instance of a service plan.
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "servicecatalog.k8s.io",
    version = "v1beta1",
    kind = "ServiceInstance",
    plural = "serviceinstances",
    namespaced,
    status = "ServiceInstanceStatus",
    derive = "Default",
    derive = "PartialEq",
    printcolumn = r#"{"name":"Class", "type":"string", "jsonPath":".spec.clusterServiceClassExternalName"}"#,
    printcolumn = r#"{"name":"Plan", "type":"string", "jsonPath":".spec.clusterServicePlanExternalName"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInstanceSpec {
    #[serde(flatten)]
    pub plan_reference: PlanReference,

    // The resolved class and plan. Only the controller sets these, with an update that
    // changes nothing else.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_service_class_ref: Option<ClusterObjectReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_service_plan_ref: Option<ClusterObjectReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_class_ref: Option<LocalObjectReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_plan_ref: Option<LocalObjectReference>,

    /// Parameters sent to the broker. Must be a JSON object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "crate::apis::preserve_unknown_fields")]
    pub parameters: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters_from: Vec<ParametersFromSource>,

    /// The identity of this instance in the OSB API. Generated when left empty.
    #[serde(default, rename = "externalID")]
    pub external_id: String,

    /// The user that last changed the spec. Set by the catalog, never by clients.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_info: Option<UserInfo>,

    /// Bumping this counter requests an update against the broker without changing the spec.
    #[serde(default)]
    pub update_requests: i64,
}

impl ServiceInstanceSpec {
    pub fn class_ref_set(&self) -> bool {
        self.cluster_service_class_ref.is_some() || self.service_class_ref.is_some()
    }

    pub fn plan_ref_set(&self) -> bool {
        self.cluster_service_plan_ref.is_some() || self.service_plan_ref.is_some()
    }

    pub fn clear_refs(&mut self) {
        self.cluster_service_class_ref = None;
        self.cluster_service_plan_ref = None;
        self.service_class_ref = None;
        self.service_plan_ref = None;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInstanceStatus {
    #[serde(default)]
    pub conditions: Vec<ServiceInstanceCondition>,

    /// An asynchronous operation against the broker is in progress.
    #[serde(default)]
    pub async_op_in_progress: bool,

    #[serde(default)]
    pub orphan_mitigation_in_progress: bool,

    /// Operation key returned by the broker for the in-flight async operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_operation: Option<String>,

    #[serde(default, rename = "dashboardURL", skip_serializing_if = "Option::is_none")]
    pub dashboard_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_operation: Option<ServiceInstanceOperation>,

    #[serde(default)]
    pub reconciled_generation: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_start_time: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_progress_properties: Option<ServiceInstancePropertiesState>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_properties: Option<ServiceInstancePropertiesState>,

    #[serde(default)]
    pub deprovision_status: ServiceInstanceDeprovisionStatus,

    /// SHA-256 of the spec as of the last transition to Ready.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

impl ServiceInstanceStatus {
    pub fn is_ready(&self) -> bool {
        self.conditions.iter().any(|c| {
            c.type_ == ServiceInstanceConditionType::Ready && c.status == ConditionStatus::True
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInstanceCondition {
    #[serde(rename = "type")]
    pub type_: ServiceInstanceConditionType,
    pub status: ConditionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum ServiceInstanceConditionType {
    #[default]
    Ready,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ServiceInstanceOperation {
    Provision,
    Update,
    Deprovision,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum ServiceInstanceDeprovisionStatus {
    // No provision request was ever sent, so none needs to be undone.
    NotRequired,
    // A provision request was sent; a deprovision must happen before deletion.
    #[default]
    Required,
    Succeeded,
    // The controller gave up deprovisioning.
    Failed,
}

/// What the broker knows about an instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInstancePropertiesState {
    #[serde(default)]
    pub cluster_service_plan_external_name: String,

    #[serde(default, rename = "clusterServicePlanExternalID")]
    pub cluster_service_plan_external_id: String,

    /// Parameters as sent; values sourced from secrets read `<redacted>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "crate::apis::preserve_unknown_fields")]
    pub parameters: Option<serde_json::Value>,

    #[serde(default, rename = "parameterChecksum", skip_serializing_if = "Option::is_none")]
    pub parameters_checksum: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_info: Option<UserInfo>,
}

catalog_resource!(ServiceInstance, ServiceInstanceSpec, ServiceInstanceStatus, true);
