use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{catalog_resource, ConditionStatus, LocalObjectReference, ParametersFromSource, UserInfo};

/// ServiceBinding requests credentials for a ServiceInstance in the same namespace.
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "servicecatalog.k8s.io",
    version = "v1beta1",
    kind = "ServiceBinding",
    plural = "servicebindings",
    namespaced,
    status = "ServiceBindingStatus",
    derive = "Default",
    derive = "PartialEq",
    printcolumn = r#"{"name":"Instance", "type":"string", "jsonPath":".spec.instanceRef.name"}"#,
    printcolumn = r#"{"name":"Secret", "type":"string", "jsonPath":".spec.secretName"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ServiceBindingSpec {
    /// The instance to bind to. Immutable.
    #[serde(default, rename = "instanceRef")]
    pub instance_ref: LocalObjectReference,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "crate::apis::preserve_unknown_fields")]
    pub parameters: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters_from: Vec<ParametersFromSource>,

    /// Name of the secret the credentials are written to. Defaults to the binding name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,

    #[serde(default, rename = "externalID")]
    pub external_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_info: Option<UserInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceBindingStatus {
    #[serde(default)]
    pub conditions: Vec<ServiceBindingCondition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_operation: Option<ServiceBindingOperation>,

    #[serde(default)]
    pub reconciled_generation: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_start_time: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_progress_properties: Option<ServiceBindingPropertiesState>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_properties: Option<ServiceBindingPropertiesState>,

    #[serde(default)]
    pub orphan_mitigation_in_progress: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

impl ServiceBindingStatus {
    pub fn is_ready(&self) -> bool {
        self.conditions.iter().any(|c| {
            c.type_ == ServiceBindingConditionType::Ready && c.status == ConditionStatus::True
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceBindingCondition {
    #[serde(rename = "type")]
    pub type_: ServiceBindingConditionType,
    pub status: ConditionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum ServiceBindingConditionType {
    #[default]
    Ready,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ServiceBindingOperation {
    Bind,
    Unbind,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceBindingPropertiesState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "crate::apis::preserve_unknown_fields")]
    pub parameters: Option<serde_json::Value>,

    #[serde(default, rename = "parameterChecksum", skip_serializing_if = "Option::is_none")]
    pub parameters_checksum: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_info: Option<UserInfo>,
}

catalog_resource!(ServiceBinding, ServiceBindingSpec, ServiceBindingStatus, true);
