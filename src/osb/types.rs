use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An opaque broker operation token, handed back when polling.
pub type OperationKey = String;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogResponse {
    #[serde(default)]
    pub services: Vec<Service>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<String>,
    #[serde(default)]
    pub bindable: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub bindings_retrievable: bool,
    #[serde(rename = "plan_updateable", default, skip_serializing_if = "Option::is_none")]
    pub plan_updatable: Option<bool>,
    #[serde(default)]
    pub plans: Vec<Plan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dashboard_client: Option<DashboardClient>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardClient {
    pub id: String,
    pub secret: String,
    pub redirect_uri: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bindable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schemas: Option<Schemas>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schemas {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_instance: Option<ServiceInstanceSchema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_binding: Option<ServiceBindingSchema>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceInstanceSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create: Option<InputParametersSchema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<InputParametersSchema>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceBindingSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create: Option<InputParametersSchema>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputParametersSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

/// Identifies the platform user a request is made on behalf of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginatingIdentity {
    pub platform: String,
    /// Platform specific JSON describing the user.
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProvisionRequest {
    #[serde(skip)]
    pub instance_id: String,
    #[serde(skip)]
    pub accepts_incomplete: bool,
    pub service_id: String,
    pub plan_id: String,
    pub organization_guid: String,
    pub space_guid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Map<String, Value>>,
    #[serde(skip)]
    pub originating_identity: Option<OriginatingIdentity>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProvisionResponse {
    #[serde(skip)]
    pub is_async: bool,
    #[serde(default)]
    pub dashboard_url: Option<String>,
    #[serde(default, rename = "operation")]
    pub operation_key: Option<OperationKey>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateInstanceRequest {
    #[serde(skip)]
    pub instance_id: String,
    #[serde(skip)]
    pub accepts_incomplete: bool,
    pub service_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_values: Option<PreviousValues>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Map<String, Value>>,
    #[serde(skip)]
    pub originating_identity: Option<OriginatingIdentity>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PreviousValues {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub plan_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub service_id: String,
    #[serde(rename = "organization_id", skip_serializing_if = "String::is_empty")]
    pub org_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub space_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UpdateInstanceResponse {
    #[serde(skip)]
    pub is_async: bool,
    #[serde(default, rename = "operation")]
    pub operation_key: Option<OperationKey>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeprovisionRequest {
    pub instance_id: String,
    pub accepts_incomplete: bool,
    pub service_id: String,
    pub plan_id: String,
    pub originating_identity: Option<OriginatingIdentity>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DeprovisionResponse {
    #[serde(skip)]
    pub is_async: bool,
    #[serde(default, rename = "operation")]
    pub operation_key: Option<OperationKey>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LastOperationRequest {
    pub instance_id: String,
    pub service_id: Option<String>,
    pub plan_id: Option<String>,
    pub operation_key: Option<OperationKey>,
    pub originating_identity: Option<OriginatingIdentity>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LastOperationState {
    #[serde(rename = "in progress")]
    InProgress,
    #[serde(rename = "succeeded")]
    Succeeded,
    #[serde(rename = "failed")]
    Failed,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LastOperationResponse {
    pub state: LastOperationState,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BindRequest {
    #[serde(skip)]
    pub binding_id: String,
    #[serde(skip)]
    pub instance_id: String,
    #[serde(skip)]
    pub accepts_incomplete: bool,
    pub service_id: String,
    pub plan_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_guid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind_resource: Option<BindResource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Map<String, Value>>,
    #[serde(skip)]
    pub originating_identity: Option<OriginatingIdentity>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BindResource {
    #[serde(rename = "appGuid", skip_serializing_if = "Option::is_none")]
    pub app_guid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BindResponse {
    #[serde(skip)]
    pub is_async: bool,
    #[serde(default)]
    pub credentials: Option<Map<String, Value>>,
    #[serde(default)]
    pub syslog_drain_url: Option<String>,
    #[serde(default)]
    pub route_service_url: Option<String>,
    #[serde(default)]
    pub volume_mounts: Vec<Value>,
    #[serde(default, rename = "operation")]
    pub operation_key: Option<OperationKey>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnbindRequest {
    pub instance_id: String,
    pub binding_id: String,
    pub accepts_incomplete: bool,
    pub service_id: String,
    pub plan_id: String,
    pub originating_identity: Option<OriginatingIdentity>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UnbindResponse {
    #[serde(skip)]
    pub is_async: bool,
    #[serde(default, rename = "operation")]
    pub operation_key: Option<OperationKey>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetBindingRequest {
    pub instance_id: String,
    pub binding_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GetBindingResponse {
    #[serde(default)]
    pub credentials: Option<Map<String, Value>>,
    #[serde(default)]
    pub syslog_drain_url: Option<String>,
    #[serde(default)]
    pub route_service_url: Option<String>,
    #[serde(default)]
    pub volume_mounts: Vec<Value>,
    #[serde(default)]
    pub parameters: Option<Map<String, Value>>,
}

/// The body brokers send along with a failure status.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ErrorResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}
