use std::time::Duration;

use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{catalog_resource, parse_duration, CatalogResource, ConditionStatus, LocalObjectReference, ObjectReference};

/// Relist interval applied when a broker asks for `Duration` relisting without giving one.
pub const DEFAULT_RELIST_DURATION: &str = "15m";

/// Fields shared by cluster-scoped and namespaced brokers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommonServiceBrokerSpec {
    /// URL is the address used to communicate with the broker.
    #[serde(default)]
    pub url: String,

    /// InsecureSkipTLSVerify disables TLS certificate verification when communicating with this broker.
    /// This is strongly discouraged. You should use the CABundle instead.
    #[serde(default, rename = "insecureSkipTLSVerify")]
    pub insecure_skip_tls_verify: bool,

    /// CABundle is a base64 encoded PEM CA bundle used to validate the broker's serving certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_bundle: Option<String>,

    /// RelistBehavior specifies how the catalog relists the broker's classes and plans.
    #[serde(default)]
    pub relist_behavior: ServiceBrokerRelistBehavior,

    /// RelistDuration is the relist frequency when RelistBehavior is `Duration`, e.g. `15m`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relist_duration: Option<String>,

    /// RelistRequests is a strictly increasing, non-negative counter that users bump to
    /// trigger a manual relist.
    #[serde(default)]
    pub relist_requests: i64,
}

impl CommonServiceBrokerSpec {
    /// The parsed relist interval, if one is set and well formed.
    pub fn relist_interval(&self) -> Option<Duration> {
        self.relist_duration
            .as_deref()
            .and_then(|d| parse_duration(d).ok())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum ServiceBrokerRelistBehavior {
    // The broker is relisted automatically after RelistDuration has passed.
    #[default]
    Duration,
    // The broker is only relisted when its spec changes.
    Manual,
}

/// Credentials used to talk to a broker. At most one method may be set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ServiceBrokerAuthInfo<R> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basic: Option<SecretAuthConfig<R>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer: Option<SecretAuthConfig<R>>,
}

impl<R> Default for ServiceBrokerAuthInfo<R> {
    fn default() -> Self {
        Self {
            basic: None,
            bearer: None,
        }
    }
}

/// Basic auth reads `username`/`password` from the secret, bearer auth reads `token`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretAuthConfig<R> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<R>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    Basic,
    Bearer,
}

impl AuthMethod {
    pub fn field_name(&self) -> &'static str {
        match self {
            AuthMethod::Basic => "basic",
            AuthMethod::Bearer => "bearer",
        }
    }
}

/// A secret reference resolved against the broker's scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSecretRef {
    pub method: AuthMethod,
    pub namespace: Option<String>,
    pub name: Option<String>,
}

impl AuthSecretRef {
    pub fn is_complete(&self) -> bool {
        matches!((&self.namespace, &self.name), (Some(ns), Some(n)) if !ns.is_empty() && !n.is_empty())
    }
}

/// ClusterServiceBroker is a cluster-scoped OSB API v2 broker.
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "servicecatalog.k8s.io",
    version = "v1beta1",
    kind = "ClusterServiceBroker",
    plural = "clusterservicebrokers",
    status = "ServiceBrokerStatus",
    derive = "Default",
    derive = "PartialEq",
    printcolumn = r#"{"name":"URL", "type":"string", "jsonPath":".spec.url"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterServiceBrokerSpec {
    #[serde(flatten)]
    pub common: CommonServiceBrokerSpec,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_info: Option<ServiceBrokerAuthInfo<ObjectReference>>,
}

/// ServiceBroker is a broker whose classes and plans are only visible in its namespace.
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "servicecatalog.k8s.io",
    version = "v1beta1",
    kind = "ServiceBroker",
    plural = "servicebrokers",
    namespaced,
    status = "ServiceBrokerStatus",
    derive = "Default",
    derive = "PartialEq",
    printcolumn = r#"{"name":"URL", "type":"string", "jsonPath":".spec.url"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ServiceBrokerSpec {
    #[serde(flatten)]
    pub common: CommonServiceBrokerSpec,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_info: Option<ServiceBrokerAuthInfo<LocalObjectReference>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceBrokerStatus {
    #[serde(default)]
    pub conditions: Vec<ServiceBrokerCondition>,

    /// ReconciledGeneration is the generation of the spec that was last processed by the controller.
    #[serde(default)]
    pub reconciled_generation: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_start_time: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_catalog_retrieval_time: Option<String>,

    /// SHA-256 of the spec as of the last transition to Ready.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

impl ServiceBrokerStatus {
    pub fn is_ready(&self) -> bool {
        self.conditions.iter().any(|c| {
            c.type_ == ServiceBrokerConditionType::Ready && c.status == ConditionStatus::True
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceBrokerCondition {
    #[serde(rename = "type")]
    pub type_: ServiceBrokerConditionType,
    pub status: ConditionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum ServiceBrokerConditionType {
    #[default]
    Ready,
    // A final failure that should not be retried.
    Failed,
}

/// Operations shared by both broker kinds.
pub trait BrokerResource: CatalogResource<Status = ServiceBrokerStatus> {
    fn common(&self) -> &CommonServiceBrokerSpec;
    fn common_mut(&mut self) -> &mut CommonServiceBrokerSpec;

    /// The configured auth secrets, one entry per method set on the spec.
    fn auth_secret_refs(&self) -> Vec<AuthSecretRef>;

    /// The secret the catalog reads broker credentials from, if fully specified.
    fn auth_secret(&self) -> Option<AuthSecretRef> {
        self.auth_secret_refs().into_iter().find(|r| r.is_complete())
    }
}

fn collect_refs<R>(
    auth: Option<&ServiceBrokerAuthInfo<R>>,
    resolve: impl Fn(&R) -> (Option<String>, Option<String>),
) -> Vec<AuthSecretRef> {
    let Some(auth) = auth else {
        return Vec::new();
    };
    [
        (AuthMethod::Basic, auth.basic.as_ref()),
        (AuthMethod::Bearer, auth.bearer.as_ref()),
    ]
    .into_iter()
    .filter_map(|(method, config)| {
        let config = config?;
        let (namespace, name) = match &config.secret_ref {
            Some(r) => resolve(r),
            None => (None, None),
        };
        Some(AuthSecretRef {
            method,
            namespace,
            name,
        })
    })
    .collect()
}

impl BrokerResource for ClusterServiceBroker {
    fn common(&self) -> &CommonServiceBrokerSpec {
        &self.spec.common
    }
    fn common_mut(&mut self) -> &mut CommonServiceBrokerSpec {
        &mut self.spec.common
    }
    fn auth_secret_refs(&self) -> Vec<AuthSecretRef> {
        collect_refs(self.spec.auth_info.as_ref(), |r: &ObjectReference| {
            (r.namespace.clone(), r.name.clone())
        })
    }
}

impl BrokerResource for ServiceBroker {
    fn common(&self) -> &CommonServiceBrokerSpec {
        &self.spec.common
    }
    fn common_mut(&mut self) -> &mut CommonServiceBrokerSpec {
        &mut self.spec.common
    }
    fn auth_secret_refs(&self) -> Vec<AuthSecretRef> {
        // Namespaced brokers may only read secrets from their own namespace.
        let namespace = self.namespace();
        collect_refs(self.spec.auth_info.as_ref(), |r: &LocalObjectReference| {
            (
                namespace.clone(),
                Some(r.name.clone()).filter(|n| !n.is_empty()),
            )
        })
    }
}

catalog_resource!(ClusterServiceBroker, ClusterServiceBrokerSpec, ServiceBrokerStatus, false);
catalog_resource!(ServiceBroker, ServiceBrokerSpec, ServiceBrokerStatus, true);
