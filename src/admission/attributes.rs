use std::fmt::Display;

use kube::core::admission::{self, AdmissionRequest};
use kube::core::DynamicObject;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::err::AdmissionError;
use crate::apis::UserInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Update,
    Delete,
    Connect,
}

impl Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Operation::Create => "CREATE",
            Operation::Update => "UPDATE",
            Operation::Delete => "DELETE",
            Operation::Connect => "CONNECT",
        })
    }
}

impl From<admission::Operation> for Operation {
    fn from(value: admission::Operation) -> Self {
        match value {
            admission::Operation::Create => Operation::Create,
            admission::Operation::Update => Operation::Update,
            admission::Operation::Delete => Operation::Delete,
            admission::Operation::Connect => Operation::Connect,
        }
    }
}

/// Everything an admission plugin may inspect about a request. Mutating plugins replace
/// the object through [`Attributes::set_object`].
#[derive(Debug, Clone)]
pub struct Attributes {
    pub operation: Operation,
    pub group: String,
    pub kind: String,
    // Plural resource name as addressed by the client, e.g. `instances` or `serviceinstances`.
    pub resource: String,
    // Empty for the main resource.
    pub subresource: String,
    pub namespace: String,
    pub name: String,
    pub user: UserInfo,
    pub dry_run: bool,
    pub object: Option<Value>,
    pub old_object: Option<Value>,
}

impl Attributes {
    /// True for requests on the main resource (not a subresource) of one of `resources`.
    pub fn is_resource(&self, resources: &[&str]) -> bool {
        self.subresource.is_empty() && resources.contains(&self.resource.as_str())
    }

    pub fn object_as<K: DeserializeOwned>(&self) -> Result<Option<K>, AdmissionError> {
        decode(self.object.as_ref(), &self.kind)
    }

    pub fn old_object_as<K: DeserializeOwned>(&self) -> Result<Option<K>, AdmissionError> {
        decode(self.old_object.as_ref(), &self.kind)
    }

    pub fn set_object<K: Serialize>(&mut self, obj: &K) -> Result<(), AdmissionError> {
        let value = serde_json::to_value(obj)
            .map_err(|e| AdmissionError::Internal(format!("failed to encode {}: {e}", self.kind)))?;
        self.object = Some(value);
        Ok(())
    }

    /// `namespace/name` of the object, or just the name for cluster scoped objects.
    pub fn object_key(&self) -> String {
        match self.namespace.as_str() {
            "" => self.name.clone(),
            ns => format!("{ns}/{}", self.name),
        }
    }
}

fn decode<K: DeserializeOwned>(value: Option<&Value>, kind: &str) -> Result<Option<K>, AdmissionError> {
    value
        .map(|v| {
            serde_json::from_value(v.clone()).map_err(|source| AdmissionError::Decode {
                kind: kind.to_string(),
                source,
            })
        })
        .transpose()
}

fn to_value(obj: Option<&DynamicObject>) -> Result<Option<Value>, AdmissionError> {
    obj.map(serde_json::to_value)
        .transpose()
        .map_err(|e| AdmissionError::BadRequest(format!("unreadable object: {e}")))
}

impl TryFrom<&AdmissionRequest<DynamicObject>> for Attributes {
    type Error = AdmissionError;

    fn try_from(req: &AdmissionRequest<DynamicObject>) -> Result<Self, Self::Error> {
        let user = &req.user_info;
        Ok(Attributes {
            operation: req.operation.clone().into(),
            group: req.kind.group.clone(),
            kind: req.kind.kind.clone(),
            resource: req.resource.resource.clone(),
            subresource: req.sub_resource.clone().unwrap_or_default(),
            namespace: req.namespace.clone().unwrap_or_default(),
            name: req.name.clone(),
            user: UserInfo {
                username: user.username.clone().unwrap_or_default(),
                uid: user.uid.clone().unwrap_or_default(),
                groups: user.groups.clone().unwrap_or_default(),
                extra: user.extra.clone().unwrap_or_default().into_iter().collect(),
            },
            dry_run: req.dry_run,
            object: to_value(req.object.as_ref())?,
            old_object: to_value(req.old_object.as_ref())?,
        })
    }
}

#[cfg(test)]
mod test {
    use kube::core::admission::AdmissionReview;

    use super::*;
    use crate::apis::ServiceInstance;

    fn request(sub_resource: Option<&str>) -> AdmissionRequest<DynamicObject> {
        let mut review = serde_json::json!({
            "apiVersion": "admission.k8s.io/v1",
            "kind": "AdmissionReview",
            "request": {
                "uid": "705ab4f5-6393-11e8-b7cc-42010a800002",
                "kind": {"group": "servicecatalog.k8s.io", "version": "v1beta1", "kind": "ServiceInstance"},
                "resource": {"group": "servicecatalog.k8s.io", "version": "v1beta1", "resource": "instances"},
                "requestKind": {"group": "servicecatalog.k8s.io", "version": "v1beta1", "kind": "ServiceInstance"},
                "requestResource": {"group": "servicecatalog.k8s.io", "version": "v1beta1", "resource": "instances"},
                "name": "test-instance",
                "namespace": "test-ns",
                "operation": "CREATE",
                "userInfo": {
                    "username": "alice",
                    "uid": "1234",
                    "groups": ["devs"],
                    "extra": {"scopes": ["a", "b"]}
                },
                "object": {
                    "apiVersion": "servicecatalog.k8s.io/v1beta1",
                    "kind": "ServiceInstance",
                    "metadata": {"name": "test-instance", "namespace": "test-ns"},
                    "spec": {"clusterServiceClassExternalName": "mysql"}
                },
                "oldObject": null,
                "dryRun": false
            }
        });
        if let Some(sub) = sub_resource {
            review["request"]["subResource"] = Value::String(sub.to_string());
        }
        let review: AdmissionReview<DynamicObject> = serde_json::from_value(review).unwrap();
        review.try_into().unwrap()
    }

    #[test]
    fn test_attributes_from_request() {
        let attrs = Attributes::try_from(&request(None)).unwrap();
        assert_eq!(attrs.operation, Operation::Create);
        assert_eq!(attrs.kind, "ServiceInstance");
        assert_eq!(attrs.object_key(), "test-ns/test-instance");
        assert_eq!(attrs.user.username, "alice");
        assert_eq!(attrs.user.groups, vec!["devs"]);
        assert_eq!(attrs.user.extra["scopes"], vec!["a", "b"]);
        assert!(attrs.is_resource(&["serviceinstances", "instances"]));
        assert!(!attrs.is_resource(&["servicebindings"]));

        let instance: ServiceInstance = attrs.object_as().unwrap().unwrap();
        assert_eq!(
            instance.spec.plan_reference.cluster_service_class_external_name.as_deref(),
            Some("mysql")
        );
        assert!(attrs.old_object_as::<ServiceInstance>().unwrap().is_none());
    }

    #[test]
    fn test_subresource_is_not_the_resource() {
        let attrs = Attributes::try_from(&request(Some("status"))).unwrap();
        assert_eq!(attrs.subresource, "status");
        assert!(!attrs.is_resource(&["instances"]));
    }
}
