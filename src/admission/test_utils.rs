#[cfg(test)]
use std::sync::Arc;

#[cfg(test)]
use serde::Serialize;

#[cfg(test)]
use super::{Attributes, FakeAccessReviewer, Operation, PluginContext};
#[cfg(test)]
use crate::apis::{UserInfo, GROUP_NAME};
#[cfg(test)]
use crate::client::Informers;

#[cfg(test)]
pub struct AttributesBuilder {
    attrs: Attributes,
}

#[cfg(test)]
impl AttributesBuilder {
    pub fn new(operation: Operation, resource: &str, namespace: &str, name: &str) -> Self {
        Self {
            attrs: Attributes {
                operation,
                group: GROUP_NAME.to_string(),
                kind: String::new(),
                resource: resource.to_string(),
                subresource: String::new(),
                namespace: namespace.to_string(),
                name: name.to_string(),
                user: UserInfo {
                    username: "test-user".to_string(),
                    ..Default::default()
                },
                dry_run: false,
                object: None,
                old_object: None,
            },
        }
    }

    pub fn create(resource: &str, namespace: &str, name: &str) -> Self {
        Self::new(Operation::Create, resource, namespace, name)
    }

    pub fn update(resource: &str, namespace: &str, name: &str) -> Self {
        Self::new(Operation::Update, resource, namespace, name)
    }

    pub fn delete(resource: &str, namespace: &str, name: &str) -> Self {
        Self::new(Operation::Delete, resource, namespace, name)
    }

    pub fn with_object<K: Serialize + kube::Resource<DynamicType = ()>>(mut self, obj: &K) -> Self {
        self.attrs.kind = K::kind(&()).to_string();
        self.attrs.object = Some(serde_json::to_value(obj).unwrap());
        self
    }

    pub fn with_old_object<K: Serialize>(mut self, obj: &K) -> Self {
        self.attrs.old_object = Some(serde_json::to_value(obj).unwrap());
        self
    }

    pub fn with_subresource(mut self, subresource: &str) -> Self {
        self.attrs.subresource = subresource.to_string();
        self
    }

    pub fn with_user(mut self, username: &str, groups: &[&str]) -> Self {
        self.attrs.user = UserInfo {
            username: username.to_string(),
            uid: format!("{username}-uid"),
            groups: groups.iter().map(|g| g.to_string()).collect(),
            ..Default::default()
        };
        self
    }

    pub fn build(self) -> Attributes {
        self.attrs
    }
}

/// A plugin context with empty synced caches and an allowing access reviewer.
#[cfg(test)]
pub fn test_context() -> PluginContext {
    PluginContext {
        informers: Informers::fake(vec![], vec![], vec![], vec![], vec![]),
        access_reviewer: Arc::new(FakeAccessReviewer::allowing()),
    }
}
