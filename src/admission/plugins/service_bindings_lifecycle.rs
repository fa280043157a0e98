use std::sync::Arc;

use async_trait::async_trait;
use kube::runtime::reflector::ObjectRef;
use tracing::debug;

use crate::admission::{
    AdmissionError, AdmissionResult, Attributes, Handler, Interface, Operation, ReadyGate,
    ValidationInterface,
};
use crate::apis::{ServiceBinding, ServiceInstance};
use crate::client::KubeStore;

pub const PLUGIN_NAME: &str = "ServiceBindingsLifecycle";

const BINDING_RESOURCES: &[&str] = &["servicebindings", "bindings"];

/// Rejects new bindings to instances that are being deleted.
pub struct ServiceBindingsLifecycle {
    handler: Handler,
    ready: ReadyGate,
    instances: Arc<dyn KubeStore<ServiceInstance>>,
}

impl ServiceBindingsLifecycle {
    pub fn new(instances: Arc<dyn KubeStore<ServiceInstance>>, ready: ReadyGate) -> Self {
        Self {
            handler: Handler::new(&[Operation::Create]),
            ready,
            instances,
        }
    }
}

impl Interface for ServiceBindingsLifecycle {
    fn name(&self) -> &'static str {
        PLUGIN_NAME
    }

    fn handles(&self, operation: Operation) -> bool {
        self.handler.handles(operation)
    }
}

#[async_trait]
impl ValidationInterface for ServiceBindingsLifecycle {
    async fn validate(&self, attrs: &Attributes) -> AdmissionResult<()> {
        if !attrs.is_resource(BINDING_RESOURCES) {
            return Ok(());
        }
        if !self.ready.wait_for_ready().await {
            return Err(AdmissionError::NotReady);
        }
        let Some(binding) = attrs.object_as::<ServiceBinding>()? else {
            return Ok(());
        };

        let namespace = binding.metadata.namespace.as_deref().unwrap_or(&attrs.namespace);
        let instance_name = &binding.spec.instance_ref.name;
        let key = ObjectRef::new(instance_name).within(namespace);
        // A missing instance is left for the controller to report.
        let Some(instance) = self.instances.get(&key) else {
            debug!(binding = %attrs.object_key(), instance = %key, "referenced instance not found");
            return Ok(());
        };

        if instance.metadata.deletion_timestamp.is_some() {
            let binding_name = binding.metadata.name.as_deref().unwrap_or(&attrs.name);
            return Err(AdmissionError::Forbidden(format!(
                "ServiceBinding {namespace}/{binding_name} references an instance that is being deleted: {namespace}/{instance_name}"
            )));
        }
        Ok(())
    }
}
