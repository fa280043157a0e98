use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::admission::{
    AdmissionError, AdmissionResult, Attributes, Handler, Interface, MutationInterface, Operation,
    ReadyGate,
};
use crate::apis::{
    ClassResource, ClusterServiceClass, ClusterServicePlan, PlanResource, ServiceClass,
    ServiceInstance, ServicePlan,
};
use crate::client::{find_class, plans_of, Informers};

pub const PLUGIN_NAME: &str = "DefaultServicePlan";

const INSTANCE_RESOURCES: &[&str] = &["serviceinstances", "instances"];

/// Fills in the plan of a new instance whose class offers exactly one plan.
pub struct DefaultServicePlan {
    handler: Handler,
    ready: ReadyGate,
    informers: Informers,
}

impl DefaultServicePlan {
    pub fn new(informers: Informers, ready: ReadyGate) -> Self {
        Self {
            handler: Handler::new(&[Operation::Create]),
            ready,
            informers,
        }
    }
}

/// Picks the only plan, failing when there is none or more than one.
fn single_plan<C: ClassResource, P: PlanResource>(class: &C, plans: &[Arc<P>]) -> AdmissionResult<String> {
    let class_name = &class.common().external_name;
    match plans {
        [] => Err(AdmissionError::Forbidden(format!(
            "no plans found at all for service class \"{class_name}\""
        ))),
        [plan] => Ok(plan.common().external_name.clone()),
        _ => Err(AdmissionError::Forbidden(format!(
            "there is more than one plan for service class \"{class_name}\"; a plan must be specified"
        ))),
    }
}

impl Interface for DefaultServicePlan {
    fn name(&self) -> &'static str {
        PLUGIN_NAME
    }

    fn handles(&self, operation: Operation) -> bool {
        self.handler.handles(operation)
    }
}

#[async_trait]
impl MutationInterface for DefaultServicePlan {
    async fn admit(&self, attrs: &mut Attributes) -> AdmissionResult<()> {
        if !attrs.is_resource(INSTANCE_RESOURCES) {
            return Ok(());
        }
        if !self.ready.wait_for_ready().await {
            return Err(AdmissionError::NotReady);
        }
        let Some(mut instance) = attrs.object_as::<ServiceInstance>()? else {
            return Ok(());
        };
        let plan_ref = &instance.spec.plan_reference;
        if plan_ref.plan_specified() {
            debug!(instance = %attrs.object_key(), "plan already specified");
            return Ok(());
        }

        let not_found = || AdmissionError::Forbidden(format!("could not find {}", plan_ref.class_description()));
        let plan_name = if plan_ref.cluster_class_specified() {
            let class: Arc<ClusterServiceClass> = find_class(
                &self.informers.cluster_service_classes,
                None,
                plan_ref.cluster_service_class_name.as_deref(),
                plan_ref.cluster_service_class_external_name.as_deref(),
            )
            .ok_or_else(not_found)?;
            let plans = plans_of::<_, ClusterServicePlan>(&self.informers.cluster_service_plans, &*class);
            single_plan(&*class, &plans)?
        } else if plan_ref.namespaced_class_specified() {
            let namespace = instance.metadata.namespace.clone().unwrap_or_else(|| attrs.namespace.clone());
            let class: Arc<ServiceClass> = find_class(
                &self.informers.service_classes,
                Some(namespace.as_str()),
                plan_ref.service_class_name.as_deref(),
                plan_ref.service_class_external_name.as_deref(),
            )
            .ok_or_else(not_found)?;
            let plans = plans_of::<_, ServicePlan>(&self.informers.service_plans, &*class);
            single_plan(&*class, &plans)?
        } else {
            return Err(AdmissionError::BadRequest(
                "class not specified on ServiceInstance, cannot choose default plan".to_string(),
            ));
        };

        info!(instance = %attrs.object_key(), plan = %plan_name, "defaulting service plan");
        let cluster = instance.spec.plan_reference.cluster_class_specified();
        let plan_ref = &mut instance.spec.plan_reference;
        if cluster {
            plan_ref.cluster_service_plan_external_name = Some(plan_name);
        } else {
            plan_ref.service_plan_external_name = Some(plan_name);
        }
        attrs.set_object(&instance)
    }
}
