use std::sync::Arc;

use chrono::{DateTime, Utc};
use kube::runtime::controller::Action;
use kube::ResourceExt;
use tracing::{debug, info};

use super::{
    set_condition, Context, ControllerError, ERROR_NONEXISTENT_CLASS_REASON, ERROR_NONEXISTENT_PLAN_REASON,
};
use crate::apis::{
    ClassResource, ClusterObjectReference, ConditionStatus, LocalObjectReference, PlanReference, PlanResource,
    ServiceInstance, ServiceInstanceConditionType, ServiceInstanceStatus,
};
use crate::client::{find_class, find_plan, replace_status, Informers, KubeStore};

const NONEXISTENT_CLASS_MESSAGE: &str = "The instance references a ServiceClass that does not exist. ";
const NONEXISTENT_PLAN_MESSAGE: &str = "The instance references a ServicePlan that does not exist. ";

/// How an instance names one side of its class and plan: the reference the controller
/// already resolved, or the object name or external name the user gave.
struct Wanted<'a> {
    resolved: Option<&'a str>,
    name: Option<&'a str>,
    external_name: Option<&'a str>,
}

impl Wanted<'_> {
    fn name(&self) -> Option<&str> {
        self.resolved.or(self.name)
    }
}

fn plan_description(refs: &PlanReference) -> String {
    let pick = [
        ("ClusterServicePlan", "externalName", &refs.cluster_service_plan_external_name),
        ("ClusterServicePlan", "name", &refs.cluster_service_plan_name),
        ("ServicePlan", "externalName", &refs.service_plan_external_name),
        ("ServicePlan", "name", &refs.service_plan_name),
    ]
    .into_iter()
    .find(|(_, _, v)| v.as_deref().is_some_and(|v| !v.is_empty()));
    match pick {
        Some((kind, field, Some(v))) => format!("{kind} ({field}): \"{v}\""),
        _ => "<unspecified plan>".to_string(),
    }
}

/// Finds the class, then the plan within it. Returns their object names.
fn resolve<C: ClassResource, P: PlanResource>(
    classes: &Arc<dyn KubeStore<C>>,
    plans: &Arc<dyn KubeStore<P>>,
    namespace: Option<&str>,
    class: Wanted,
    plan: Wanted,
    refs: &PlanReference,
) -> Result<(String, String), ControllerError> {
    let class = find_class(classes, namespace, class.name(), class.external_name)
        .ok_or_else(|| ControllerError::ClassNotFound(refs.class_description()))?;
    let plan = find_plan(plans, &*class, plan.name(), plan.external_name).ok_or_else(|| {
        ControllerError::PlanNotFound {
            plan: plan_description(refs),
            class: refs.class_description(),
        }
    })?;
    Ok((class.name_any(), plan.name_any()))
}

/// Returns `instance` with its class and plan references filled in from the informer caches.
pub fn resolve_references(
    instance: &ServiceInstance,
    informers: &Informers,
) -> Result<ServiceInstance, ControllerError> {
    let spec = &instance.spec;
    let refs = &spec.plan_reference;
    let mut resolved = instance.clone();

    if refs.cluster_class_specified() || spec.cluster_service_class_ref.is_some() {
        let (class, plan) = resolve(
            &informers.cluster_service_classes,
            &informers.cluster_service_plans,
            None,
            Wanted {
                resolved: spec.cluster_service_class_ref.as_ref().map(|r| r.name.as_str()),
                name: refs.cluster_service_class_name.as_deref(),
                external_name: refs.cluster_service_class_external_name.as_deref(),
            },
            Wanted {
                resolved: spec.cluster_service_plan_ref.as_ref().map(|r| r.name.as_str()),
                name: refs.cluster_service_plan_name.as_deref(),
                external_name: refs.cluster_service_plan_external_name.as_deref(),
            },
            refs,
        )?;
        resolved.spec.cluster_service_class_ref = Some(ClusterObjectReference { name: class });
        resolved.spec.cluster_service_plan_ref = Some(ClusterObjectReference { name: plan });
    } else {
        let namespace = instance.namespace();
        let (class, plan) = resolve(
            &informers.service_classes,
            &informers.service_plans,
            namespace.as_deref(),
            Wanted {
                resolved: spec.service_class_ref.as_ref().map(|r| r.name.as_str()),
                name: refs.service_class_name.as_deref(),
                external_name: refs.service_class_external_name.as_deref(),
            },
            Wanted {
                resolved: spec.service_plan_ref.as_ref().map(|r| r.name.as_str()),
                name: refs.service_plan_name.as_deref(),
                external_name: refs.service_plan_external_name.as_deref(),
            },
            refs,
        )?;
        resolved.spec.service_class_ref = Some(LocalObjectReference { name: class });
        resolved.spec.service_plan_ref = Some(LocalObjectReference { name: plan });
    }
    Ok(resolved)
}

/// The status recording why `instance` could not be resolved, or None when `error` is not a
/// resolution failure.
pub fn unresolved_status(
    instance: &ServiceInstance,
    error: &ControllerError,
    now: DateTime<Utc>,
) -> Option<ServiceInstanceStatus> {
    let (reason, prefix) = match error {
        ControllerError::ClassNotFound(_) => (ERROR_NONEXISTENT_CLASS_REASON, NONEXISTENT_CLASS_MESSAGE),
        ControllerError::PlanNotFound { .. } => (ERROR_NONEXISTENT_PLAN_REASON, NONEXISTENT_PLAN_MESSAGE),
        _ => return None,
    };
    let message = format!(
        "{prefix}ServiceInstance \"{}/{}\" {error}",
        instance.namespace().unwrap_or_default(),
        instance.name_any()
    );
    let mut status = instance.status.clone().unwrap_or_default();
    set_condition(
        &mut status.conditions,
        ServiceInstanceConditionType::Ready,
        ConditionStatus::False,
        reason,
        &message,
        now,
    );
    Some(status)
}

pub async fn reconcile_instance(
    instance: Arc<ServiceInstance>,
    ctx: Arc<Context>,
) -> Result<Action, ControllerError> {
    let spec = &instance.spec;
    if instance.metadata.deletion_timestamp.is_some() || (spec.class_ref_set() && spec.plan_ref_set()) {
        return Ok(Action::await_change());
    }
    ctx.informers.check_synced()?;

    let namespace = instance.namespace().unwrap_or_default();
    let name = instance.name_any();
    match resolve_references(&instance, &ctx.informers) {
        Ok(resolved) => {
            ctx.client.update_instance_references(&resolved).await?;
            info!(instance = %format!("{namespace}/{name}"), "Resolved class and plan references");
            Ok(Action::await_change())
        }
        Err(err) => {
            let Some(status) = unresolved_status(&instance, &err, Utc::now()) else {
                return Err(err);
            };
            if instance.status.as_ref() != Some(&status) {
                let mut updated = (*instance).clone();
                updated.status = Some(status);
                replace_status(&ctx.client.service_instances(Some(&namespace)), &updated).await?;
            }
            debug!(instance = %format!("{namespace}/{name}"), "Waiting for class and plan: {err}");
            Err(err)
        }
    }
}
