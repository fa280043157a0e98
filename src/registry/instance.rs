use crate::apis::{ServiceInstance, ServiceInstanceDeprovisionStatus, ServiceInstanceStatus};
use crate::validation::{self, plan_changed, ErrorList};

use super::checksum::update_checksum;
use super::{
    prepare_meta_for_create, reset_object_meta_for_status, update_generation, RequestContext,
    RestStrategy,
};

pub struct InstanceStrategy;

impl RestStrategy for InstanceStrategy {
    type Object = ServiceInstance;

    fn prepare_for_create(&self, ctx: &RequestContext, instance: &mut ServiceInstance) {
        instance.status = Some(ServiceInstanceStatus {
            deprovision_status: ServiceInstanceDeprovisionStatus::Required,
            ..Default::default()
        });
        prepare_meta_for_create(&mut instance.metadata, true);

        if instance.spec.external_id.is_empty() {
            instance.spec.external_id = uuid::Uuid::new_v4().to_string();
        }
        // The controller resolves these with a reference update.
        instance.spec.clear_refs();
        instance.spec.user_info = ctx.user.clone();
    }

    fn prepare_for_update(&self, ctx: &RequestContext, new: &mut ServiceInstance, old: &ServiceInstance) {
        new.status = old.status.clone();
        if is_reference_update(new, old) {
            reset_object_meta_for_status(&mut new.metadata, &old.metadata);
            return;
        }

        new.spec.cluster_service_class_ref = old.spec.cluster_service_class_ref.clone();
        new.spec.cluster_service_plan_ref = old.spec.cluster_service_plan_ref.clone();
        new.spec.service_class_ref = old.spec.service_class_ref.clone();
        new.spec.service_plan_ref = old.spec.service_plan_ref.clone();
        if plan_changed(&new.spec.plan_reference, &old.spec.plan_reference) {
            new.spec.cluster_service_plan_ref = None;
            new.spec.service_plan_ref = None;
        }

        new.spec.user_info = old.spec.user_info.clone();
        let spec_changed = new.spec != old.spec;
        if spec_changed {
            new.spec.user_info = ctx.user.clone();
        }
        update_generation(&mut new.metadata, &old.metadata, spec_changed);
    }

    fn validate(&self, instance: &ServiceInstance) -> ErrorList {
        validation::validate_service_instance(instance)
    }

    fn validate_update(&self, new: &ServiceInstance, old: &ServiceInstance) -> ErrorList {
        if is_reference_update(new, old) {
            return validation::validate_service_instance_references_update(new, old);
        }
        validation::validate_service_instance_update(new, old)
    }
}

/// True when `new` differs from `old` only in the resolved class and plan references.
///
/// Such an update keeps the generation, status and owned metadata of `old`, and is checked
/// against the reference rules: set references never change and a class needs a plan.
pub fn is_reference_update(new: &ServiceInstance, old: &ServiceInstance) -> bool {
    if new.spec == old.spec {
        return false;
    }
    let mut spec = new.spec.clone();
    spec.cluster_service_class_ref = old.spec.cluster_service_class_ref.clone();
    spec.cluster_service_plan_ref = old.spec.cluster_service_plan_ref.clone();
    spec.service_class_ref = old.spec.service_class_ref.clone();
    spec.service_plan_ref = old.spec.service_plan_ref.clone();
    spec == old.spec
}

/// Strategy of the `status` subresource.
pub struct InstanceStatusStrategy;

impl RestStrategy for InstanceStatusStrategy {
    type Object = ServiceInstance;

    fn prepare_for_create(&self, ctx: &RequestContext, instance: &mut ServiceInstance) {
        InstanceStrategy.prepare_for_create(ctx, instance)
    }

    fn prepare_for_update(&self, _ctx: &RequestContext, new: &mut ServiceInstance, old: &ServiceInstance) {
        new.spec = old.spec.clone();
        reset_object_meta_for_status(&mut new.metadata, &old.metadata);
        update_checksum(new, old);
    }

    fn validate(&self, instance: &ServiceInstance) -> ErrorList {
        validation::validate_service_instance(instance)
    }

    fn validate_update(&self, new: &ServiceInstance, old: &ServiceInstance) -> ErrorList {
        validation::validate_service_instance_status_update(new, old)
    }
}

#[cfg(test)]
mod test {
    use kube::api::ObjectMeta;

    use super::*;
    use crate::apis::{
        ClusterObjectReference, ConditionStatus, PlanReference, ServiceInstanceCondition,
        ServiceInstanceConditionType, ServiceInstanceOperation, ServiceInstanceSpec, UserInfo,
        FINALIZER_SERVICE_CATALOG,
    };
    use crate::registry::checksum::spec_checksum;

    fn ctx(name: &str) -> RequestContext {
        RequestContext::with_user(UserInfo {
            username: name.to_string(),
            ..Default::default()
        })
    }

    fn instance() -> ServiceInstance {
        ServiceInstance {
            metadata: ObjectMeta {
                name: Some("test-instance".to_string()),
                namespace: Some("test-ns".to_string()),
                ..Default::default()
            },
            spec: ServiceInstanceSpec {
                plan_reference: PlanReference {
                    cluster_service_class_external_name: Some("test-serviceclass".to_string()),
                    cluster_service_plan_external_name: Some("test-plan".to_string()),
                    ..Default::default()
                },
                ..Default::default()
            },
            status: None,
        }
    }

    fn created() -> ServiceInstance {
        let mut instance = instance();
        InstanceStrategy.prepare_for_create(&ctx("creator"), &mut instance);
        instance
    }

    #[test]
    fn test_prepare_for_create() {
        let mut instance = instance();
        instance.spec.cluster_service_class_ref = Some(ClusterObjectReference {
            name: "sneaky".to_string(),
        });
        instance.status = Some(ServiceInstanceStatus {
            async_op_in_progress: true,
            ..Default::default()
        });
        InstanceStrategy.prepare_for_create(&ctx("creator"), &mut instance);

        let status = instance.status.as_ref().unwrap();
        assert!(!status.async_op_in_progress);
        assert!(status.conditions.is_empty());
        assert_eq!(status.deprovision_status, ServiceInstanceDeprovisionStatus::Required);
        assert_eq!(instance.metadata.generation, Some(1));
        assert_eq!(
            instance.metadata.finalizers,
            Some(vec![FINALIZER_SERVICE_CATALOG.to_string()])
        );
        assert!(uuid::Uuid::parse_str(&instance.spec.external_id).is_ok());
        assert_eq!(instance.spec.cluster_service_class_ref, None);
        assert_eq!(instance.spec.user_info.as_ref().unwrap().username, "creator");
        assert!(InstanceStrategy.validate(&instance).is_empty());
    }

    #[test]
    fn test_prepare_for_create_keeps_external_id() {
        let mut instance = instance();
        instance.spec.external_id = "my-id".to_string();
        InstanceStrategy.prepare_for_create(&RequestContext::default(), &mut instance);
        assert_eq!(instance.spec.external_id, "my-id");
        assert_eq!(instance.spec.user_info, None);
    }

    #[test]
    fn test_prepare_for_update() {
        let mut old = created();
        old.status.as_mut().unwrap().reconciled_generation = 1;
        old.spec.cluster_service_class_ref = Some(ClusterObjectReference {
            name: "class".to_string(),
        });
        old.spec.cluster_service_plan_ref = Some(ClusterObjectReference {
            name: "plan".to_string(),
        });

        // Metadata only: nothing about the spec moves.
        let mut relabeled = old.clone();
        relabeled.metadata.labels = Some([("a".to_string(), "b".to_string())].into());
        relabeled.spec.cluster_service_class_ref = None;
        InstanceStrategy.prepare_for_update(&ctx("updater"), &mut relabeled, &old);
        assert_eq!(relabeled.metadata.generation, Some(1));
        assert_eq!(relabeled.spec, old.spec);

        // Plan change: generation bumps, the plan ref is cleared, the class ref survives.
        let mut replanned = old.clone();
        replanned.spec.plan_reference.cluster_service_plan_external_name = Some("bigger".to_string());
        InstanceStrategy.prepare_for_update(&ctx("updater"), &mut replanned, &old);
        assert_eq!(replanned.metadata.generation, Some(2));
        assert_eq!(replanned.spec.cluster_service_plan_ref, None);
        assert!(replanned.spec.cluster_service_class_ref.is_some());
        assert_eq!(replanned.spec.user_info.as_ref().unwrap().username, "updater");
        assert!(InstanceStrategy.validate_update(&replanned, &old).is_empty());

        // Parameter change keeps the plan ref.
        let mut reparameterized = old.clone();
        reparameterized.spec.parameters = Some(serde_json::json!({"size": 2}));
        InstanceStrategy.prepare_for_update(&ctx("updater"), &mut reparameterized, &old);
        assert_eq!(reparameterized.metadata.generation, Some(2));
        assert!(reparameterized.spec.cluster_service_plan_ref.is_some());
    }

    #[test]
    fn test_status_update_ready_with_async_op() {
        let mut old = created();
        old.metadata.generation = Some(2);
        old.spec.cluster_service_class_ref = Some(ClusterObjectReference::default());
        old.spec.cluster_service_plan_ref = Some(ClusterObjectReference::default());
        old.status.as_mut().unwrap().reconciled_generation = 1;

        let ready = vec![ServiceInstanceCondition {
            type_: ServiceInstanceConditionType::Ready,
            status: ConditionStatus::True,
            ..Default::default()
        }];

        let mut rejected = old.clone();
        {
            let status = rejected.status.as_mut().unwrap();
            status.async_op_in_progress = true;
            status.conditions = ready.clone();
        }
        InstanceStatusStrategy.prepare_for_update(&RequestContext::default(), &mut rejected, &old);
        let errs = InstanceStatusStrategy.validate_update(&rejected, &old);
        assert_eq!(errs.len(), 1, "{errs:?}");
        assert!(errs[0].detail.contains("operation in progress"));

        let mut accepted = old.clone();
        {
            let status = accepted.status.as_mut().unwrap();
            status.reconciled_generation = 2;
            status.conditions = ready;
        }
        InstanceStatusStrategy.prepare_for_update(&RequestContext::default(), &mut accepted, &old);
        assert!(InstanceStatusStrategy.validate_update(&accepted, &old).is_empty());
        assert_eq!(
            accepted.status.as_ref().unwrap().checksum,
            Some(spec_checksum(&old.spec))
        );
    }

    #[test]
    fn test_status_update_cannot_start_operation_without_generation_change() {
        let old = created();
        let mut new = old.clone();
        {
            let status = new.status.as_mut().unwrap();
            status.current_operation = Some(ServiceInstanceOperation::Deprovision);
            status.operation_start_time = Some("2018-01-01T00:00:00Z".to_string());
        }
        InstanceStatusStrategy.prepare_for_update(&RequestContext::default(), &mut new, &old);
        assert!(!InstanceStatusStrategy.validate_update(&new, &old).is_empty());
    }

    #[test]
    fn test_reference_update() {
        let old = created();
        let mut new = old.clone();
        new.spec.cluster_service_class_ref = Some(ClusterObjectReference {
            name: "class-guid".to_string(),
        });
        new.spec.cluster_service_plan_ref = Some(ClusterObjectReference {
            name: "plan-guid".to_string(),
        });
        new.metadata.finalizers = None;
        new.status.as_mut().unwrap().async_op_in_progress = true;
        assert!(is_reference_update(&new, &old));

        InstanceStrategy.prepare_for_update(&ctx("controller"), &mut new, &old);
        assert_eq!(new.status, old.status);
        assert_eq!(new.metadata.generation, old.metadata.generation);
        assert_eq!(new.metadata.finalizers, old.metadata.finalizers);
        assert_eq!(new.spec.user_info, old.spec.user_info);
        assert_eq!(new.spec.cluster_service_class_ref.as_ref().unwrap().name, "class-guid");
        assert_eq!(new.spec.cluster_service_plan_ref.as_ref().unwrap().name, "plan-guid");
        assert!(InstanceStrategy.validate_update(&new, &old).is_empty());

        // Once set, a reference cannot be moved to another class.
        let mut moved = new.clone();
        moved.spec.cluster_service_class_ref = Some(ClusterObjectReference {
            name: "other-guid".to_string(),
        });
        InstanceStrategy.prepare_for_update(&ctx("controller"), &mut moved, &new);
        assert!(!InstanceStrategy.validate_update(&moved, &new).is_empty());

        // A class reference without its plan is incomplete.
        let mut class_only = old.clone();
        class_only.spec.cluster_service_class_ref = Some(ClusterObjectReference {
            name: "class-guid".to_string(),
        });
        InstanceStrategy.prepare_for_update(&ctx("controller"), &mut class_only, &old);
        assert!(!InstanceStrategy.validate_update(&class_only, &old).is_empty());
    }

    #[test]
    fn test_mixed_update_reverts_refs() {
        let old = created();
        let mut new = old.clone();
        new.spec.parameters = Some(serde_json::json!({"size": 3}));
        new.spec.cluster_service_class_ref = Some(ClusterObjectReference {
            name: "class-guid".to_string(),
        });
        assert!(!is_reference_update(&new, &old));

        InstanceStrategy.prepare_for_update(&ctx("updater"), &mut new, &old);
        assert_eq!(new.spec.cluster_service_class_ref, None);
        assert_eq!(new.spec.parameters, Some(serde_json::json!({"size": 3})));
        assert_eq!(new.metadata.generation, Some(2));
        assert!(!is_reference_update(&old, &old));
    }
}
