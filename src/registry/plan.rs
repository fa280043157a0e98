use std::marker::PhantomData;

use crate::apis::{ClusterServicePlan, PlanResource, ServicePlan, ServicePlanStatus};
use crate::validation::{self, ErrorList};

use super::{
    prepare_meta_for_create, reset_object_meta_for_status, update_generation, RequestContext,
    RestStrategy,
};

pub trait PlanKind: PlanResource {
    fn validate(&self) -> ErrorList;
    fn validate_update(&self, old: &Self) -> ErrorList;
}

impl PlanKind for ClusterServicePlan {
    fn validate(&self) -> ErrorList {
        validation::validate_cluster_service_plan(self)
    }
    fn validate_update(&self, old: &Self) -> ErrorList {
        validation::validate_cluster_service_plan_update(self, old)
    }
}

impl PlanKind for ServicePlan {
    fn validate(&self) -> ErrorList {
        validation::validate_service_plan(self)
    }
    fn validate_update(&self, old: &Self) -> ErrorList {
        validation::validate_service_plan_update(self, old)
    }
}

pub struct PlanStrategy<K>(PhantomData<fn() -> K>);

impl<K> Default for PlanStrategy<K> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<K: PlanKind> RestStrategy for PlanStrategy<K> {
    type Object = K;

    fn prepare_for_create(&self, _ctx: &RequestContext, plan: &mut K) {
        *plan.status_mut() = Some(ServicePlanStatus::default());
        prepare_meta_for_create(plan.meta_mut(), false);
    }

    fn prepare_for_update(&self, _ctx: &RequestContext, new: &mut K, old: &K) {
        *new.status_mut() = old.status().cloned();
        let spec_changed = new.spec() != old.spec();
        update_generation(new.meta_mut(), old.meta(), spec_changed);
    }

    fn validate(&self, plan: &K) -> ErrorList {
        plan.validate()
    }

    fn validate_update(&self, new: &K, old: &K) -> ErrorList {
        new.validate_update(old)
    }
}

pub struct PlanStatusStrategy<K>(PhantomData<fn() -> K>);

impl<K> Default for PlanStatusStrategy<K> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<K: PlanKind> RestStrategy for PlanStatusStrategy<K> {
    type Object = K;

    fn prepare_for_create(&self, ctx: &RequestContext, plan: &mut K) {
        PlanStrategy::<K>::default().prepare_for_create(ctx, plan)
    }

    fn prepare_for_update(&self, _ctx: &RequestContext, new: &mut K, old: &K) {
        *new.spec_mut() = old.spec().clone();
        reset_object_meta_for_status(new.meta_mut(), old.meta());
    }

    fn validate(&self, plan: &K) -> ErrorList {
        plan.validate()
    }

    fn validate_update(&self, new: &K, old: &K) -> ErrorList {
        new.validate_update(old)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::apis::{LocalObjectReference, ServicePlanSpec, CommonServicePlanSpec};

    fn plan() -> ServicePlan {
        let mut plan = ServicePlan::new(
            "86064792-7ea2-467b-af93-ac9694d96d52",
            ServicePlanSpec {
                service_broker_name: "test-broker".to_string(),
                service_class_ref: LocalObjectReference {
                    name: "test-class".to_string(),
                },
                common: CommonServicePlanSpec {
                    external_name: "small".to_string(),
                    external_id: "86064792-7ea2-467b-af93-ac9694d96d52".to_string(),
                    description: "a small plan".to_string(),
                    ..Default::default()
                },
            },
        );
        plan.metadata.namespace = Some("test-ns".to_string());
        plan
    }

    #[test]
    fn test_namespaced_plan_lifecycle() {
        let strategy = PlanStrategy::<ServicePlan>::default();
        assert!(strategy.namespace_scoped());

        let mut created = plan();
        strategy.prepare_for_create(&RequestContext::default(), &mut created);
        assert_eq!(created.status, Some(ServicePlanStatus::default()));
        assert!(strategy.validate(&created).is_empty());

        let mut updated = created.clone();
        updated.spec.service_class_ref.name = "another-class".to_string();
        strategy.prepare_for_update(&RequestContext::default(), &mut updated, &created);
        assert_eq!(updated.metadata.generation, Some(2));

        let errs = strategy.validate_update(&updated, &created);
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].field, "spec.serviceClassRef");
    }

    #[test]
    fn test_status_update_marks_removed() {
        let strategy = PlanStatusStrategy::<ServicePlan>::default();
        let old = plan();
        let mut new = old.clone();
        new.status = Some(ServicePlanStatus {
            removed_from_broker_catalog: true,
        });
        strategy.prepare_for_update(&RequestContext::default(), &mut new, &old);
        assert!(new.status.unwrap().removed_from_broker_catalog);
    }
}
