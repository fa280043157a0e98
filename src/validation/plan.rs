use crate::apis::{CatalogResource, ClusterServicePlan, PlanResource, ServicePlan};

use super::{
    is_external_name, is_guid_name, validate_immutable_field, validate_object_meta,
    validate_object_meta_update, ErrorList, FieldError, Path,
};

pub fn validate_cluster_service_plan(plan: &ClusterServicePlan) -> ErrorList {
    validate_plan(plan)
}

pub fn validate_service_plan(plan: &ServicePlan) -> ErrorList {
    validate_plan(plan)
}

pub fn validate_cluster_service_plan_update(
    new: &ClusterServicePlan,
    old: &ClusterServicePlan,
) -> ErrorList {
    validate_plan_update(new, old)
}

pub fn validate_service_plan_update(new: &ServicePlan, old: &ServicePlan) -> ErrorList {
    validate_plan_update(new, old)
}

fn broker_name_field<K: CatalogResource>() -> &'static str {
    if K::NAMESPACED {
        "serviceBrokerName"
    } else {
        "clusterServiceBrokerName"
    }
}

fn validate_plan<K: PlanResource>(plan: &K) -> ErrorList {
    let mut errs = validate_object_meta(plan.meta(), K::NAMESPACED, is_guid_name);
    let path = Path::new("spec");
    let common = plan.common();

    if plan.broker_name().is_empty() {
        errs.push(FieldError::required(
            &path.child(broker_name_field::<K>()),
            "plans must reference a broker",
        ));
    }

    if common.external_name.is_empty() {
        errs.push(FieldError::required(&path.child("externalName"), ""));
    } else {
        for msg in is_external_name(&common.external_name) {
            errs.push(FieldError::invalid(
                &path.child("externalName"),
                common.external_name.as_str(),
                msg,
            ));
        }
    }

    if common.external_id.is_empty() {
        errs.push(FieldError::required(&path.child("externalID"), ""));
    }

    if common.description.is_empty() {
        errs.push(FieldError::required(&path.child("description"), ""));
    }

    let class_path = path.child(K::class_ref_field()).child("name");
    if plan.class_name().is_empty() {
        errs.push(FieldError::required(&class_path, "plans must reference a service class"));
    } else {
        for msg in is_guid_name(plan.class_name()) {
            errs.push(FieldError::invalid(&class_path, plan.class_name(), msg));
        }
    }
    errs
}

fn validate_plan_update<K: PlanResource>(new: &K, old: &K) -> ErrorList {
    let path = Path::new("spec");
    let mut errs = validate_plan(new);
    errs.extend(validate_object_meta_update(new.meta(), old.meta()));
    errs.extend(validate_immutable_field(
        &new.common().external_id,
        &old.common().external_id,
        &path.child("externalID"),
    ));
    errs.extend(validate_immutable_field(
        &new.class_name(),
        &old.class_name(),
        &path.child(K::class_ref_field()),
    ));
    errs.extend(validate_immutable_field(
        &new.broker_name(),
        &old.broker_name(),
        &path.child(broker_name_field::<K>()),
    ));
    errs
}

#[cfg(test)]
mod test {
    use kube::api::ObjectMeta;

    use super::*;
    use crate::apis::{ClusterObjectReference, ClusterServicePlanSpec, CommonServicePlanSpec};

    fn valid_plan() -> ClusterServicePlan {
        ClusterServicePlan {
            metadata: ObjectMeta {
                name: Some("86064792-7ea2-467b-af93-ac9694d96d52".to_string()),
                ..Default::default()
            },
            spec: ClusterServicePlanSpec {
                cluster_service_broker_name: "test-broker".to_string(),
                cluster_service_class_ref: ClusterObjectReference {
                    name: "test-serviceclass".to_string(),
                },
                common: CommonServicePlanSpec {
                    external_name: "test-plan".to_string(),
                    external_id: "40d-0983-1b89".to_string(),
                    description: "plan description".to_string(),
                    free: true,
                    ..Default::default()
                },
            },
            status: None,
        }
    }

    fn with(mutate: impl FnOnce(&mut ClusterServicePlan)) -> ClusterServicePlan {
        let mut plan = valid_plan();
        mutate(&mut plan);
        plan
    }

    #[test]
    fn test_validate_cluster_service_plan() {
        let cases = vec![
            ("valid", with(|_| {}), true),
            (
                "missing broker name",
                with(|p| p.spec.cluster_service_broker_name.clear()),
                false,
            ),
            ("missing external name", with(|p| p.spec.common.external_name.clear()), false),
            (
                "bad external name",
                with(|p| p.spec.common.external_name = "plan/name".to_string()),
                false,
            ),
            ("missing external id", with(|p| p.spec.common.external_id.clear()), false),
            ("missing description", with(|p| p.spec.common.description.clear()), false),
            (
                "missing class reference",
                with(|p| p.spec.cluster_service_class_ref.name.clear()),
                false,
            ),
            (
                "bad class reference",
                with(|p| p.spec.cluster_service_class_ref.name = "bad class".to_string()),
                false,
            ),
            ("non-free plan", with(|p| p.spec.common.free = false), true),
        ];
        for (name, plan, valid) in cases {
            let errs = validate_cluster_service_plan(&plan);
            assert_eq!(errs.is_empty(), valid, "{name}: {errs:?}");
        }
    }

    #[test]
    fn test_validate_cluster_service_plan_update() {
        let old = valid_plan();
        let cases = vec![
            ("no change", with(|_| {}), true),
            (
                "description changed",
                with(|p| p.spec.common.description = "new description".to_string()),
                true,
            ),
            (
                "external id changed",
                with(|p| p.spec.common.external_id = "something-else".to_string()),
                false,
            ),
            (
                "class changed",
                with(|p| p.spec.cluster_service_class_ref.name = "other-class".to_string()),
                false,
            ),
        ];
        for (name, new, valid) in cases {
            let errs = validate_cluster_service_plan_update(&new, &old);
            assert_eq!(errs.is_empty(), valid, "{name}: {errs:?}");
        }

        let errs = validate_cluster_service_plan_update(
            &with(|p| p.spec.common.external_id = "changed".to_string()),
            &old,
        );
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].field, "spec.externalID");
        assert_eq!(errs[0].detail, "field is immutable");
    }
}
