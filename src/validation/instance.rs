use crate::apis::{
    PlanReference, ServiceInstance, ServiceInstanceOperation, ServiceInstanceSpec,
    ServiceInstanceStatus,
};

use super::{
    is_dns1123_subdomain, is_external_name, is_guid_name, validate_condition_types,
    validate_object_meta, validate_object_meta_update, validate_parameters,
    validate_parameters_from, validate_properties_parameters, validate_reconciled_generation,
    validate_timestamp, ErrorList, FieldError, Path,
};

/// Validates an instance about to be created.
pub fn validate_service_instance(instance: &ServiceInstance) -> ErrorList {
    validate_instance(instance, true)
}

/// Validates a spec update. A spec change may not start while another is still being
/// reconciled, and changing the plan requires the resolved plan reference to be cleared.
pub fn validate_service_instance_update(new: &ServiceInstance, old: &ServiceInstance) -> ErrorList {
    let mut errs = validate_instance(new, false);
    errs.extend(validate_object_meta_update(&new.metadata, &old.metadata));
    errs.extend(validate_instance_update_allowed(new, old));
    errs
}

pub fn validate_service_instance_status_update(
    new: &ServiceInstance,
    old: &ServiceInstance,
) -> ErrorList {
    let mut errs = validate_instance(new, false);
    errs.extend(validate_object_meta_update(&new.metadata, &old.metadata));
    errs
}

/// Validates a reference update, which the controller uses to record the class and plan it resolved.
pub fn validate_service_instance_references_update(
    new: &ServiceInstance,
    old: &ServiceInstance,
) -> ErrorList {
    let path = Path::new("spec");
    let mut errs = validate_instance(new, false);
    errs.extend(validate_object_meta_update(&new.metadata, &old.metadata));

    if old.status.as_ref().is_some_and(|s| s.current_operation.is_some()) {
        errs.push(FieldError::forbidden(
            &Path::new("status").child("currentOperation"),
            "cannot update references while an operation is in progress",
        ));
    }

    let (new_spec, old_spec) = (&new.spec, &old.spec);
    if old_spec.cluster_service_class_ref.is_some()
        && new_spec.cluster_service_class_ref != old_spec.cluster_service_class_ref
    {
        errs.push(FieldError::forbidden(
            &path.child("clusterServiceClassRef"),
            "clusterServiceClassRef cannot be changed once set",
        ));
    }
    if old_spec.service_class_ref.is_some() && new_spec.service_class_ref != old_spec.service_class_ref {
        errs.push(FieldError::forbidden(
            &path.child("serviceClassRef"),
            "serviceClassRef cannot be changed once set",
        ));
    }
    if old_spec.cluster_service_plan_ref.is_some()
        && new_spec.cluster_service_plan_ref != old_spec.cluster_service_plan_ref
    {
        errs.push(FieldError::forbidden(
            &path.child("clusterServicePlanRef"),
            "clusterServicePlanRef can only be set when it was cleared by a plan change",
        ));
    }
    if old_spec.service_plan_ref.is_some() && new_spec.service_plan_ref != old_spec.service_plan_ref {
        errs.push(FieldError::forbidden(
            &path.child("servicePlanRef"),
            "servicePlanRef can only be set when it was cleared by a plan change",
        ));
    }

    if !new_spec.class_ref_set() {
        errs.push(FieldError::required(&path.child("clusterServiceClassRef"), "class reference is required"));
    }
    if !new_spec.plan_ref_set() {
        errs.push(FieldError::required(&path.child("clusterServicePlanRef"), "plan reference is required"));
    }
    errs
}

fn validate_instance(instance: &ServiceInstance, create: bool) -> ErrorList {
    let mut errs = validate_object_meta(&instance.metadata, true, is_dns1123_subdomain);
    errs.extend(validate_instance_spec(&instance.spec));
    let status = instance.status.clone().unwrap_or_default();
    errs.extend(validate_instance_status(
        &status,
        &instance.spec,
        instance.metadata.generation.unwrap_or_default(),
        create,
    ));
    errs
}

fn validate_instance_spec(spec: &ServiceInstanceSpec) -> ErrorList {
    let path = Path::new("spec");
    let mut errs = validate_plan_reference(&spec.plan_reference, &path);
    errs.extend(validate_parameters(spec.parameters.as_ref(), &path.child("parameters")));
    errs.extend(validate_parameters_from(&spec.parameters_from, &path.child("parametersFrom")));
    if spec.update_requests < 0 {
        errs.push(FieldError::invalid(
            &path.child("updateRequests"),
            spec.update_requests,
            "updateRequests must be greater than or equal to 0",
        ));
    }
    errs
}

/// An instance names its class and its plan, each by exactly one of external name or
/// object name, and all of them in a single scope.
pub fn validate_plan_reference(r: &PlanReference, path: &Path) -> ErrorList {
    let cluster = r.cluster_class_specified() || r.cluster_plan_specified();
    let namespaced = r.namespaced_class_specified() || r.namespaced_plan_specified();

    match (cluster, namespaced) {
        (true, true) => vec![FieldError::forbidden(
            path,
            "instances can refer to either ClusterServiceClass and ClusterServicePlan or \
             ServiceClass and ServicePlan, but not both",
        )],
        (_, false) => {
            let mut errs = exactly_one(
                path,
                ("clusterServiceClassExternalName", &r.cluster_service_class_external_name),
                ("clusterServiceClassName", &r.cluster_service_class_name),
            );
            errs.extend(exactly_one(
                path,
                ("clusterServicePlanExternalName", &r.cluster_service_plan_external_name),
                ("clusterServicePlanName", &r.cluster_service_plan_name),
            ));
            errs
        }
        (false, true) => {
            let mut errs = exactly_one(
                path,
                ("serviceClassExternalName", &r.service_class_external_name),
                ("serviceClassName", &r.service_class_name),
            );
            errs.extend(exactly_one(
                path,
                ("servicePlanExternalName", &r.service_plan_external_name),
                ("servicePlanName", &r.service_plan_name),
            ));
            errs
        }
    }
}

fn exactly_one(
    path: &Path,
    (external_field, external): (&str, &Option<String>),
    (name_field, name): (&str, &Option<String>),
) -> ErrorList {
    let external = external.as_deref().filter(|v| !v.is_empty());
    let name = name.as_deref().filter(|v| !v.is_empty());
    let mut errs = ErrorList::new();
    match (external, name) {
        (Some(_), Some(_)) => errs.push(FieldError::forbidden(
            &path.child(name_field),
            format!("exactly one of {external_field} or {name_field} may be set"),
        )),
        (None, None) => errs.push(FieldError::required(
            &path.child(external_field),
            format!("exactly one of {external_field} or {name_field} required"),
        )),
        (Some(external), None) => {
            for msg in is_external_name(external) {
                errs.push(FieldError::invalid(&path.child(external_field), external, msg));
            }
        }
        (None, Some(name)) => {
            for msg in is_guid_name(name) {
                errs.push(FieldError::invalid(&path.child(name_field), name, msg));
            }
        }
    }
    errs
}

fn validate_instance_status(
    status: &ServiceInstanceStatus,
    spec: &ServiceInstanceSpec,
    generation: i64,
    create: bool,
) -> ErrorList {
    let path = Path::new("status");
    let mut errs = ErrorList::new();
    let in_progress = status.current_operation.is_some();

    if create {
        if in_progress {
            errs.push(FieldError::forbidden(
                &path.child("currentOperation"),
                "currentOperation must be empty on create",
            ));
        }
        if status.reconciled_generation != 0 {
            errs.push(FieldError::invalid(
                &path.child("reconciledGeneration"),
                status.reconciled_generation,
                "reconciledGeneration must be 0 on create",
            ));
        }
    } else {
        errs.extend(validate_reconciled_generation(
            status.reconciled_generation,
            Some(generation),
            &path.child("reconciledGeneration"),
        ));
    }

    match (in_progress, status.operation_start_time.as_deref()) {
        (true, None) => errs.push(FieldError::required(
            &path.child("operationStartTime"),
            "operationStartTime must be present when currentOperation is present",
        )),
        (false, Some(_)) => errs.push(FieldError::forbidden(
            &path.child("operationStartTime"),
            "operationStartTime must not be present when currentOperation is not present",
        )),
        (_, start) => errs.extend(validate_timestamp(start, &path.child("operationStartTime"))),
    }

    if in_progress && !create {
        if generation <= status.reconciled_generation {
            errs.push(FieldError::forbidden(
                &path.child("currentOperation"),
                "currentOperation must not be present when reconciledGeneration is the same as generation",
            ));
        }
        if !spec.class_ref_set() {
            errs.push(FieldError::required(
                &Path::new("spec").child("clusterServiceClassRef"),
                "class reference is required while an operation is in progress",
            ));
        }
        if !spec.plan_ref_set() {
            errs.push(FieldError::required(
                &Path::new("spec").child("clusterServicePlanRef"),
                "plan reference is required while an operation is in progress",
            ));
        }
    }

    let properties_path = path.child("inProgressProperties");
    match (status.current_operation, &status.in_progress_properties) {
        (
            Some(ServiceInstanceOperation::Provision | ServiceInstanceOperation::Update),
            None,
        ) => errs.push(FieldError::required(
            &properties_path,
            "inProgressProperties is required when currentOperation is Provision or Update",
        )),
        (Some(ServiceInstanceOperation::Deprovision) | None, Some(_)) => {
            errs.push(FieldError::forbidden(
                &properties_path,
                "inProgressProperties must not be present when currentOperation is neither Provision nor Update",
            ))
        }
        (_, Some(properties)) => errs.extend(validate_properties_parameters(
            properties.parameters.as_ref(),
            properties.parameters_checksum.as_deref(),
            &properties_path,
        )),
        (_, None) => {}
    }

    if let Some(properties) = &status.external_properties {
        errs.extend(validate_properties_parameters(
            properties.parameters.as_ref(),
            properties.parameters_checksum.as_deref(),
            &path.child("externalProperties"),
        ));
    }

    let operation_ongoing = in_progress || status.async_op_in_progress;
    for (i, condition) in status.conditions.iter().enumerate() {
        let path = path.child("conditions").index(i);
        errs.extend(validate_timestamp(
            condition.last_transition_time.as_deref(),
            &path.child("lastTransitionTime"),
        ));
    }
    let types: Vec<_> = status.conditions.iter().map(|c| c.type_).collect();
    errs.extend(validate_condition_types(&types, &path.child("conditions")));
    if operation_ongoing && status.is_ready() {
        errs.push(FieldError::forbidden(
            &path.child("conditions"),
            "Ready condition can not be True while an operation in progress",
        ));
    }
    errs
}

fn validate_instance_update_allowed(new: &ServiceInstance, old: &ServiceInstance) -> ErrorList {
    let mut errs = ErrorList::new();
    let path = Path::new("spec");
    let old_generation = old.metadata.generation.unwrap_or_default();
    let old_reconciled = old.status.as_ref().map(|s| s.reconciled_generation).unwrap_or_default();

    if new.metadata.generation.unwrap_or_default() != old_generation && old_generation != old_reconciled {
        errs.push(FieldError::forbidden(
            &path,
            "Another change to this ServiceInstance is in progress",
        ));
    }

    if new.spec.update_requests < old.spec.update_requests {
        errs.push(FieldError::invalid(
            &path.child("updateRequests"),
            new.spec.update_requests,
            "updateRequests must not decrease",
        ));
    }

    if plan_changed(&new.spec.plan_reference, &old.spec.plan_reference) && new.spec.plan_ref_set() {
        errs.push(FieldError::forbidden(
            &path.child("clusterServicePlanRef"),
            "the plan reference must be cleared when the plan changes",
        ));
    }
    errs
}

/// True when any of the plan selectors differ between `new` and `old`.
pub fn plan_changed(new: &PlanReference, old: &PlanReference) -> bool {
    new.cluster_service_plan_external_name != old.cluster_service_plan_external_name
        || new.cluster_service_plan_name != old.cluster_service_plan_name
        || new.service_plan_external_name != old.service_plan_external_name
        || new.service_plan_name != old.service_plan_name
}

#[cfg(test)]
mod test {
    use kube::api::ObjectMeta;

    use super::*;
    use crate::apis::{
        ClusterObjectReference, ConditionStatus, ServiceInstanceCondition,
        ServiceInstanceConditionType, ServiceInstancePropertiesState,
    };

    const CHECKSUM: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";
    const NOW: &str = "2018-01-01T00:00:00Z";

    fn valid_instance_for_create() -> ServiceInstance {
        ServiceInstance {
            metadata: ObjectMeta {
                name: Some("test-instance".to_string()),
                namespace: Some("test-ns".to_string()),
                generation: Some(1),
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

    fn valid_instance() -> ServiceInstance {
        let mut instance = valid_instance_for_create();
        instance.spec.cluster_service_class_ref = Some(ClusterObjectReference::default());
        instance.spec.cluster_service_plan_ref = Some(ClusterObjectReference::default());
        instance
    }

    fn valid_properties() -> ServiceInstancePropertiesState {
        ServiceInstancePropertiesState {
            parameters: Some(serde_json::json!({"a": 1, "b": "2"})),
            parameters_checksum: Some(CHECKSUM.to_string()),
            ..Default::default()
        }
    }

    fn in_progress_provision() -> ServiceInstance {
        let mut instance = valid_instance();
        instance.metadata.generation = Some(2);
        instance.status = Some(ServiceInstanceStatus {
            reconciled_generation: 1,
            current_operation: Some(ServiceInstanceOperation::Provision),
            operation_start_time: Some(NOW.to_string()),
            in_progress_properties: Some(valid_properties()),
            ..Default::default()
        });
        instance
    }

    fn status(instance: &mut ServiceInstance) -> &mut ServiceInstanceStatus {
        instance.status.get_or_insert_with(Default::default)
    }

    fn ready(value: ConditionStatus) -> Vec<ServiceInstanceCondition> {
        vec![ServiceInstanceCondition {
            type_: ServiceInstanceConditionType::Ready,
            status: value,
            ..Default::default()
        }]
    }

    fn modify(mut instance: ServiceInstance, f: impl FnOnce(&mut ServiceInstance)) -> ServiceInstance {
        f(&mut instance);
        instance
    }

    #[test]
    fn test_validate_service_instance() {
        let cases = vec![
            ("valid", valid_instance_for_create(), true, true),
            (
                "missing namespace",
                modify(valid_instance_for_create(), |i| i.metadata.namespace = None),
                true,
                false,
            ),
            (
                "missing class",
                modify(valid_instance_for_create(), |i| {
                    i.spec.plan_reference.cluster_service_class_external_name = None
                }),
                true,
                false,
            ),
            (
                "invalid class name",
                modify(valid_instance_for_create(), |i| {
                    i.spec.plan_reference.cluster_service_class_external_name = Some("oops!".to_string())
                }),
                true,
                false,
            ),
            (
                "missing plan",
                modify(valid_instance_for_create(), |i| {
                    i.spec.plan_reference.cluster_service_plan_external_name = None
                }),
                true,
                false,
            ),
            (
                "class by external name and k8s name",
                modify(valid_instance_for_create(), |i| {
                    i.spec.plan_reference.cluster_service_class_name = Some("abc".to_string())
                }),
                true,
                false,
            ),
            (
                "mixed cluster and namespaced references",
                modify(valid_instance_for_create(), |i| {
                    i.spec.plan_reference.service_plan_name = Some("abc".to_string())
                }),
                true,
                false,
            ),
            (
                "namespaced class and plan by k8s name",
                modify(valid_instance_for_create(), |i| {
                    i.spec.plan_reference = PlanReference {
                        service_class_name: Some("class-guid".to_string()),
                        service_plan_name: Some("plan-guid".to_string()),
                        ..Default::default()
                    }
                }),
                true,
                true,
            ),
            (
                "parameters not an object",
                modify(valid_instance_for_create(), |i| i.spec.parameters = Some(serde_json::json!([1, 2]))),
                true,
                false,
            ),
            ("valid with in-progress provision", in_progress_provision(), false, true),
            (
                "valid with in-progress update",
                modify(in_progress_provision(), |i| {
                    status(i).current_operation = Some(ServiceInstanceOperation::Update)
                }),
                false,
                true,
            ),
            (
                "valid with in-progress deprovision",
                modify(in_progress_provision(), |i| {
                    status(i).current_operation = Some(ServiceInstanceOperation::Deprovision);
                    status(i).in_progress_properties = None;
                }),
                false,
                true,
            ),
            (
                "in-progress without updated generation",
                modify(in_progress_provision(), |i| status(i).reconciled_generation = 2),
                false,
                false,
            ),
            (
                "in-progress with missing operation start time",
                modify(in_progress_provision(), |i| status(i).operation_start_time = None),
                false,
                false,
            ),
            (
                "not in-progress with operation start time",
                modify(valid_instance(), |i| status(i).operation_start_time = Some(NOW.to_string())),
                false,
                false,
            ),
            (
                "in-progress with condition ready/true",
                modify(in_progress_provision(), |i| status(i).conditions = ready(ConditionStatus::True)),
                false,
                false,
            ),
            (
                "in-progress with condition ready/false",
                modify(in_progress_provision(), |i| status(i).conditions = ready(ConditionStatus::False)),
                false,
                true,
            ),
            (
                "in-progress provision without in-progress properties",
                modify(in_progress_provision(), |i| status(i).in_progress_properties = None),
                false,
                false,
            ),
            (
                "not in-progress with in-progress properties",
                modify(valid_instance(), |i| status(i).in_progress_properties = Some(valid_properties())),
                false,
                false,
            ),
            (
                "in-progress deprovision with in-progress properties",
                modify(in_progress_provision(), |i| {
                    status(i).current_operation = Some(ServiceInstanceOperation::Deprovision)
                }),
                false,
                false,
            ),
            (
                "in-progress properties with checksum but no parameters",
                modify(in_progress_provision(), |i| {
                    status(i).in_progress_properties.as_mut().unwrap().parameters = None
                }),
                false,
                false,
            ),
            (
                "external properties checksum too short",
                modify(valid_instance(), |i| {
                    status(i).external_properties = Some(ServiceInstancePropertiesState {
                        parameters_checksum: Some("0123456".to_string()),
                        ..valid_properties()
                    })
                }),
                false,
                false,
            ),
            (
                "create with operation in progress",
                modify(valid_instance_for_create(), |i| {
                    status(i).current_operation = Some(ServiceInstanceOperation::Provision);
                    status(i).operation_start_time = Some(NOW.to_string());
                    status(i).in_progress_properties = Some(valid_properties());
                }),
                true,
                false,
            ),
            (
                "create with reconciled generation",
                modify(valid_instance_for_create(), |i| status(i).reconciled_generation = 1),
                true,
                false,
            ),
            (
                "update with reconciled generation ahead",
                modify(valid_instance(), |i| status(i).reconciled_generation = 2),
                false,
                false,
            ),
            (
                "in-progress with missing class ref",
                modify(in_progress_provision(), |i| i.spec.cluster_service_class_ref = None),
                false,
                false,
            ),
            (
                "in-progress with missing plan ref",
                modify(in_progress_provision(), |i| i.spec.cluster_service_plan_ref = None),
                false,
                false,
            ),
            (
                "ready while async operation is in progress",
                modify(valid_instance(), |i| {
                    status(i).async_op_in_progress = true;
                    status(i).conditions = ready(ConditionStatus::True);
                }),
                false,
                false,
            ),
        ];

        for (name, instance, create, valid) in cases {
            let errs = validate_instance(&instance, create);
            assert_eq!(errs.is_empty(), valid, "{name}: {errs:?}");
        }
    }

    #[test]
    fn test_update_allowed() {
        let cases = vec![
            ("spec change when no ongoing spec change", true, false, true),
            ("spec change when ongoing spec change", true, true, false),
            ("meta change when no ongoing spec change", false, false, true),
            ("meta change when ongoing spec change", false, true, true),
        ];
        for (name, new_spec_change, ongoing_spec_change, valid) in cases {
            let mut old = valid_instance_for_create();
            old.metadata.generation = Some(if ongoing_spec_change { 2 } else { 1 });
            status(&mut old).reconciled_generation = 1;

            let mut new = valid_instance_for_create();
            let old_generation = old.metadata.generation.unwrap();
            new.metadata.generation = Some(if new_spec_change { old_generation + 1 } else { old_generation });
            status(&mut new).reconciled_generation = 1;

            let errs = validate_instance_update_allowed(&new, &old);
            assert_eq!(errs.is_empty(), valid, "{name}: {errs:?}");
        }
    }

    #[test]
    fn test_update_allowed_for_plan_change() {
        let cases = vec![
            ("valid plan change", "old-plan", "new-plan", None, true),
            (
                "plan ref not cleared",
                "old-plan",
                "new-plan",
                Some(ClusterObjectReference::default()),
                false,
            ),
            (
                "no plan change",
                "plan-name",
                "plan-name",
                Some(ClusterObjectReference::default()),
                true,
            ),
        ];
        for (name, old_plan, new_plan, new_plan_ref, valid) in cases {
            let old = modify(valid_instance(), |i| {
                i.spec.plan_reference.cluster_service_plan_external_name = Some(old_plan.to_string())
            });
            let new = modify(valid_instance(), |i| {
                i.spec.plan_reference.cluster_service_plan_external_name = Some(new_plan.to_string());
                i.spec.cluster_service_plan_ref = new_plan_ref;
            });
            let errs = validate_instance_update_allowed(&new, &old);
            assert_eq!(errs.is_empty(), valid, "{name}: {errs:?}");
        }
    }

    #[test]
    fn test_status_update() {
        let started = ServiceInstanceStatus {
            current_operation: Some(ServiceInstanceOperation::Provision),
            operation_start_time: Some(NOW.to_string()),
            in_progress_properties: Some(ServiceInstancePropertiesState::default()),
            async_op_in_progress: true,
            ..Default::default()
        };
        let cases = vec![
            ("start async op", ServiceInstanceStatus::default(), started.clone(), true),
            ("complete async op", started.clone(), ServiceInstanceStatus::default(), true),
            (
                "ready can not be true while operation is ongoing",
                ServiceInstanceStatus {
                    conditions: ready(ConditionStatus::False),
                    ..Default::default()
                },
                ServiceInstanceStatus {
                    conditions: ready(ConditionStatus::True),
                    async_op_in_progress: false,
                    ..started.clone()
                },
                false,
            ),
            (
                "ready can be true once the operation completed",
                ServiceInstanceStatus {
                    conditions: ready(ConditionStatus::False),
                    ..started.clone()
                },
                ServiceInstanceStatus {
                    conditions: ready(ConditionStatus::True),
                    ..Default::default()
                },
                true,
            ),
        ];

        for (name, old_status, new_status, valid) in cases {
            let mut old = valid_instance();
            old.metadata.generation = Some(2);
            old.status = Some(ServiceInstanceStatus {
                reconciled_generation: 1,
                ..old_status
            });
            let mut new = old.clone();
            new.status = Some(ServiceInstanceStatus {
                reconciled_generation: 1,
                ..new_status
            });

            let errs = validate_service_instance_status_update(&new, &old);
            assert_eq!(errs.is_empty(), valid, "{name}: {errs:?}");
            for err in errs {
                assert!(err.detail.contains("operation in progress"), "{name}: {err}");
            }
        }
    }

    #[test]
    fn test_references_update() {
        let without_refs = modify(valid_instance(), |i| i.spec.clear_refs());
        let cases = vec![
            ("valid class and plan update", without_refs.clone(), valid_instance(), true),
            (
                "class ref changed",
                valid_instance(),
                modify(valid_instance(), |i| {
                    i.spec.cluster_service_class_ref = Some(ClusterObjectReference {
                        name: "new-class-name".to_string(),
                    })
                }),
                false,
            ),
            (
                "direct update to plan ref",
                valid_instance(),
                modify(valid_instance(), |i| {
                    i.spec.cluster_service_plan_ref = Some(ClusterObjectReference {
                        name: "new-plan-name".to_string(),
                    })
                }),
                false,
            ),
            (
                "plan ref set after a plan change",
                modify(valid_instance(), |i| i.spec.cluster_service_plan_ref = None),
                modify(valid_instance(), |i| {
                    i.spec.cluster_service_plan_ref = Some(ClusterObjectReference {
                        name: "new-plan-name".to_string(),
                    })
                }),
                true,
            ),
            ("refs left empty", without_refs.clone(), without_refs, false),
            ("in-progress operation", in_progress_provision(), in_progress_provision(), false),
        ];
        for (name, old, new, valid) in cases {
            let errs = validate_service_instance_references_update(&new, &old);
            assert_eq!(errs.is_empty(), valid, "{name}: {errs:?}");
        }
    }
}
