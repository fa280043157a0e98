use crate::apis::{ServiceBinding, ServiceBindingOperation, ServiceBindingSpec, ServiceBindingStatus};

use super::{
    is_dns1123_subdomain, validate_object_meta, validate_object_meta_update, validate_parameters,
    validate_condition_types, validate_parameters_from, validate_properties_parameters, validate_reconciled_generation,
    validate_timestamp, ErrorList, FieldError, Path,
};

pub fn validate_service_binding(binding: &ServiceBinding) -> ErrorList {
    validate_binding(binding, true)
}

/// The spec of a binding cannot change once it has been created.
pub fn validate_service_binding_update(new: &ServiceBinding, old: &ServiceBinding) -> ErrorList {
    let mut errs = validate_binding(new, false);
    errs.extend(validate_object_meta_update(&new.metadata, &old.metadata));
    if new.spec != old.spec {
        errs.push(FieldError::forbidden(
            &Path::new("spec"),
            "updates to the spec of a ServiceBinding are forbidden",
        ));
    }
    errs
}

pub fn validate_service_binding_status_update(
    new: &ServiceBinding,
    old: &ServiceBinding,
) -> ErrorList {
    let mut errs = validate_binding(new, false);
    errs.extend(validate_object_meta_update(&new.metadata, &old.metadata));
    errs
}

fn validate_binding(binding: &ServiceBinding, create: bool) -> ErrorList {
    let mut errs = validate_object_meta(&binding.metadata, true, is_dns1123_subdomain);
    errs.extend(validate_binding_spec(&binding.spec));
    let status = binding.status.clone().unwrap_or_default();
    errs.extend(validate_binding_status(
        &status,
        binding.metadata.generation.unwrap_or_default(),
        create,
    ));
    errs
}

fn validate_binding_spec(spec: &ServiceBindingSpec) -> ErrorList {
    let path = Path::new("spec");
    let mut errs = ErrorList::new();

    let instance_path = path.child("instanceRef").child("name");
    if spec.instance_ref.name.is_empty() {
        errs.push(FieldError::required(&instance_path, "a binding must reference an instance"));
    } else {
        for msg in is_dns1123_subdomain(&spec.instance_ref.name) {
            errs.push(FieldError::invalid(&instance_path, spec.instance_ref.name.as_str(), msg));
        }
    }

    if let Some(secret) = spec.secret_name.as_deref().filter(|s| !s.is_empty()) {
        for msg in is_dns1123_subdomain(secret) {
            errs.push(FieldError::invalid(&path.child("secretName"), secret, msg));
        }
    }

    errs.extend(validate_parameters(spec.parameters.as_ref(), &path.child("parameters")));
    errs.extend(validate_parameters_from(&spec.parameters_from, &path.child("parametersFrom")));
    errs
}

fn validate_binding_status(status: &ServiceBindingStatus, generation: i64, create: bool) -> ErrorList {
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
        if in_progress && generation <= status.reconciled_generation {
            errs.push(FieldError::forbidden(
                &path.child("currentOperation"),
                "currentOperation must not be present when reconciledGeneration is the same as generation",
            ));
        }
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

    let properties_path = path.child("inProgressProperties");
    match (status.current_operation, &status.in_progress_properties) {
        (Some(ServiceBindingOperation::Bind), None) => errs.push(FieldError::required(
            &properties_path,
            "inProgressProperties is required when currentOperation is Bind",
        )),
        (Some(ServiceBindingOperation::Unbind) | None, Some(_)) => errs.push(FieldError::forbidden(
            &properties_path,
            "inProgressProperties must not be present when currentOperation is not Bind",
        )),
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

    for (i, condition) in status.conditions.iter().enumerate() {
        errs.extend(validate_timestamp(
            condition.last_transition_time.as_deref(),
            &path.child("conditions").index(i).child("lastTransitionTime"),
        ));
    }
    let types: Vec<_> = status.conditions.iter().map(|c| c.type_).collect();
    errs.extend(validate_condition_types(&types, &path.child("conditions")));
    if in_progress && status.is_ready() {
        errs.push(FieldError::forbidden(
            &path.child("conditions"),
            "Ready condition can not be True while an operation in progress",
        ));
    }
    errs
}

#[cfg(test)]
mod test {
    use kube::api::ObjectMeta;

    use super::*;
    use crate::apis::{
        ConditionStatus, LocalObjectReference, ParametersFromSource, ServiceBindingCondition,
        ServiceBindingConditionType, ServiceBindingPropertiesState,
    };

    fn valid_binding() -> ServiceBinding {
        ServiceBinding {
            metadata: ObjectMeta {
                name: Some("test-binding".to_string()),
                namespace: Some("test-ns".to_string()),
                generation: Some(1),
                ..Default::default()
            },
            spec: ServiceBindingSpec {
                instance_ref: LocalObjectReference {
                    name: "test-instance".to_string(),
                },
                secret_name: Some("test-secret".to_string()),
                ..Default::default()
            },
            status: None,
        }
    }

    fn binding_in_progress() -> ServiceBinding {
        let mut binding = valid_binding();
        binding.metadata.generation = Some(2);
        binding.status = Some(ServiceBindingStatus {
            reconciled_generation: 1,
            current_operation: Some(ServiceBindingOperation::Bind),
            operation_start_time: Some("2018-01-01T00:00:00Z".to_string()),
            in_progress_properties: Some(ServiceBindingPropertiesState::default()),
            ..Default::default()
        });
        binding
    }

    fn modify(mut binding: ServiceBinding, f: impl FnOnce(&mut ServiceBinding)) -> ServiceBinding {
        f(&mut binding);
        binding
    }

    fn status(binding: &mut ServiceBinding) -> &mut ServiceBindingStatus {
        binding.status.get_or_insert_with(Default::default)
    }

    #[test]
    fn test_validate_service_binding() {
        let cases = vec![
            ("valid", valid_binding(), true, true),
            ("missing namespace", modify(valid_binding(), |b| b.metadata.namespace = None), true, false),
            ("missing instance", modify(valid_binding(), |b| b.spec.instance_ref.name.clear()), true, false),
            (
                "invalid instance name",
                modify(valid_binding(), |b| b.spec.instance_ref.name = "Bad_Name".to_string()),
                true,
                false,
            ),
            (
                "invalid secret name",
                modify(valid_binding(), |b| b.spec.secret_name = Some("Bad_Secret".to_string())),
                true,
                false,
            ),
            ("no secret name", modify(valid_binding(), |b| b.spec.secret_name = None), true, true),
            (
                "parameters from without secret key ref",
                modify(valid_binding(), |b| b.spec.parameters_from = vec![ParametersFromSource::default()]),
                true,
                false,
            ),
            ("valid in-progress bind", binding_in_progress(), false, true),
            (
                "valid in-progress unbind",
                modify(binding_in_progress(), |b| {
                    status(b).current_operation = Some(ServiceBindingOperation::Unbind);
                    status(b).in_progress_properties = None;
                }),
                false,
                true,
            ),
            (
                "in-progress bind without properties",
                modify(binding_in_progress(), |b| status(b).in_progress_properties = None),
                false,
                false,
            ),
            (
                "in-progress unbind with properties",
                modify(binding_in_progress(), |b| {
                    status(b).current_operation = Some(ServiceBindingOperation::Unbind)
                }),
                false,
                false,
            ),
            (
                "in-progress without start time",
                modify(binding_in_progress(), |b| status(b).operation_start_time = None),
                false,
                false,
            ),
            (
                "in-progress without updated generation",
                modify(binding_in_progress(), |b| status(b).reconciled_generation = 2),
                false,
                false,
            ),
            (
                "ready while bind in progress",
                modify(binding_in_progress(), |b| {
                    status(b).conditions = vec![ServiceBindingCondition {
                        type_: ServiceBindingConditionType::Ready,
                        status: ConditionStatus::True,
                        ..Default::default()
                    }]
                }),
                false,
                false,
            ),
            ("create with in-progress bind", binding_in_progress(), true, false),
        ];
        for (name, binding, create, valid) in cases {
            let errs = validate_binding(&binding, create);
            assert_eq!(errs.is_empty(), valid, "{name}: {errs:?}");
        }
    }

    #[test]
    fn test_binding_spec_is_immutable() {
        let old = valid_binding();
        assert!(validate_service_binding_update(&old.clone(), &old).is_empty());

        let new = modify(valid_binding(), |b| b.spec.instance_ref.name = "other-instance".to_string());
        let errs = validate_service_binding_update(&new, &old);
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].field, "spec");

        let relabeled = modify(valid_binding(), |b| {
            b.metadata.labels = Some([("team".to_string(), "a".to_string())].into())
        });
        assert!(validate_service_binding_update(&relabeled, &old).is_empty());
    }
}
