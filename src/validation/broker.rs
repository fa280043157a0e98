use crate::apis::{
    parse_duration, BrokerResource, ClusterServiceBroker, CommonServiceBrokerSpec, DurationError,
    ObjectReference, SecretAuthConfig, ServiceBroker, ServiceBrokerAuthInfo, ServiceBrokerRelistBehavior,
    ServiceBrokerStatus,
};

use super::{
    is_dns1123_subdomain, validate_condition_types, validate_object_meta, validate_object_meta_update,
    validate_reconciled_generation, validate_timestamp, ErrorList, FieldError, Path,
};

pub fn validate_cluster_service_broker(broker: &ClusterServiceBroker) -> ErrorList {
    let mut errs = validate_object_meta(&broker.metadata, false, is_dns1123_subdomain);
    errs.extend(validate_common_broker_spec(&broker.spec.common));
    if let Some(auth) = &broker.spec.auth_info {
        errs.extend(validate_auth_info(auth, |path, r: &ObjectReference| {
            let mut errs = ErrorList::new();
            if r.namespace.as_deref().unwrap_or_default().is_empty() {
                errs.push(FieldError::required(&path.child("namespace"), "namespace is required"));
            }
            if r.name.as_deref().unwrap_or_default().is_empty() {
                errs.push(FieldError::required(&path.child("name"), "name is required"));
            }
            errs
        }));
    }
    errs
}

pub fn validate_service_broker(broker: &ServiceBroker) -> ErrorList {
    let mut errs = validate_object_meta(&broker.metadata, true, is_dns1123_subdomain);
    errs.extend(validate_common_broker_spec(&broker.spec.common));
    if let Some(auth) = &broker.spec.auth_info {
        errs.extend(validate_auth_info(auth, |path, r| {
            if r.name.is_empty() {
                vec![FieldError::required(&path.child("name"), "name is required")]
            } else {
                ErrorList::new()
            }
        }));
    }
    errs
}

pub fn validate_cluster_service_broker_update(
    new: &ClusterServiceBroker,
    old: &ClusterServiceBroker,
) -> ErrorList {
    let mut errs = validate_cluster_service_broker(new);
    errs.extend(validate_broker_update(new, old));
    errs
}

pub fn validate_service_broker_update(new: &ServiceBroker, old: &ServiceBroker) -> ErrorList {
    let mut errs = validate_service_broker(new);
    errs.extend(validate_broker_update(new, old));
    errs
}

pub fn validate_cluster_service_broker_status_update(
    new: &ClusterServiceBroker,
    old: &ClusterServiceBroker,
) -> ErrorList {
    let mut errs = validate_cluster_service_broker_update(new, old);
    errs.extend(validate_broker_status(new));
    errs
}

pub fn validate_service_broker_status_update(new: &ServiceBroker, old: &ServiceBroker) -> ErrorList {
    let mut errs = validate_service_broker_update(new, old);
    errs.extend(validate_broker_status(new));
    errs
}

fn validate_common_broker_spec(spec: &CommonServiceBrokerSpec) -> ErrorList {
    let path = Path::new("spec");
    let mut errs = ErrorList::new();

    if spec.url.is_empty() {
        errs.push(FieldError::required(&path.child("url"), "brokers must have a remote url to contact"));
    }

    if spec.insecure_skip_tls_verify && spec.ca_bundle.as_deref().is_some_and(|b| !b.is_empty()) {
        errs.push(FieldError::forbidden(
            &path.child("caBundle"),
            "caBundle cannot be used when insecureSkipTLSVerify is true",
        ));
    }

    match (spec.relist_behavior, spec.relist_duration.as_deref()) {
        (ServiceBrokerRelistBehavior::Duration, None) => errs.push(FieldError::required(
            &path.child("relistDuration"),
            "relistDuration must be set if relistBehavior is set to Duration",
        )),
        (ServiceBrokerRelistBehavior::Duration, Some(raw)) => match parse_duration(raw) {
            Ok(d) if d.is_zero() => errs.push(FieldError::invalid(
                &path.child("relistDuration"),
                raw,
                "relistDuration must be greater than zero",
            )),
            Err(DurationError::Negative(_)) => errs.push(FieldError::invalid(
                &path.child("relistDuration"),
                raw,
                "relistDuration must be greater than zero",
            )),
            Ok(_) => {}
            Err(e) => errs.push(FieldError::invalid(
                &path.child("relistDuration"),
                raw,
                format!("relistDuration must be a duration: {e}"),
            )),
        },
        (ServiceBrokerRelistBehavior::Manual, Some(_)) => errs.push(FieldError::forbidden(
            &path.child("relistDuration"),
            "relistDuration must not be set if relistBehavior is set to Manual",
        )),
        (ServiceBrokerRelistBehavior::Manual, None) => {}
    }

    if spec.relist_requests < 0 {
        errs.push(FieldError::invalid(
            &path.child("relistRequests"),
            spec.relist_requests,
            "relistRequests must be greater than or equal to 0",
        ));
    }
    errs
}

fn validate_auth_info<R>(
    auth: &ServiceBrokerAuthInfo<R>,
    validate_ref: impl Fn(&Path, &R) -> ErrorList,
) -> ErrorList {
    let path = Path::new("spec").child("authInfo");
    let mut errs = ErrorList::new();

    if auth.basic.is_some() && auth.bearer.is_some() {
        errs.push(FieldError::forbidden(
            &path,
            "may not specify more than one authentication method",
        ));
    }

    let methods: [(&str, &Option<SecretAuthConfig<R>>); 2] =
        [("basic", &auth.basic), ("bearer", &auth.bearer)];
    for (field, config) in methods {
        let Some(config) = config else { continue };
        let path = path.child(field).child("secretRef");
        match &config.secret_ref {
            Some(r) => errs.extend(validate_ref(&path, r)),
            None => errs.push(FieldError::required(&path, "a secret reference is required")),
        }
    }
    errs
}

fn validate_broker_update<K: BrokerResource>(new: &K, old: &K) -> ErrorList {
    let mut errs = validate_object_meta_update(new.meta(), old.meta());
    let path = Path::new("spec").child("relistRequests");
    let (new_requests, old_requests) = (new.common().relist_requests, old.common().relist_requests);
    if new_requests < old_requests {
        errs.push(FieldError::invalid(
            &path,
            new_requests,
            "relistRequests must not decrease",
        ));
    }
    errs
}

fn validate_broker_status<K: BrokerResource>(broker: &K) -> ErrorList {
    let Some(status) = broker.status() else {
        return ErrorList::new();
    };
    validate_broker_status_fields(status, broker.meta().generation)
}

fn validate_broker_status_fields(status: &ServiceBrokerStatus, generation: Option<i64>) -> ErrorList {
    let path = Path::new("status");
    let mut errs = ErrorList::new();
    for (i, condition) in status.conditions.iter().enumerate() {
        errs.extend(validate_timestamp(
            condition.last_transition_time.as_deref(),
            &path.child("conditions").index(i).child("lastTransitionTime"),
        ));
    }
    let types: Vec<_> = status.conditions.iter().map(|c| c.type_).collect();
    errs.extend(validate_condition_types(&types, &path.child("conditions")));
    errs.extend(validate_reconciled_generation(
        status.reconciled_generation,
        generation,
        &path.child("reconciledGeneration"),
    ));
    errs.extend(validate_timestamp(
        status.operation_start_time.as_deref(),
        &path.child("operationStartTime"),
    ));
    errs.extend(validate_timestamp(
        status.last_catalog_retrieval_time.as_deref(),
        &path.child("lastCatalogRetrievalTime"),
    ));
    errs
}
