use crate::apis::{CatalogResource, ClassResource, ClusterServiceClass, ServiceClass};

use super::{
    is_external_name, is_guid_name, validate_immutable_field, validate_object_meta,
    validate_object_meta_update, ErrorList, FieldError, Path,
};

pub fn validate_cluster_service_class(class: &ClusterServiceClass) -> ErrorList {
    validate_class(class)
}

pub fn validate_service_class(class: &ServiceClass) -> ErrorList {
    validate_class(class)
}

pub fn validate_cluster_service_class_update(
    new: &ClusterServiceClass,
    old: &ClusterServiceClass,
) -> ErrorList {
    validate_class_update(new, old)
}

pub fn validate_service_class_update(new: &ServiceClass, old: &ServiceClass) -> ErrorList {
    validate_class_update(new, old)
}

fn broker_name_field<K: CatalogResource>() -> &'static str {
    if K::NAMESPACED {
        "serviceBrokerName"
    } else {
        "clusterServiceBrokerName"
    }
}

fn validate_class<K: ClassResource>(class: &K) -> ErrorList {
    let mut errs = validate_object_meta(class.meta(), K::NAMESPACED, is_guid_name);
    let path = Path::new("spec");

    if class.broker_name().is_empty() {
        errs.push(FieldError::required(
            &path.child(broker_name_field::<K>()),
            "classes must reference a broker",
        ));
    }

    let common = class.common();
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
    errs
}

fn validate_class_update<K: ClassResource>(new: &K, old: &K) -> ErrorList {
    let path = Path::new("spec");
    let mut errs = validate_class(new);
    errs.extend(validate_object_meta_update(new.meta(), old.meta()));
    errs.extend(validate_immutable_field(
        &new.common().external_id,
        &old.common().external_id,
        &path.child("externalID"),
    ));
    errs.extend(validate_immutable_field(
        &new.broker_name(),
        &old.broker_name(),
        &path.child(broker_name_field::<K>()),
    ));
    errs
}
