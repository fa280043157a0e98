use std::marker::PhantomData;

use crate::apis::{ClassResource, ClusterServiceClass, ServiceClass, ServiceClassStatus};
use crate::validation::{self, ErrorList};

use super::{
    prepare_meta_for_create, reset_object_meta_for_status, update_generation, RequestContext,
    RestStrategy,
};

pub trait ClassKind: ClassResource {
    fn validate(&self) -> ErrorList;
    fn validate_update(&self, old: &Self) -> ErrorList;
}

impl ClassKind for ClusterServiceClass {
    fn validate(&self) -> ErrorList {
        validation::validate_cluster_service_class(self)
    }
    fn validate_update(&self, old: &Self) -> ErrorList {
        validation::validate_cluster_service_class_update(self, old)
    }
}

impl ClassKind for ServiceClass {
    fn validate(&self) -> ErrorList {
        validation::validate_service_class(self)
    }
    fn validate_update(&self, old: &Self) -> ErrorList {
        validation::validate_service_class_update(self, old)
    }
}

pub struct ClassStrategy<K>(PhantomData<fn() -> K>);

impl<K> Default for ClassStrategy<K> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<K: ClassKind> RestStrategy for ClassStrategy<K> {
    type Object = K;

    // Classes are owned by the broker controller, which deletes them without a finalizer.
    fn prepare_for_create(&self, _ctx: &RequestContext, class: &mut K) {
        *class.status_mut() = Some(ServiceClassStatus::default());
        prepare_meta_for_create(class.meta_mut(), false);
    }

    fn prepare_for_update(&self, _ctx: &RequestContext, new: &mut K, old: &K) {
        *new.status_mut() = old.status().cloned();
        let spec_changed = new.spec() != old.spec();
        update_generation(new.meta_mut(), old.meta(), spec_changed);
    }

    fn validate(&self, class: &K) -> ErrorList {
        class.validate()
    }

    fn validate_update(&self, new: &K, old: &K) -> ErrorList {
        new.validate_update(old)
    }
}

pub struct ClassStatusStrategy<K>(PhantomData<fn() -> K>);

impl<K> Default for ClassStatusStrategy<K> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<K: ClassKind> RestStrategy for ClassStatusStrategy<K> {
    type Object = K;

    fn prepare_for_create(&self, ctx: &RequestContext, class: &mut K) {
        ClassStrategy::<K>::default().prepare_for_create(ctx, class)
    }

    fn prepare_for_update(&self, _ctx: &RequestContext, new: &mut K, old: &K) {
        *new.spec_mut() = old.spec().clone();
        reset_object_meta_for_status(new.meta_mut(), old.meta());
    }

    fn validate(&self, class: &K) -> ErrorList {
        class.validate()
    }

    fn validate_update(&self, new: &K, old: &K) -> ErrorList {
        new.validate_update(old)
    }
}
