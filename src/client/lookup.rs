//! Class and plan lookups over the informer caches, shared by the admission plugins and
//! the instance reference resolver.

use std::sync::Arc;

use kube::runtime::reflector::ObjectRef;
use kube::ResourceExt;

use super::KubeStore;
use crate::apis::{ClassResource, PlanResource};

/// Finds a class either by object name or by external name, within `namespace` for
/// namespaced classes.
pub fn find_class<C: ClassResource>(
    store: &Arc<dyn KubeStore<C>>,
    namespace: Option<&str>,
    name: Option<&str>,
    external_name: Option<&str>,
) -> Option<Arc<C>> {
    match (name.filter(|n| !n.is_empty()), external_name) {
        (Some(name), _) => {
            let key = match namespace {
                Some(ns) => ObjectRef::new(name).within(ns),
                None => ObjectRef::new(name),
            };
            store.get(&key)
        }
        (None, Some(external_name)) => store.list().into_iter().find(|c| {
            c.common().external_name == external_name && c.namespace().as_deref() == namespace
        }),
        (None, None) => None,
    }
}

/// The plans that belong to `class`.
pub fn plans_of<C: ClassResource, P: PlanResource>(store: &Arc<dyn KubeStore<P>>, class: &C) -> Vec<Arc<P>> {
    let class_name = class.name_any();
    let namespace = class.namespace();
    store
        .list()
        .into_iter()
        .filter(|p| p.class_name() == class_name && p.namespace() == namespace)
        .collect()
}

/// Finds a plan of `class` by object name or by external name.
pub fn find_plan<C: ClassResource, P: PlanResource>(
    store: &Arc<dyn KubeStore<P>>,
    class: &C,
    name: Option<&str>,
    external_name: Option<&str>,
) -> Option<Arc<P>> {
    let name = name.filter(|n| !n.is_empty());
    plans_of(store, class).into_iter().find(|p| match (name, external_name) {
        (Some(name), _) => p.name_any() == name,
        (None, Some(external_name)) => p.common().external_name == external_name,
        (None, None) => false,
    })
}
