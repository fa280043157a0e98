//! REST strategies: how each catalog resource is prepared and validated before the
//! apiserver persists it.
//!
//! A [`RestStrategy`] works on the typed object. The webhook only sees JSON, so every
//! strategy is also usable as a [`DynamicStrategy`], and a [`Registry`] maps resource
//! plurals (including the legacy `brokers`, `instances` and `bindings`) and subresources
//! to them.

mod binding;
mod broker;
pub mod checksum;
mod class;
mod err;
mod instance;
mod plan;

pub use binding::*;
pub use broker::*;
pub use class::*;
pub use err::*;
pub use instance::*;
pub use plan::*;

use std::collections::HashMap;
use std::sync::Arc;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde_json::Value;

use crate::apis::{
    CatalogResource, ClusterServiceBroker, ClusterServiceClass, ClusterServicePlan, ServiceBroker,
    ServiceClass, ServicePlan, UserInfo, FINALIZER_SERVICE_CATALOG,
};
use crate::validation::ErrorList;

/// Request scoped information a strategy may use.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// The user making the request, as authenticated by the apiserver.
    pub user: Option<UserInfo>,
}

impl RequestContext {
    pub fn with_user(user: UserInfo) -> Self {
        Self { user: Some(user) }
    }
}

pub trait RestStrategy: Send + Sync {
    type Object: CatalogResource;

    fn namespace_scoped(&self) -> bool {
        <Self::Object as CatalogResource>::NAMESPACED
    }

    /// Clears fields that clients may not set on create and seeds the initial state.
    fn prepare_for_create(&self, ctx: &RequestContext, obj: &mut Self::Object);

    /// Carries over fields that clients may not change from `old`.
    fn prepare_for_update(&self, ctx: &RequestContext, new: &mut Self::Object, old: &Self::Object);

    fn validate(&self, obj: &Self::Object) -> ErrorList;

    fn validate_update(&self, new: &Self::Object, old: &Self::Object) -> ErrorList;
}

/// A [`RestStrategy`] over raw JSON objects, as carried by admission reviews.
pub trait DynamicStrategy: Send + Sync {
    fn namespace_scoped(&self) -> bool;
    fn prepare_for_create(&self, ctx: &RequestContext, obj: &Value) -> Result<Value, StrategyError>;
    fn prepare_for_update(
        &self,
        ctx: &RequestContext,
        new: &Value,
        old: &Value,
    ) -> Result<Value, StrategyError>;
    fn validate(&self, obj: &Value) -> Result<ErrorList, StrategyError>;
    fn validate_update(&self, new: &Value, old: &Value) -> Result<ErrorList, StrategyError>;
}

fn decode<K: CatalogResource>(value: &Value) -> Result<K, StrategyError> {
    serde_json::from_value(value.clone()).map_err(|source| StrategyError::Decode {
        kind: K::kind(&()).to_string(),
        source,
    })
}

fn encode<K: CatalogResource>(obj: &K) -> Result<Value, StrategyError> {
    serde_json::to_value(obj).map_err(|source| StrategyError::Encode {
        kind: K::kind(&()).to_string(),
        source,
    })
}

impl<S: RestStrategy> DynamicStrategy for S {
    fn namespace_scoped(&self) -> bool {
        RestStrategy::namespace_scoped(self)
    }

    fn prepare_for_create(&self, ctx: &RequestContext, obj: &Value) -> Result<Value, StrategyError> {
        let mut typed = decode::<S::Object>(obj)?;
        RestStrategy::prepare_for_create(self, ctx, &mut typed);
        encode(&typed)
    }

    fn prepare_for_update(
        &self,
        ctx: &RequestContext,
        new: &Value,
        old: &Value,
    ) -> Result<Value, StrategyError> {
        let mut typed = decode::<S::Object>(new)?;
        let old = decode::<S::Object>(old)?;
        RestStrategy::prepare_for_update(self, ctx, &mut typed, &old);
        encode(&typed)
    }

    fn validate(&self, obj: &Value) -> Result<ErrorList, StrategyError> {
        Ok(RestStrategy::validate(self, &decode::<S::Object>(obj)?))
    }

    fn validate_update(&self, new: &Value, old: &Value) -> Result<ErrorList, StrategyError> {
        Ok(RestStrategy::validate_update(
            self,
            &decode::<S::Object>(new)?,
            &decode::<S::Object>(old)?,
        ))
    }
}

/// Strategies by `(resource, subresource)`; the main resource uses an empty subresource.
pub struct Registry {
    strategies: HashMap<(String, String), Arc<dyn DynamicStrategy>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// A registry holding every catalog resource, under both current and legacy names.
    pub fn new() -> Self {
        let mut registry = Self {
            strategies: HashMap::new(),
        };

        registry.register(
            &["clusterservicebrokers", "brokers"],
            "",
            BrokerStrategy::<ClusterServiceBroker>::default(),
        );
        registry.register(
            &["clusterservicebrokers", "brokers"],
            "status",
            BrokerStatusStrategy::<ClusterServiceBroker>::default(),
        );
        registry.register(&["servicebrokers"], "", BrokerStrategy::<ServiceBroker>::default());
        registry.register(
            &["servicebrokers"],
            "status",
            BrokerStatusStrategy::<ServiceBroker>::default(),
        );

        registry.register(
            &["clusterserviceclasses"],
            "",
            ClassStrategy::<ClusterServiceClass>::default(),
        );
        registry.register(
            &["clusterserviceclasses"],
            "status",
            ClassStatusStrategy::<ClusterServiceClass>::default(),
        );
        registry.register(&["serviceclasses"], "", ClassStrategy::<ServiceClass>::default());
        registry.register(
            &["serviceclasses"],
            "status",
            ClassStatusStrategy::<ServiceClass>::default(),
        );

        registry.register(
            &["clusterserviceplans"],
            "",
            PlanStrategy::<ClusterServicePlan>::default(),
        );
        registry.register(
            &["clusterserviceplans"],
            "status",
            PlanStatusStrategy::<ClusterServicePlan>::default(),
        );
        registry.register(&["serviceplans"], "", PlanStrategy::<ServicePlan>::default());
        registry.register(
            &["serviceplans"],
            "status",
            PlanStatusStrategy::<ServicePlan>::default(),
        );

        registry.register(&["serviceinstances", "instances"], "", InstanceStrategy);
        registry.register(&["serviceinstances", "instances"], "status", InstanceStatusStrategy);

        registry.register(&["servicebindings", "bindings"], "", BindingStrategy);
        registry.register(&["servicebindings", "bindings"], "status", BindingStatusStrategy);

        registry
    }

    fn register(
        &mut self,
        resources: &[&str],
        subresource: &str,
        strategy: impl DynamicStrategy + 'static,
    ) {
        let strategy: Arc<dyn DynamicStrategy> = Arc::new(strategy);
        for resource in resources {
            self.strategies.insert(
                (resource.to_string(), subresource.to_string()),
                strategy.clone(),
            );
        }
    }

    pub fn get(&self, resource: &str, subresource: &str) -> Option<Arc<dyn DynamicStrategy>> {
        self.strategies
            .get(&(resource.to_string(), subresource.to_string()))
            .cloned()
    }
}

/// Adds the catalog finalizer once and starts the generation counter.
pub(crate) fn prepare_meta_for_create(meta: &mut ObjectMeta, with_finalizer: bool) {
    meta.generation = Some(1);
    if with_finalizer {
        let finalizers = meta.finalizers.get_or_insert_with(Vec::new);
        if !finalizers.iter().any(|f| f == FINALIZER_SERVICE_CATALOG) {
            finalizers.push(FINALIZER_SERVICE_CATALOG.to_string());
        }
    }
}

/// Bumps the generation when the spec changed, otherwise keeps the old one.
pub(crate) fn update_generation(new: &mut ObjectMeta, old: &ObjectMeta, spec_changed: bool) {
    let old_generation = old.generation.unwrap_or_default();
    new.generation = Some(if spec_changed {
        old_generation + 1
    } else {
        old_generation
    });
}

/// Status updates may not touch the metadata fields clients own.
pub(crate) fn reset_object_meta_for_status(new: &mut ObjectMeta, old: &ObjectMeta) {
    new.deletion_timestamp = old.deletion_timestamp.clone();
    new.generation = old.generation;
    new.self_link = old.self_link.clone();
    new.labels = old.labels.clone();
    new.annotations = old.annotations.clone();
    new.finalizers = old.finalizers.clone();
    new.owner_references = old.owner_references.clone();
}
