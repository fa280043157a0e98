use std::marker::PhantomData;

use crate::apis::{
    BrokerResource, ClusterServiceBroker, ServiceBroker, ServiceBrokerRelistBehavior,
    ServiceBrokerStatus, DEFAULT_RELIST_DURATION,
};
use crate::validation::{self, ErrorList};

use super::checksum::update_checksum;
use super::{
    prepare_meta_for_create, reset_object_meta_for_status, update_generation, RequestContext,
    RestStrategy,
};

/// Ties each broker kind to its validators.
pub trait BrokerKind: BrokerResource {
    fn validate(&self) -> ErrorList;
    fn validate_update(&self, old: &Self) -> ErrorList;
    fn validate_status_update(&self, old: &Self) -> ErrorList;
}

impl BrokerKind for ClusterServiceBroker {
    fn validate(&self) -> ErrorList {
        validation::validate_cluster_service_broker(self)
    }
    fn validate_update(&self, old: &Self) -> ErrorList {
        validation::validate_cluster_service_broker_update(self, old)
    }
    fn validate_status_update(&self, old: &Self) -> ErrorList {
        validation::validate_cluster_service_broker_status_update(self, old)
    }
}

impl BrokerKind for ServiceBroker {
    fn validate(&self) -> ErrorList {
        validation::validate_service_broker(self)
    }
    fn validate_update(&self, old: &Self) -> ErrorList {
        validation::validate_service_broker_update(self, old)
    }
    fn validate_status_update(&self, old: &Self) -> ErrorList {
        validation::validate_service_broker_status_update(self, old)
    }
}

pub struct BrokerStrategy<K>(PhantomData<fn() -> K>);

impl<K> Default for BrokerStrategy<K> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<K: BrokerKind> RestStrategy for BrokerStrategy<K> {
    type Object = K;

    fn prepare_for_create(&self, _ctx: &RequestContext, broker: &mut K) {
        *broker.status_mut() = Some(ServiceBrokerStatus::default());
        prepare_meta_for_create(broker.meta_mut(), true);

        let common = broker.common_mut();
        if common.relist_behavior == ServiceBrokerRelistBehavior::Duration
            && common.relist_duration.is_none()
        {
            common.relist_duration = Some(DEFAULT_RELIST_DURATION.to_string());
        }
    }

    fn prepare_for_update(&self, _ctx: &RequestContext, new: &mut K, old: &K) {
        *new.status_mut() = old.status().cloned();
        let spec_changed = new.spec() != old.spec();
        update_generation(new.meta_mut(), old.meta(), spec_changed);
    }

    fn validate(&self, broker: &K) -> ErrorList {
        broker.validate()
    }

    fn validate_update(&self, new: &K, old: &K) -> ErrorList {
        new.validate_update(old)
    }
}

/// Strategy of the `status` subresource: only the status may change.
pub struct BrokerStatusStrategy<K>(PhantomData<fn() -> K>);

impl<K> Default for BrokerStatusStrategy<K> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<K: BrokerKind> RestStrategy for BrokerStatusStrategy<K> {
    type Object = K;

    fn prepare_for_create(&self, ctx: &RequestContext, broker: &mut K) {
        BrokerStrategy::<K>::default().prepare_for_create(ctx, broker)
    }

    fn prepare_for_update(&self, _ctx: &RequestContext, new: &mut K, old: &K) {
        *new.spec_mut() = old.spec().clone();
        reset_object_meta_for_status(new.meta_mut(), old.meta());
        update_checksum(new, old);
    }

    fn validate(&self, broker: &K) -> ErrorList {
        broker.validate()
    }

    fn validate_update(&self, new: &K, old: &K) -> ErrorList {
        new.validate_status_update(old)
    }
}

#[cfg(test)]
mod test {
    use kube::Resource;

    use super::*;
    use crate::apis::{
        ClusterServiceBrokerSpec, CommonServiceBrokerSpec, ConditionStatus, ServiceBrokerCondition,
        ServiceBrokerConditionType, FINALIZER_SERVICE_CATALOG,
    };
    use crate::registry::checksum::spec_checksum;

    fn broker() -> ClusterServiceBroker {
        ClusterServiceBroker::new(
            "test-broker",
            ClusterServiceBrokerSpec {
                common: CommonServiceBrokerSpec {
                    url: "http://example.com".to_string(),
                    ..Default::default()
                },
                auth_info: None,
            },
        )
    }

    #[test]
    fn test_prepare_for_create() {
        let strategy = BrokerStrategy::<ClusterServiceBroker>::default();
        let mut broker = broker();
        broker.status = Some(ServiceBrokerStatus {
            reconciled_generation: 3,
            ..Default::default()
        });
        strategy.prepare_for_create(&RequestContext::default(), &mut broker);

        assert_eq!(broker.status, Some(ServiceBrokerStatus::default()));
        assert_eq!(broker.meta().generation, Some(1));
        assert_eq!(
            broker.meta().finalizers,
            Some(vec![FINALIZER_SERVICE_CATALOG.to_string()])
        );
        assert_eq!(broker.spec.common.relist_duration.as_deref(), Some("15m"));
        assert!(!strategy.namespace_scoped());
    }

    #[test]
    fn test_manual_relist_gets_no_default_duration() {
        let strategy = BrokerStrategy::<ClusterServiceBroker>::default();
        let mut broker = broker();
        broker.spec.common.relist_behavior = ServiceBrokerRelistBehavior::Manual;
        strategy.prepare_for_create(&RequestContext::default(), &mut broker);
        assert_eq!(broker.spec.common.relist_duration, None);
        assert!(strategy.validate(&broker).is_empty());
    }

    #[test]
    fn test_prepare_for_update() {
        let strategy = BrokerStrategy::<ClusterServiceBroker>::default();
        let mut old = broker();
        old.metadata.generation = Some(1);
        old.status = Some(ServiceBrokerStatus {
            reconciled_generation: 1,
            ..Default::default()
        });

        let mut unchanged = old.clone();
        unchanged.status = None;
        strategy.prepare_for_update(&RequestContext::default(), &mut unchanged, &old);
        assert_eq!(unchanged.metadata.generation, Some(1));
        assert_eq!(unchanged.status, old.status);

        let mut changed = old.clone();
        changed.spec.common.relist_requests = 1;
        strategy.prepare_for_update(&RequestContext::default(), &mut changed, &old);
        assert_eq!(changed.metadata.generation, Some(2));
    }

    #[test]
    fn test_status_update_keeps_spec_and_sets_checksum() {
        let strategy = BrokerStatusStrategy::<ClusterServiceBroker>::default();
        let mut old = broker();
        old.metadata.generation = Some(1);
        old.status = Some(ServiceBrokerStatus::default());

        let mut new = old.clone();
        new.spec.common.url = "http://sneaky.example.com".to_string();
        new.metadata.labels = Some([("a".to_string(), "b".to_string())].into());
        new.status = Some(ServiceBrokerStatus {
            conditions: vec![ServiceBrokerCondition {
                type_: ServiceBrokerConditionType::Ready,
                status: ConditionStatus::True,
                ..Default::default()
            }],
            reconciled_generation: 1,
            ..Default::default()
        });

        strategy.prepare_for_update(&RequestContext::default(), &mut new, &old);
        assert_eq!(new.spec, old.spec);
        assert_eq!(new.metadata.labels, None);
        assert_eq!(
            new.status.as_ref().unwrap().checksum,
            Some(spec_checksum(&old.spec))
        );
        assert!(strategy.validate_update(&new, &old).is_empty());
    }
}
