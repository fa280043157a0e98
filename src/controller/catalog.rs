//! Turns a broker's OSB catalog into the classes and plans it publishes.

use std::collections::HashSet;

use kube::api::Api;
use kube::{Resource, ResourceExt};
use serde_json::Value;

use super::ControllerError;
use crate::apis::{
    CatalogResource,
    BrokerResource, ClassResource, ClusterObjectReference, ClusterServiceBroker, ClusterServiceClass,
    ClusterServiceClassSpec, ClusterServicePlan, ClusterServicePlanSpec, CommonServiceClassSpec,
    CommonServicePlanSpec, LocalObjectReference, PlanResource, ServiceBroker, ServiceClass,
    ServiceClassSpec, ServicePlan, ServicePlanSpec,
};
use crate::client::CatalogClient;
use crate::osb::{CatalogResponse, Plan, Service};

/// A broker kind together with the class and plan kinds it publishes into its own scope.
pub trait CatalogBroker: BrokerResource {
    type Class: ClassResource;
    type Plan: PlanResource;

    fn api(client: &CatalogClient, namespace: Option<&str>) -> Api<Self>;
    fn class_api(client: &CatalogClient, namespace: Option<&str>) -> Api<Self::Class>;
    fn plan_api(client: &CatalogClient, namespace: Option<&str>) -> Api<Self::Plan>;

    fn class_for(&self, name: &str, common: CommonServiceClassSpec) -> Self::Class;
    fn plan_for(&self, name: &str, class_name: &str, common: CommonServicePlanSpec) -> Self::Plan;
}

impl CatalogBroker for ClusterServiceBroker {
    type Class = ClusterServiceClass;
    type Plan = ClusterServicePlan;

    fn api(client: &CatalogClient, _namespace: Option<&str>) -> Api<Self> {
        client.cluster_service_brokers()
    }
    fn class_api(client: &CatalogClient, _namespace: Option<&str>) -> Api<Self::Class> {
        client.cluster_service_classes()
    }
    fn plan_api(client: &CatalogClient, _namespace: Option<&str>) -> Api<Self::Plan> {
        client.cluster_service_plans()
    }

    fn class_for(&self, name: &str, common: CommonServiceClassSpec) -> ClusterServiceClass {
        ClusterServiceClass::new(
            name,
            ClusterServiceClassSpec {
                common,
                cluster_service_broker_name: self.name_any(),
            },
        )
    }

    fn plan_for(&self, name: &str, class_name: &str, common: CommonServicePlanSpec) -> ClusterServicePlan {
        ClusterServicePlan::new(
            name,
            ClusterServicePlanSpec {
                common,
                cluster_service_broker_name: self.name_any(),
                cluster_service_class_ref: ClusterObjectReference {
                    name: class_name.to_string(),
                },
            },
        )
    }
}

impl CatalogBroker for ServiceBroker {
    type Class = ServiceClass;
    type Plan = ServicePlan;

    fn api(client: &CatalogClient, namespace: Option<&str>) -> Api<Self> {
        client.service_brokers(namespace)
    }
    fn class_api(client: &CatalogClient, namespace: Option<&str>) -> Api<Self::Class> {
        client.service_classes(namespace)
    }
    fn plan_api(client: &CatalogClient, namespace: Option<&str>) -> Api<Self::Plan> {
        client.service_plans(namespace)
    }

    fn class_for(&self, name: &str, common: CommonServiceClassSpec) -> ServiceClass {
        let mut class = ServiceClass::new(
            name,
            ServiceClassSpec {
                common,
                service_broker_name: self.name_any(),
            },
        );
        class.metadata.namespace = self.namespace();
        class
    }

    fn plan_for(&self, name: &str, class_name: &str, common: CommonServicePlanSpec) -> ServicePlan {
        let mut plan = ServicePlan::new(
            name,
            ServicePlanSpec {
                common,
                service_broker_name: self.name_any(),
                service_class_ref: LocalObjectReference {
                    name: class_name.to_string(),
                },
            },
        );
        plan.metadata.namespace = self.namespace();
        plan
    }
}

/// Classes are named after the OSB service ID and keep the service name as external name.
pub fn class_spec(service: &Service) -> CommonServiceClassSpec {
    CommonServiceClassSpec {
        external_name: service.name.clone(),
        external_id: service.id.clone(),
        description: service.description.clone(),
        bindable: service.bindable,
        plan_updatable: service.plan_updatable.unwrap_or(false),
        external_metadata: service.metadata.clone().map(Value::Object),
        tags: service.tags.clone(),
        requires: service.requires.clone(),
    }
}

/// Plans are free unless the broker says otherwise.
pub fn plan_spec(plan: &Plan) -> CommonServicePlanSpec {
    let schemas = plan.schemas.as_ref();
    let instance = schemas.and_then(|s| s.service_instance.as_ref());
    let binding = schemas.and_then(|s| s.service_binding.as_ref());
    CommonServicePlanSpec {
        external_name: plan.name.clone(),
        external_id: plan.id.clone(),
        description: plan.description.clone(),
        bindable: plan.bindable,
        free: plan.free.unwrap_or(true),
        external_metadata: plan.metadata.clone().map(Value::Object),
        instance_create_parameter_schema: instance
            .and_then(|i| i.create.as_ref())
            .and_then(|c| c.parameters.clone()),
        instance_update_parameter_schema: instance
            .and_then(|i| i.update.as_ref())
            .and_then(|u| u.parameters.clone()),
        service_binding_create_parameter_schema: binding
            .and_then(|b| b.create.as_ref())
            .and_then(|c| c.parameters.clone()),
    }
}

/// The writes that bring the stored classes and plans in line with a fetched catalog.
#[derive(Debug)]
pub struct CatalogSync<C, P> {
    /// Desired classes and plans, applied whether or not they exist yet.
    pub classes: Vec<C>,
    pub plans: Vec<P>,
    /// Existing objects whose `removedFromBrokerCatalog` flag flips, with the new value.
    pub class_status: Vec<(String, bool)>,
    pub plan_status: Vec<(String, bool)>,
}

/// Computes the catalog writes for `broker`. `existing_classes` and `existing_plans` hold
/// every object in the broker's scope, including those of other brokers.
pub fn sync_catalog<B: CatalogBroker>(
    broker: &B,
    catalog: &CatalogResponse,
    existing_classes: &[B::Class],
    existing_plans: &[B::Plan],
) -> Result<CatalogSync<B::Class, B::Plan>, ControllerError> {
    if catalog.services.is_empty() {
        return Err(ControllerError::EmptyCatalog);
    }
    let broker_name = broker.name_any();

    let mut classes = Vec::new();
    let mut plans = Vec::new();
    for service in &catalog.services {
        check_owner(existing_classes, &service.id, &broker_name, |c| c.broker_name())?;
        classes.push(broker.class_for(&service.id, class_spec(service)));
        for plan in &service.plans {
            check_owner(existing_plans, &plan.id, &broker_name, |p| p.broker_name())?;
            plans.push(broker.plan_for(&plan.id, &service.id, plan_spec(plan)));
        }
    }

    let listed: HashSet<String> = classes.iter().map(|c| c.name_any()).collect();
    let class_status = flag_changes(
        existing_classes,
        |c| c.broker_name() == broker_name,
        |c| c.status().is_some_and(|s| s.removed_from_broker_catalog),
        &listed,
    );
    let listed: HashSet<String> = plans.iter().map(|p| p.name_any()).collect();
    let plan_status = flag_changes(
        existing_plans,
        |p| p.broker_name() == broker_name,
        |p| p.status().is_some_and(|s| s.removed_from_broker_catalog),
        &listed,
    );

    Ok(CatalogSync {
        classes,
        plans,
        class_status,
        plan_status,
    })
}

fn check_owner<K: Resource<DynamicType = ()>>(
    existing: &[K],
    name: &str,
    broker: &str,
    owner: impl Fn(&K) -> &str,
) -> Result<(), ControllerError> {
    match existing.iter().find(|k| k.meta().name.as_deref() == Some(name)) {
        Some(other) if owner(other) != broker => Err(ControllerError::OwnedByOtherBroker {
            kind: K::kind(&()).to_string(),
            name: name.to_string(),
            owner: owner(other).to_string(),
        }),
        _ => Ok(()),
    }
}

fn flag_changes<K: Resource>(
    existing: &[K],
    owned: impl Fn(&K) -> bool,
    removed: impl Fn(&K) -> bool,
    listed: &HashSet<String>,
) -> Vec<(String, bool)> {
    existing
        .iter()
        .filter(|k| owned(*k))
        .filter_map(|k| {
            let name = k.name_any();
            let listed = listed.contains(&name);
            // Removed and listed again, or present and now unlisted.
            (removed(k) == listed).then_some((name, !listed))
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::apis::{CommonServiceBrokerSpec, ClusterServiceBrokerSpec, ServiceClassStatus, ServicePlanStatus};
    use crate::osb::{InputParametersSchema, Schemas, ServiceBindingSchema, ServiceInstanceSchema};

    fn broker() -> ClusterServiceBroker {
        ClusterServiceBroker::new(
            "test-broker",
            ClusterServiceBrokerSpec {
                common: CommonServiceBrokerSpec {
                    url: "http://broker".to_string(),
                    ..Default::default()
                },
                auth_info: None,
            },
        )
    }

    fn catalog() -> CatalogResponse {
        serde_json::from_value(serde_json::json!({
            "services": [{
                "id": "class-guid",
                "name": "mysql",
                "description": "A database",
                "bindable": true,
                "plan_updateable": true,
                "tags": ["sql"],
                "metadata": {"provider": "acme"},
                "plans": [
                    {"id": "plan-small", "name": "small", "description": "Small", "free": false},
                    {"id": "plan-large", "name": "large", "description": "Large"}
                ]
            }]
        }))
        .unwrap()
    }

    fn existing_class(name: &str, broker: &str, removed: bool) -> ClusterServiceClass {
        let mut class = broker_named(broker).class_for(
            name,
            CommonServiceClassSpec {
                external_name: name.to_string(),
                external_id: name.to_string(),
                ..Default::default()
            },
        );
        class.status = Some(ServiceClassStatus {
            removed_from_broker_catalog: removed,
        });
        class
    }

    fn existing_plan(name: &str, removed: bool) -> ClusterServicePlan {
        let mut plan = broker().plan_for(name, "class-guid", CommonServicePlanSpec::default());
        plan.status = Some(ServicePlanStatus {
            removed_from_broker_catalog: removed,
        });
        plan
    }

    fn broker_named(name: &str) -> ClusterServiceBroker {
        let mut broker = broker();
        broker.metadata.name = Some(name.to_string());
        broker
    }

    #[test]
    fn test_class_and_plan_specs() {
        let catalog = catalog();
        let service = &catalog.services[0];
        let class = class_spec(service);
        assert_eq!(class.external_name, "mysql");
        assert_eq!(class.external_id, "class-guid");
        assert!(class.bindable);
        assert!(class.plan_updatable);
        assert_eq!(class.tags, vec!["sql".to_string()]);
        assert_eq!(class.external_metadata, Some(serde_json::json!({"provider": "acme"})));

        let small = plan_spec(&service.plans[0]);
        assert!(!small.free);
        assert_eq!(small.bindable, None);
        // Free is the OSB default.
        assert!(plan_spec(&service.plans[1]).free);

        let schema = serde_json::json!({"type": "object"});
        let with_schemas = Plan {
            schemas: Some(Schemas {
                service_instance: Some(ServiceInstanceSchema {
                    create: Some(InputParametersSchema {
                        parameters: Some(schema.clone()),
                    }),
                    update: None,
                }),
                service_binding: Some(ServiceBindingSchema {
                    create: Some(InputParametersSchema {
                        parameters: Some(schema.clone()),
                    }),
                }),
            }),
            ..service.plans[0].clone()
        };
        let spec = plan_spec(&with_schemas);
        assert_eq!(spec.instance_create_parameter_schema, Some(schema.clone()));
        assert_eq!(spec.instance_update_parameter_schema, None);
        assert_eq!(spec.service_binding_create_parameter_schema, Some(schema));
    }

    #[test]
    fn test_sync_catalog() {
        let existing_classes = vec![
            existing_class("class-guid", "test-broker", true),
            existing_class("dropped-guid", "test-broker", false),
            existing_class("gone-guid", "test-broker", true),
            existing_class("foreign-guid", "other-broker", false),
        ];
        let existing_plans = vec![existing_plan("plan-small", false), existing_plan("plan-old", false)];

        let sync = sync_catalog(&broker(), &catalog(), &existing_classes, &existing_plans).unwrap();
        assert_eq!(sync.classes.len(), 1);
        let class = &sync.classes[0];
        assert_eq!(class.name_any(), "class-guid");
        assert_eq!(class.spec.cluster_service_broker_name, "test-broker");
        assert_eq!(class.spec.common.external_name, "mysql");

        let plans: Vec<_> = sync.plans.iter().map(|p| (p.name_any(), p.class_name().to_string())).collect();
        assert_eq!(
            plans,
            vec![
                ("plan-small".to_string(), "class-guid".to_string()),
                ("plan-large".to_string(), "class-guid".to_string()),
            ]
        );

        let mut class_status = sync.class_status.clone();
        class_status.sort();
        assert_eq!(
            class_status,
            vec![("class-guid".to_string(), false), ("dropped-guid".to_string(), true)]
        );
        assert_eq!(sync.plan_status, vec![("plan-old".to_string(), true)]);
    }

    #[test]
    fn test_sync_catalog_rejects() {
        let err = sync_catalog(&broker(), &CatalogResponse::default(), &[], &[]).unwrap_err();
        assert!(matches!(err, ControllerError::EmptyCatalog));

        let taken = vec![existing_class("class-guid", "other-broker", false)];
        let err = sync_catalog(&broker(), &catalog(), &taken, &[]).unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"ClusterServiceClass "class-guid" already exists for broker "other-broker""#
        );
    }

    #[test]
    fn test_namespaced_objects_land_in_broker_namespace() {
        let mut broker = ServiceBroker::new("ns-broker", Default::default());
        broker.metadata.namespace = Some("team-a".to_string());
        let sync = sync_catalog(&broker, &catalog(), &[], &[]).unwrap();
        assert_eq!(sync.classes[0].namespace().as_deref(), Some("team-a"));
        assert_eq!(sync.classes[0].spec.service_broker_name, "ns-broker");
        assert!(sync.plans.iter().all(|p| p.namespace().as_deref() == Some("team-a")));
        assert_eq!(sync.plans[0].spec.service_class_ref.name, "class-guid");
    }
}
