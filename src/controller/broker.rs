use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, DeleteParams, ListParams, Patch, PatchParams};
use kube::runtime::controller::Action;
use kube::{Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, info, warn};

use super::{
    condition_is, parse_timestamp, set_condition, sync_catalog, timestamp, CatalogBroker, Context,
    ControllerError, ERROR_DELETING_CATALOG_MESSAGE, ERROR_DELETING_CATALOG_REASON, MANAGER_NAME,
};
use crate::apis::{
    BrokerResource, ClassResource, ConditionStatus, PlanResource, ServiceBrokerConditionType,
    ServiceBrokerRelistBehavior, ServiceBrokerStatus, ServiceClassStatus, ServicePlanStatus,
    FINALIZER_SERVICE_CATALOG,
};
use crate::client::{patch_status, replace_status};
use crate::osb::{AuthConfig, CatalogResponse, Client, ClientConfiguration};

pub const FETCHED_CATALOG_REASON: &str = "FetchedCatalog";
pub const FETCHED_CATALOG_MESSAGE: &str = "Successfully fetched catalog entries from broker.";
pub const DELETED_SUCCESSFULLY_REASON: &str = "DeletedSuccessfully";
pub const DELETED_SUCCESSFULLY_MESSAGE: &str = "The broker was deleted successfully";
pub const RETRY_TIMEOUT_REASON: &str = "ErrorReconciliationRetryTimeout";
pub const RETRY_TIMEOUT_MESSAGE: &str = "Stopping reconciliation retries because too much time has elapsed";

/// When a broker's catalog should be fetched next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relist {
    Now,
    After(Duration),
    Never,
}

/// Decides whether `broker` needs a relist at `now`.
///
/// A spec change, including a bumped `relistRequests`, always relists. So does a broker that
/// is not Ready yet. A Ready broker with `Duration` behavior relists once `relistDuration`
/// has passed since the last retrieval; `Manual` brokers wait for the next spec change, as
/// do brokers that gave up with `Failed`.
pub fn relist_decision<B: BrokerResource>(broker: &B, now: DateTime<Utc>) -> Relist {
    let Some(status) = broker.status() else {
        return Relist::Now;
    };
    if status.reconciled_generation != broker.meta().generation.unwrap_or_default() {
        return Relist::Now;
    }
    if condition_is(&status.conditions, ServiceBrokerConditionType::Failed, ConditionStatus::True) {
        return Relist::Never;
    }
    if !condition_is(&status.conditions, ServiceBrokerConditionType::Ready, ConditionStatus::True) {
        return Relist::Now;
    }

    let common = broker.common();
    if common.relist_behavior == ServiceBrokerRelistBehavior::Manual {
        return Relist::Never;
    }
    let Some(interval) = common.relist_interval() else {
        return Relist::Never;
    };
    let Some(last) = parse_timestamp(status.last_catalog_retrieval_time.as_deref()) else {
        return Relist::Now;
    };
    let next = chrono::Duration::from_std(interval)
        .ok()
        .and_then(|interval| last.checked_add_signed(interval));
    match next.map(|next| (next - now).to_std()) {
        Some(Ok(wait)) if !wait.is_zero() => Relist::After(wait),
        Some(_) => Relist::Now,
        None => Relist::Never,
    }
}

/// Sets a broker condition. A Ready broker records the generation it reconciled and when
/// the catalog was retrieved.
pub fn set_broker_condition(
    status: &mut ServiceBrokerStatus,
    generation: i64,
    type_: ServiceBrokerConditionType,
    condition_status: ConditionStatus,
    reason: &str,
    message: &str,
    now: DateTime<Utc>,
) {
    set_condition(&mut status.conditions, type_, condition_status, reason, message, now);
    if type_ == ServiceBrokerConditionType::Ready && condition_status == ConditionStatus::True {
        status.reconciled_generation = generation;
        status.last_catalog_retrieval_time = Some(timestamp(now));
    }
}

/// Records a failed relist. Returns true once retries have run for longer than
/// `retry_duration`, in which case the broker is marked Failed and left alone until its
/// spec changes.
pub fn record_relist_failure(
    status: &mut ServiceBrokerStatus,
    generation: i64,
    error: &ControllerError,
    now: DateTime<Utc>,
    retry_duration: Duration,
) -> bool {
    let (reason, prefix) = error.broker_reason();
    let message = format!("{prefix}{error}");
    set_broker_condition(
        status,
        generation,
        ServiceBrokerConditionType::Ready,
        ConditionStatus::False,
        reason,
        &message,
        now,
    );

    let started = parse_timestamp(status.operation_start_time.as_deref());
    let expired = started
        .zip(chrono::Duration::from_std(retry_duration).ok())
        .and_then(|(start, retry)| start.checked_add_signed(retry))
        .is_some_and(|deadline| now > deadline);
    if started.is_none() {
        status.operation_start_time = Some(timestamp(now));
    }
    if expired {
        set_broker_condition(
            status,
            generation,
            ServiceBrokerConditionType::Failed,
            ConditionStatus::True,
            RETRY_TIMEOUT_REASON,
            RETRY_TIMEOUT_MESSAGE,
            now,
        );
        status.reconciled_generation = generation;
        status.operation_start_time = None;
    }
    expired
}

/// Fetches the catalog of `broker`, authenticating with `secret` when the broker names one.
pub async fn fetch_catalog<B: BrokerResource>(
    broker: &B,
    secret: Option<&Secret>,
) -> Result<CatalogResponse, ControllerError> {
    let auth = match (broker.auth_secret(), secret) {
        (Some(auth), Some(secret)) => Some(AuthConfig::from_secret(auth.method, secret)?),
        _ => None,
    };
    let config = ClientConfiguration::for_broker(&broker.name_any(), broker.common(), auth)?;
    Ok(Client::new(config)?.get_catalog().await?)
}

async fn read_auth_secret<B: BrokerResource>(
    broker: &B,
    ctx: &Context,
) -> Result<Option<Secret>, ControllerError> {
    let Some(auth) = broker.auth_secret() else {
        return Ok(None);
    };
    let (Some(namespace), Some(name)) = (auth.namespace, auth.name) else {
        return Ok(None);
    };
    match ctx.client.secrets(&namespace).get(&name).await {
        Ok(secret) => Ok(Some(secret)),
        Err(source) => Err(ControllerError::AuthSecret {
            namespace,
            name,
            source,
        }),
    }
}

/// Fetches the catalog and writes it as classes and plans. Returns how many of each the
/// broker now publishes.
async fn relist<B: CatalogBroker>(broker: &B, ctx: &Context) -> Result<(usize, usize), ControllerError> {
    let secret = read_auth_secret(broker, ctx).await?;
    let catalog = fetch_catalog(broker, secret.as_ref()).await?;

    let namespace = broker.namespace();
    let classes = B::class_api(&ctx.client, namespace.as_deref());
    let plans = B::plan_api(&ctx.client, namespace.as_deref());
    let existing_classes = classes.list(&ListParams::default()).await?.items;
    let existing_plans = plans.list(&ListParams::default()).await?.items;
    let sync = sync_catalog(broker, &catalog, &existing_classes, &existing_plans)?;

    let apply = PatchParams::apply(MANAGER_NAME).force();
    for class in &sync.classes {
        classes.patch(&class.name_any(), &apply, &Patch::Apply(class)).await?;
    }
    for plan in &sync.plans {
        plans.patch(&plan.name_any(), &apply, &Patch::Apply(plan)).await?;
    }
    for (name, removed) in &sync.class_status {
        debug!(class = %name, removed, "Updating removedFromBrokerCatalog");
        let status = ServiceClassStatus {
            removed_from_broker_catalog: *removed,
        };
        patch_status(&classes, name, &status).await?;
    }
    for (name, removed) in &sync.plan_status {
        debug!(plan = %name, removed, "Updating removedFromBrokerCatalog");
        let status = ServicePlanStatus {
            removed_from_broker_catalog: *removed,
        };
        patch_status(&plans, name, &status).await?;
    }
    Ok((sync.classes.len(), sync.plans.len()))
}

/// Writes `status` unless it is what the broker already has.
async fn write_status<B: CatalogBroker>(
    broker: &B,
    ctx: &Context,
    status: ServiceBrokerStatus,
) -> Result<B, ControllerError> {
    if broker.status() == Some(&status) {
        return Ok(broker.clone());
    }
    let api = B::api(&ctx.client, broker.namespace().as_deref());
    let mut updated = broker.clone();
    *updated.status_mut() = Some(status);
    Ok(replace_status(&api, &updated).await?)
}

pub async fn reconcile_broker<B: CatalogBroker>(
    broker: Arc<B>,
    ctx: Arc<Context>,
) -> Result<Action, ControllerError> {
    let name = broker.name_any();
    if broker.meta().deletion_timestamp.is_some() {
        return finalize_broker(&*broker, &ctx).await;
    }
    match relist_decision(&*broker, Utc::now()) {
        Relist::Now => {}
        Relist::After(wait) => {
            debug!(broker = %name, wait = %humantime::format_duration(wait), "Relist not due yet");
            return Ok(Action::requeue(wait));
        }
        Relist::Never => return Ok(Action::await_change()),
    }

    info!(kind = %B::kind(&()), broker = %name, "Relisting broker catalog");
    let result = relist(&*broker, &ctx).await;
    let generation = broker.meta().generation.unwrap_or_default();
    let mut status = broker.status().cloned().unwrap_or_default();
    let now = Utc::now();
    match result {
        Ok((classes, plans)) => {
            status.operation_start_time = None;
            set_broker_condition(
                &mut status,
                generation,
                ServiceBrokerConditionType::Ready,
                ConditionStatus::True,
                FETCHED_CATALOG_REASON,
                FETCHED_CATALOG_MESSAGE,
                now,
            );
            write_status(&*broker, &ctx, status).await?;
            let common = broker.common();
            match common.relist_interval() {
                Some(interval) if common.relist_behavior == ServiceBrokerRelistBehavior::Duration => {
                    info!(
                        broker = %name, classes, plans,
                        next = %humantime::format_duration(interval),
                        "Fetched catalog"
                    );
                    Ok(Action::requeue(interval))
                }
                _ => {
                    info!(broker = %name, classes, plans, "Fetched catalog");
                    Ok(Action::await_change())
                }
            }
        }
        Err(err) => {
            let gave_up = record_relist_failure(&mut status, generation, &err, now, ctx.retry_duration);
            write_status(&*broker, &ctx, status).await?;
            if gave_up {
                warn!(broker = %name, "Relist failed for longer than {}; giving up: {err}",
                    humantime::format_duration(ctx.retry_duration));
                return Ok(Action::await_change());
            }
            Err(err)
        }
    }
}

async fn delete_owned<K>(api: &Api<K>, owned: impl Fn(&K) -> bool) -> Result<(), ControllerError>
where
    K: Resource + Clone + DeserializeOwned + Debug,
{
    for obj in api.list(&ListParams::default()).await?.items.into_iter().filter(|k| owned(k)) {
        match api.delete(&obj.name_any(), &DeleteParams::default()).await {
            Ok(_) => {}
            Err(kube::Error::Api(e)) if e.code == 404 => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Deletes the broker's plans, then its classes.
async fn delete_catalog<B: CatalogBroker>(broker: &B, ctx: &Context) -> Result<(), ControllerError> {
    let name = broker.name_any();
    let namespace = broker.namespace();
    delete_owned(&B::plan_api(&ctx.client, namespace.as_deref()), |p| p.broker_name() == name).await?;
    delete_owned(&B::class_api(&ctx.client, namespace.as_deref()), |c| c.broker_name() == name).await
}

async fn finalize_broker<B: CatalogBroker>(broker: &B, ctx: &Context) -> Result<Action, ControllerError> {
    if !broker.finalizers().iter().any(|f| f == FINALIZER_SERVICE_CATALOG) {
        return Ok(Action::await_change());
    }
    let name = broker.name_any();
    let generation = broker.meta().generation.unwrap_or_default();
    let mut status = broker.status().cloned().unwrap_or_default();
    info!(kind = %B::kind(&()), broker = %name, "Deleting broker catalog");

    if let Err(err) = delete_catalog(broker, ctx).await {
        set_broker_condition(
            &mut status,
            generation,
            ServiceBrokerConditionType::Ready,
            ConditionStatus::Unknown,
            ERROR_DELETING_CATALOG_REASON,
            &format!("{ERROR_DELETING_CATALOG_MESSAGE}{err}"),
            Utc::now(),
        );
        write_status(broker, ctx, status).await?;
        return Err(err);
    }

    set_broker_condition(
        &mut status,
        generation,
        ServiceBrokerConditionType::Ready,
        ConditionStatus::False,
        DELETED_SUCCESSFULLY_REASON,
        DELETED_SUCCESSFULLY_MESSAGE,
        Utc::now(),
    );
    status.operation_start_time = None;
    status.reconciled_generation = generation;
    let broker = write_status(broker, ctx, status).await?;

    let finalizers: Vec<_> = broker
        .finalizers()
        .iter()
        .filter(|f| *f != FINALIZER_SERVICE_CATALOG)
        .collect();
    let patch = json!({
        "metadata": {
            "finalizers": finalizers,
            "resourceVersion": broker.resource_version(),
        }
    });
    B::api(&ctx.client, broker.namespace().as_deref())
        .patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
        .await?;
    info!(broker = %name, "Broker catalog deleted");
    Ok(Action::await_change())
}
