//! Controllers that keep the catalog in step with its brokers: the broker controller relists
//! each broker's catalog into classes and plans, and the instance controller resolves the
//! class and plan an instance asks for.

mod broker;
mod catalog;
mod err;
mod instance;

pub use broker::*;
pub use catalog::*;
pub use err::*;
pub use instance::*;

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use futures_util::StreamExt;
use kube::runtime::controller::{Action, Controller};
use kube::runtime::watcher::Config as WatcherConfig;
use kube::Resource;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::apis::{
    ConditionStatus, ServiceBrokerCondition, ServiceBrokerConditionType, ServiceInstance,
    ServiceInstanceCondition, ServiceInstanceConditionType,
};
use crate::client::{CatalogClient, Informers};

/// Field manager of every server-side apply the controllers issue.
pub const MANAGER_NAME: &str = "service-catalog-controller";

/// How long a failed reconcile waits before it is retried.
pub const ERROR_REQUEUE: Duration = Duration::from_secs(60);

/// Shared by every reconcile.
pub struct Context {
    pub client: CatalogClient,
    pub informers: Informers,
    /// How long a broker keeps retrying a failing relist before it is marked Failed.
    pub retry_duration: Duration,
}

/// The condition type of a status, with the fields every catalog condition shares.
pub trait Condition {
    type Type: Copy + PartialEq;

    fn new(type_: Self::Type) -> Self;
    fn type_(&self) -> Self::Type;
    fn status(&self) -> ConditionStatus;

    /// Overwrites the condition; the transition time only moves when `status` changes.
    fn set(&mut self, status: ConditionStatus, reason: &str, message: &str, now: &str);
}

macro_rules! condition {
    ($cond:ty, $type:ty) => {
        impl Condition for $cond {
            type Type = $type;

            fn new(type_: $type) -> Self {
                Self {
                    type_,
                    ..Default::default()
                }
            }
            fn type_(&self) -> $type {
                self.type_
            }
            fn status(&self) -> ConditionStatus {
                self.status
            }
            fn set(&mut self, status: ConditionStatus, reason: &str, message: &str, now: &str) {
                if self.last_transition_time.is_none() || self.status != status {
                    self.last_transition_time = Some(now.to_string());
                }
                self.status = status;
                self.reason = reason.to_string();
                self.message = message.to_string();
            }
        }
    };
}

condition!(ServiceBrokerCondition, ServiceBrokerConditionType);
condition!(ServiceInstanceCondition, ServiceInstanceConditionType);

/// Sets the condition of `type_`, adding it when missing.
pub fn set_condition<C: Condition>(
    conditions: &mut Vec<C>,
    type_: C::Type,
    status: ConditionStatus,
    reason: &str,
    message: &str,
    now: DateTime<Utc>,
) {
    let now = timestamp(now);
    match conditions.iter_mut().find(|c| c.type_() == type_) {
        Some(condition) => condition.set(status, reason, message, &now),
        None => {
            let mut condition = C::new(type_);
            condition.set(status, reason, message, &now);
            conditions.push(condition);
        }
    }
}

/// True if the condition of `type_` exists and has `status`.
pub fn condition_is<C: Condition>(conditions: &[C], type_: C::Type, status: ConditionStatus) -> bool {
    conditions
        .iter()
        .any(|c| c.type_() == type_ && c.status() == status)
}

/// Timestamps are stored as RFC 3339 with second precision, like `metav1.Time`.
pub fn timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub(crate) fn parse_timestamp(value: Option<&str>) -> Option<DateTime<Utc>> {
    value
        .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
        .map(|t| t.with_timezone(&Utc))
}

fn error_policy<K>(obj: Arc<K>, error: &ControllerError, _ctx: Arc<Context>) -> Action
where
    K: Resource<DynamicType = ()>,
{
    warn!(
        kind = %K::kind(&()),
        name = obj.meta().name.as_deref().unwrap_or_default(),
        "Reconciliation failed: {error}"
    );
    Action::requeue(ERROR_REQUEUE)
}

async fn drain<K, S>(results: S)
where
    K: Resource<DynamicType = ()> + Debug,
    S: futures_util::Stream<
        Item = Result<
            (kube::runtime::reflector::ObjectRef<K>, Action),
            kube::runtime::controller::Error<ControllerError, kube::runtime::watcher::Error>,
        >,
    >,
{
    results
        .for_each(|res| async move {
            match res {
                Ok((obj, action)) => debug!("Reconciled {obj}, next {action:?}"),
                // Reconcile errors were already logged by the error policy.
                Err(kube::runtime::controller::Error::ReconcilerFailed(..)) => {}
                Err(e) => warn!("Controller error: {e}"),
            }
        })
        .await
}

/// Runs the catalog controller for broker kind `B` until `token` is cancelled. Namespaced
/// brokers are only watched in `namespace` when it is set.
pub async fn run_broker_controller<B>(ctx: Arc<Context>, namespace: Option<String>, token: CancellationToken)
where
    B: CatalogBroker + Debug,
{
    let api = B::api(&ctx.client, namespace.as_deref());
    info!(kind = %B::kind(&()), "Starting broker controller");
    let results = Controller::new(api, WatcherConfig::default()).run(
        reconcile_broker::<B>,
        error_policy::<B>,
        ctx,
    );
    tokio::select! {
        _ = drain(results) => {}
        _ = token.cancelled() => {}
    }
    info!(kind = %B::kind(&()), "Broker controller stopped");
}

/// Runs the instance reference resolver until `token` is cancelled.
pub async fn run_instance_controller(ctx: Arc<Context>, namespace: Option<String>, token: CancellationToken) {
    let api = ctx.client.service_instances(namespace.as_deref());
    info!("Starting instance controller");
    let results = Controller::new(api, WatcherConfig::default()).run(
        reconcile_instance,
        error_policy::<ServiceInstance>,
        ctx,
    );
    tokio::select! {
        _ = drain(results) => {}
        _ = token.cancelled() => {}
    }
    info!("Instance controller stopped");
}
