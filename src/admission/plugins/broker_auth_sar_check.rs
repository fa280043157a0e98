use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::admission::{
    secret_get_review, AccessReviewer, AdmissionError, AdmissionResult, Attributes, Handler,
    Interface, Operation, ReadyGate, ValidationInterface,
};
use crate::apis::{BrokerResource, ClusterServiceBroker, ServiceBroker};

pub const PLUGIN_NAME: &str = "BrokerAuthSarCheck";

const CLUSTER_BROKER_RESOURCES: &[&str] = &["clusterservicebrokers", "brokers"];
const BROKER_RESOURCES: &[&str] = &["servicebrokers"];

/// Rejects brokers whose auth secret the requesting user could not read themselves.
pub struct BrokerAuthSarCheck {
    handler: Handler,
    ready: ReadyGate,
    reviewer: Arc<dyn AccessReviewer>,
}

impl BrokerAuthSarCheck {
    pub fn new(reviewer: Arc<dyn AccessReviewer>, ready: ReadyGate) -> Self {
        Self {
            handler: Handler::new(&[Operation::Create, Operation::Update]),
            ready,
            reviewer,
        }
    }

    fn broker<K: BrokerResource>(attrs: &Attributes) -> AdmissionResult<K> {
        attrs
            .object_as::<K>()?
            .ok_or_else(|| AdmissionError::BadRequest(format!("{} carries no object", attrs.object_key())))
    }
}

impl Interface for BrokerAuthSarCheck {
    fn name(&self) -> &'static str {
        PLUGIN_NAME
    }

    fn handles(&self, operation: Operation) -> bool {
        self.handler.handles(operation)
    }
}

#[async_trait]
impl ValidationInterface for BrokerAuthSarCheck {
    async fn validate(&self, attrs: &Attributes) -> AdmissionResult<()> {
        if !attrs.is_resource(CLUSTER_BROKER_RESOURCES) && !attrs.is_resource(BROKER_RESOURCES) {
            return Ok(());
        }
        if !self.ready.wait_for_ready().await {
            return Err(AdmissionError::NotReady);
        }
        let secret = if attrs.is_resource(CLUSTER_BROKER_RESOURCES) {
            Self::broker::<ClusterServiceBroker>(attrs)?.auth_secret()
        } else {
            Self::broker::<ServiceBroker>(attrs)?.auth_secret()
        };

        let Some(secret) = secret else {
            debug!(broker = %attrs.object_key(), "broker has no auth secret");
            return Ok(());
        };
        // auth_secret only returns complete references.
        let namespace = secret.namespace.unwrap_or_default();
        let name = secret.name.unwrap_or_default();

        let review = secret_get_review(&attrs.user, &namespace, &name);
        let reason = match self.reviewer.review(review).await {
            Ok(status) if status.allowed => return Ok(()),
            Ok(status) => status.reason.unwrap_or_default(),
            Err(e) => e.to_string(),
        };
        info!(
            broker = %attrs.object_key(),
            user = %attrs.user.username,
            secret = %format!("{namespace}/{name}"),
            %reason,
            "denied broker auth secret access"
        );
        Err(AdmissionError::Forbidden(format!(
            "broker forbidden access to auth secret ({name}): Reason: {reason}"
        )))
    }
}
