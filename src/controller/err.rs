use crate::client::{ClientError, StoreError};
use crate::osb::OsbError;

/// Condition reason for a broker whose catalog could not be fetched.
pub const ERROR_FETCHING_CATALOG_REASON: &str = "ErrorFetchingCatalog";
pub const ERROR_FETCHING_CATALOG_MESSAGE: &str = "Error fetching catalog. ";
/// Condition reason for a fetched catalog that could not be written as classes and plans.
pub const ERROR_SYNCING_CATALOG_REASON: &str = "ErrorSyncingCatalog";
pub const ERROR_SYNCING_CATALOG_MESSAGE: &str = "Error syncing catalog from ServiceBroker. ";
pub const ERROR_DELETING_CATALOG_REASON: &str = "ErrorDeletingCatalog";
pub const ERROR_DELETING_CATALOG_MESSAGE: &str = "Error deleting catalog of ServiceBroker. ";
pub const ERROR_NONEXISTENT_CLASS_REASON: &str = "ReferencesNonexistentServiceClass";
pub const ERROR_NONEXISTENT_PLAN_REASON: &str = "ReferencesNonexistentServicePlan";

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("received zero services; at least one service is required")]
    EmptyCatalog,
    #[error("{kind} {name:?} already exists for broker {owner:?}")]
    OwnedByOtherBroker {
        kind: String,
        name: String,
        owner: String,
    },
    #[error("failed to read auth secret {namespace}/{name}: {source}")]
    AuthSecret {
        namespace: String,
        name: String,
        #[source]
        source: kube::Error,
    },
    #[error("references a non-existent {0}")]
    ClassNotFound(String),
    #[error("references a non-existent {plan} on {class}")]
    PlanNotFound { plan: String, class: String },
    #[error(transparent)]
    Osb(#[from] OsbError),
    #[error(transparent)]
    Kube(#[from] kube::Error),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ControllerError {
    /// The reason and message prefix recorded on the broker's Ready condition.
    pub fn broker_reason(&self) -> (&'static str, &'static str) {
        match self {
            ControllerError::AuthSecret { .. } | ControllerError::Osb(_) => {
                (ERROR_FETCHING_CATALOG_REASON, ERROR_FETCHING_CATALOG_MESSAGE)
            }
            _ => (ERROR_SYNCING_CATALOG_REASON, ERROR_SYNCING_CATALOG_MESSAGE),
        }
    }
}
