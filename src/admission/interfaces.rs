use async_trait::async_trait;

use super::attributes::{Attributes, Operation};
use super::err::AdmissionResult;

/// Base of every admission plugin.
pub trait Interface: Send + Sync {
    /// The name the plugin is registered under.
    fn name(&self) -> &'static str;

    fn handles(&self, operation: Operation) -> bool;
}

/// A plugin that may change the object before it is persisted.
#[async_trait]
pub trait MutationInterface: Interface {
    async fn admit(&self, attrs: &mut Attributes) -> AdmissionResult<()>;
}

/// A plugin that may only reject a request.
#[async_trait]
pub trait ValidationInterface: Interface {
    async fn validate(&self, attrs: &Attributes) -> AdmissionResult<()>;
}
