use crate::admission::AdmissionError;
use crate::registry::StrategyError;

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("{0}")]
    Invalid(String),
    #[error("{operation} of {resource} requires the {field}")]
    MissingObject {
        operation: String,
        resource: String,
        field: &'static str,
    },
    #[error(transparent)]
    Admission(#[from] AdmissionError),
    #[error(transparent)]
    Strategy(#[from] StrategyError),
    #[error("failed to build patch: {0}")]
    Patch(#[from] kube::core::admission::SerializePatchError),
}

impl WebhookError {
    /// HTTP status code reported back to the apiserver.
    pub fn code(&self) -> u16 {
        match self {
            WebhookError::Invalid(_) => 422,
            WebhookError::MissingObject { .. } => 400,
            WebhookError::Admission(e) => e.code(),
            WebhookError::Strategy(StrategyError::Decode { .. }) => 400,
            WebhookError::Strategy(StrategyError::Encode { .. }) | WebhookError::Patch(_) => 500,
        }
    }
}
