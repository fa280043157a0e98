#[derive(Debug, thiserror::Error)]
pub enum AdmissionError {
    #[error("{0}")]
    Forbidden(String),
    #[error("not yet ready to handle request")]
    NotReady,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("failed to decode {kind}: {source}")]
    Decode {
        kind: String,
        source: serde_json::Error,
    },
    #[error("admission plugin {0} is not registered")]
    UnknownPlugin(String),
    #[error("admission plugin {0} is registered twice")]
    DuplicatePlugin(String),
    #[error("internal error: {0}")]
    Internal(String),
    #[error(transparent)]
    Kube(#[from] kube::Error),
}

impl AdmissionError {
    /// HTTP status code reported back to the apiserver.
    pub fn code(&self) -> u16 {
        match self {
            AdmissionError::Forbidden(_) | AdmissionError::NotReady => 403,
            AdmissionError::BadRequest(_) | AdmissionError::Decode { .. } => 400,
            AdmissionError::UnknownPlugin(_)
            | AdmissionError::DuplicatePlugin(_)
            | AdmissionError::Internal(_)
            | AdmissionError::Kube(_) => 500,
        }
    }
}

pub type AdmissionResult<T> = Result<T, AdmissionError>;
