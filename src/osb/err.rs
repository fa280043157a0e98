use reqwest::StatusCode;

/// Error code a broker returns with 422 when it only supports asynchronous operations.
pub const ASYNC_REQUIRED_ERROR: &str = "AsyncRequired";

#[derive(Debug, thiserror::Error)]
pub enum OsbError {
    #[error("broker reported a conflict: {}", .description.as_deref().unwrap_or("<none>"))]
    Conflict { description: Option<String> },
    #[error("broker requires asynchronous operations: {}", .description.as_deref().unwrap_or("<none>"))]
    AsyncRequired { description: Option<String> },
    #[error("resource is gone")]
    Gone,
    #[error(
        "Status: {status}; ErrorMessage: {}; Description: {}",
        .error_message.as_deref().unwrap_or("<nil>"),
        .description.as_deref().unwrap_or("<nil>")
    )]
    HttpStatus {
        status: u16,
        error_message: Option<String>,
        description: Option<String>,
    },
    #[error("invalid broker client configuration: {0}")]
    Config(String),
    #[error("request to broker failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("failed to decode broker response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl OsbError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, OsbError::Conflict { .. })
    }

    pub fn is_async_required(&self) -> bool {
        matches!(self, OsbError::AsyncRequired { .. })
    }

    pub fn is_gone(&self) -> bool {
        matches!(self, OsbError::Gone)
    }

    /// Maps an unexpected response status and its OSB error body to an error.
    pub(crate) fn from_status(status: StatusCode, body: &[u8]) -> Self {
        let body: super::types::ErrorResponse = serde_json::from_slice(body).unwrap_or_default();
        match status {
            StatusCode::CONFLICT => OsbError::Conflict {
                description: body.description,
            },
            StatusCode::GONE => OsbError::Gone,
            StatusCode::UNPROCESSABLE_ENTITY
                if body.error.as_deref() == Some(ASYNC_REQUIRED_ERROR) =>
            {
                OsbError::AsyncRequired {
                    description: body.description,
                }
            }
            _ => OsbError::HttpStatus {
                status: status.as_u16(),
                error_message: body.error,
                description: body.description,
            },
        }
    }
}
