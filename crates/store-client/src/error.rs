//! Object store errors

use thiserror::Error;

/// Errors that can occur when talking to the Kubernetes API server
#[derive(Debug, Error)]
pub enum StoreError {
    /// Object does not exist (HTTP 404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Field-ownership or resource-version conflict (HTTP 409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Object rejected by schema validation or admission (HTTP 400/422)
    #[error("Rejected: {0}")]
    Rejected(String),

    /// Request could not be built (e.g., object without name or namespace)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Any other API error response
    #[error("API error ({code}): {message}")]
    Api {
        /// HTTP status code
        code: u16,
        /// Server-provided message
        message: String,
    },

    /// Transport, TLS or client-side kube error
    #[error("Kubernetes client error: {0}")]
    Client(#[source] kube::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// True for `NotFound`
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    /// True for `Conflict`
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

impl From<kube::Error> for StoreError {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(response) => match response.code {
                404 => StoreError::NotFound(response.message.clone()),
                409 => StoreError::Conflict(response.message.clone()),
                400 | 422 => StoreError::Rejected(response.message.clone()),
                code => StoreError::Api {
                    code,
                    message: response.message.clone(),
                },
            },
            other => StoreError::Client(other),
        }
    }
}
