use ghseal_api::ApiError;
use ghseal_crypto::SealError;
use thiserror::Error;

/// Errors from secrets manager operations
#[derive(Debug, Error)]
pub enum SecretsError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Seal(#[from] SealError),

    /// A status the operation has no mapping for
    #[error("Unexpected status code from {operation}: {status}")]
    UnexpectedStatus { operation: String, status: u16 },

    #[error("secret {name} was not found in organization {organization}")]
    SecretNotFound { name: String, organization: String },

    #[error("repository {repository} was not found in organization {organization}")]
    RepositoryNotFound {
        repository: String,
        organization: String,
    },

    #[error("Failed to resolve public key for {target}")]
    MissingPublicKey { target: String },
}

impl SecretsError {
    pub fn unexpected_status(operation: impl Into<String>, status: u16) -> Self {
        Self::UnexpectedStatus {
            operation: operation.into(),
            status,
        }
    }

    pub fn missing_key(target: impl Into<String>) -> Self {
        Self::MissingPublicKey {
            target: target.into(),
        }
    }
}
