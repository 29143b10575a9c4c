//! GitHub Actions secrets management
//!
//! [`SecretsManager`] reads, writes and deletes secrets at organization,
//! repository and environment scope. Values are sealed locally against the
//! scope's current public key before they are sent.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ghseal::{GitHubClient, SecretsManager};
//!
//! let client = Arc::new(GitHubClient::new(token)?);
//! let secrets = SecretsManager::new(client, "acme");
//! let outcome = secrets
//!     .save_or_update_repository_secret("widgets", "API_TOKEN", "s3cr3t", true)
//!     .await?;
//! ```

mod error;
mod manager;
mod model;

pub use error::SecretsError;
pub use manager::{organization_secret_upsert, SecretsManager};
pub use model::{
    Environment, EnvironmentSecret, EnvironmentSecretPublicKey, OrganizationSecret, Repository,
    RepositorySecret, SaveOutcome, SecretPublicKey,
};

// Re-export the collaborators callers need to construct a manager
pub use ghseal_api::{ApiError, GitHubClient, SecretsApi, Visibility};
pub use ghseal_crypto::{Encrypt, SealError};
