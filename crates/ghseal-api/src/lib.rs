//! Typed access to the GitHub Actions secrets REST API
//!
//! Requests are expressed as a [`Route`] plus a [`Method`] and sent through the
//! [`SecretsApi`] trait. [`GitHubClient`] is the reqwest-backed implementation;
//! tests substitute an in-memory fake.

mod client;
mod error;
mod messages;
mod route;
mod transport;

pub use client::{GitHubClient, API_VERSION, DEFAULT_API_URL};
pub use error::{ApiError, NotFoundExt};
pub use messages::{
    EnvironmentPayload, ErrorPayload, OrgSecretPayload, OrgSecretUpsert, OwnerPayload,
    PublicKeyPayload, RepositoryPayload, SecretPayload, SecretUpsert, SelectedRepositoriesPage,
    Visibility,
};
pub use route::{Route, SecretScope};
pub use transport::{ApiRequest, ApiResponse, Method, SecretsApi};
