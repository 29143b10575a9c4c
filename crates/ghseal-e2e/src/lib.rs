//! End-to-end test utilities for the ghseal secrets manager
//!
//! This crate provides an in-memory GitHub secrets API and a canned-response
//! HTTP server so the manager and the REST client can be tested without
//! reaching github.com.

pub mod keys;
pub mod mock_github;
pub mod mock_http;

use std::sync::Arc;

use ghseal::SecretsManager;

pub use keys::TestKeyPair;
pub use mock_github::{MockGitHub, RecordedCall, SecretRecord};
pub use mock_http::{MockHttpService, RecordedRequest};

/// Manager for `organization` backed by the mock API
pub fn manager(github: &Arc<MockGitHub>, organization: &str) -> SecretsManager<MockGitHub> {
    SecretsManager::new(github.clone(), organization)
}
