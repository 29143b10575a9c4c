//! Read-through projections of remote secrets state
//!
//! Every value here is fetched fresh for a single operation and dropped
//! afterwards. Nothing is cached between calls.

use std::fmt;

use chrono::{DateTime, Utc};
use ghseal_api::{
    EnvironmentPayload, OrgSecretPayload, PublicKeyPayload, RepositoryPayload, SecretPayload,
    Visibility,
};

/// Repository snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    pub id: u64,
    pub node_id: String,
    pub name: String,
    pub owner: String,
    pub full_name: String,
}

impl Repository {
    /// Build from an API payload, recording `owner` as the owning organization
    pub fn from_payload(payload: RepositoryPayload, owner: impl Into<String>) -> Self {
        Self {
            id: payload.id,
            node_id: payload.node_id,
            name: payload.name,
            owner: owner.into(),
            full_name: payload.full_name,
        }
    }
}

impl From<RepositoryPayload> for Repository {
    fn from(payload: RepositoryPayload) -> Self {
        let owner = payload.owner.login.clone();
        Self::from_payload(payload, owner)
    }
}

/// Deployment environment of a repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    pub id: u64,
    pub name: String,
    pub url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub repository_id: u64,
}

impl Environment {
    pub fn from_payload(payload: EnvironmentPayload, repository_id: u64) -> Self {
        Self {
            id: payload.id,
            name: payload.name,
            url: payload.html_url,
            created_at: payload.created_at,
            updated_at: payload.updated_at,
            repository_id,
        }
    }
}

/// Organization-level secret
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizationSecret {
    pub organization: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub visibility: Visibility,
    shared_repositories: Option<Vec<Repository>>,
}

impl OrganizationSecret {
    /// Build a secret, keeping linked repositories only when the visibility is
    /// `selected` and at least one repository is linked
    pub fn new(
        organization: impl Into<String>,
        payload: OrgSecretPayload,
        shared: Option<Vec<Repository>>,
    ) -> Self {
        let shared_repositories = match payload.visibility {
            Visibility::Selected => shared.filter(|repos| !repos.is_empty()),
            _ => None,
        };

        Self {
            organization: organization.into(),
            name: payload.name,
            created_at: payload.created_at,
            updated_at: payload.updated_at,
            visibility: payload.visibility,
            shared_repositories,
        }
    }

    /// Repositories this secret is explicitly shared with
    pub fn shared_repositories(&self) -> Option<&[Repository]> {
        self.shared_repositories.as_deref()
    }

    pub fn is_shared_with_repositories(&self) -> bool {
        self.visibility == Visibility::Selected && self.shared_repositories.is_some()
    }
}

/// Repository-level secret
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositorySecret {
    pub organization: String,
    pub repository: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RepositorySecret {
    pub fn new(
        organization: impl Into<String>,
        repository: impl Into<String>,
        payload: SecretPayload,
    ) -> Self {
        Self {
            organization: organization.into(),
            repository: repository.into(),
            name: payload.name,
            created_at: payload.created_at,
            updated_at: payload.updated_at,
        }
    }
}

/// Environment-level secret
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentSecret {
    pub repository_id: u64,
    pub environment: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EnvironmentSecret {
    pub fn new(repository_id: u64, environment: impl Into<String>, payload: SecretPayload) -> Self {
        Self {
            repository_id,
            environment: environment.into(),
            name: payload.name,
            created_at: payload.created_at,
            updated_at: payload.updated_at,
        }
    }
}

/// Public key used to seal secrets for an organization or repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretPublicKey {
    /// Opaque key identifier sent back with the encrypted value
    pub id: String,
    /// Base64-encoded X25519 public key
    pub key: String,
}

impl From<PublicKeyPayload> for SecretPublicKey {
    fn from(payload: PublicKeyPayload) -> Self {
        Self {
            id: payload.key_id,
            key: payload.key,
        }
    }
}

/// Environment public key, addressed by the owning repository id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentSecretPublicKey {
    pub repository_id: u64,
    pub key: SecretPublicKey,
}

/// Result of a create-or-update call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The secret did not exist and was created (HTTP 201)
    Created,
    /// An existing secret was replaced (HTTP 204)
    Updated,
    /// The secret exists and overwriting was disabled; nothing was written
    Exists,
}

impl SaveOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaveOutcome::Created => "created",
            SaveOutcome::Updated => "updated",
            SaveOutcome::Exists => "exists",
        }
    }
}

impl fmt::Display for SaveOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ghseal_api::OwnerPayload;

    fn org_payload(visibility: Visibility) -> OrgSecretPayload {
        OrgSecretPayload {
            name: "SHARED".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            visibility,
            selected_repositories_url: None,
        }
    }

    fn repo(id: u64, name: &str) -> Repository {
        Repository::from(RepositoryPayload {
            id,
            node_id: format!("R_{}", id),
            name: name.into(),
            full_name: format!("acme/{}", name),
            owner: OwnerPayload {
                login: "acme".into(),
            },
        })
    }

    #[test]
    fn test_shared_only_when_selected_and_linked() {
        let secret = OrganizationSecret::new(
            "acme",
            org_payload(Visibility::Selected),
            Some(vec![repo(1, "widgets")]),
        );
        assert!(secret.is_shared_with_repositories());
        assert_eq!(secret.shared_repositories().map(|r| r.len()), Some(1));
    }

    #[test]
    fn test_selected_without_links_is_not_shared() {
        let secret =
            OrganizationSecret::new("acme", org_payload(Visibility::Selected), Some(vec![]));
        assert!(!secret.is_shared_with_repositories());
        assert!(secret.shared_repositories().is_none());

        let secret = OrganizationSecret::new("acme", org_payload(Visibility::Selected), None);
        assert!(!secret.is_shared_with_repositories());
    }

    #[test]
    fn test_links_dropped_for_other_visibilities() {
        for visibility in [Visibility::All, Visibility::Private] {
            let secret = OrganizationSecret::new(
                "acme",
                org_payload(visibility),
                Some(vec![repo(1, "widgets")]),
            );
            assert!(!secret.is_shared_with_repositories());
            assert!(secret.shared_repositories().is_none());
        }
    }

    #[test]
    fn test_repository_owner_from_payload() {
        let repository = repo(1296269, "hello-world");
        assert_eq!(repository.owner, "acme");
        assert_eq!(repository.full_name, "acme/hello-world");
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(SaveOutcome::Created.to_string(), "created");
        assert_eq!(SaveOutcome::Updated.to_string(), "updated");
        assert_eq!(SaveOutcome::Exists.to_string(), "exists");
    }
}
