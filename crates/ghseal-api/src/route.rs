//! Typed resource paths for the secrets API

use std::fmt;

/// Addressing key for a secret scope.
///
/// Organization and repository secrets are addressed by name, environment
/// secrets by the numeric repository id plus the environment name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SecretScope {
    Organization { org: String },
    Repository { owner: String, repo: String },
    Environment { repository_id: u64, environment: String },
}

impl SecretScope {
    pub fn organization(org: impl Into<String>) -> Self {
        Self::Organization { org: org.into() }
    }

    pub fn repository(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self::Repository {
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    pub fn environment(repository_id: u64, environment: impl Into<String>) -> Self {
        Self::Environment {
            repository_id,
            environment: environment.into(),
        }
    }

    /// Short scope name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            SecretScope::Organization { .. } => "organization",
            SecretScope::Repository { .. } => "repository",
            SecretScope::Environment { .. } => "environment",
        }
    }

    /// Segments of the collection that holds this scope's secrets
    fn secrets_segments(&self) -> Vec<String> {
        match self {
            SecretScope::Organization { org } => {
                vec!["orgs".into(), org.clone(), "actions".into(), "secrets".into()]
            }
            SecretScope::Repository { owner, repo } => vec![
                "repos".into(),
                owner.clone(),
                repo.clone(),
                "actions".into(),
                "secrets".into(),
            ],
            SecretScope::Environment {
                repository_id,
                environment,
            } => vec![
                "repositories".into(),
                repository_id.to_string(),
                "environments".into(),
                environment.clone(),
                "secrets".into(),
            ],
        }
    }
}

impl fmt::Display for SecretScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretScope::Organization { org } => write!(f, "{}", org),
            SecretScope::Repository { owner, repo } => write!(f, "{}/{}", owner, repo),
            SecretScope::Environment {
                repository_id,
                environment,
            } => write!(f, "repository {} environment {}", repository_id, environment),
        }
    }
}

/// A resource on the remote API
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    /// `/repos/{owner}/{repo}`
    Repository { owner: String, repo: String },

    /// `/repos/{owner}/{repo}/environments/{environment}`
    Environment {
        owner: String,
        repo: String,
        environment: String,
    },

    /// `.../secrets/public-key` for the given scope
    PublicKey(SecretScope),

    /// `.../secrets/{name}` for the given scope
    Secret { scope: SecretScope, name: String },

    /// `/orgs/{org}/actions/secrets/{name}/repositories`
    SelectedRepositories { org: String, name: String },

    /// `/orgs/{org}/actions/secrets/{name}/repositories/{repository_id}`
    SelectedRepository {
        org: String,
        name: String,
        repository_id: u64,
    },
}

impl Route {
    /// Unescaped path segments; the client percent-encodes each one
    pub fn segments(&self) -> Vec<String> {
        match self {
            Route::Repository { owner, repo } => {
                vec!["repos".into(), owner.clone(), repo.clone()]
            }
            Route::Environment {
                owner,
                repo,
                environment,
            } => vec![
                "repos".into(),
                owner.clone(),
                repo.clone(),
                "environments".into(),
                environment.clone(),
            ],
            Route::PublicKey(scope) => {
                let mut segments = scope.secrets_segments();
                segments.push("public-key".into());
                segments
            }
            Route::Secret { scope, name } => {
                let mut segments = scope.secrets_segments();
                segments.push(name.clone());
                segments
            }
            Route::SelectedRepositories { org, name } => {
                let mut segments = SecretScope::organization(org.clone()).secrets_segments();
                segments.push(name.clone());
                segments.push("repositories".into());
                segments
            }
            Route::SelectedRepository {
                org,
                name,
                repository_id,
            } => {
                let mut segments = SecretScope::organization(org.clone()).secrets_segments();
                segments.push(name.clone());
                segments.push("repositories".into());
                segments.push(repository_id.to_string());
                segments
            }
        }
    }

    /// Human-readable path, used in logs
    pub fn path(&self) -> String {
        format!("/{}", self.segments().join("/"))
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}
