//! In-memory GitHub secrets API for E2E tests
//!
//! Implements [`SecretsApi`] over DashMap-backed state so the secrets manager
//! can be driven end to end without network access. Each scope gets its own
//! generated key pair, writes are checked against the scope's current key,
//! and every call is recorded for assertions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use ghseal::Encrypt;
use ghseal_api::{
    ApiError, ApiRequest, ApiResponse, EnvironmentPayload, Method, OrgSecretPayload,
    OrgSecretUpsert, OwnerPayload, PublicKeyPayload, RepositoryPayload, Route, SecretPayload,
    SecretScope, SecretUpsert, SecretsApi, SelectedRepositoriesPage, Visibility,
};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;

use crate::keys::TestKeyPair;

/// Default page size of the selected-repositories listing
const DEFAULT_PER_PAGE: usize = 30;

/// A request seen by the mock
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: Method,
    pub route: Route,
    pub query: Vec<(String, String)>,
}

/// What the mock holds for a secret, with the value already opened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretRecord {
    /// Plaintext, if the stored ciphertext opens with the key it names
    pub value: Option<String>,
    pub key_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Organization secrets only
    pub visibility: Option<Visibility>,
    /// Organization secrets only
    pub selected_repository_ids: Vec<u64>,
}

#[derive(Debug, Clone)]
struct StoredSecret {
    encrypted_value: String,
    key_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct StoredOrgSecret {
    secret: StoredSecret,
    visibility: Visibility,
    selected: Vec<u64>,
}

type MockResult = Result<ApiResponse, ApiError>;

/// Mock GitHub secrets API
pub struct MockGitHub {
    /// Current key pair per scope; a scope exists once it has a key
    scope_keys: DashMap<SecretScope, Arc<TestKeyPair>>,
    /// Every key ever issued, by key id
    keys_by_id: DashMap<String, Arc<TestKeyPair>>,
    /// (owner, name) -> repository
    repositories: DashMap<(String, String), RepositoryPayload>,
    /// (repository id, name) -> environment
    environments: DashMap<(u64, String), EnvironmentPayload>,
    /// (org, name) -> organization secret
    org_secrets: DashMap<(String, String), StoredOrgSecret>,
    /// (scope, name) -> repository or environment secret
    secrets: DashMap<(SecretScope, String), StoredSecret>,
    /// Injected statuses, checked before any state is touched
    overrides: DashMap<(Method, Route), u16>,
    calls: Mutex<Vec<RecordedCall>>,
    id_counter: AtomicU64,
}

impl MockGitHub {
    /// Create an empty mock API
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }


    /// Register an organization and issue its public key
    pub fn add_organization(&self, org: &str) {
        self.issue_key(SecretScope::organization(org));
    }

    /// Register a repository, returning its id
    pub fn add_repository(&self, owner: &str, name: &str) -> u64 {
        let id = self.next_id();
        self.repositories.insert(
            (owner.to_string(), name.to_string()),
            RepositoryPayload {
                id,
                node_id: format!("R_kgDO{}", id),
                name: name.to_string(),
                full_name: format!("{}/{}", owner, name),
                owner: OwnerPayload {
                    login: owner.to_string(),
                },
            },
        );
        self.issue_key(SecretScope::repository(owner, name));
        id
    }

    /// Register a deployment environment on an existing repository
    pub fn add_environment(&self, owner: &str, repo: &str, name: &str) -> u64 {
        let repository_id = self
            .repository_id(owner, repo)
            .expect("repository must be added before its environments");
        let id = self.next_id();
        let now = Utc::now();
        self.environments.insert(
            (repository_id, name.to_string()),
            EnvironmentPayload {
                id,
                name: name.to_string(),
                html_url: Some(format!(
                    "https://github.com/{}/{}/deployments/activity_log?environments_filter={}",
                    owner, repo, name
                )),
                created_at: now,
                updated_at: now,
            },
        );
        self.issue_key(SecretScope::environment(repository_id, name));
        id
    }

    /// Store an organization secret sealed with the current key
    pub fn seed_organization_secret(
        &self,
        org: &str,
        name: &str,
        value: &str,
        visibility: Visibility,
        selected: Vec<u64>,
    ) {
        let secret = self.seal_for(&SecretScope::organization(org), value);
        self.org_secrets.insert(
            (org.to_string(), name.to_string()),
            StoredOrgSecret {
                secret,
                visibility,
                selected,
            },
        );
    }

    /// Store a repository secret sealed with the current key
    pub fn seed_repository_secret(&self, owner: &str, repo: &str, name: &str, value: &str) {
        let scope = SecretScope::repository(owner, repo);
        let secret = self.seal_for(&scope, value);
        self.secrets.insert((scope, name.to_string()), secret);
    }

    /// Store an environment secret sealed with the current key
    pub fn seed_environment_secret(
        &self,
        owner: &str,
        repo: &str,
        environment: &str,
        name: &str,
        value: &str,
    ) {
        let repository_id = self
            .repository_id(owner, repo)
            .expect("repository must be added before its secrets");
        let scope = SecretScope::environment(repository_id, environment);
        let secret = self.seal_for(&scope, value);
        self.secrets.insert((scope, name.to_string()), secret);
    }

    /// Replace a scope's key pair; older key ids stop being accepted
    pub fn rotate_key(&self, scope: SecretScope) -> String {
        self.issue_key(scope)
    }

    /// Answer every `method` call on `route` with `status`
    pub fn respond_with(&self, method: Method, route: Route, status: u16) {
        self.overrides.insert((method, route), status);
    }


    pub fn repository_id(&self, owner: &str, name: &str) -> Option<u64> {
        self.repositories
            .get(&(owner.to_string(), name.to_string()))
            .map(|repo| repo.id)
    }

    /// Key id currently handed out for `scope`
    pub fn current_key_id(&self, scope: &SecretScope) -> Option<String> {
        self.scope_keys.get(scope).map(|key| key.key_id.clone())
    }

    pub fn organization_secret(&self, org: &str, name: &str) -> Option<SecretRecord> {
        let stored = self
            .org_secrets
            .get(&(org.to_string(), name.to_string()))?
            .value()
            .clone();
        let mut record = self.record(&stored.secret);
        record.visibility = Some(stored.visibility);
        record.selected_repository_ids = stored.selected;
        Some(record)
    }

    pub fn repository_secret(&self, owner: &str, repo: &str, name: &str) -> Option<SecretRecord> {
        let stored = self
            .secrets
            .get(&(SecretScope::repository(owner, repo), name.to_string()))?
            .value()
            .clone();
        Some(self.record(&stored))
    }

    pub fn environment_secret(
        &self,
        owner: &str,
        repo: &str,
        environment: &str,
        name: &str,
    ) -> Option<SecretRecord> {
        let repository_id = self.repository_id(owner, repo)?;
        let stored = self
            .secrets
            .get(&(
                SecretScope::environment(repository_id, environment),
                name.to_string(),
            ))?
            .value()
            .clone();
        Some(self.record(&stored))
    }

    /// All calls so far, in order
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Number of calls made with `method`
    pub fn count(&self, method: Method) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.method == method)
            .count()
    }

    /// Number of calls matching `predicate`
    pub fn count_matching(&self, predicate: impl Fn(&RecordedCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|call| predicate(call)).count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }


    fn next_id(&self) -> u64 {
        self.id_counter.fetch_add(1, Ordering::Relaxed)
    }

    fn issue_key(&self, scope: SecretScope) -> String {
        let key_id = format!("5682501672{}", self.next_id());
        let pair = Arc::new(TestKeyPair::generate(key_id.clone()));
        self.keys_by_id.insert(key_id.clone(), pair.clone());
        self.scope_keys.insert(scope, pair);
        key_id
    }

    fn current_key(&self, scope: &SecretScope) -> Option<Arc<TestKeyPair>> {
        self.scope_keys.get(scope).map(|key| Arc::clone(key.value()))
    }

    fn seal_for(&self, scope: &SecretScope, value: &str) -> StoredSecret {
        let key = self
            .current_key(scope)
            .expect("scope must be added before its secrets");
        let encrypted_value = Encrypt::new(&key.public_key_b64())
            .and_then(|encrypt| encrypt.encrypt_value(value))
            .expect("seed value must seal");
        let now = Utc::now();
        StoredSecret {
            encrypted_value,
            key_id: key.key_id.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    fn record(&self, stored: &StoredSecret) -> SecretRecord {
        let value = self
            .keys_by_id
            .get(&stored.key_id)
            .and_then(|key| key.open(&stored.encrypted_value));
        SecretRecord {
            value,
            key_id: stored.key_id.clone(),
            created_at: stored.created_at,
            updated_at: stored.updated_at,
            visibility: None,
            selected_repository_ids: Vec::new(),
        }
    }

    fn find_repository(&self, owner: &str, repo: &str) -> Option<RepositoryPayload> {
        self.repositories
            .get(&(owner.to_string(), repo.to_string()))
            .map(|entry| entry.value().clone())
    }

    fn repository_by_id(&self, id: u64) -> Option<RepositoryPayload> {
        self.repositories
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.value().clone())
    }

    /// Reject writes that name a stale key or do not open with it
    fn check_sealed(key: &TestKeyPair, key_id: &str, encrypted_value: &str) -> Result<(), ApiError> {
        if key.key_id != key_id {
            return Err(ApiError::status(
                422,
                format!("key_id {} does not match the current public key", key_id),
            ));
        }
        if key.open(encrypted_value).is_none() {
            return Err(ApiError::status(
                422,
                "encrypted_value could not be decrypted",
            ));
        }
        Ok(())
    }

    fn get_public_key(&self, scope: &SecretScope) -> MockResult {
        let key = self.current_key(scope).ok_or_else(not_found)?;
        ok(PublicKeyPayload {
            key_id: key.key_id.clone(),
            key: key.public_key_b64(),
        })
    }

    fn get_secret(&self, scope: &SecretScope, name: &str) -> MockResult {
        match scope {
            SecretScope::Organization { org } => {
                let stored = self
                    .org_secrets
                    .get(&(org.clone(), name.to_string()))
                    .map(|entry| entry.value().clone())
                    .ok_or_else(not_found)?;
                let selected_repositories_url = (stored.visibility == Visibility::Selected)
                    .then(|| {
                        format!(
                            "https://api.github.com/orgs/{}/actions/secrets/{}/repositories",
                            org, name
                        )
                    });
                ok(OrgSecretPayload {
                    name: name.to_string(),
                    created_at: stored.secret.created_at,
                    updated_at: stored.secret.updated_at,
                    visibility: stored.visibility,
                    selected_repositories_url,
                })
            }
            _ => {
                let stored = self
                    .secrets
                    .get(&(scope.clone(), name.to_string()))
                    .map(|entry| entry.value().clone())
                    .ok_or_else(not_found)?;
                ok(SecretPayload {
                    name: name.to_string(),
                    created_at: stored.created_at,
                    updated_at: stored.updated_at,
                })
            }
        }
    }

    fn put_secret(&self, scope: &SecretScope, name: &str, body: Option<Value>) -> MockResult {
        let key = self.current_key(scope).ok_or_else(not_found)?;
        let body = body.ok_or_else(|| ApiError::status(422, "Request body is required"))?;
        let now = Utc::now();

        let created = match scope {
            SecretScope::Organization { org } => {
                let upsert: OrgSecretUpsert = serde_json::from_value(body)
                    .map_err(|e| ApiError::status(422, e.to_string()))?;
                Self::check_sealed(&key, &upsert.key_id, &upsert.encrypted_value)?;

                let id = (org.clone(), name.to_string());
                let existing = self.org_secrets.get(&id).map(|entry| entry.value().clone());
                let selected = match upsert.visibility {
                    Visibility::Selected => upsert
                        .selected_repository_ids
                        .or_else(|| existing.as_ref().map(|secret| secret.selected.clone()))
                        .unwrap_or_default(),
                    _ => Vec::new(),
                };
                let created_at = existing
                    .as_ref()
                    .map(|secret| secret.secret.created_at)
                    .unwrap_or(now);

                self.org_secrets.insert(
                    id,
                    StoredOrgSecret {
                        secret: StoredSecret {
                            encrypted_value: upsert.encrypted_value,
                            key_id: upsert.key_id,
                            created_at,
                            updated_at: now,
                        },
                        visibility: upsert.visibility,
                        selected,
                    },
                );
                existing.is_none()
            }
            _ => {
                let upsert: SecretUpsert = serde_json::from_value(body)
                    .map_err(|e| ApiError::status(422, e.to_string()))?;
                Self::check_sealed(&key, &upsert.key_id, &upsert.encrypted_value)?;

                let id = (scope.clone(), name.to_string());
                let created_at = self.secrets.get(&id).map(|secret| secret.created_at);
                self.secrets.insert(
                    id,
                    StoredSecret {
                        encrypted_value: upsert.encrypted_value,
                        key_id: upsert.key_id,
                        created_at: created_at.unwrap_or(now),
                        updated_at: now,
                    },
                );
                created_at.is_none()
            }
        };

        tracing::debug!("MockGitHub: stored {} secret {} ({})", scope.kind(), name, scope);
        Ok(ApiResponse::empty(if created { 201 } else { 204 }))
    }

    fn delete_secret(&self, scope: &SecretScope, name: &str) -> MockResult {
        let removed = match scope {
            SecretScope::Organization { org } => self
                .org_secrets
                .remove(&(org.clone(), name.to_string()))
                .is_some(),
            _ => self
                .secrets
                .remove(&(scope.clone(), name.to_string()))
                .is_some(),
        };

        if removed {
            tracing::debug!("MockGitHub: deleted {} secret {}", scope.kind(), name);
            Ok(ApiResponse::empty(204))
        } else {
            Err(not_found())
        }
    }

    fn list_selected(&self, org: &str, name: &str, query: &[(String, String)]) -> MockResult {
        let selected = self
            .org_secrets
            .get(&(org.to_string(), name.to_string()))
            .map(|secret| secret.selected.clone())
            .ok_or_else(not_found)?;

        let per_page = query_param(query, "per_page").unwrap_or(DEFAULT_PER_PAGE).max(1);
        let page = query_param(query, "page").unwrap_or(1).max(1);

        let repositories = selected
            .iter()
            .skip((page - 1) * per_page)
            .take(per_page)
            .filter_map(|id| self.repository_by_id(*id))
            .collect();

        ok(SelectedRepositoriesPage {
            total_count: selected.len() as u64,
            repositories,
        })
    }

    fn change_selection(&self, method: Method, org: &str, name: &str, repository_id: u64) -> MockResult {
        let id = (org.to_string(), name.to_string());
        let mut secret = self.org_secrets.get_mut(&id).ok_or_else(not_found)?;
        if secret.visibility != Visibility::Selected {
            return Err(ApiError::status(
                409,
                "Secret visibility must be set to selected",
            ));
        }

        match method {
            Method::Put => {
                if !secret.selected.contains(&repository_id) {
                    secret.selected.push(repository_id);
                }
            }
            _ => secret.selected.retain(|id| *id != repository_id),
        }
        Ok(ApiResponse::empty(204))
    }

    fn dispatch(&self, request: ApiRequest) -> MockResult {
        match (request.method, request.route) {
            (Method::Get, Route::Repository { owner, repo }) => {
                ok(self.find_repository(&owner, &repo).ok_or_else(not_found)?)
            }
            (
                Method::Get,
                Route::Environment {
                    owner,
                    repo,
                    environment,
                },
            ) => {
                let repo = self.find_repository(&owner, &repo).ok_or_else(not_found)?;
                let environment = self
                    .environments
                    .get(&(repo.id, environment))
                    .map(|entry| entry.value().clone())
                    .ok_or_else(not_found)?;
                ok(environment)
            }
            (Method::Get, Route::PublicKey(scope)) => self.get_public_key(&scope),
            (Method::Get, Route::Secret { scope, name }) => self.get_secret(&scope, &name),
            (Method::Put, Route::Secret { scope, name }) => {
                self.put_secret(&scope, &name, request.body)
            }
            (Method::Delete, Route::Secret { scope, name }) => self.delete_secret(&scope, &name),
            (Method::Get, Route::SelectedRepositories { org, name }) => {
                self.list_selected(&org, &name, &request.query)
            }
            (
                method @ (Method::Put | Method::Delete),
                Route::SelectedRepository {
                    org,
                    name,
                    repository_id,
                },
            ) => self.change_selection(method, &org, &name, repository_id),
            _ => Err(not_found()),
        }
    }
}

impl Default for MockGitHub {
    fn default() -> Self {
        Self {
            scope_keys: DashMap::new(),
            keys_by_id: DashMap::new(),
            repositories: DashMap::new(),
            environments: DashMap::new(),
            org_secrets: DashMap::new(),
            secrets: DashMap::new(),
            overrides: DashMap::new(),
            calls: Mutex::new(Vec::new()),
            id_counter: AtomicU64::new(1296269),
        }
    }
}

#[async_trait]
impl SecretsApi for MockGitHub {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        tracing::debug!("MockGitHub: {} {}", request.method, request.route);
        self.calls.lock().push(RecordedCall {
            method: request.method,
            route: request.route.clone(),
            query: request.query.clone(),
        });

        let injected = self
            .overrides
            .get(&(request.method, request.route.clone()))
            .map(|status| *status);
        if let Some(status) = injected {
            return if status >= 400 {
                Err(ApiError::status(status, "Injected failure"))
            } else {
                Ok(ApiResponse::empty(status))
            };
        }

        self.dispatch(request)
    }
}

fn not_found() -> ApiError {
    ApiError::status(404, "Not Found")
}

fn ok<T: Serialize>(payload: T) -> MockResult {
    Ok(ApiResponse::new(200, Some(serde_json::to_value(payload)?)))
}

fn query_param(query: &[(String, String)], name: &str) -> Option<usize> {
    query
        .iter()
        .find(|(key, _)| key == name)
        .and_then(|(_, value)| value.parse().ok())
}
