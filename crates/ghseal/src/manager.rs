//! Secret orchestration across organization, repository and environment scopes
//!
//! Every write resolves the scope's current public key immediately before
//! sealing the value. Keys rotate independently of secrets, so a key is never
//! reused across calls.

use std::collections::HashSet;
use std::sync::Arc;

use ghseal_api::{
    ApiRequest, ApiResponse, EnvironmentPayload, NotFoundExt, OrgSecretPayload, OrgSecretUpsert,
    PublicKeyPayload, RepositoryPayload, Route, SecretPayload, SecretScope, SecretUpsert,
    SecretsApi, SelectedRepositoriesPage, Visibility,
};
use ghseal_crypto::{require_string_argument, Encrypt};

use crate::error::SecretsError;
use crate::model::{
    Environment, EnvironmentSecret, EnvironmentSecretPublicKey, OrganizationSecret, Repository,
    RepositorySecret, SaveOutcome, SecretPublicKey,
};

/// Page size used when listing the repositories linked to a secret
const SELECTED_REPOSITORIES_PAGE_SIZE: u32 = 100;

/// Manages Actions secrets for a single organization
pub struct SecretsManager<A: ?Sized> {
    api: Arc<A>,
    organization: String,
}

impl<A: ?Sized> Clone for SecretsManager<A> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            organization: self.organization.clone(),
        }
    }
}

impl<A: SecretsApi + ?Sized> SecretsManager<A> {
    pub fn new(api: Arc<A>, organization: impl Into<String>) -> Self {
        Self {
            api,
            organization: organization.into(),
        }
    }

    /// Organization (or repository owner) this manager acts on
    pub fn organization(&self) -> &str {
        &self.organization
    }


    /// Fetch an organization secret, including its linked repositories when
    /// the visibility is `selected`
    pub async fn get_organization_secret(
        &self,
        name: &str,
    ) -> Result<Option<OrganizationSecret>, SecretsError> {
        tracing::debug!(organization = %self.organization, secret = name, "Fetching organization secret");

        let route = Route::Secret {
            scope: self.organization_scope(),
            name: name.to_string(),
        };
        let Some(response) = self.api.send(ApiRequest::get(route)).await.found()? else {
            return Ok(None);
        };
        let payload: OrgSecretPayload = expect_ok(response, "get organization secret")?.json()?;

        let shared = if payload.selected_repositories_url.is_some() {
            match self.list_selected_repositories(name).await.found()? {
                Some(repositories) => Some(repositories),
                // Secret vanished between the two calls
                None => return Ok(None),
            }
        } else {
            None
        };

        Ok(Some(OrganizationSecret::new(
            &self.organization,
            payload,
            shared,
        )))
    }

    /// Fetch a repository owned by the organization
    pub async fn get_repository(&self, name: &str) -> Result<Option<Repository>, SecretsError> {
        tracing::debug!(organization = %self.organization, repository = name, "Fetching repository");

        let route = Route::Repository {
            owner: self.organization.clone(),
            repo: name.to_string(),
        };
        let Some(response) = self.api.send(ApiRequest::get(route)).await.found()? else {
            return Ok(None);
        };
        let payload: RepositoryPayload = expect_ok(response, "get repository")?.json()?;

        Ok(Some(Repository::from_payload(payload, &self.organization)))
    }

    /// Fetch a deployment environment, resolving the repository first
    pub async fn get_environment(
        &self,
        repository: &str,
        environment: &str,
    ) -> Result<Option<Environment>, SecretsError> {
        let Some(repo) = self.get_repository(repository).await? else {
            return Ok(None);
        };

        tracing::debug!(repository = %repo.full_name, environment, "Fetching environment");

        let route = Route::Environment {
            owner: repo.owner.clone(),
            repo: repo.name.clone(),
            environment: environment.to_string(),
        };
        let Some(response) = self.api.send(ApiRequest::get(route)).await.found()? else {
            return Ok(None);
        };
        let payload: EnvironmentPayload = expect_ok(response, "get environment")?.json()?;

        Ok(Some(Environment::from_payload(payload, repo.id)))
    }

    pub async fn get_repository_secret(
        &self,
        repository: &str,
        name: &str,
    ) -> Result<Option<RepositorySecret>, SecretsError> {
        tracing::debug!(organization = %self.organization, repository, secret = name, "Fetching repository secret");

        let route = Route::Secret {
            scope: SecretScope::repository(&self.organization, repository),
            name: name.to_string(),
        };
        let Some(response) = self.api.send(ApiRequest::get(route)).await.found()? else {
            return Ok(None);
        };
        let payload: SecretPayload = expect_ok(response, "get repository secret")?.json()?;

        Ok(Some(RepositorySecret::new(
            &self.organization,
            repository,
            payload,
        )))
    }

    /// Fetch an environment secret. Absent when the repository, the
    /// environment or the secret does not exist.
    pub async fn get_environment_secret(
        &self,
        repository: &str,
        environment: &str,
        name: &str,
    ) -> Result<Option<EnvironmentSecret>, SecretsError> {
        let Some(env) = self.get_environment(repository, environment).await? else {
            return Ok(None);
        };

        tracing::debug!(repository_id = env.repository_id, environment = %env.name, secret = name, "Fetching environment secret");

        let route = Route::Secret {
            scope: SecretScope::environment(env.repository_id, &env.name),
            name: name.to_string(),
        };
        let Some(response) = self.api.send(ApiRequest::get(route)).await.found()? else {
            return Ok(None);
        };
        let payload: SecretPayload = expect_ok(response, "get environment secret")?.json()?;

        Ok(Some(EnvironmentSecret::new(
            env.repository_id,
            env.name,
            payload,
        )))
    }

    pub async fn get_repository_public_key(
        &self,
        repository: &str,
    ) -> Result<Option<SecretPublicKey>, SecretsError> {
        let Some(repo) = self.get_repository(repository).await? else {
            return Ok(None);
        };

        let route = Route::PublicKey(SecretScope::repository(&repo.owner, &repo.name));
        let Some(response) = self.api.send(ApiRequest::get(route)).await.found()? else {
            return Ok(None);
        };
        let payload: PublicKeyPayload = expect_ok(response, "get repository public key")?.json()?;

        Ok(Some(payload.into()))
    }

    /// Fetch the organization public key. Any failure, including not-found,
    /// propagates.
    pub async fn get_organization_public_key(&self) -> Result<SecretPublicKey, SecretsError> {
        let route = Route::PublicKey(self.organization_scope());
        let response = self.api.send(ApiRequest::get(route)).await?;
        let payload: PublicKeyPayload =
            expect_ok(response, "get organization public key")?.json()?;

        Ok(payload.into())
    }

    pub async fn get_environment_public_key(
        &self,
        repository: &str,
        environment: &str,
    ) -> Result<Option<EnvironmentSecretPublicKey>, SecretsError> {
        let Some(repo) = self.get_repository(repository).await? else {
            return Ok(None);
        };

        let route = Route::PublicKey(SecretScope::environment(repo.id, environment));
        let Some(response) = self.api.send(ApiRequest::get(route)).await.found()? else {
            return Ok(None);
        };
        let payload: PublicKeyPayload =
            expect_ok(response, "get environment public key")?.json()?;

        Ok(Some(EnvironmentSecretPublicKey {
            repository_id: repo.id,
            key: payload.into(),
        }))
    }


    /// Create or update an organization secret.
    ///
    /// A new secret defaults to visibility `all`. An existing secret keeps its
    /// current visibility unless one is given, and keeps its repository
    /// selection unless `selected` is given together with new ids.
    pub async fn save_or_update_organization_secret(
        &self,
        name: &str,
        value: &str,
        visibility: Option<Visibility>,
        selected_repository_ids: Option<Vec<u64>>,
    ) -> Result<SaveOutcome, SecretsError> {
        require_string_argument("value", Some(value))?;

        let (key, existing) = tokio::try_join!(
            self.get_organization_public_key(),
            self.get_organization_secret(name)
        )?;

        let encrypted_value = Encrypt::new(&key.key)?.encrypt_value(value)?;
        let body = organization_secret_upsert(
            existing.as_ref(),
            visibility,
            selected_repository_ids,
            key.id,
            encrypted_value,
        );

        tracing::info!(
            organization = %self.organization,
            secret = name,
            visibility = %body.visibility,
            "Saving organization secret"
        );

        let route = Route::Secret {
            scope: self.organization_scope(),
            name: name.to_string(),
        };
        let response = self.api.send(ApiRequest::put(route, Some(&body))?).await?;

        save_outcome(response.status, "setting organization secret value")
    }

    /// Create or update a repository secret. With `overwrite` disabled an
    /// existing secret is left untouched and `Exists` is returned.
    pub async fn save_or_update_repository_secret(
        &self,
        repository: &str,
        name: &str,
        value: &str,
        overwrite: bool,
    ) -> Result<SaveOutcome, SecretsError> {
        require_string_argument("value", Some(value))?;

        if !overwrite && self.get_repository_secret(repository, name).await?.is_some() {
            tracing::info!(organization = %self.organization, repository, secret = name, "Secret exists, not overwriting");
            return Ok(SaveOutcome::Exists);
        }

        let key = self
            .get_repository_public_key(repository)
            .await?
            .ok_or_else(|| {
                SecretsError::missing_key(format!(
                    "repository {}/{}",
                    self.organization, repository
                ))
            })?;

        let encrypted_value = Encrypt::new(&key.key)?.encrypt_value(value)?;

        tracing::info!(organization = %self.organization, repository, secret = name, "Saving repository secret");

        let route = Route::Secret {
            scope: SecretScope::repository(&self.organization, repository),
            name: name.to_string(),
        };
        let body = SecretUpsert {
            encrypted_value,
            key_id: key.id,
        };
        let response = self.api.send(ApiRequest::put(route, Some(&body))?).await?;

        save_outcome(response.status, "setting repository secret value")
    }

    /// Create or update an environment secret. With `overwrite` disabled an
    /// existing secret is left untouched and `Exists` is returned.
    pub async fn save_or_update_environment_secret(
        &self,
        repository: &str,
        environment: &str,
        name: &str,
        value: &str,
        overwrite: bool,
    ) -> Result<SaveOutcome, SecretsError> {
        require_string_argument("value", Some(value))?;

        if !overwrite
            && self
                .get_environment_secret(repository, environment, name)
                .await?
                .is_some()
        {
            tracing::info!(organization = %self.organization, repository, environment, secret = name, "Secret exists, not overwriting");
            return Ok(SaveOutcome::Exists);
        }

        let key = self
            .get_environment_public_key(repository, environment)
            .await?
            .ok_or_else(|| {
                SecretsError::missing_key(format!(
                    "environment {} of repository {}/{}",
                    environment, self.organization, repository
                ))
            })?;

        let encrypted_value = Encrypt::new(&key.key.key)?.encrypt_value(value)?;

        tracing::info!(organization = %self.organization, repository, environment, secret = name, "Saving environment secret");

        let route = Route::Secret {
            scope: SecretScope::environment(key.repository_id, environment),
            name: name.to_string(),
        };
        let body = SecretUpsert {
            encrypted_value,
            key_id: key.key.id,
        };
        let response = self.api.send(ApiRequest::put(route, Some(&body))?).await?;

        save_outcome(response.status, "setting environment secret value")
    }

    /// Grant a repository access to an organization secret
    pub async fn add_secret_to_repository(
        &self,
        name: &str,
        repository: &str,
    ) -> Result<bool, SecretsError> {
        let (secret, repo) = self.resolve_secret_and_repository(name, repository).await?;
        self.add_repository_to_secret(&secret, &repo).await
    }

    /// Revoke a repository's access to an organization secret
    pub async fn remove_secret_from_repository(
        &self,
        name: &str,
        repository: &str,
    ) -> Result<bool, SecretsError> {
        let (secret, repo) = self.resolve_secret_and_repository(name, repository).await?;
        self.remove_repository_from_secret(&secret, &repo).await
    }

    pub async fn add_repository_to_secret(
        &self,
        secret: &OrganizationSecret,
        repository: &Repository,
    ) -> Result<bool, SecretsError> {
        tracing::info!(organization = %self.organization, secret = %secret.name, repository = %repository.full_name, "Linking repository to secret");

        let route = self.selected_repository_route(secret, repository);
        let response = self.api.send(ApiRequest::put::<()>(route, None)?).await?;

        Ok(response.status == 204)
    }

    pub async fn remove_repository_from_secret(
        &self,
        secret: &OrganizationSecret,
        repository: &Repository,
    ) -> Result<bool, SecretsError> {
        tracing::info!(organization = %self.organization, secret = %secret.name, repository = %repository.full_name, "Unlinking repository from secret");

        let route = self.selected_repository_route(secret, repository);
        let response = self.api.send(ApiRequest::delete(route)).await?;

        Ok(response.status == 204)
    }


    /// Delete an organization secret. A secret that is already gone counts
    /// as deleted.
    pub async fn delete_organization_secret(&self, name: &str) -> Result<bool, SecretsError> {
        tracing::info!(organization = %self.organization, secret = name, "Deleting organization secret");

        let route = Route::Secret {
            scope: self.organization_scope(),
            name: name.to_string(),
        };
        self.delete(route).await
    }

    /// Delete a repository secret. Returns `false` without calling the API
    /// when the repository does not exist.
    pub async fn delete_repository_secret(
        &self,
        repository: &str,
        name: &str,
    ) -> Result<bool, SecretsError> {
        let Some(repo) = self.get_repository(repository).await? else {
            tracing::warn!(organization = %self.organization, repository, "Repository not found, nothing deleted");
            return Ok(false);
        };

        tracing::info!(repository = %repo.full_name, secret = name, "Deleting repository secret");

        let route = Route::Secret {
            scope: SecretScope::repository(&repo.owner, &repo.name),
            name: name.to_string(),
        };
        self.delete(route).await
    }

    /// Delete an environment secret. A secret that does not exist is treated
    /// as already deleted and no delete call is made.
    pub async fn delete_environment_secret(
        &self,
        repository: &str,
        environment: &str,
        name: &str,
    ) -> Result<bool, SecretsError> {
        let Some(secret) = self
            .get_environment_secret(repository, environment, name)
            .await?
        else {
            tracing::info!(repository, environment, secret = name, "Environment secret already absent");
            return Ok(true);
        };

        tracing::info!(repository_id = secret.repository_id, environment = %secret.environment, secret = name, "Deleting environment secret");

        let route = Route::Secret {
            scope: SecretScope::environment(secret.repository_id, &secret.environment),
            name: secret.name,
        };
        self.delete(route).await
    }


    fn organization_scope(&self) -> SecretScope {
        SecretScope::organization(&self.organization)
    }

    fn selected_repository_route(
        &self,
        secret: &OrganizationSecret,
        repository: &Repository,
    ) -> Route {
        Route::SelectedRepository {
            org: self.organization.clone(),
            name: secret.name.clone(),
            repository_id: repository.id,
        }
    }

    /// Issue a delete; not-found means the resource is already gone
    async fn delete(&self, route: Route) -> Result<bool, SecretsError> {
        match self.api.send(ApiRequest::delete(route)).await.found()? {
            Some(response) => Ok(response.status == 204),
            None => Ok(true),
        }
    }

    async fn resolve_secret_and_repository(
        &self,
        name: &str,
        repository: &str,
    ) -> Result<(OrganizationSecret, Repository), SecretsError> {
        let (secret, repo) = tokio::try_join!(
            self.get_organization_secret(name),
            self.get_repository(repository)
        )?;

        let secret = secret.ok_or_else(|| SecretsError::SecretNotFound {
            name: name.to_string(),
            organization: self.organization.clone(),
        })?;
        let repo = repo.ok_or_else(|| SecretsError::RepositoryNotFound {
            repository: repository.to_string(),
            organization: self.organization.clone(),
        })?;

        Ok((secret, repo))
    }

    /// Collect every page of repositories linked to an organization secret
    async fn list_selected_repositories(
        &self,
        name: &str,
    ) -> Result<Vec<Repository>, ghseal_api::ApiError> {
        let mut repositories = Vec::new();
        let mut seen = HashSet::new();
        let mut page = 1u32;

        loop {
            let request = ApiRequest::get(Route::SelectedRepositories {
                org: self.organization.clone(),
                name: name.to_string(),
            })
            .with_query("per_page", SELECTED_REPOSITORIES_PAGE_SIZE)
            .with_query("page", page);

            let batch: SelectedRepositoriesPage = self.api.send(request).await?.json()?;
            let received = batch.repositories.len();
            let before = repositories.len();
            for payload in batch.repositories {
                if seen.insert(payload.id) {
                    repositories.push(Repository::from(payload));
                }
            }

            // A short page is the last one; a page with nothing new means the
            // server is not honouring `page`
            if received < SELECTED_REPOSITORIES_PAGE_SIZE as usize
                || repositories.len() == before
                || repositories.len() as u64 >= batch.total_count
            {
                break;
            }
            page += 1;
        }

        tracing::debug!(secret = name, count = repositories.len(), "Listed selected repositories");
        Ok(repositories)
    }
}

/// Build the upsert body for an organization secret
pub fn organization_secret_upsert(
    existing: Option<&OrganizationSecret>,
    visibility: Option<Visibility>,
    selected_repository_ids: Option<Vec<u64>>,
    key_id: String,
    encrypted_value: String,
) -> OrgSecretUpsert {
    let (visibility, selected_repository_ids) = match existing {
        None => {
            let visibility = visibility.unwrap_or(Visibility::All);
            let ids = (visibility == Visibility::Selected)
                .then(|| selected_repository_ids.unwrap_or_default());
            (visibility, ids)
        }
        Some(secret) => {
            let ids = selected_repository_ids.filter(|_| visibility == Some(Visibility::Selected));
            (visibility.unwrap_or(secret.visibility), ids)
        }
    };

    OrgSecretUpsert {
        encrypted_value,
        key_id,
        visibility,
        selected_repository_ids,
    }
}

fn expect_ok(response: ApiResponse, operation: &str) -> Result<ApiResponse, SecretsError> {
    if response.status == 200 {
        Ok(response)
    } else {
        Err(SecretsError::unexpected_status(operation, response.status))
    }
}

fn save_outcome(status: u16, operation: &str) -> Result<SaveOutcome, SecretsError> {
    match status {
        201 => Ok(SaveOutcome::Created),
        204 => Ok(SaveOutcome::Updated),
        other => Err(SecretsError::unexpected_status(operation, other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn existing(visibility: Visibility) -> OrganizationSecret {
        OrganizationSecret::new(
            "acme",
            OrgSecretPayload {
                name: "SHARED".into(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
                visibility,
                selected_repositories_url: None,
            },
            None,
        )
    }

    fn upsert(
        existing: Option<&OrganizationSecret>,
        visibility: Option<Visibility>,
        ids: Option<Vec<u64>>,
    ) -> OrgSecretUpsert {
        organization_secret_upsert(existing, visibility, ids, "key-1".into(), "c2VhbGVk".into())
    }

    #[test]
    fn test_new_secret_defaults_to_all() {
        let body = upsert(None, None, Some(vec![1, 2]));
        assert_eq!(body.visibility, Visibility::All);
        assert!(body.selected_repository_ids.is_none());
    }

    #[test]
    fn test_new_selected_secret_always_sends_ids() {
        let body = upsert(None, Some(Visibility::Selected), None);
        assert_eq!(body.selected_repository_ids, Some(vec![]));

        let body = upsert(None, Some(Visibility::Selected), Some(vec![7]));
        assert_eq!(body.selected_repository_ids, Some(vec![7]));
    }

    #[test]
    fn test_update_keeps_existing_visibility() {
        let current = existing(Visibility::Private);
        let body = upsert(Some(&current), None, None);
        assert_eq!(body.visibility, Visibility::Private);
        assert!(body.selected_repository_ids.is_none());
    }

    #[test]
    fn test_update_selected_without_ids_leaves_links_alone() {
        let current = existing(Visibility::Selected);
        let body = upsert(Some(&current), Some(Visibility::Selected), None);
        assert_eq!(body.visibility, Visibility::Selected);
        assert!(body.selected_repository_ids.is_none());

        let body = upsert(Some(&current), None, Some(vec![3]));
        assert!(body.selected_repository_ids.is_none());
    }

    #[test]
    fn test_update_selected_with_ids() {
        let current = existing(Visibility::All);
        let body = upsert(Some(&current), Some(Visibility::Selected), Some(vec![3, 4]));
        assert_eq!(body.visibility, Visibility::Selected);
        assert_eq!(body.selected_repository_ids, Some(vec![3, 4]));
    }

    #[test]
    fn test_save_outcome_mapping() {
        assert_eq!(save_outcome(201, "test").unwrap(), SaveOutcome::Created);
        assert_eq!(save_outcome(204, "test").unwrap(), SaveOutcome::Updated);

        let err = save_outcome(200, "setting secret value").unwrap_err();
        assert!(err.to_string().contains("200"));
    }
}
