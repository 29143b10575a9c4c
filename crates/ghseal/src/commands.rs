//! Subcommand execution

use std::sync::Arc;

use anyhow::{Context, Result};
use ghseal::{
    EnvironmentSecret, GitHubClient, OrganizationSecret, RepositorySecret, SecretsApi,
    SecretsManager,
};

use ghseal_crypto::require_string_argument;

use crate::cli::{parse_repository, Commands, EnvCommand, OrgCommand, RepoCommand};
use crate::config::ResolvedConfig;
use crate::source::resolve_value;

/// Run a subcommand against the configured API
pub async fn run(command: Commands, config: ResolvedConfig) -> Result<()> {
    validate(&command)?;

    let client: Arc<dyn SecretsApi> = Arc::new(
        GitHubClient::with_base_url(&config.api_url, config.token.as_str())
            .context("Failed to create GitHub client")?,
    );

    match command {
        Commands::Org { command } => run_org(client, config.organization, command).await,
        Commands::Repo { command } => run_repo(client, command).await,
        Commands::Env { command } => run_env(client, command).await,
    }
}

async fn run_org(
    client: Arc<dyn SecretsApi>,
    default_organization: Option<String>,
    command: OrgCommand,
) -> Result<()> {
    let (target, action) = match command {
        OrgCommand::Get { target } => (target, OrgAction::Get),
        OrgCommand::Set {
            target,
            value,
            visibility,
            repository_ids,
        } => (
            target,
            OrgAction::Set {
                value,
                visibility,
                repository_ids,
            },
        ),
        OrgCommand::Delete { target } => (target, OrgAction::Delete),
        OrgCommand::AddRepo { target, repository } => (target, OrgAction::AddRepo(repository)),
        OrgCommand::RemoveRepo { target, repository } => {
            (target, OrgAction::RemoveRepo(repository))
        }
    };

    let organization = target.organization.or(default_organization).context(
        "Organization required. Use --organization, set GHSEAL_ORGANIZATION, or add organization to the config file",
    )?;
    let secret = target.secret;
    let secrets = SecretsManager::new(client, organization.as_str());

    match action {
        OrgAction::Get => match secrets.get_organization_secret(&secret).await? {
            Some(found) => print_organization_secret(&found),
            None => anyhow::bail!(
                "Secret {} was not found in organization {}",
                secret,
                organization
            ),
        },
        OrgAction::Set {
            value,
            visibility,
            repository_ids,
        } => {
            let value = resolve_value(&value).context("Failed to resolve secret value")?;
            let repository_ids = (!repository_ids.is_empty()).then_some(repository_ids);
            let outcome = secrets
                .save_or_update_organization_secret(&secret, &value, visibility, repository_ids)
                .await
                .with_context(|| format!("Failed to add/update secret {}/{}", organization, secret))?;
            println!("Successfully {} secret {}/{}.", outcome, organization, secret);
        }
        OrgAction::Delete => {
            let deleted = secrets.delete_organization_secret(&secret).await?;
            report(
                deleted,
                format!("Deleted secret {}/{}.", organization, secret),
                format!("Did not succeed in deleting secret {}/{}", organization, secret),
            )?;
        }
        OrgAction::AddRepo(repository) => {
            let added = secrets
                .add_secret_to_repository(&secret, &repository)
                .await
                .with_context(|| {
                    format!(
                        "Failed to add repository {} to secret {}/{}",
                        repository, organization, secret
                    )
                })?;
            report(
                added,
                format!(
                    "Successfully added {} to secret {}/{}.",
                    repository, organization, secret
                ),
                format!(
                    "Did not succeed in adding {} to secret {}/{}",
                    repository, organization, secret
                ),
            )?;
        }
        OrgAction::RemoveRepo(repository) => {
            let removed = secrets
                .remove_secret_from_repository(&secret, &repository)
                .await
                .with_context(|| {
                    format!(
                        "Failed to remove repository {} from secret {}/{}",
                        repository, organization, secret
                    )
                })?;
            report(
                removed,
                format!(
                    "Successfully removed {} from secret {}/{}.",
                    repository, organization, secret
                ),
                format!(
                    "Did not succeed in removing {} from secret {}/{}",
                    repository, organization, secret
                ),
            )?;
        }
    }

    Ok(())
}

enum OrgAction {
    Get,
    Set {
        value: String,
        visibility: Option<ghseal::Visibility>,
        repository_ids: Vec<u64>,
    },
    Delete,
    AddRepo(String),
    RemoveRepo(String),
}

async fn run_repo(client: Arc<dyn SecretsApi>, command: RepoCommand) -> Result<()> {
    match command {
        RepoCommand::Get { target } => {
            let (owner, repo) = parse_repository(&target.repository)?;
            let secrets = SecretsManager::new(client, owner);
            match secrets.get_repository_secret(&repo, &target.secret).await? {
                Some(found) => print_repository_secret(&found),
                None => anyhow::bail!(
                    "Secret {} was not found in repository {}",
                    target.secret,
                    target.repository
                ),
            }
        }
        RepoCommand::Set {
            target,
            value,
            no_overwrite,
        } => {
            let (owner, repo) = parse_repository(&target.repository)?;
            let value = resolve_value(&value).context("Failed to resolve secret value")?;
            let secrets = SecretsManager::new(client, owner);
            let outcome = secrets
                .save_or_update_repository_secret(&repo, &target.secret, &value, !no_overwrite)
                .await
                .with_context(|| {
                    format!(
                        "Failed to add/update secret {}/{}",
                        target.repository, target.secret
                    )
                })?;
            print_outcome(outcome, &format!("{}/{}", target.repository, target.secret));
        }
        RepoCommand::Delete { target } => {
            let (owner, repo) = parse_repository(&target.repository)?;
            let secrets = SecretsManager::new(client, owner);
            let deleted = secrets.delete_repository_secret(&repo, &target.secret).await?;
            report(
                deleted,
                format!("Deleted secret {}/{}.", target.repository, target.secret),
                format!(
                    "Did not succeed in deleting secret {}/{}",
                    target.repository, target.secret
                ),
            )?;
        }
    }

    Ok(())
}

async fn run_env(client: Arc<dyn SecretsApi>, command: EnvCommand) -> Result<()> {
    match command {
        EnvCommand::Get { target } => {
            let (owner, repo) = parse_repository(&target.repository)?;
            let secrets = SecretsManager::new(client, owner);
            match secrets
                .get_environment_secret(&repo, &target.environment, &target.secret)
                .await?
            {
                Some(found) => print_environment_secret(&target.repository, &found),
                None => anyhow::bail!(
                    "Secret {} was not found in environment {} of repository {}",
                    target.secret,
                    target.environment,
                    target.repository
                ),
            }
        }
        EnvCommand::Set {
            target,
            value,
            no_overwrite,
        } => {
            let (owner, repo) = parse_repository(&target.repository)?;
            let value = resolve_value(&value).context("Failed to resolve secret value")?;
            let secrets = SecretsManager::new(client, owner);
            let label = format!(
                "{}/{}/{}",
                target.repository, target.environment, target.secret
            );
            let outcome = secrets
                .save_or_update_environment_secret(
                    &repo,
                    &target.environment,
                    &target.secret,
                    &value,
                    !no_overwrite,
                )
                .await
                .with_context(|| format!("Failed to add/update secret {}", label))?;
            print_outcome(outcome, &label);
        }
        EnvCommand::Delete { target } => {
            let (owner, repo) = parse_repository(&target.repository)?;
            let secrets = SecretsManager::new(client, owner);
            let deleted = secrets
                .delete_environment_secret(&repo, &target.environment, &target.secret)
                .await?;
            let label = format!(
                "{}/{}/{}",
                target.repository, target.environment, target.secret
            );
            report(
                deleted,
                format!("Deleted secret {}.", label),
                format!("Did not succeed in deleting secret {}", label),
            )?;
        }
    }

    Ok(())
}

/// Reject blank names before any request is made
fn validate(command: &Commands) -> Result<()> {
    let (secret, environment) = match command {
        Commands::Org { command } => match command {
            OrgCommand::Get { target }
            | OrgCommand::Set { target, .. }
            | OrgCommand::Delete { target }
            | OrgCommand::AddRepo { target, .. }
            | OrgCommand::RemoveRepo { target, .. } => (&target.secret, None),
        },
        Commands::Repo { command } => match command {
            RepoCommand::Get { target }
            | RepoCommand::Set { target, .. }
            | RepoCommand::Delete { target } => (&target.secret, None),
        },
        Commands::Env { command } => match command {
            EnvCommand::Get { target }
            | EnvCommand::Set { target, .. }
            | EnvCommand::Delete { target } => (&target.secret, Some(&target.environment)),
        },
    };

    require_string_argument("secret", Some(secret))?;
    if let Some(environment) = environment {
        require_string_argument("environment", Some(environment))?;
    }
    Ok(())
}

fn print_outcome(outcome: ghseal::SaveOutcome, label: &str) {
    match outcome {
        ghseal::SaveOutcome::Exists => println!(
            "Secret {} already exists, but not overwriting existing value.",
            label
        ),
        other => println!("Successfully {} secret {}.", other, label),
    }
}

fn report(succeeded: bool, success: String, failure: String) -> Result<()> {
    if succeeded {
        println!("{}", success);
        Ok(())
    } else {
        anyhow::bail!(failure)
    }
}

fn print_organization_secret(secret: &OrganizationSecret) {
    println!("name:        {}", secret.name);
    println!("visibility:  {}", secret.visibility);
    println!("created_at:  {}", secret.created_at);
    println!("updated_at:  {}", secret.updated_at);
    if let Some(repositories) = secret.shared_repositories() {
        println!("repositories:");
        for repository in repositories {
            println!("  - {} ({})", repository.full_name, repository.id);
        }
    }
}

fn print_repository_secret(secret: &RepositorySecret) {
    println!("name:        {}", secret.name);
    println!("repository:  {}/{}", secret.organization, secret.repository);
    println!("created_at:  {}", secret.created_at);
    println!("updated_at:  {}", secret.updated_at);
}

fn print_environment_secret(repository: &str, secret: &EnvironmentSecret) {
    println!("name:        {}", secret.name);
    println!("repository:  {} ({})", repository, secret.repository_id);
    println!("environment: {}", secret.environment);
    println!("created_at:  {}", secret.created_at);
    println!("updated_at:  {}", secret.updated_at);
}
