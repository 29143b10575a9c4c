use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use ghseal::Visibility;

/// ghseal - manage GitHub Actions secrets from the command line
#[derive(Parser, Debug)]
#[command(name = "ghseal")]
#[command(about = "Create, update and delete GitHub Actions secrets")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// GitHub token (literal, env://VAR or file://path)
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// REST API root, for GitHub Enterprise Server
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Organization secrets
    Org {
        #[command(subcommand)]
        command: OrgCommand,
    },

    /// Repository secrets
    Repo {
        #[command(subcommand)]
        command: RepoCommand,
    },

    /// Environment secrets
    Env {
        #[command(subcommand)]
        command: EnvCommand,
    },
}

#[derive(Args, Debug)]
pub struct OrgTarget {
    /// Organization owning the secret
    #[arg(short, long)]
    pub organization: Option<String>,

    /// Secret name
    #[arg(short, long)]
    pub secret: String,
}

#[derive(Args, Debug)]
pub struct RepoTarget {
    /// Repository as <owner>/<repo>
    #[arg(short, long)]
    pub repository: String,

    /// Secret name
    #[arg(short, long)]
    pub secret: String,
}

#[derive(Args, Debug)]
pub struct EnvTarget {
    /// Repository as <owner>/<repo>
    #[arg(short, long)]
    pub repository: String,

    /// Deployment environment name
    #[arg(short, long)]
    pub environment: String,

    /// Secret name
    #[arg(short, long)]
    pub secret: String,
}

#[derive(Subcommand, Debug)]
pub enum OrgCommand {
    /// Show an organization secret
    Get {
        #[command(flatten)]
        target: OrgTarget,
    },

    /// Create or update an organization secret
    Set {
        #[command(flatten)]
        target: OrgTarget,

        /// Secret value (literal, env://VAR or file://path)
        #[arg(long)]
        value: String,

        /// Which repositories can read the secret: all, private or selected
        #[arg(long)]
        visibility: Option<Visibility>,

        /// Repository ids allowed to read a `selected` secret
        #[arg(long = "repository-id", value_delimiter = ',')]
        repository_ids: Vec<u64>,
    },

    /// Delete an organization secret
    Delete {
        #[command(flatten)]
        target: OrgTarget,
    },

    /// Give a repository access to an organization secret
    AddRepo {
        #[command(flatten)]
        target: OrgTarget,

        /// Repository name within the organization
        #[arg(short, long)]
        repository: String,
    },

    /// Revoke a repository's access to an organization secret
    RemoveRepo {
        #[command(flatten)]
        target: OrgTarget,

        /// Repository name within the organization
        #[arg(short, long)]
        repository: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum RepoCommand {
    /// Show a repository secret
    Get {
        #[command(flatten)]
        target: RepoTarget,
    },

    /// Create or update a repository secret
    Set {
        #[command(flatten)]
        target: RepoTarget,

        /// Secret value (literal, env://VAR or file://path)
        #[arg(long)]
        value: String,

        /// Leave an existing secret untouched
        #[arg(long)]
        no_overwrite: bool,
    },

    /// Delete a repository secret
    Delete {
        #[command(flatten)]
        target: RepoTarget,
    },
}

#[derive(Subcommand, Debug)]
pub enum EnvCommand {
    /// Show an environment secret
    Get {
        #[command(flatten)]
        target: EnvTarget,
    },

    /// Create or update an environment secret
    Set {
        #[command(flatten)]
        target: EnvTarget,

        /// Secret value (literal, env://VAR or file://path)
        #[arg(long)]
        value: String,

        /// Leave an existing secret untouched
        #[arg(long)]
        no_overwrite: bool,
    },

    /// Delete an environment secret
    Delete {
        #[command(flatten)]
        target: EnvTarget,
    },
}

impl Cli {
    /// Organization given on the command line, if the command takes one
    pub fn organization(&self) -> Option<String> {
        match &self.command {
            Commands::Org { command } => match command {
                OrgCommand::Get { target }
                | OrgCommand::Set { target, .. }
                | OrgCommand::Delete { target }
                | OrgCommand::AddRepo { target, .. }
                | OrgCommand::RemoveRepo { target, .. } => target.organization.clone(),
            },
            _ => None,
        }
    }
}

/// Split `<owner>/<repo>` into its parts
pub fn parse_repository(repository: &str) -> anyhow::Result<(String, String)> {
    match repository.split_once('/') {
        Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => {
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => anyhow::bail!(
            "A fully qualified repository name of the form '<owner>/<repo>' is required, but was '{}'.",
            repository
        ),
    }
}
