use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which repositories may read an organization secret
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Every repository in the organization
    All,
    /// Private and internal repositories only
    Private,
    /// An explicit allow-list of repositories
    Selected,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::All => "all",
            Visibility::Private => "private",
            Visibility::Selected => "selected",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Visibility::All),
            "private" => Ok(Visibility::Private),
            "selected" => Ok(Visibility::Selected),
            other => Err(format!(
                "Invalid visibility '{}'. Use 'all', 'private' or 'selected'",
                other
            )),
        }
    }
}

/// Account that owns a repository
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OwnerPayload {
    pub login: String,
}

/// `GET /repos/{owner}/{repo}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepositoryPayload {
    pub id: u64,
    pub node_id: String,
    pub name: String,
    pub full_name: String,
    pub owner: OwnerPayload,
}

/// `GET /repos/{owner}/{repo}/environments/{environment}`
///
/// Protection rules are part of the response but are not modelled.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnvironmentPayload {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub html_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `GET .../secrets/public-key`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublicKeyPayload {
    pub key_id: String,
    pub key: String,
}

/// `GET /orgs/{org}/actions/secrets/{name}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrgSecretPayload {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub visibility: Visibility,
    /// Present only when visibility is `selected`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_repositories_url: Option<String>,
}

/// `GET` for a repository or environment secret
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SecretPayload {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One page of `GET /orgs/{org}/actions/secrets/{name}/repositories`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelectedRepositoriesPage {
    pub total_count: u64,
    pub repositories: Vec<RepositoryPayload>,
}

/// `PUT /orgs/{org}/actions/secrets/{name}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrgSecretUpsert {
    pub encrypted_value: String,
    pub key_id: String,
    pub visibility: Visibility,
    /// Omitted to leave the existing repository selection untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_repository_ids: Option<Vec<u64>>,
}

/// `PUT` for a repository or environment secret
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SecretUpsert {
    pub encrypted_value: String,
    pub key_id: String,
}

/// Error body returned with 4xx/5xx responses
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
}
