//! CLI configuration with environment variable priority
//!
//! Configuration is resolved in this order (first found wins):
//! 1. Command-line flags
//! 2. Environment variables (GHSEAL_*, plus GITHUB_TOKEN for the token)
//! 3. Config file (`<config dir>/ghseal/config.toml` or `--config`)
//! 4. Default values (where applicable)

use std::path::{Path, PathBuf};

use serde::Deserialize;

use ghseal_api::DEFAULT_API_URL;

use crate::source::resolve_value;

/// Environment variable prefix
const ENV_PREFIX: &str = "GHSEAL";

/// Configuration file contents
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    /// REST API root (GitHub Enterprise: `https://host/api/v3`)
    pub api_url: Option<String>,

    /// Access token (literal, env://VAR or file://path)
    pub token: Option<String>,

    /// Default organization for `org` commands
    pub organization: Option<String>,
}

/// Values supplied on the command line
#[derive(Debug, Default)]
pub struct ConfigOverrides {
    pub api_url: Option<String>,
    pub token: Option<String>,
    pub organization: Option<String>,
}

/// Fully resolved configuration
#[derive(Debug)]
pub struct ResolvedConfig {
    pub api_url: String,
    pub token: String,
    pub organization: Option<String>,
}

impl FileConfig {
    /// Default config file location
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ghseal")
            .join("config.toml")
    }

    /// Load configuration from a TOML file. A missing or unreadable file
    /// yields an empty configuration.
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => {
                        tracing::debug!("Loaded config from {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse {}: {}", path.display(), e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read {}: {}", path.display(), e);
                }
            }
        }
        Self::default()
    }

    /// Resolve against the process environment
    pub fn resolve(self, overrides: ConfigOverrides) -> anyhow::Result<ResolvedConfig> {
        self.resolve_with(overrides, |name| std::env::var(name).ok())
    }

    /// Resolve using `lookup` for environment variables
    pub fn resolve_with<F>(self, overrides: ConfigOverrides, lookup: F) -> anyhow::Result<ResolvedConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get_env = |name: &str| lookup(&format!("{}_{}", ENV_PREFIX, name));

        // API URL: flag > ENV > config > default
        let api_url = overrides
            .api_url
            .or_else(|| get_env("API_URL"))
            .or(self.api_url)
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        // Token: flag > GHSEAL_TOKEN > GITHUB_TOKEN > config > required
        let token_source = overrides
            .token
            .or_else(|| get_env("TOKEN"))
            .or_else(|| lookup("GITHUB_TOKEN"))
            .or(self.token)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "GitHub token required. Use --token, set GHSEAL_TOKEN or GITHUB_TOKEN, or add token to the config file"
                )
            })?;

        let token = resolve_value(&token_source)
            .map_err(|e| anyhow::anyhow!("Failed to resolve GitHub token: {}", e))?;
        if token.is_empty() {
            anyhow::bail!("GitHub token resolved to an empty value");
        }

        // Organization: flag > ENV > config > none
        let organization = overrides
            .organization
            .or_else(|| get_env("ORGANIZATION"))
            .or(self.organization);

        Ok(ResolvedConfig {
            api_url,
            token,
            organization,
        })
    }
}
