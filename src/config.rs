use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use crate::github::GithubRepoName;
use crate::sizer::{SizeThresholds, ThresholdPolicy};

pub const DEFAULT_CONFIG_FILE_PATH: &str = "size-bot.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read config file {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Cannot parse config file")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("Invalid repository `{0}`, expected `<org>` or `<org>/<repo>`")]
    InvalidRepository(String),
    #[error("`{0}` is configured more than once")]
    Duplicate(String),
    #[error("No config found for repository {0}")]
    MissingRepository(GithubRepoName),
}

/// A single entry of the configuration file.
#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct RepositoryConfig {
    /// Either organizations (`org`) or single repositories (`org/repo`).
    pub repos: Vec<String>,
    /// Repositories that are not covered by an organization listed in `repos`.
    #[serde(default)]
    pub excluded_repos: Vec<String>,
    pub sizes: SizeThresholds,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    config_items: Vec<RepositoryConfig>,
}

struct OrganizationPolicy {
    policy: Arc<ThresholdPolicy>,
    excluded: HashSet<GithubRepoName>,
}

enum RepoPattern {
    Organization(String),
    Repository(GithubRepoName),
}

impl RepoPattern {
    fn parse(pattern: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidRepository(pattern.to_string());
        let mut parts = pattern.trim().split('/');
        let owner = parts.next().filter(|s| !s.is_empty()).ok_or_else(invalid)?;
        let name = match parts.next() {
            None => return Ok(Self::Organization(owner.to_lowercase())),
            Some(name) if !name.is_empty() => name,
            Some(_) => return Err(invalid()),
        };
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self::Repository(GithubRepoName::new(owner, name)))
    }
}

/// Validated thresholds of all configured repositories.
pub struct SizeConfig {
    repositories: HashMap<GithubRepoName, Arc<ThresholdPolicy>>,
    organizations: HashMap<String, OrganizationPolicy>,
}

impl SizeConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        content.parse()
    }

    fn from_items(items: Vec<RepositoryConfig>) -> Result<Self, ConfigError> {
        let mut repositories = HashMap::new();
        let mut organizations = HashMap::new();
        for item in items {
            if item.repos.is_empty() {
                return Err(ConfigError::InvalidConfig(
                    "config item without any repositories".to_string(),
                ));
            }
            let policy = Arc::new(ThresholdPolicy::try_from(item.sizes)?);
            let excluded = item
                .excluded_repos
                .iter()
                .map(|pattern| match RepoPattern::parse(pattern)? {
                    RepoPattern::Repository(name) => Ok(name),
                    RepoPattern::Organization(_) => {
                        Err(ConfigError::InvalidRepository(pattern.clone()))
                    }
                })
                .collect::<Result<HashSet<_>, _>>()?;

            for pattern in &item.repos {
                let duplicate = match RepoPattern::parse(pattern)? {
                    RepoPattern::Repository(name) => {
                        repositories.insert(name, policy.clone()).is_some()
                    }
                    RepoPattern::Organization(org) => organizations
                        .insert(
                            org,
                            OrganizationPolicy {
                                policy: policy.clone(),
                                excluded: excluded.clone(),
                            },
                        )
                        .is_some(),
                };
                if duplicate {
                    return Err(ConfigError::Duplicate(pattern.clone()));
                }
            }
        }
        Ok(Self {
            repositories,
            organizations,
        })
    }

    /// Finds the thresholds of the given repository.
    ///
    /// An entry naming the repository wins over an entry naming its organization.
    pub fn policy_for(&self, repo: &GithubRepoName) -> Result<Arc<ThresholdPolicy>, ConfigError> {
        if let Some(policy) = self.repositories.get(repo) {
            return Ok(policy.clone());
        }
        self.organizations
            .get(repo.owner())
            .filter(|org| !org.excluded.contains(repo))
            .map(|org| org.policy.clone())
            .ok_or_else(|| ConfigError::MissingRepository(repo.clone()))
    }

    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty() && self.organizations.is_empty()
    }
}

impl std::str::FromStr for SizeConfig {
    type Err = ConfigError;

    fn from_str(content: &str) -> Result<Self, Self::Err> {
        let file: ConfigFile = toml::from_str(content)?;
        Self::from_items(file.config_items)
    }
}
