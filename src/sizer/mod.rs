use std::sync::Arc;

use axum::async_trait;

use crate::config::SizeConfig;
use crate::github::{GithubRepoName, PullRequestNumber};

pub mod changes;
mod error;
pub mod event;
mod handlers;
pub mod label;
pub mod policy;
pub mod reconcile;

pub use changes::{total_change_count, ChangeRecord};
pub use error::HandleError;
pub use handlers::handle_sizer_event;
pub use label::SizeLabel;
pub use policy::{SizeThresholds, ThresholdPolicy};

/// Provides the line statistics of a pull request.
#[async_trait]
pub trait ChangeProvider: Send + Sync {
    /// Returns one record per file changed by the given PR.
    async fn get_pull_request_changes(
        &self,
        pr: PullRequestNumber,
    ) -> anyhow::Result<Vec<ChangeRecord>>;
}

/// Adds and removes labels of a pull request.
#[async_trait]
pub trait LabelMutator: Send + Sync {
    async fn add_label(&self, pr: PullRequestNumber, label: &str) -> anyhow::Result<()>;

    async fn remove_label(&self, pr: PullRequestNumber, label: &str) -> anyhow::Result<()>;
}

/// Provides functionality for working with a remote repository.
pub trait RepositoryClient: ChangeProvider + LabelMutator {
    fn repository(&self) -> &GithubRepoName;
}

/// Main state holder for the bot.
/// It is behind a trait to allow easier mocking in tests.
#[async_trait]
pub trait SizeBotState<Client: RepositoryClient>: Send + Sync {
    /// Get repository state for the given repository name.
    fn get_repo_state(&self, repo: &GithubRepoName) -> Option<Arc<RepositoryState<Client>>>;

    /// Reload state of repositories due to some external change.
    async fn reload_repositories(&self) -> anyhow::Result<()>;
}

/// An access point to a single repository.
pub struct RepositoryState<Client: RepositoryClient> {
    pub repository: GithubRepoName,
    pub client: Client,
}

/// Immutable values shared by all event handlers.
pub struct SizeBotContext {
    pub config: SizeConfig,
}

impl SizeBotContext {
    pub fn new(config: SizeConfig) -> Self {
        Self { config }
    }
}
