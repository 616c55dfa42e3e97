use crate::config::ConfigError;
use crate::github::GithubRepoName;
use crate::sizer::label::SizeLabel;

/// Reasons why a pull request event could not be handled.
#[derive(Debug, thiserror::Error)]
pub enum HandleError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Repository {0} not found in the bot state")]
    RepositoryNotFound(GithubRepoName),
    #[error("Cannot fetch changes of PR {pr}")]
    Fetch {
        pr: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("Cannot {operation} label {label}")]
    LabelMutation {
        operation: &'static str,
        label: SizeLabel,
        #[source]
        source: anyhow::Error,
    },
}
