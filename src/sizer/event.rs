use crate::github::{GithubRepoName, PullRequestNumber};

#[derive(Debug)]
pub enum SizeBotEvent {
    /// Something happened to a pull request.
    PullRequest(PullRequestEvent),
    /// The set of repositories the bot's Github App is installed in has changed.
    InstallationsChanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullRequestAction {
    /// A pull request was opened.
    Opened,
    /// New commits were pushed to the source branch of a pull request.
    SourceBranchChanged,
    /// Any other action (closed, labeled, edited, ...).
    Other(String),
}

impl PullRequestAction {
    pub fn from_github(action: &str) -> Self {
        match action {
            "opened" => Self::Opened,
            "synchronize" => Self::SourceBranchChanged,
            other => Self::Other(other.to_string()),
        }
    }

    /// Only these actions can change the size of a PR.
    pub fn affects_size(&self) -> bool {
        matches!(self, Self::Opened | Self::SourceBranchChanged)
    }
}

#[derive(Debug)]
pub struct PullRequestEvent {
    pub repository: GithubRepoName,
    pub number: PullRequestNumber,
    pub action: PullRequestAction,
    /// Labels attached to the PR at the time of the event.
    pub labels: Vec<String>,
}
