use anyhow::Context;
use axum::async_trait;
use octocrab::{Error, Octocrab};
use serde::{Deserialize, Deserializer};
use url::Url;

use crate::github::api::get_all_pages;
use crate::github::{GithubRepoName, PullRequestNumber};
use crate::sizer::{ChangeProvider, ChangeRecord, LabelMutator, RepositoryClient};

/// GitHub lists at most 3000 files of a pull request.
const MAX_FILE_PAGES: u32 = 30;

/// Provides access to a single app installation (repository) using the GitHub API.
pub struct GithubRepositoryClient {
    /// The client caches the access token for this given repository and refreshes it once it
    /// expires.
    client: Octocrab,
    repo_name: GithubRepoName,
}

impl GithubRepositoryClient {
    pub fn new(client: Octocrab, repo_name: GithubRepoName) -> Self {
        Self { client, repo_name }
    }

    pub fn name(&self) -> &GithubRepoName {
        &self.repo_name
    }

    fn format_pr(&self, pr: PullRequestNumber) -> String {
        format!("{}/{}/{}", self.name().owner(), self.name().name(), pr)
    }

    /// Builds a percent-encoded API route of an issue label.
    fn label_route(&self, pr: PullRequestNumber, label: &str) -> anyhow::Result<String> {
        let mut url = Url::parse("https://api.github.com").context("Cannot parse base URL")?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Base URL cannot have path"))?
            .extend(&[
                "repos",
                self.repo_name.owner(),
                self.repo_name.name(),
                "issues",
                &pr.to_string(),
                "labels",
                label,
            ]);
        Ok(url.path().to_string())
    }
}

/// A single entry of the "list pull request files" endpoint.
#[derive(Deserialize, Debug)]
struct PullRequestFile {
    filename: String,
    #[serde(default, deserialize_with = "deserialize_count")]
    additions: String,
    #[serde(default, deserialize_with = "deserialize_count")]
    deletions: String,
}

/// Keeps line counts in their textual form, whatever JSON type they were sent as.
fn deserialize_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(count) => count,
        other => other.to_string(),
    })
}

impl From<PullRequestFile> for ChangeRecord {
    fn from(file: PullRequestFile) -> Self {
        ChangeRecord {
            filename: file.filename,
            additions: file.additions,
            deletions: file.deletions,
        }
    }
}

impl RepositoryClient for GithubRepositoryClient {
    fn repository(&self) -> &GithubRepoName {
        self.name()
    }
}

#[async_trait]
impl ChangeProvider for GithubRepositoryClient {
    async fn get_pull_request_changes(
        &self,
        pr: PullRequestNumber,
    ) -> anyhow::Result<Vec<ChangeRecord>> {
        // https://docs.github.com/en/rest/pulls/pulls?apiVersion=2022-11-28#list-pull-requests-files
        let route = format!(
            "/repos/{}/{}/pulls/{pr}/files",
            self.repo_name.owner(),
            self.repo_name.name(),
        );
        let files =
            get_all_pages::<Vec<PullRequestFile>, _>(&self.client, &route, MAX_FILE_PAGES)
                .await
                .with_context(|| format!("Cannot list files of PR {}", self.format_pr(pr)))?;
        Ok(files.into_iter().map(ChangeRecord::from).collect())
    }
}

#[async_trait]
impl LabelMutator for GithubRepositoryClient {
    async fn add_label(&self, pr: PullRequestNumber, label: &str) -> anyhow::Result<()> {
        self.client
            .issues(self.name().owner(), self.name().name())
            .add_labels(pr.0, &[label.to_string()])
            .await
            .with_context(|| format!("Cannot add label {label} to PR {}", self.format_pr(pr)))?;
        Ok(())
    }

    async fn remove_label(&self, pr: PullRequestNumber, label: &str) -> anyhow::Result<()> {
        // Size labels contain a slash, which has to be escaped in the route.
        let route = self.label_route(pr, label)?;
        match self
            .client
            .delete::<serde_json::Value, _, ()>(route, None)
            .await
        {
            Ok(_) => Ok(()),
            // This error is returned if we try to remove a label that does not exist on the issue.
            // The label is already gone, which is what we wanted.
            Err(Error::GitHub { source, .. }) if source.message.contains("Label does not exist") => {
                tracing::trace!("Trying to remove label {label} which does not exist on PR {pr}");
                Ok(())
            }
            Err(error) => Err(error).with_context(|| {
                format!("Cannot remove label {label} from PR {}", self.format_pr(pr))
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use octocrab::Octocrab;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::GithubRepositoryClient;
    use crate::github::{GithubRepoName, PullRequestNumber};
    use crate::sizer::{total_change_count, ChangeProvider, ChangeRecord, LabelMutator};

    async fn create_client() -> (MockServer, GithubRepositoryClient) {
        let mock_server = MockServer::start().await;
        let octocrab = Octocrab::builder()
            .base_uri(mock_server.uri())
            .unwrap()
            .build()
            .unwrap();
        let client = GithubRepositoryClient::new(octocrab, GithubRepoName::new("owner", "name"));
        (mock_server, client)
    }

    fn file(name: &str, additions: u64, deletions: u64) -> serde_json::Value {
        json!({
            "sha": "bbcd538c8e72b8c175046e27cc8f907076331401",
            "filename": name,
            "status": "modified",
            "additions": additions,
            "deletions": deletions,
            "changes": additions + deletions,
        })
    }

    #[tokio::test]
    async fn list_files_single_page() {
        let (server, client) = create_client().await;
        Mock::given(method("GET"))
            .and(path("/repos/owner/name/pulls/1/files"))
            .and(query_param("page", "1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([file("a.rs", 3, 2), file("b.rs", 10, 0)])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let changes = client
            .get_pull_request_changes(PullRequestNumber(1))
            .await
            .unwrap();
        assert_eq!(
            changes,
            vec![
                ChangeRecord::new("a.rs", "3", "2"),
                ChangeRecord::new("b.rs", "10", "0"),
            ]
        );
    }

    #[tokio::test]
    async fn list_files_multiple_pages() {
        let (server, client) = create_client().await;
        let first_page: Vec<_> = (0..100)
            .map(|i| file(&format!("file-{i}.rs"), 1, 1))
            .collect();
        Mock::given(method("GET"))
            .and(path("/repos/owner/name/pulls/1/files"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(first_page))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/owner/name/pulls/1/files"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([file("last.rs", 5, 0)])))
            .expect(1)
            .mount(&server)
            .await;

        let changes = client
            .get_pull_request_changes(PullRequestNumber(1))
            .await
            .unwrap();
        assert_eq!(changes.len(), 101);
        assert_eq!(total_change_count(&changes), 205);
    }

    #[tokio::test]
    async fn list_files_keeps_malformed_counts() {
        let (server, client) = create_client().await;
        Mock::given(method("GET"))
            .and(path("/repos/owner/name/pulls/1/files"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "filename": "a.rs", "additions": "7", "deletions": null },
                { "filename": "b.bin" }
            ])))
            .mount(&server)
            .await;

        let changes = client
            .get_pull_request_changes(PullRequestNumber(1))
            .await
            .unwrap();
        assert_eq!(
            changes,
            vec![
                ChangeRecord::new("a.rs", "7", "null"),
                ChangeRecord::new("b.bin", "", ""),
            ]
        );
        assert_eq!(total_change_count(&changes), 7);
    }

    #[tokio::test]
    async fn list_files_failure() {
        let (server, client) = create_client().await;
        Mock::given(method("GET"))
            .and(path("/repos/owner/name/pulls/1/files"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "message": "Server Error",
                "documentation_url": "https://docs.github.com/rest"
            })))
            .mount(&server)
            .await;

        assert!(client
            .get_pull_request_changes(PullRequestNumber(1))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn add_label() {
        let (server, client) = create_client().await;
        Mock::given(method("POST"))
            .and(path("/repos/owner/name/issues/1/labels"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        client
            .add_label(PullRequestNumber(1), "size/M")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn remove_label_escapes_slash() {
        let (server, client) = create_client().await;
        Mock::given(method("DELETE"))
            .and(path("/repos/owner/name/issues/1/labels/size%2FXS"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        client
            .remove_label(PullRequestNumber(1), "size/XS")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn remove_missing_label_is_ok() {
        let (server, client) = create_client().await;
        Mock::given(method("DELETE"))
            .and(path("/repos/owner/name/issues/1/labels/size%2FXS"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "message": "Label does not exist",
                "documentation_url": "https://docs.github.com/rest"
            })))
            .mount(&server)
            .await;

        client
            .remove_label(PullRequestNumber(1), "size/XS")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn remove_label_failure() {
        let (server, client) = create_client().await;
        Mock::given(method("DELETE"))
            .and(path("/repos/owner/name/issues/1/labels/size%2FXS"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "message": "Resource not accessible by integration",
                "documentation_url": "https://docs.github.com/rest"
            })))
            .mount(&server)
            .await;

        assert!(client
            .remove_label(PullRequestNumber(1), "size/XS")
            .await
            .is_err());
    }
}
