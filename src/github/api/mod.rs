use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use anyhow::Context;
use axum::async_trait;
use octocrab::models::{AppId, InstallationId};
use octocrab::Octocrab;
use secrecy::{ExposeSecret, SecretVec};
use serde::de::DeserializeOwned;

use client::GithubRepositoryClient;

use crate::github::GithubRepoName;
use crate::sizer::{RepositoryState, SizeBotState};

pub mod client;

type GithubRepositoryState = RepositoryState<GithubRepositoryClient>;

type RepositoryMap = HashMap<GithubRepoName, Arc<GithubRepositoryState>>;

/// Provides access to managed GitHub repositories.
pub struct GithubAppState {
    client: Octocrab,
    repositories: RwLock<Arc<RepositoryMap>>,
}

impl GithubAppState {
    /// Loads repositories managed by the GitHub app with the given ID.
    pub async fn load(app_id: AppId, private_key: SecretVec<u8>) -> anyhow::Result<GithubAppState> {
        let key = jsonwebtoken::EncodingKey::from_rsa_pem(private_key.expose_secret().as_ref())
            .context("Could not encode private key")?;

        let client = Octocrab::builder()
            .app(app_id, key)
            .build()
            .context("Could not create octocrab builder")?;

        let app = client
            .current()
            .app()
            .await
            .context("Could not load Github App")?;
        tracing::info!("Authenticated as GitHub App {}", app.name);

        let repositories = load_repositories(&client).await?;
        Ok(GithubAppState {
            client,
            repositories: RwLock::new(Arc::new(repositories)),
        })
    }

    pub fn repository_count(&self) -> usize {
        self.repositories.read().unwrap().len()
    }
}

/// Maximum page size of the GitHub REST API.
const PER_PAGE: usize = 100;

#[derive(serde::Serialize)]
struct PageParams {
    per_page: usize,
    page: u32,
}

/// Downloads pages of a list endpoint until a short page is returned or `max_pages` is reached.
async fn get_all_pages<Page, Item>(
    client: &Octocrab,
    route: &str,
    max_pages: u32,
) -> octocrab::Result<Vec<Item>>
where
    Page: DeserializeOwned + IntoIterator<Item = Item>,
{
    let mut items = Vec::new();
    for page in 1..=max_pages {
        let page_items: Vec<Item> = client
            .get::<Page, _, _>(
                route,
                Some(&PageParams {
                    per_page: PER_PAGE,
                    page,
                }),
            )
            .await?
            .into_iter()
            .collect();
        let last_page = page_items.len() < PER_PAGE;
        items.extend(page_items);
        if last_page {
            break;
        }
    }
    Ok(items)
}

#[derive(serde::Deserialize, Debug)]
struct AppInstallation {
    id: InstallationId,
    repositories_url: Option<String>,
}

#[derive(serde::Deserialize, Debug)]
struct RepositoryOwner {
    login: String,
}

#[derive(serde::Deserialize, Debug)]
struct InstallationRepository {
    name: String,
    owner: Option<RepositoryOwner>,
}

/// Body of the "list repositories accessible to the app installation" endpoint.
#[derive(serde::Deserialize, Debug)]
struct InstallationRepositoryPage {
    repositories: Vec<InstallationRepository>,
}

impl IntoIterator for InstallationRepositoryPage {
    type Item = InstallationRepository;
    type IntoIter = std::vec::IntoIter<InstallationRepository>;

    fn into_iter(self) -> Self::IntoIter {
        self.repositories.into_iter()
    }
}

/// Lists all installations of the GitHub App.
async fn list_installations(client: &Octocrab) -> anyhow::Result<Vec<AppInstallation>> {
    // https://docs.github.com/en/rest/apps/apps?apiVersion=2022-11-28#list-installations-for-the-authenticated-app
    get_all_pages::<Vec<AppInstallation>, _>(client, "/app/installations", u32::MAX)
        .await
        .context("Could not load app installations")
}

/// Lists all repositories accessible to a single installation.
async fn list_installation_repositories(
    installation_client: &Octocrab,
    repositories_url: &str,
) -> anyhow::Result<Vec<InstallationRepository>> {
    get_all_pages::<InstallationRepositoryPage, _>(
        installation_client,
        repositories_url,
        u32::MAX,
    )
    .await
    .with_context(|| format!("Could not list repositories from {repositories_url}"))
}

/// Loads repositories that are connected to the given GitHub App client.
pub async fn load_repositories(client: &Octocrab) -> anyhow::Result<RepositoryMap> {
    let installations = list_installations(client).await?;

    let mut repositories = HashMap::default();
    for installation in installations {
        let Some(ref repositories_url) = installation.repositories_url else {
            continue;
        };
        let installation_client = client.installation(installation.id);

        let repos =
            match list_installation_repositories(&installation_client, repositories_url).await {
                Ok(repos) => repos,
                Err(error) => {
                    tracing::error!(
                        "Could not load repositories of installation {}: {error:?}",
                        installation.id
                    );
                    continue;
                }
            };
        for repo in repos {
            let repo_state = match create_repo_state(installation_client.clone(), &repo) {
                Ok(repo_state) => repo_state,
                Err(error) => {
                    tracing::error!("Could not load repository {}: {error:?}", repo.name);
                    continue;
                }
            };
            tracing::info!("Loaded repository {}", repo_state.repository);

            if let Some(existing) =
                repositories.insert(repo_state.repository.clone(), Arc::new(repo_state))
            {
                return Err(anyhow::anyhow!(
                    "Repository {} found in multiple installations!",
                    existing.repository
                ));
            }
        }
    }
    Ok(repositories)
}

fn create_repo_state(
    repo_client: Octocrab,
    repo: &InstallationRepository,
) -> anyhow::Result<GithubRepositoryState> {
    let Some(owner) = repo.owner.as_ref() else {
        return Err(anyhow::anyhow!("Repository {} has no owner", repo.name));
    };

    let name = GithubRepoName::new(&owner.login, &repo.name);
    let client = GithubRepositoryClient::new(repo_client, name.clone());

    Ok(RepositoryState {
        repository: name,
        client,
    })
}

#[async_trait]
impl SizeBotState<GithubRepositoryClient> for GithubAppState {
    fn get_repo_state(&self, repo: &GithubRepoName) -> Option<Arc<GithubRepositoryState>> {
        self.repositories.read().unwrap().get(repo).map(Arc::clone)
    }

    /// Re-download information about repositories connected to this GitHub app.
    async fn reload_repositories(&self) -> anyhow::Result<()> {
        let repositories = load_repositories(&self.client).await?;
        tracing::info!("Reloaded {} repositories", repositories.len());
        *self.repositories.write().unwrap() = Arc::new(repositories);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use octocrab::Octocrab;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::{create_repo_state, list_installation_repositories, list_installations};
    use crate::github::GithubRepoName;

    async fn create_client() -> (MockServer, Octocrab) {
        let mock_server = MockServer::start().await;
        let octocrab = Octocrab::builder()
            .base_uri(mock_server.uri())
            .unwrap()
            .build()
            .unwrap();
        (mock_server, octocrab)
    }

    fn repository(owner: &str, name: &str) -> serde_json::Value {
        json!({
            "id": 1,
            "name": name,
            "full_name": format!("{owner}/{name}"),
            "owner": { "login": owner, "id": 2 },
            "private": false,
        })
    }

    #[tokio::test]
    async fn list_repositories_of_large_installation() {
        let (server, client) = create_client().await;
        let first_page: Vec<_> = (0..100)
            .map(|i| repository("org", &format!("repo-{i}")))
            .collect();
        Mock::given(method("GET"))
            .and(path("/installation/repositories"))
            .and(query_param("page", "1"))
            .and(query_param("per_page", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total_count": 101,
                "repositories": first_page,
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/installation/repositories"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total_count": 101,
                "repositories": [repository("org", "last")],
            })))
            .expect(1)
            .mount(&server)
            .await;

        let repos = list_installation_repositories(&client, "/installation/repositories")
            .await
            .unwrap();
        assert_eq!(repos.len(), 101);

        let last = repos.last().unwrap();
        let state = create_repo_state(client.clone(), last).unwrap();
        assert_eq!(state.repository, GithubRepoName::new("org", "last"));
    }

    #[tokio::test]
    async fn list_installations_pages() {
        let (server, client) = create_client().await;
        let first_page: Vec<_> = (0..100)
            .map(|i| {
                json!({
                    "id": i,
                    "repositories_url": "https://api.github.com/installation/repositories",
                })
            })
            .collect();
        Mock::given(method("GET"))
            .and(path("/app/installations"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(first_page))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/app/installations"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 100 }])))
            .expect(1)
            .mount(&server)
            .await;

        let installations = list_installations(&client).await.unwrap();
        assert_eq!(installations.len(), 101);
        assert!(installations[100].repositories_url.is_none());
    }

    #[tokio::test]
    async fn repository_without_owner_is_rejected() {
        let (server, client) = create_client().await;
        Mock::given(method("GET"))
            .and(path("/installation/repositories"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total_count": 1,
                "repositories": [{ "name": "orphan" }],
            })))
            .mount(&server)
            .await;

        let repos = list_installation_repositories(&client, "/installation/repositories")
            .await
            .unwrap();
        assert!(create_repo_state(client.clone(), &repos[0]).is_err());
    }
}
