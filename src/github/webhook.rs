use axum::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use crate::github::server::ServerStateRef;
use crate::github::{GithubRepoName, PullRequestNumber};
use crate::sizer::event::{PullRequestAction, PullRequestEvent, SizeBotEvent};

/// GitHub caps webhook payloads at 25 MiB.
const MAX_WEBHOOK_BODY_SIZE: usize = 25 * 1024 * 1024;

// The wrappers below only deserialize the fields the bot needs, so that they do not break
// on payload fields that octocrab models do not know about.
#[derive(serde::Deserialize, Debug)]
struct WebhookOwner {
    login: String,
}

#[derive(serde::Deserialize, Debug)]
struct WebhookRepository {
    name: String,
    owner: Option<WebhookOwner>,
}

#[derive(serde::Deserialize, Debug)]
struct WebhookLabel {
    name: String,
}

#[derive(serde::Deserialize, Debug)]
struct WebhookPullRequestInner {
    #[serde(default)]
    labels: Vec<WebhookLabel>,
}

#[derive(serde::Deserialize, Debug)]
struct WebhookPullRequest {
    action: String,
    number: u64,
    pull_request: WebhookPullRequestInner,
    repository: WebhookRepository,
}

/// axum extractor for GitHub webhook events.
#[derive(Debug)]
pub struct GitHubWebhook(pub SizeBotEvent);

/// Extracts a webhook event from a HTTP request.
#[async_trait]
impl FromRequest<ServerStateRef> for GitHubWebhook {
    type Rejection = StatusCode;

    async fn from_request(
        request: Request,
        state: &ServerStateRef,
    ) -> Result<Self, Self::Rejection> {
        let (parts, body) = request.into_parts();

        // Eagerly load body
        let body: Bytes = axum::body::to_bytes(body, MAX_WEBHOOK_BODY_SIZE)
            .await
            .map_err(|error| {
                tracing::error!("Parsing webhook body failed: {error:?}");
                StatusCode::BAD_REQUEST
            })?;

        // Verify that the request is valid
        if !verify_gh_signature(&parts.headers, &body, state.get_webhook_secret()) {
            tracing::error!("Webhook request failed, could not authenticate webhook");
            return Err(StatusCode::BAD_REQUEST);
        }

        // Parse webhook content
        match parse_webhook_event(&parts.headers, &body) {
            Ok(Some(event)) => Ok(GitHubWebhook(event)),
            Ok(None) => Err(StatusCode::OK),
            Err(error) => {
                tracing::error!("Cannot parse webhook event: {error:?}");
                Err(StatusCode::BAD_REQUEST)
            }
        }
    }
}

fn parse_webhook_event(headers: &HeaderMap, body: &[u8]) -> anyhow::Result<Option<SizeBotEvent>> {
    let Some(event_type) = headers.get("x-github-event") else {
        return Err(anyhow::anyhow!("x-github-event header not found"));
    };

    match event_type.as_bytes() {
        b"pull_request" => {
            let payload: WebhookPullRequest = serde_json::from_slice(body)?;
            let repository = parse_repository_name(&payload.repository)?;
            Ok(Some(SizeBotEvent::PullRequest(PullRequestEvent {
                repository,
                number: PullRequestNumber(payload.number),
                action: PullRequestAction::from_github(&payload.action),
                labels: payload
                    .pull_request
                    .labels
                    .into_iter()
                    .map(|label| label.name)
                    .collect(),
            })))
        }
        b"installation_repositories" | b"installation" => {
            Ok(Some(SizeBotEvent::InstallationsChanged))
        }
        _ => {
            tracing::debug!("Ignoring unknown event type {:?}", event_type.to_str());
            Ok(None)
        }
    }
}

fn parse_repository_name(repository: &WebhookRepository) -> anyhow::Result<GithubRepoName> {
    let repo_name = &repository.name;
    let Some(repo_owner) = repository.owner.as_ref().map(|u| &u.login) else {
        return Err(anyhow::anyhow!("Owner for repo {repo_name} is missing"));
    };
    Ok(GithubRepoName::new(repo_owner, repo_name))
}

type HmacSha256 = Hmac<Sha256>;

/// Verifies that the request is properly signed by GitHub with SHA-256 and the passed `secret`.
fn verify_gh_signature(
    headers: &HeaderMap<HeaderValue>,
    body: &[u8],
    secret: &WebhookSecret,
) -> bool {
    let Some(signature) = headers.get("x-hub-signature-256").map(|v| v.as_bytes()) else {
        return false;
    };
    let Some(signature) = signature
        .strip_prefix(b"sha256=")
        .and_then(|v| hex::decode(v).ok())
    else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.expose().as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&signature).is_ok()
}

/// Wrapper for a secret which is zeroed on drop and can be exposed only through the [`WebhookSecret::expose`] method.
pub struct WebhookSecret(SecretString);

impl WebhookSecret {
    pub fn new(secret: String) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret().as_str()
    }
}
