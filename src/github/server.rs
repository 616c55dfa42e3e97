use std::future::Future;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use tokio::sync::mpsc;
use tower::limit::ConcurrencyLimitLayer;
use tracing::Instrument;

use crate::github::webhook::{GitHubWebhook, WebhookSecret};
use crate::sizer::event::SizeBotEvent;
use crate::sizer::{handle_sizer_event, RepositoryClient, SizeBotContext, SizeBotState};
use crate::utils::logging::LogError;

/// Shared server state for all axum handlers.
pub struct ServerState {
    webhook_sender: WebhookSender,
    webhook_secret: WebhookSecret,
}

impl ServerState {
    pub fn new(webhook_sender: WebhookSender, webhook_secret: WebhookSecret) -> Self {
        Self {
            webhook_sender,
            webhook_secret,
        }
    }

    pub fn get_webhook_secret(&self) -> &WebhookSecret {
        &self.webhook_secret
    }
}

pub type ServerStateRef = Arc<ServerState>;

pub fn create_app(state: ServerState) -> Router {
    Router::new()
        .route("/github", post(github_webhook_handler))
        .route("/health", get(health_handler))
        .layer(ConcurrencyLimitLayer::new(100))
        .with_state(Arc::new(state))
}

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "")
}

/// Axum handler that receives a webhook and sends it to a webhook channel.
pub async fn github_webhook_handler(
    State(state): State<ServerStateRef>,
    GitHubWebhook(event): GitHubWebhook,
) -> impl IntoResponse {
    match state.webhook_sender.send(event).await {
        Ok(_) => (StatusCode::OK, ""),
        Err(err) => {
            tracing::error!("Could not send webhook event: {err:?}");
            (StatusCode::INTERNAL_SERVER_ERROR, "")
        }
    }
}

pub type WebhookSender = mpsc::Sender<SizeBotEvent>;

/// Creates a future with a process that continuously receives webhook events and reacts to them.
///
/// Every event is handled in its own task, so that a slow GitHub API call for one pull request
/// does not hold back the others.
pub fn create_size_bot_process<Client: RepositoryClient + 'static>(
    state: Arc<dyn SizeBotState<Client>>,
    ctx: SizeBotContext,
) -> (WebhookSender, impl Future<Output = ()>) {
    let (tx, mut rx) = mpsc::channel::<SizeBotEvent>(1024);

    let service = async move {
        let ctx = Arc::new(ctx);
        while let Some(event) = rx.recv().await {
            tracing::trace!("Received webhook: {event:#?}");

            let state = Arc::clone(&state);
            let ctx = Arc::clone(&ctx);
            tokio::spawn(async move {
                let span = tracing::info_span!("SizeBotEvent");
                if let Err(error) = handle_sizer_event(event, state, ctx)
                    .instrument(span.clone())
                    .await
                {
                    span.log_error(error);
                }
            });
        }
    };
    (tx, service)
}
