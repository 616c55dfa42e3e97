use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use size_bot::config::{SizeConfig, DEFAULT_CONFIG_FILE_PATH};
use size_bot::github::api::client::GithubRepositoryClient;
use size_bot::github::server::{create_app, create_size_bot_process, ServerState};
use size_bot::github::{GithubAppState, WebhookSecret};
use size_bot::sizer::{SizeBotContext, SizeBotState};
use size_bot::utils::logging::init_logging;

#[derive(clap::Parser)]
struct Opts {
    /// Secret used to authenticate webhooks.
    #[arg(long, env = "WEBHOOK_SECRET")]
    webhook_secret: String,

    /// Github App ID.
    #[arg(long, env = "APP_ID")]
    app_id: u64,

    /// Private key used to authenticate as a Github App.
    #[arg(long, env = "PRIVATE_KEY")]
    private_key: String,

    /// Path to the file with size thresholds of repositories.
    #[arg(long, env = "SIZE_BOT_CONFIG", default_value = DEFAULT_CONFIG_FILE_PATH)]
    config: PathBuf,

    /// Port on which the webhook server listens.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,
}

async fn server(state: ServerState, port: u16) -> anyhow::Result<()> {
    let app = create_app(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Cannot bind to {addr}"))?;
    tracing::info!("Listening on {addr}");

    axum::serve(listener, app).await?;
    Ok(())
}

fn try_main(opts: Opts) -> anyhow::Result<()> {
    // Invalid thresholds must stop the bot before it handles any event.
    let config = SizeConfig::load(&opts.config)
        .with_context(|| format!("Cannot load config from {:?}", opts.config))?;
    if config.is_empty() {
        tracing::warn!("No repository is configured, all events will be rejected");
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Cannot build tokio runtime")?;

    let app_state = runtime.block_on(GithubAppState::load(
        opts.app_id.into(),
        opts.private_key.into_bytes().into(),
    ))?;
    tracing::info!("Loaded {} repositories", app_state.repository_count());

    let app_state: Arc<dyn SizeBotState<GithubRepositoryClient>> = Arc::new(app_state);
    let (tx, size_bot_process) = create_size_bot_process(app_state, SizeBotContext::new(config));

    let state = ServerState::new(tx, WebhookSecret::new(opts.webhook_secret));
    let server_process = server(state, opts.port);

    runtime.block_on(async move {
        tokio::select! {
            () = size_bot_process => {
                tracing::warn!("Size bot process has ended");
                Ok(())
            },
            res = server_process => {
                tracing::warn!("Server has ended: {res:?}");
                res
            }
        }
    })?;

    Ok(())
}

fn main() {
    init_logging();

    let opts = Opts::parse();
    if let Err(error) = try_main(opts) {
        eprintln!("Error: {error:?}");
        std::process::exit(1);
    }
}
