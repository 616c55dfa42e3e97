use std::sync::Arc;

use tracing::Instrument;

use crate::sizer::event::SizeBotEvent;
use crate::sizer::handlers::pr_events::handle_pull_request;
use crate::sizer::{RepositoryClient, SizeBotContext, SizeBotState};

mod pr_events;

/// This function executes a single bot event
pub async fn handle_sizer_event<Client: RepositoryClient>(
    event: SizeBotEvent,
    state: Arc<dyn SizeBotState<Client>>,
    ctx: Arc<SizeBotContext>,
) -> anyhow::Result<()> {
    match event {
        SizeBotEvent::PullRequest(payload) => {
            let span = tracing::info_span!(
                "PullRequest",
                pr = format!("{}#{}", payload.repository, payload.number),
                action = ?payload.action
            );
            handle_pull_request(state.as_ref(), &ctx, payload)
                .instrument(span)
                .await?;
        }
        SizeBotEvent::InstallationsChanged => {
            let span = tracing::info_span!("Installations changed");
            tracing::info!(parent: &span, "Reloading installation repositories");
            state.reload_repositories().instrument(span).await?;
        }
    }
    Ok(())
}
