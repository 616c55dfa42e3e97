use crate::sizer::event::PullRequestEvent;
use crate::sizer::reconcile::{apply_label_plan, LabelPlan};
use crate::sizer::{
    total_change_count, HandleError, RepositoryClient, SizeBotContext, SizeBotState,
};

/// Recomputes the size of a pull request and fixes its size label.
pub(super) async fn handle_pull_request<Client: RepositoryClient>(
    state: &dyn SizeBotState<Client>,
    ctx: &SizeBotContext,
    payload: PullRequestEvent,
) -> Result<(), HandleError> {
    if !payload.action.affects_size() {
        tracing::info!("Pull request was not opened or pushed to, skipping");
        return Ok(());
    }

    let policy = ctx.config.policy_for(&payload.repository)?;
    let repo = state
        .get_repo_state(&payload.repository)
        .ok_or_else(|| HandleError::RepositoryNotFound(payload.repository.clone()))?;

    let changes = repo
        .client
        .get_pull_request_changes(payload.number)
        .await
        .map_err(|source| HandleError::Fetch {
            pr: format!("{}#{}", repo.client.repository(), payload.number),
            source,
        })?;
    let count = total_change_count(&changes);
    let label = policy.classify(count);
    tracing::debug!(
        "{} file(s) changed, {count} line(s) in total, size is {label}",
        changes.len()
    );

    let plan = LabelPlan::new(label, &payload.labels);
    if plan.is_noop() {
        tracing::debug!("PR is already labeled with {label}");
        return Ok(());
    }
    apply_label_plan(&repo.client, payload.number, &plan).await
}
