use itertools::Itertools;

use crate::github::PullRequestNumber;
use crate::sizer::error::HandleError;
use crate::sizer::label::SizeLabel;
use crate::sizer::LabelMutator;

/// Label changes required to leave exactly one (correct) size label on a PR.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct LabelPlan {
    pub remove: Vec<SizeLabel>,
    pub add: Option<SizeLabel>,
}

impl LabelPlan {
    /// Computes the plan from the labels currently attached to the PR.
    pub fn new(target: SizeLabel, current_labels: &[String]) -> Self {
        if current_labels
            .iter()
            .any(|label| SizeLabel::parse(label) == Some(target))
        {
            return Self::default();
        }
        let remove = current_labels
            .iter()
            .filter_map(|label| SizeLabel::parse(label))
            .sorted()
            .dedup()
            .collect();
        Self {
            remove,
            add: Some(target),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.remove.is_empty() && self.add.is_none()
    }
}

/// Applies the plan, stopping at the first failed operation.
///
/// Removals that already succeeded are not reverted, the next event for the PR converges the
/// label set again.
pub async fn apply_label_plan<Client: LabelMutator + ?Sized>(
    client: &Client,
    pr: PullRequestNumber,
    plan: &LabelPlan,
) -> Result<(), HandleError> {
    for label in &plan.remove {
        tracing::info!("Removing stale label {label}");
        client
            .remove_label(pr, label.as_str())
            .await
            .map_err(|source| HandleError::LabelMutation {
                operation: "remove",
                label: *label,
                source,
            })?;
    }
    if let Some(label) = plan.add {
        tracing::info!("Adding label {label}");
        client
            .add_label(pr, label.as_str())
            .await
            .map_err(|source| HandleError::LabelMutation {
                operation: "add",
                label,
                source,
            })?;
    }
    Ok(())
}
