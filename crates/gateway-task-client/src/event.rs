use crate::content::{NormalizedMessage, ProgressPayload};
use crate::errors::TaskFailure;
use crate::model::TaskId;

/// Lifecycle events delivered by `TaskRun`.
///
/// A run yields any number of `Progress` events followed by exactly one
/// terminal event (`Completed` or `Failed`), unless it is cancelled first, in
/// which case the sequence just ends.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// Intermediate update, passed through un-normalized.
    Progress { task_id: TaskId, raw: ProgressPayload },
    /// Terminal success.
    Completed {
        task_id: TaskId,
        message: NormalizedMessage,
    },
    /// Terminal failure. `task_id` is `None` when the task never got one.
    Failed {
        task_id: Option<TaskId>,
        reason: TaskFailure,
    },
}

impl LifecycleEvent {
    /// Returns `true` for `Completed` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }

    /// Returns the task this event belongs to, when known.
    pub fn task_id(&self) -> Option<&TaskId> {
        match self {
            Self::Progress { task_id, .. } | Self::Completed { task_id, .. } => Some(task_id),
            Self::Failed { task_id, .. } => task_id.as_ref(),
        }
    }
}
