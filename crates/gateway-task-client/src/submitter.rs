use std::sync::Arc;

use tracing::{debug, warn};

use crate::errors::SubmitError;
use crate::gateway::GatewayTransport;
use crate::model::{ObservationMode, Submission, TaskId};
use crate::normalizer::extract_task_id;

/// Sends a prompt to the gateway and extracts the id of the created task.
///
/// Exactly one request is made per call. Nothing is retried: a second
/// request could create a duplicate task.
#[derive(Clone)]
pub struct TaskSubmitter {
    gateway: Arc<dyn GatewayTransport>,
    mode: ObservationMode,
}

impl TaskSubmitter {
    /// Creates a submitter that sends in the wire format of `mode`.
    pub fn new(gateway: Arc<dyn GatewayTransport>, mode: ObservationMode) -> Self {
        Self { gateway, mode }
    }

    /// Submits `text` and returns the new task's id.
    pub async fn submit(&self, text: &str) -> Result<TaskId, SubmitError> {
        if text.trim().is_empty() {
            return Err(SubmitError::Validation("text must not be empty".into()));
        }

        let submission = Submission::new(text, self.mode);
        let reply = self.gateway.submit(&submission).await?;
        let elapsed_ms = (chrono::Utc::now() - submission.submitted_at).num_milliseconds();

        if !reply.is_success() {
            warn!(status = reply.status_code, elapsed_ms, "task submission rejected");
            return Err(SubmitError::SubmissionFailed {
                status_code: reply.status_code,
                body: reply.body,
            });
        }

        match extract_task_id(&reply.body) {
            Some(task_id) => {
                debug!(task_id = %task_id, mode = %self.mode, elapsed_ms, "task submitted");
                Ok(task_id)
            }
            None => Err(SubmitError::NoTaskId { body: reply.body }),
        }
    }
}
