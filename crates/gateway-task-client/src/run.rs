use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::StreamExt as _;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::content::NormalizedMessage;
use crate::errors::ClientError;
use crate::event::LifecycleEvent;
use crate::gateway::GatewayTransport;
use crate::model::TaskId;
use crate::observer::{
    CancelSignal, EventSink, ObservationHandle, ObservationOutcome, build_observer,
};
use crate::submitter::TaskSubmitter;

/// Handle used to cancel a run from anywhere.
#[derive(Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    /// Requests cancellation.
    ///
    /// Nothing is delivered after this returns, including events already
    /// buffered. Cancelling a finished run does nothing.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Returns `true` once `cancel` was called.
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Event sequence of one submitted task, returned by `TaskClient::run`.
///
/// Yields `Progress` events followed by exactly one `Completed` or `Failed`,
/// then `None`. After cancellation it yields `None` right away. Dropping the
/// run cancels it.
pub struct TaskRun {
    run_id: uuid::Uuid,
    rx: mpsc::Receiver<LifecycleEvent>,
    task_id_rx: watch::Receiver<Option<TaskId>>,
    cancel: CancelHandle,
    done: bool,
}

/// Run-task side of a `TaskRun`.
pub(crate) struct RunWiring {
    pub(crate) sink: EventSink,
    pub(crate) cancel: CancelSignal,
    pub(crate) task_id_tx: watch::Sender<Option<TaskId>>,
}

impl TaskRun {
    pub(crate) fn channel(capacity: usize) -> (Self, RunWiring) {
        let (tx, rx) = mpsc::channel(capacity);
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (task_id_tx, task_id_rx) = watch::channel(None);
        let cancel = CancelSignal::new(cancel_rx);
        let run = Self {
            run_id: uuid::Uuid::new_v4(),
            rx,
            task_id_rx,
            cancel: CancelHandle {
                tx: Arc::new(cancel_tx),
            },
            done: false,
        };
        let wiring = RunWiring {
            sink: EventSink::new(tx, cancel.clone()),
            cancel,
            task_id_tx,
        };
        (run, wiring)
    }

    /// Client-side id of this run, used in logs.
    pub fn run_id(&self) -> uuid::Uuid {
        self.run_id
    }

    /// Gateway task id, once the submission was accepted.
    pub fn task_id(&self) -> Option<TaskId> {
        self.task_id_rx.borrow().clone()
    }

    /// Returns a handle that can cancel the run from another task.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Cancels the run and drops anything still buffered.
    pub fn cancel(&mut self) {
        self.cancel.cancel();
        self.rx.close();
        self.done = true;
    }

    /// Waits for the next event.
    ///
    /// Returns `None` after the terminal event or once the run was cancelled.
    pub async fn next_event(&mut self) -> Option<LifecycleEvent> {
        self.next().await
    }

    /// Drains the run and returns the completed message.
    ///
    /// Progress events are skipped.
    pub async fn collect_message(mut self) -> Result<NormalizedMessage, ClientError> {
        while let Some(event) = self.next_event().await {
            match event {
                LifecycleEvent::Progress { .. } => {}
                LifecycleEvent::Completed { message, .. } => return Ok(message),
                LifecycleEvent::Failed { reason, .. } => return Err(ClientError::RunFailed(reason)),
            }
        }
        if self.cancel.is_cancelled() {
            Err(ClientError::Cancelled)
        } else {
            Err(ClientError::Protocol(format!(
                "run {} ended without a terminal event",
                self.run_id
            )))
        }
    }
}

impl futures::Stream for TaskRun {
    type Item = LifecycleEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }
        if this.cancel.is_cancelled() {
            this.cancel();
            return Poll::Ready(None);
        }
        match this.rx.poll_recv(cx) {
            Poll::Ready(Some(_)) if this.cancel.is_cancelled() => {
                this.cancel();
                Poll::Ready(None)
            }
            Poll::Ready(Some(event)) => {
                if event.is_terminal() {
                    this.done = true;
                }
                Poll::Ready(Some(event))
            }
            Poll::Ready(None) => {
                this.done = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for TaskRun {
    fn drop(&mut self) {
        if !self.done {
            self.cancel.cancel();
        }
    }
}

/// Submits `text`, then observes the created task until it ends.
pub(crate) async fn run_task(
    gateway: Arc<dyn GatewayTransport>,
    config: ClientConfig,
    text: String,
    wiring: RunWiring,
) -> ObservationOutcome {
    let RunWiring {
        sink,
        mut cancel,
        task_id_tx,
    } = wiring;

    let submitter = TaskSubmitter::new(gateway.clone(), config.mode);
    let submitted = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            debug!("run cancelled during submission");
            return ObservationOutcome::Cancelled;
        }
        submitted = submitter.submit(&text) => submitted,
    };

    let task_id = match submitted {
        Ok(task_id) => task_id,
        Err(err) => {
            warn!(error = %err, "task submission failed");
            return sink
                .finish(
                    LifecycleEvent::Failed {
                        task_id: None,
                        reason: err.into(),
                    },
                    ObservationOutcome::Failed,
                )
                .await;
        }
    };
    task_id_tx.send_replace(Some(task_id.clone()));

    let observer = build_observer(gateway, &config);
    info!(task_id = %task_id, mode = %observer.mode(), "observing task");
    let outcome = ObservationHandle::start(observer, task_id.clone(), sink.clone(), cancel)
        .finished(&sink)
        .await;
    info!(task_id = %task_id, outcome = ?outcome, "run finished");
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::TaskFailure;

    #[tokio::test]
    async fn collect_message_skips_progress() {
        let (run, wiring) = TaskRun::channel(8);
        let task_id = TaskId::new("t-1");
        assert!(
            wiring
                .sink
                .emit(LifecycleEvent::Progress {
                    task_id: task_id.clone(),
                    raw: crate::content::ProgressPayload::Text("tick".into()),
                })
                .await
        );
        assert!(
            wiring
                .sink
                .emit(LifecycleEvent::Completed {
                    task_id,
                    message: NormalizedMessage::agent("hello"),
                })
                .await
        );
        drop(wiring);
        assert_eq!(
            run.collect_message().await,
            Ok(NormalizedMessage::agent("hello"))
        );
    }

    #[tokio::test]
    async fn collect_message_surfaces_failures_and_protocol_gaps() {
        let (run, wiring) = TaskRun::channel(8);
        wiring
            .sink
            .emit(LifecycleEvent::Failed {
                task_id: None,
                reason: TaskFailure::StreamClosed,
            })
            .await;
        assert_eq!(
            run.collect_message().await,
            Err(ClientError::RunFailed(TaskFailure::StreamClosed))
        );

        let (run, wiring) = TaskRun::channel(8);
        drop(wiring);
        assert!(matches!(
            run.collect_message().await,
            Err(ClientError::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn cancellation_discards_buffered_events() {
        let (mut run, wiring) = TaskRun::channel(8);
        for n in 0..3 {
            wiring
                .sink
                .emit(LifecycleEvent::Progress {
                    task_id: TaskId::new("t-1"),
                    raw: crate::content::ProgressPayload::Text(n.to_string()),
                })
                .await;
        }
        let handle = run.cancel_handle();
        handle.cancel();

        assert!(handle.is_cancelled());
        assert_eq!(run.next_event().await, None);
        assert!(
            !wiring
                .sink
                .emit(LifecycleEvent::Failed {
                    task_id: None,
                    reason: TaskFailure::StreamClosed,
                })
                .await
        );
        assert_eq!(run.next_event().await, None);
    }

    #[tokio::test]
    async fn nothing_follows_the_terminal_event() {
        let (mut run, wiring) = TaskRun::channel(8);
        wiring
            .sink
            .emit(LifecycleEvent::Failed {
                task_id: None,
                reason: TaskFailure::Validation("empty".into()),
            })
            .await;
        wiring
            .sink
            .emit(LifecycleEvent::Failed {
                task_id: None,
                reason: TaskFailure::StreamClosed,
            })
            .await;
        assert!(matches!(
            run.next_event().await,
            Some(LifecycleEvent::Failed { reason: TaskFailure::Validation(_), .. })
        ));
        assert_eq!(run.next_event().await, None);
    }

    #[tokio::test]
    async fn dropping_the_run_cancels_it() {
        let (run, wiring) = TaskRun::channel(8);
        let handle = run.cancel_handle();
        drop(run);
        assert!(handle.is_cancelled());
        assert!(wiring.cancel.is_cancelled());
    }
}
