//! Observation strategies: how a submitted task is watched until it ends.
//!
//! Both strategies implement `ObservationStrategy` and are picked once per
//! task from `ObservationMode`.
mod poll;
mod stream;

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{Instrument as _, warn};

pub use poll::PollObserver;
pub use stream::StreamObserver;

use crate::config::ClientConfig;
use crate::errors::TaskFailure;
use crate::event::LifecycleEvent;
use crate::gateway::GatewayTransport;
use crate::model::{ObservationMode, TaskId};

/// How an observation ended.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ObservationOutcome {
    /// A `Completed` event was delivered.
    Completed,
    /// A `Failed` event was delivered.
    Failed,
    /// Cancellation was requested; nothing more was delivered.
    Cancelled,
    /// The consumer dropped its end of the event channel.
    ConsumerGone,
}

/// Cooperative cancellation signal shared by a run and its observer.
#[derive(Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    pub(crate) fn new(rx: watch::Receiver<bool>) -> Self {
        Self { rx }
    }

    /// Returns `true` once cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves when cancellation is requested.
    ///
    /// Never resolves if every cancel handle is dropped without cancelling.
    pub async fn cancelled(&mut self) {
        if self.rx.wait_for(|cancelled| *cancelled).await.is_err() {
            futures::future::pending::<()>().await;
        }
    }
}

/// Delivery side of a run's event channel.
///
/// Refuses to deliver anything once cancellation is visible, so late probe or
/// frame results can never reach the consumer.
#[derive(Clone)]
pub struct EventSink {
    tx: mpsc::Sender<LifecycleEvent>,
    cancel: CancelSignal,
}

impl EventSink {
    pub(crate) fn new(tx: mpsc::Sender<LifecycleEvent>, cancel: CancelSignal) -> Self {
        Self { tx, cancel }
    }

    /// Delivers an event. Returns `false` if it was discarded.
    ///
    /// A send blocked on a full buffer gives up as soon as cancellation is
    /// requested, so the caller can release its connection or timer.
    pub async fn emit(&self, event: LifecycleEvent) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        let mut cancel = self.cancel.clone();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            sent = self.tx.send(event) => sent.is_ok(),
        }
    }

    /// Delivers a terminal event and maps the result to an outcome.
    pub(crate) async fn finish(
        &self,
        event: LifecycleEvent,
        delivered: ObservationOutcome,
    ) -> ObservationOutcome {
        if self.emit(event).await {
            delivered
        } else {
            self.undelivered()
        }
    }

    /// Outcome to report after `emit` returned `false`.
    pub(crate) fn undelivered(&self) -> ObservationOutcome {
        if self.cancel.is_cancelled() {
            ObservationOutcome::Cancelled
        } else {
            ObservationOutcome::ConsumerGone
        }
    }
}

/// Watches one task until a terminal event, cancellation, or consumer loss.
///
/// Implementations must emit at most one terminal event, stop right after it,
/// and release their timer or connection on every return path.
#[async_trait::async_trait]
pub trait ObservationStrategy: Send + Sync {
    /// Strategy identifier for logs.
    fn mode(&self) -> ObservationMode;

    /// Runs the observation loop.
    async fn observe(
        &self,
        task_id: &TaskId,
        sink: &EventSink,
        cancel: &mut CancelSignal,
    ) -> ObservationOutcome;
}

/// Builds the strategy configured for `config.mode`.
pub fn build_observer(
    gateway: Arc<dyn GatewayTransport>,
    config: &ClientConfig,
) -> Box<dyn ObservationStrategy> {
    match config.mode {
        ObservationMode::Poll => Box::new(PollObserver::new(gateway, config)),
        ObservationMode::Stream => Box::new(StreamObserver::new(gateway, config)),
    }
}

/// One active observation. Dropping the handle aborts the observer task, so
/// its timer or connection cannot outlive the run.
pub(crate) struct ObservationHandle {
    task_id: TaskId,
    join: JoinHandle<ObservationOutcome>,
}

impl ObservationHandle {
    pub(crate) fn start(
        strategy: Box<dyn ObservationStrategy>,
        task_id: TaskId,
        sink: EventSink,
        mut cancel: CancelSignal,
    ) -> Self {
        let observed = task_id.clone();
        let join = tokio::spawn(
            async move { strategy.observe(&observed, &sink, &mut cancel).await }.in_current_span(),
        );
        Self { task_id, join }
    }

    /// Waits for the observer to end. A panicked observer is reported as a
    /// failed task so the consumer still sees a terminal event.
    pub(crate) async fn finished(mut self, sink: &EventSink) -> ObservationOutcome {
        match (&mut self.join).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(task_id = %self.task_id, error = %err, "observer task aborted");
                let failure = TaskFailure::Transport {
                    message: format!("observer aborted: {err}"),
                };
                sink.finish(
                    LifecycleEvent::Failed {
                        task_id: Some(self.task_id.clone()),
                        reason: failure,
                    },
                    ObservationOutcome::Failed,
                )
                .await
            }
        }
    }
}

impl Drop for ObservationHandle {
    fn drop(&mut self) {
        self.join.abort();
    }
}
