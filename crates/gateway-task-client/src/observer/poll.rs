use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

use super::{CancelSignal, EventSink, ObservationOutcome, ObservationStrategy};
use crate::config::ClientConfig;
use crate::errors::{TaskFailure, TransportError};
use crate::event::LifecycleEvent;
use crate::gateway::GatewayTransport;
use crate::model::{ObservationMode, TaskId};
use crate::normalizer::{StatusProbe, extract_terminal_message};

/// Observes a task by probing `GET /tasks/{id}` on a fixed interval.
///
/// Probes run one after another: the next tick is only awaited once the
/// previous probe has been handled, so two probes can never both try to end
/// the task. Empty and malformed bodies keep the task polling; only repeated
/// transport failures or a terminal state end it.
pub struct PollObserver {
    gateway: Arc<dyn GatewayTransport>,
    interval: Duration,
    probe_timeout: Option<Duration>,
    max_consecutive_failures: u32,
}

impl PollObserver {
    /// Creates a poll observer from client settings.
    pub fn new(gateway: Arc<dyn GatewayTransport>, config: &ClientConfig) -> Self {
        Self {
            gateway,
            interval: config.poll_interval,
            probe_timeout: config.probe_timeout,
            max_consecutive_failures: config.max_consecutive_probe_failures.max(1),
        }
    }

    async fn probe(&self, task_id: &TaskId) -> Result<String, TransportError> {
        let fetch = self.gateway.fetch_status(task_id);
        let reply = match self.probe_timeout {
            Some(limit) => tokio::time::timeout(limit, fetch).await.map_err(|_| {
                TransportError::Timeout(format!("status probe exceeded {}ms", limit.as_millis()))
            })??,
            None => fetch.await?,
        };
        if !reply.is_success() {
            return Err(TransportError::Status {
                status_code: reply.status_code,
                body: reply.body,
            });
        }
        Ok(reply.body)
    }
}

#[async_trait::async_trait]
impl ObservationStrategy for PollObserver {
    fn mode(&self) -> ObservationMode {
        ObservationMode::Poll
    }

    async fn observe(
        &self,
        task_id: &TaskId,
        sink: &EventSink,
        cancel: &mut CancelSignal,
    ) -> ObservationOutcome {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut attempt: u64 = 0;
        let mut strikes: u32 = 0;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return ObservationOutcome::Cancelled,
                _ = ticker.tick() => {}
            }
            attempt += 1;

            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(task_id = %task_id, attempt, "cancelled with a status probe in flight");
                    return ObservationOutcome::Cancelled;
                }
                fetched = self.probe(task_id) => fetched,
            };
            if cancel.is_cancelled() {
                return ObservationOutcome::Cancelled;
            }

            let body = match fetched {
                Ok(body) => {
                    strikes = 0;
                    body
                }
                Err(err) => {
                    strikes += 1;
                    warn!(task_id = %task_id, attempt, strikes, error = %err, "status probe failed");
                    if strikes >= self.max_consecutive_failures {
                        return sink
                            .finish(
                                LifecycleEvent::Failed {
                                    task_id: Some(task_id.clone()),
                                    reason: TaskFailure::transport(&err),
                                },
                                ObservationOutcome::Failed,
                            )
                            .await;
                    }
                    continue;
                }
            };

            match extract_terminal_message(&body) {
                Ok(StatusProbe::NotTerminalYet { state }) => {
                    debug!(task_id = %task_id, attempt, state = state.as_deref().unwrap_or("<empty>"), "task not terminal yet");
                }
                Err(err) => {
                    warn!(task_id = %task_id, attempt, error = %err, raw = %err.raw, "ignoring malformed status body");
                }
                Ok(StatusProbe::Completed(message)) => {
                    debug!(task_id = %task_id, attempt, "task completed");
                    return sink
                        .finish(
                            LifecycleEvent::Completed {
                                task_id: task_id.clone(),
                                message,
                            },
                            ObservationOutcome::Completed,
                        )
                        .await;
                }
                Ok(StatusProbe::Failed { state, reason }) => {
                    debug!(task_id = %task_id, attempt, state = %state, "task failed on the gateway");
                    return sink
                        .finish(
                            LifecycleEvent::Failed {
                                task_id: Some(task_id.clone()),
                                reason: TaskFailure::Gateway {
                                    state,
                                    message: reason,
                                },
                            },
                            ObservationOutcome::Failed,
                        )
                        .await;
                }
            }
        }
    }
}
