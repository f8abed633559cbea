use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt as _;
use tracing::{debug, warn};

use super::{CancelSignal, EventSink, ObservationOutcome, ObservationStrategy};
use crate::config::ClientConfig;
use crate::content::NormalizedMessage;
use crate::errors::{TaskFailure, TransportError};
use crate::event::LifecycleEvent;
use crate::gateway::{FrameStream, GatewayTransport, SseFrame};
use crate::model::{ObservationMode, StreamClosePolicy, TaskId};
use crate::normalizer::{FrameEvent, NO_REPLY_TEXT, classify_frame};

/// Observes a task through its server-sent event subscription.
///
/// Every frame is forwarded as `Progress` unless it carries a terminal task
/// state. The connection is dropped as soon as the observation ends.
pub struct StreamObserver {
    gateway: Arc<dyn GatewayTransport>,
    close_policy: StreamClosePolicy,
    idle_timeout: Option<Duration>,
}

impl StreamObserver {
    /// Creates a stream observer from client settings.
    pub fn new(gateway: Arc<dyn GatewayTransport>, config: &ClientConfig) -> Self {
        Self {
            gateway,
            close_policy: config.stream_close_policy,
            idle_timeout: config.stream_idle_timeout,
        }
    }

    async fn next_frame(
        &self,
        frames: &mut FrameStream,
    ) -> Result<Option<SseFrame>, TransportError> {
        match self.idle_timeout {
            Some(limit) => tokio::time::timeout(limit, frames.next())
                .await
                .map_err(|_| {
                    TransportError::Timeout(format!(
                        "no stream frame within {}ms",
                        limit.as_millis()
                    ))
                })?
                .transpose(),
            None => frames.next().await.transpose(),
        }
    }

    fn closed_event(&self, task_id: &TaskId, last_text: Option<String>) -> LifecycleEvent {
        match self.close_policy {
            StreamClosePolicy::Fail => LifecycleEvent::Failed {
                task_id: Some(task_id.clone()),
                reason: TaskFailure::StreamClosed,
            },
            StreamClosePolicy::CompleteWithLastText => LifecycleEvent::Completed {
                task_id: task_id.clone(),
                message: NormalizedMessage::agent(
                    last_text.unwrap_or_else(|| NO_REPLY_TEXT.to_string()),
                ),
            },
        }
    }
}

#[async_trait::async_trait]
impl ObservationStrategy for StreamObserver {
    fn mode(&self) -> ObservationMode {
        ObservationMode::Stream
    }

    async fn observe(
        &self,
        task_id: &TaskId,
        sink: &EventSink,
        cancel: &mut CancelSignal,
    ) -> ObservationOutcome {
        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => return ObservationOutcome::Cancelled,
            opened = self.gateway.open_stream(task_id) => opened,
        };
        let mut frames = match opened {
            Ok(frames) => frames,
            Err(err) => {
                warn!(task_id = %task_id, error = %err, "could not open task event stream");
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
        };

        let mut last_text: Option<String> = None;
        let mut seq: u64 = 0;
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(task_id = %task_id, seq, "closing event stream on cancellation");
                    return ObservationOutcome::Cancelled;
                }
                next = self.next_frame(&mut frames) => next,
            };
            if cancel.is_cancelled() {
                return ObservationOutcome::Cancelled;
            }

            let frame = match next {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    debug!(task_id = %task_id, seq, policy = ?self.close_policy, "event stream closed without a terminal frame");
                    let event = self.closed_event(task_id, last_text);
                    let delivered = match event {
                        LifecycleEvent::Completed { .. } => ObservationOutcome::Completed,
                        _ => ObservationOutcome::Failed,
                    };
                    return sink.finish(event, delivered).await;
                }
                Err(err) => {
                    warn!(task_id = %task_id, seq, error = %err, "event stream failed");
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
            };
            seq += 1;

            if frame.event.as_deref() == Some("error") {
                return sink
                    .finish(
                        LifecycleEvent::Failed {
                            task_id: Some(task_id.clone()),
                            reason: TaskFailure::Gateway {
                                state: "error".into(),
                                message: frame.data,
                            },
                        },
                        ObservationOutcome::Failed,
                    )
                    .await;
            }

            match classify_frame(&frame.data) {
                FrameEvent::Skip => {}
                FrameEvent::Progress(raw) => {
                    if let Some(text) = raw.text_fragment() {
                        last_text = Some(text.to_string());
                    }
                    let event = LifecycleEvent::Progress {
                        task_id: task_id.clone(),
                        raw,
                    };
                    if !sink.emit(event).await {
                        return sink.undelivered();
                    }
                }
                FrameEvent::Completed(message) => {
                    debug!(task_id = %task_id, seq, "terminal frame received");
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
                FrameEvent::Failed { state, reason } => {
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
