//! Scripted gateway used by unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures::stream;
use tokio::sync::Notify;

use super::{FrameStream, GatewayReply, GatewayTransport, SseFrame};
use crate::errors::TransportError;
use crate::model::{Submission, TaskId};

/// One scripted answer to `fetch_status`.
pub(crate) enum StatusStep {
    Reply(Result<GatewayReply, TransportError>),
    /// Signals `started`, then waits for `release` before answering.
    Gated {
        started: Arc<Notify>,
        release: Arc<Notify>,
        reply: GatewayReply,
    },
}

/// One scripted answer to `open_stream`.
pub(crate) enum StreamStep {
    Frames(Vec<Result<SseFrame, TransportError>>),
    /// Yields the frames, then never ends.
    FramesThenPending(Vec<Result<SseFrame, TransportError>>),
    Refuse(TransportError),
}

#[derive(Default)]
pub(crate) struct ScriptedGateway {
    submits: Mutex<VecDeque<Result<GatewayReply, TransportError>>>,
    statuses: Mutex<VecDeque<StatusStep>>,
    streams: Mutex<VecDeque<StreamStep>>,
    pub submissions: Mutex<Vec<Submission>>,
    pub status_calls: AtomicUsize,
    pub stream_calls: AtomicUsize,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept_submit(self, body: &str) -> Self {
        self.push_submit(Ok(GatewayReply::new(200, body)))
    }

    pub fn push_submit(self, reply: Result<GatewayReply, TransportError>) -> Self {
        self.submits.lock().expect("lock").push_back(reply);
        self
    }

    pub fn status(self, status_code: u16, body: &str) -> Self {
        self.push_status(StatusStep::Reply(Ok(GatewayReply::new(status_code, body))))
    }

    pub fn push_status(self, step: StatusStep) -> Self {
        self.statuses.lock().expect("lock").push_back(step);
        self
    }

    pub fn push_stream(self, step: StreamStep) -> Self {
        self.streams.lock().expect("lock").push_back(step);
        self
    }

    pub fn submit_calls(&self) -> usize {
        self.submissions.lock().expect("lock").len()
    }
}

#[async_trait::async_trait]
impl GatewayTransport for ScriptedGateway {
    async fn submit(&self, submission: &Submission) -> Result<GatewayReply, TransportError> {
        self.submissions
            .lock()
            .expect("lock")
            .push(submission.clone());
        self.submits
            .lock()
            .expect("lock")
            .pop_front()
            .unwrap_or_else(|| Ok(GatewayReply::new(200, r#"{"taskId":"task-1"}"#)))
    }

    async fn fetch_status(&self, _task_id: &TaskId) -> Result<GatewayReply, TransportError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let step = self.statuses.lock().expect("lock").pop_front();
        match step {
            Some(StatusStep::Reply(reply)) => reply,
            Some(StatusStep::Gated {
                started,
                release,
                reply,
            }) => {
                started.notify_one();
                release.notified().await;
                Ok(reply)
            }
            None => Ok(GatewayReply::new(200, "")),
        }
    }

    async fn open_stream(&self, _task_id: &TaskId) -> Result<FrameStream, TransportError> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        let step = self.streams.lock().expect("lock").pop_front();
        match step {
            Some(StreamStep::Frames(frames)) => Ok(Box::pin(stream::iter(frames))),
            Some(StreamStep::FramesThenPending(frames)) => {
                use futures::StreamExt as _;
                Ok(Box::pin(stream::iter(frames).chain(stream::pending())))
            }
            Some(StreamStep::Refuse(err)) => Err(err),
            None => Ok(Box::pin(stream::empty())),
        }
    }
}
