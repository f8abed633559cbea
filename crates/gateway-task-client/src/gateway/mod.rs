//! Transport seam between the lifecycle client and the gateway.
//!
//! Submitter and observers only talk to `GatewayTransport`; `HttpGateway` is
//! the reqwest implementation and tests plug in scripted fakes.
mod http;
mod sse;

#[cfg(test)]
pub(crate) mod scripted;

use std::pin::Pin;

pub use http::HttpGateway;
pub use sse::SseFrame;

use crate::errors::TransportError;
use crate::model::{Submission, TaskId};

/// Decoded server-sent frames of one task subscription.
///
/// Dropping the stream closes the underlying connection.
pub type FrameStream =
    Pin<Box<dyn futures::Stream<Item = Result<SseFrame, TransportError>> + Send + 'static>>;

/// Raw HTTP answer from the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayReply {
    /// HTTP status code.
    pub status_code: u16,
    /// Body text, possibly empty.
    pub body: String,
}

impl GatewayReply {
    /// Creates a reply.
    pub fn new(status_code: u16, body: impl Into<String>) -> Self {
        Self {
            status_code,
            body: body.into(),
        }
    }

    /// Returns `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

/// Gateway operations the lifecycle client depends on.
///
/// Implementations return non-success HTTP answers as `Ok(GatewayReply)` and
/// reserve `Err` for requests that produced no usable response.
#[async_trait::async_trait]
pub trait GatewayTransport: Send + Sync {
    /// Sends exactly one submission request, in the wire format selected by
    /// `submission.mode`.
    async fn submit(&self, submission: &Submission) -> Result<GatewayReply, TransportError>;

    /// Fetches the current status body of a task.
    async fn fetch_status(&self, task_id: &TaskId) -> Result<GatewayReply, TransportError>;

    /// Opens the server-sent event subscription of a task.
    async fn open_stream(&self, task_id: &TaskId) -> Result<FrameStream, TransportError>;
}
