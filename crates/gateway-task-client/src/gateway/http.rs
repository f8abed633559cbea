use reqwest::Url;
use reqwest::header::{ACCEPT, HeaderValue};
use reqwest::multipart::Form;
use tracing::debug;

use super::sse::frame_stream;
use super::{FrameStream, GatewayReply, GatewayTransport};
use crate::config::GatewayConfig;
use crate::errors::{ClientError, TransportError};
use crate::model::{ObservationMode, Submission, TaskId};

const EVENT_STREAM: &str = "text/event-stream";

/// `GatewayTransport` over HTTP.
///
/// - `POST {base}/tasks` (multipart form: `agent_name`, `prompt`) in poll mode
/// - `POST {base}/message:stream` (JSON-RPC `message/stream`) in stream mode
/// - `GET {base}/tasks/{id}` for status probes
/// - `GET {base}/sse/subscribe/{id}` for the event stream
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: Url,
    config: GatewayConfig,
}

impl HttpGateway {
    /// Creates a gateway client from explicit configuration.
    pub fn new(config: GatewayConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let base_url = Url::parse(config.base_url.trim())
            .map_err(|e| ClientError::Config(format!("invalid gateway base_url: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::Config(format!(
                "gateway base_url `{base_url}` cannot carry a path"
            )));
        }
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build gateway client: {e}")))?;
        Ok(Self {
            client,
            base_url,
            config,
        })
    }

    /// Creates a gateway client from `GATEWAY_*` environment variables.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::new(GatewayConfig::from_env()?)
    }

    /// Appends path segments to the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn read_reply(response: reqwest::Response) -> Result<GatewayReply, TransportError> {
        let status_code = response.status().as_u16();
        let body = response.text().await.map_err(TransportError::from_reqwest)?;
        Ok(GatewayReply { status_code, body })
    }
}

#[async_trait::async_trait]
impl GatewayTransport for HttpGateway {
    async fn submit(&self, submission: &Submission) -> Result<GatewayReply, TransportError> {
        let request = match submission.mode {
            ObservationMode::Poll => self
                .client
                .post(self.endpoint(&["tasks"]))
                .multipart(task_form(&submission.text, &self.config.agent_name)),
            ObservationMode::Stream => self
                .client
                .post(self.endpoint(&["message:stream"]))
                .json(&stream_message_envelope(
                    &submission.text,
                    &self.config.agent_name,
                )),
        };
        debug!(mode = %submission.mode, agent = %self.config.agent_name, "sending task submission");

        let response = request
            .bearer_auth(&self.config.token)
            .timeout(self.config.request_timeout)
            .send()
            .await
            .map_err(TransportError::from_reqwest)?;
        Self::read_reply(response).await
    }

    async fn fetch_status(&self, task_id: &TaskId) -> Result<GatewayReply, TransportError> {
        let response = self
            .client
            .get(self.endpoint(&["tasks", task_id.as_str()]))
            .bearer_auth(&self.config.token)
            .timeout(self.config.request_timeout)
            .send()
            .await
            .map_err(TransportError::from_reqwest)?;
        Self::read_reply(response).await
    }

    async fn open_stream(&self, task_id: &TaskId) -> Result<FrameStream, TransportError> {
        debug!(task_id = %task_id, "subscribing to task event stream");
        let response = self
            .client
            .get(self.endpoint(&["sse", "subscribe", task_id.as_str()]))
            .bearer_auth(&self.config.token)
            .header(ACCEPT, HeaderValue::from_static(EVENT_STREAM))
            .send()
            .await
            .map_err(TransportError::from_reqwest)?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(TransportError::Status {
                status_code: status.as_u16(),
                body,
            });
        }
        Ok(frame_stream(response.bytes_stream()))
    }
}

/// Multipart body of a poll-mode submission.
fn task_form(text: &str, agent_name: &str) -> Form {
    Form::new()
        .text("agent_name", agent_name.to_string())
        .text("prompt", text.to_string())
}

/// JSON-RPC `message/stream` envelope carrying one user text part.
pub(crate) fn stream_message_envelope(text: &str, agent_name: &str) -> serde_json::Value {
    serde_json::json!({
        "id": uuid::Uuid::new_v4().to_string(),
        "jsonrpc": "2.0",
        "method": "message/stream",
        "params": {
            "message": {
                "kind": "message",
                "messageId": uuid::Uuid::new_v4().to_string(),
                "role": "user",
                "metadata": { "agent_name": agent_name },
                "parts": [{ "kind": "text", "text": text }],
            }
        }
    })
}
