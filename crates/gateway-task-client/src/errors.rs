/// Errors raised by a `GatewayTransport` while talking to the gateway.
///
/// HTTP responses with a non-success status are normally returned as a
/// `GatewayReply` so callers can inspect the body; `Status` is only used where
/// no body is useful to the caller (for example opening an event stream).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The request could not be sent or the connection dropped.
    #[error("connection error: {0}")]
    Connect(String),
    /// The request, probe, or stream read did not finish in time.
    #[error("timed out: {0}")]
    Timeout(String),
    /// The gateway answered with a non-success HTTP status.
    #[error("gateway returned status {status_code}: {body}")]
    Status { status_code: u16, body: String },
    /// Reading the response body or event stream failed.
    #[error("read error: {0}")]
    Read(String),
}

impl TransportError {
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() || err.is_request() {
            Self::Connect(err.to_string())
        } else {
            Self::Read(err.to_string())
        }
    }
}

/// A gateway body that could not be parsed as JSON.
///
/// Never fatal on its own: observers log it and try again on the next probe.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed gateway payload: {message}")]
pub struct ParseError {
    /// The body exactly as received.
    pub raw: String,
    /// Parser diagnostic.
    pub message: String,
}

/// Reason carried by a terminal `LifecycleEvent::Failed`.
///
/// This is the only failure shape the consumer sees; transport errors are
/// flattened into readable messages before they get here.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, serde::Serialize, serde::Deserialize)]
pub enum TaskFailure {
    /// Input was rejected before any request was made.
    #[error("validation error: {0}")]
    Validation(String),
    /// The gateway refused the submission.
    #[error("task submission failed with status {status_code}: {body}")]
    SubmissionFailed { status_code: u16, body: String },
    /// The submission succeeded but no task id could be found in the reply.
    #[error("gateway response carried no task id: {body}")]
    NoTaskId { body: String },
    /// Connection-level failure while submitting or observing.
    #[error("transport failure: {message}")]
    Transport { message: String },
    /// The event stream closed without a terminal frame.
    #[error("stream closed")]
    StreamClosed,
    /// The gateway reported the task as failed, rejected, or cancelled.
    #[error("task {state}: {message}")]
    Gateway { state: String, message: String },
}

impl TaskFailure {
    pub(crate) fn transport(err: &TransportError) -> Self {
        Self::Transport {
            message: err.to_string(),
        }
    }
}

/// Errors returned by `TaskSubmitter::submit`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    /// Empty or whitespace-only text.
    #[error("validation error: {0}")]
    Validation(String),
    /// Non-success HTTP status on submit.
    #[error("task submission failed with status {status_code}: {body}")]
    SubmissionFailed { status_code: u16, body: String },
    /// Successful submit without a recognizable task id.
    #[error("gateway response carried no task id: {body}")]
    NoTaskId { body: String },
    /// The request never produced a response.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl From<SubmitError> for TaskFailure {
    fn from(value: SubmitError) -> Self {
        match value {
            SubmitError::Validation(message) => TaskFailure::Validation(message),
            SubmitError::SubmissionFailed { status_code, body } => {
                TaskFailure::SubmissionFailed { status_code, body }
            }
            SubmitError::NoTaskId { body } => TaskFailure::NoTaskId { body },
            SubmitError::Transport(err) => TaskFailure::transport(&err),
        }
    }
}

/// Top-level error type for the public client API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Invalid client or gateway configuration.
    #[error("config error: {0}")]
    Config(String),
    /// A run ended with a terminal failure.
    #[error(transparent)]
    RunFailed(TaskFailure),
    /// The run was cancelled before a terminal event was delivered.
    #[error("cancelled")]
    Cancelled,
    /// The run ended without producing a terminal event.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl From<TaskFailure> for ClientError {
    fn from(value: TaskFailure) -> Self {
        ClientError::RunFailed(value)
    }
}
