use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::errors::ClientError;

/// Correlation identifier assigned by the gateway to a submitted task.
///
/// Opaque to the client; it is only ever used as the key for status probes and
/// stream subscriptions.
#[derive(Clone, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
pub struct TaskId(pub String);

impl TaskId {
    /// Creates a task id from any string-like value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the task id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// How a task is submitted and then observed.
///
/// Chosen once per client; a task never switches strategy mid-flight.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObservationMode {
    /// `POST /tasks`, then poll `GET /tasks/{id}`.
    #[default]
    Poll,
    /// `POST /message:stream`, then subscribe to `GET /sse/subscribe/{id}`.
    Stream,
}

impl fmt::Display for ObservationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Poll => "poll",
            Self::Stream => "stream",
        })
    }
}

impl FromStr for ObservationMode {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "poll" | "polling" => Ok(Self::Poll),
            "stream" | "sse" => Ok(Self::Stream),
            other => Err(ClientError::Config(format!(
                "unknown observation mode `{other}` (expected `poll` or `stream`)"
            ))),
        }
    }
}

/// What the stream observer does when the connection closes before a
/// terminal frame arrives.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StreamClosePolicy {
    /// Emit `Failed` with `TaskFailure::StreamClosed`.
    #[default]
    Fail,
    /// Treat the close as completion and emit `Completed` with the last text
    /// fragment seen on the stream (or the placeholder text).
    CompleteWithLastText,
}

impl FromStr for StreamClosePolicy {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail" => Ok(Self::Fail),
            "complete" | "complete-with-last-text" => Ok(Self::CompleteWithLastText),
            other => Err(ClientError::Config(format!(
                "unknown stream close policy `{other}` (expected `fail` or `complete-with-last-text`)"
            ))),
        }
    }
}

/// A task submission in flight.
///
/// Lives only until the gateway hands back a task id (or refuses).
#[derive(Clone, Debug, PartialEq)]
pub struct Submission {
    /// Prompt text exactly as the consumer typed it.
    pub text: String,
    /// Wire format to submit with.
    pub mode: ObservationMode,
    /// When the consumer asked for the send.
    pub submitted_at: DateTime<Utc>,
}

impl Submission {
    /// Creates a submission stamped with the current time.
    pub fn new(text: impl Into<String>, mode: ObservationMode) -> Self {
        Self {
            text: text.into(),
            mode,
            submitted_at: Utc::now(),
        }
    }
}
