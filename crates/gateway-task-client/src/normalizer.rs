//! Defensive parsing of gateway bodies.
//!
//! Gateway deployments disagree on field names and sometimes answer with an
//! empty body while a task is still running. Everything that has to cope with
//! that lives here so the observers only ever see `NotTerminalYet`, a terminal
//! result, or a `ParseError` to log.

use serde_json::Value;

use crate::content::{NormalizedMessage, ProgressPayload};
use crate::errors::ParseError;
use crate::model::TaskId;

/// Reply text used when a completed task carries no text fragment.
pub const NO_REPLY_TEXT: &str = "No reply";

/// JSON pointers tried in order when looking for the task id of a submission.
///
/// `/result/id` is the JSON-RPC streaming reply; the rest are the REST
/// variants seen across gateway versions.
pub const TASK_ID_RULES: &[&str] = &["/result/id", "/taskId", "/id", "/task_id"];

const COMPLETED_STATE: &str = "completed";
const FAILURE_STATES: &[&str] = &["failed", "canceled", "cancelled", "rejected"];

/// Outcome of inspecting one status body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StatusProbe {
    /// Empty body or a non-terminal state. `state` is the reported state, if any.
    NotTerminalYet { state: Option<String> },
    /// Task finished successfully.
    Completed(NormalizedMessage),
    /// Gateway reported the task as failed, rejected, or cancelled.
    Failed { state: String, reason: String },
}

/// Classification of one server-sent frame.
#[derive(Clone, Debug, PartialEq)]
pub enum FrameEvent {
    /// Frame had no data (keep-alive).
    Skip,
    /// Intermediate update to forward.
    Progress(ProgressPayload),
    /// Terminal success frame.
    Completed(NormalizedMessage),
    /// Terminal failure frame.
    Failed { state: String, reason: String },
}

/// Extracts the task id from a submission reply body.
///
/// Returns `None` when the body is not JSON or no rule in `TASK_ID_RULES`
/// matches a non-empty value.
pub fn extract_task_id(body: &str) -> Option<TaskId> {
    let value: Value = serde_json::from_str(body).ok()?;
    TASK_ID_RULES
        .iter()
        .find_map(|rule| value.pointer(rule).and_then(id_text))
        .map(TaskId::new)
}

fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => {
            let text = text.trim();
            (!text.is_empty()).then(|| text.to_string())
        }
        Value::Number(number) if number.is_u64() || number.is_i64() => Some(number.to_string()),
        _ => None,
    }
}

/// Inspects a status body from `GET /tasks/{id}`.
///
/// An empty body is not an error: gateways return nothing while a task runs.
pub fn extract_terminal_message(body: &str) -> Result<StatusProbe, ParseError> {
    if body.trim().is_empty() {
        return Ok(StatusProbe::NotTerminalYet { state: None });
    }
    let value: Value = serde_json::from_str(body).map_err(|e| ParseError {
        raw: body.to_string(),
        message: e.to_string(),
    })?;
    Ok(probe_status(&value))
}

pub(crate) fn probe_status(value: &Value) -> StatusProbe {
    let status = value.get("status");
    let Some(state) = status
        .and_then(|s| s.get("state"))
        .and_then(Value::as_str)
        .map(|s| s.trim().to_ascii_lowercase())
    else {
        return StatusProbe::NotTerminalYet { state: None };
    };
    let message_text = status
        .and_then(|s| s.get("message"))
        .and_then(first_text_fragment);

    if state == COMPLETED_STATE {
        StatusProbe::Completed(NormalizedMessage::agent(
            message_text.unwrap_or(NO_REPLY_TEXT),
        ))
    } else if FAILURE_STATES.contains(&state.as_str()) {
        let reason = message_text
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| format!("task {state}"));
        StatusProbe::Failed { state, reason }
    } else {
        StatusProbe::NotTerminalYet { state: Some(state) }
    }
}

/// Classifies one SSE `data` payload.
///
/// JSON-RPC envelopes are unwrapped so a `result` carrying a terminal task
/// status ends the task the same way a status probe would.
pub fn classify_frame(data: &str) -> FrameEvent {
    if data.trim().is_empty() {
        return FrameEvent::Skip;
    }
    let value: Value = match serde_json::from_str(data.trim()) {
        Ok(value) => value,
        Err(_) => return FrameEvent::Progress(ProgressPayload::Text(data.to_string())),
    };
    if let Some(error) = value.get("error").filter(|e| e.is_object()) {
        let reason = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("gateway stream error")
            .to_string();
        return FrameEvent::Failed {
            state: "error".into(),
            reason,
        };
    }
    match probe_status(unwrap_result(&value)) {
        StatusProbe::NotTerminalYet { .. } => FrameEvent::Progress(ProgressPayload::Json(value)),
        StatusProbe::Completed(message) => FrameEvent::Completed(message),
        StatusProbe::Failed { state, reason } => FrameEvent::Failed { state, reason },
    }
}

fn unwrap_result(value: &Value) -> &Value {
    match value.get("result") {
        Some(result) if result.is_object() => result,
        _ => value,
    }
}

/// First non-blank text fragment of a message structure.
///
/// Looks at `parts[*].text`, then `content[*].text`, then a bare `text`.
pub(crate) fn first_text_fragment(message: &Value) -> Option<&str> {
    ["parts", "content"]
        .iter()
        .filter_map(|key| message.get(*key).and_then(Value::as_array))
        .flatten()
        .find_map(|part| non_blank(part.get("text")))
        .or_else(|| non_blank(message.get("text")))
}

/// Text carried by a progress frame: its status message, or the frame itself
/// when the frame is a bare message.
pub(crate) fn progress_text(value: &Value) -> Option<&str> {
    let payload = unwrap_result(value);
    payload
        .get("status")
        .and_then(|s| s.get("message"))
        .and_then(first_text_fragment)
        .or_else(|| first_text_fragment(payload))
}

fn non_blank(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .filter(|text| !text.trim().is_empty())
}
