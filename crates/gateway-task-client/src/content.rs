/// Role attached to every normalized reply.
pub const AGENT_ROLE: &str = "agent";

/// Final reply of a completed task, reduced to the one shape consumers render.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct NormalizedMessage {
    /// Always `agent`.
    pub role: String,
    /// Reply text, or the placeholder when the gateway sent none.
    pub text: String,
}

impl NormalizedMessage {
    /// Builds an agent reply.
    pub fn agent(text: impl Into<String>) -> Self {
        Self {
            role: AGENT_ROLE.to_string(),
            text: text.into(),
        }
    }
}

/// Intermediate update passed through to the consumer as received.
///
/// The client does not interpret progress payloads; it only keeps frames that
/// failed to parse visible as raw text instead of dropping them.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(untagged)]
#[non_exhaustive]
pub enum ProgressPayload {
    /// Frame body that parsed as JSON.
    Json(serde_json::Value),
    /// Frame body that did not parse.
    Text(String),
}

impl ProgressPayload {
    /// Returns the first text fragment carried by the payload, if any.
    ///
    /// Raw text payloads never count: they are usually keep-alives or
    /// truncated frames rather than reply text.
    pub fn text_fragment(&self) -> Option<&str> {
        match self {
            Self::Json(value) => crate::normalizer::progress_text(value),
            Self::Text(_) => None,
        }
    }
}
