use std::time::Duration;

use crate::errors::ClientError;
use crate::model::{ObservationMode, StreamClosePolicy};

const DEFAULT_BASE_URL: &str = "http://localhost:9000/api/v2";
const DEFAULT_AGENT_NAME: &str = "ManufacturingOrchestrator";

/// Connection settings for `HttpGateway`.
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    /// Gateway API root, for example `http://localhost:9000/api/v2`.
    pub base_url: String,
    /// Static bearer token sent on every request.
    pub token: String,
    /// Agent the gateway should route submissions to.
    pub agent_name: String,
    /// Timeout for submit and status requests. Event streams are not bounded
    /// by it.
    pub request_timeout: Duration,
    /// Timeout for establishing a connection.
    pub connect_timeout: Duration,
}

impl GatewayConfig {
    /// Creates a config with defaults and the given bearer token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: token.into(),
            agent_name: DEFAULT_AGENT_NAME.to_string(),
            request_timeout: Duration::from_secs(120),
            connect_timeout: Duration::from_secs(10),
        }
    }

    /// Builds a config from `GATEWAY_*` environment variables.
    ///
    /// `GATEWAY_TOKEN` is required; `GATEWAY_BASE_URL` and
    /// `GATEWAY_AGENT_NAME` override the defaults.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading keys through `lookup` instead of the
    /// process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ClientError> {
        let token = lookup("GATEWAY_TOKEN").unwrap_or_default();
        if token.trim().is_empty() {
            return Err(ClientError::Config(
                "missing GATEWAY_TOKEN for the task gateway".into(),
            ));
        }
        let mut config = Self::new(token);
        if let Some(base_url) = non_empty(lookup("GATEWAY_BASE_URL")) {
            config.base_url = base_url;
        }
        if let Some(agent_name) = non_empty(lookup("GATEWAY_AGENT_NAME")) {
            config.agent_name = agent_name;
        }
        Ok(config)
    }

    /// Overrides the gateway base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Overrides the target agent.
    pub fn agent_name(mut self, agent_name: impl Into<String>) -> Self {
        self.agent_name = agent_name.into();
        self
    }

    /// Overrides the per-request timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), ClientError> {
        if self.token.trim().is_empty() {
            return Err(ClientError::Config("gateway token must not be empty".into()));
        }
        if self.base_url.trim().is_empty() {
            return Err(ClientError::Config("gateway base_url must not be empty".into()));
        }
        if self.agent_name.trim().is_empty() {
            return Err(ClientError::Config("agent_name must not be empty".into()));
        }
        Ok(())
    }
}

/// Lifecycle settings: which observer to use and how it behaves.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Submission format and observation strategy.
    pub mode: ObservationMode,
    /// Delay between status probes.
    pub poll_interval: Duration,
    /// Upper bound for a single status probe. `None` waits indefinitely.
    pub probe_timeout: Option<Duration>,
    /// Consecutive failed probes tolerated before the task fails.
    pub max_consecutive_probe_failures: u32,
    /// Behavior when a stream closes without a terminal frame.
    pub stream_close_policy: StreamClosePolicy,
    /// Upper bound for the wait between two stream frames. `None` waits
    /// indefinitely.
    pub stream_idle_timeout: Option<Duration>,
    /// Bounded buffer between the run task and the consumer.
    pub event_buffer_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            mode: ObservationMode::Poll,
            poll_interval: Duration::from_millis(1500),
            probe_timeout: Some(Duration::from_secs(30)),
            max_consecutive_probe_failures: 3,
            stream_close_policy: StreamClosePolicy::Fail,
            stream_idle_timeout: None,
            event_buffer_capacity: 64,
        }
    }
}

impl ClientConfig {
    /// Builds a config from `GATEWAY_*` environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading keys through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ClientError> {
        let mut config = Self::default();
        if let Some(mode) = non_empty(lookup("GATEWAY_MODE")) {
            config.mode = mode.parse()?;
        }
        if let Some(ms) = non_empty(lookup("GATEWAY_POLL_INTERVAL_MS")) {
            config.poll_interval = Duration::from_millis(parse_u64("GATEWAY_POLL_INTERVAL_MS", &ms)?);
        }
        if let Some(ms) = non_empty(lookup("GATEWAY_PROBE_TIMEOUT_MS")) {
            let ms = parse_u64("GATEWAY_PROBE_TIMEOUT_MS", &ms)?;
            config.probe_timeout = (ms > 0).then(|| Duration::from_millis(ms));
        }
        if let Some(policy) = non_empty(lookup("GATEWAY_STREAM_CLOSE_POLICY")) {
            config.stream_close_policy = policy.parse()?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Sets the observation mode.
    pub fn mode(mut self, mode: ObservationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the poll interval.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets or clears the per-probe timeout.
    pub fn probe_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Sets how many consecutive probe failures end the task.
    pub fn max_consecutive_probe_failures(mut self, max: u32) -> Self {
        self.max_consecutive_probe_failures = max;
        self
    }

    /// Sets the stream close policy.
    pub fn stream_close_policy(mut self, policy: StreamClosePolicy) -> Self {
        self.stream_close_policy = policy;
        self
    }

    /// Sets or clears the stream idle timeout.
    pub fn stream_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.stream_idle_timeout = timeout;
        self
    }

    /// Sets the event buffer size.
    pub fn event_buffer_capacity(mut self, capacity: usize) -> Self {
        self.event_buffer_capacity = capacity;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), ClientError> {
        if self.poll_interval.is_zero() {
            return Err(ClientError::Config("poll_interval must be greater than 0".into()));
        }
        if self.max_consecutive_probe_failures == 0 {
            return Err(ClientError::Config(
                "max_consecutive_probe_failures must be greater than 0".into(),
            ));
        }
        if self.event_buffer_capacity == 0 {
            return Err(ClientError::Config(
                "event_buffer_capacity must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ClientError> {
    value
        .trim()
        .parse()
        .map_err(|e| ClientError::Config(format!("invalid {key} `{value}`: {e}")))
}
