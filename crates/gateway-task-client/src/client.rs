use std::sync::Arc;

use tracing::{Instrument as _, info_span};

use crate::config::{ClientConfig, GatewayConfig};
use crate::errors::ClientError;
use crate::gateway::{GatewayTransport, HttpGateway};
use crate::run::{TaskRun, run_task};

pub(crate) struct ClientInner {
    gateway: Arc<dyn GatewayTransport>,
    config: ClientConfig,
}

/// Entry point: submits prompts and hands back one `TaskRun` per task.
///
/// Cheap to clone. Runs started from the same client share the gateway
/// connection pool and nothing else.
#[derive(Clone)]
pub struct TaskClient {
    inner: Arc<ClientInner>,
}

impl TaskClient {
    /// Starts a builder for plugging in a custom `GatewayTransport`.
    pub fn builder() -> TaskClientBuilder {
        TaskClientBuilder::default()
    }

    /// Creates a client talking to the HTTP gateway.
    pub fn from_config(gateway: GatewayConfig, config: ClientConfig) -> Result<Self, ClientError> {
        Self::builder()
            .gateway(Arc::new(HttpGateway::new(gateway)?))
            .config(config)
            .build()
    }

    /// Creates an HTTP client from `GATEWAY_*` environment variables.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_config(GatewayConfig::from_env()?, ClientConfig::from_env()?)
    }

    /// Lifecycle settings in use.
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Submits `text` and starts observing the resulting task.
    ///
    /// Returns immediately; submission and observation happen on a spawned
    /// task. Blank text ends the run with `Failed(Validation)` without any
    /// request being made.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn run(&self, text: impl Into<String>) -> TaskRun {
        let config = self.inner.config.clone();
        let (run, wiring) = TaskRun::channel(config.event_buffer_capacity);
        let span = info_span!("task_run", run_id = %run.run_id(), mode = %config.mode);
        tokio::spawn(
            run_task(self.inner.gateway.clone(), config, text.into(), wiring).instrument(span),
        );
        run
    }
}

/// Builder for `TaskClient`.
#[derive(Default)]
pub struct TaskClientBuilder {
    gateway: Option<Arc<dyn GatewayTransport>>,
    config: ClientConfig,
}

impl TaskClientBuilder {
    /// Sets the gateway transport.
    pub fn gateway(mut self, gateway: Arc<dyn GatewayTransport>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    /// Sets the lifecycle settings.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Validates the settings and builds the client.
    pub fn build(self) -> Result<TaskClient, ClientError> {
        let gateway = self
            .gateway
            .ok_or_else(|| ClientError::Config("a gateway transport is required".into()))?;
        self.config.validate()?;
        Ok(TaskClient {
            inner: Arc::new(ClientInner {
                gateway,
                config: self.config,
            }),
        })
    }
}
