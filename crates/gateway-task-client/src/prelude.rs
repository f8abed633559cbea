//! Common imports for typical client usage.
pub use crate::{
    CancelHandle, ClientConfig, ClientError, GatewayConfig, LifecycleEvent, NormalizedMessage,
    ObservationMode, ProgressPayload, StreamClosePolicy, TaskClient, TaskFailure, TaskId, TaskRun,
};
