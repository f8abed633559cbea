//! Task-lifecycle client for agent gateways.
//!
//! A prompt is submitted once, the gateway answers with a task id, and the
//! task is then observed until it ends, either by polling its status or by
//! subscribing to its server-sent event stream. Consumers see one event
//! sequence per task: any number of `Progress` events, then exactly one
//! `Completed` or `Failed`. A cancelled run just ends.
//!
//! # Usage
//!
//! ```no_run
//! use gateway_task_client::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), ClientError> {
//! let client = TaskClient::from_config(
//!     GatewayConfig::new("local-dev-token").agent_name("ManufacturingOrchestrator"),
//!     ClientConfig::default().mode(ObservationMode::Stream),
//! )?;
//!
//! let mut run = client.run("What is the current OEE of line 2?");
//! while let Some(event) = run.next_event().await {
//!     match event {
//!         LifecycleEvent::Progress { .. } => {}
//!         LifecycleEvent::Completed { message, .. } => println!("{}", message.text),
//!         LifecycleEvent::Failed { reason, .. } => eprintln!("{reason}"),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

/// `TaskClient` entry point and builder.
pub mod client;
/// Gateway and lifecycle configuration.
pub mod config;
/// Normalized reply and progress payload types.
pub mod content;
/// Error types, from transport faults up to the reasons carried by events.
pub mod errors;
/// Lifecycle events delivered to consumers.
pub mod event;
/// Gateway transport seam and its HTTP implementation.
pub mod gateway;
/// Task ids, observation modes, and submissions.
pub mod model;
/// Pure extraction of task ids, terminal states, and stream frames.
pub mod normalizer;
/// Poll and stream observation strategies.
pub mod observer;
/// Common imports for typical usage.
pub mod prelude;
/// Run handle, cancellation, and the per-run task.
pub mod run;
/// Task submission.
pub mod submitter;

pub use client::{TaskClient, TaskClientBuilder};
pub use config::{ClientConfig, GatewayConfig};
pub use content::{NormalizedMessage, ProgressPayload};
pub use errors::{ClientError, ParseError, SubmitError, TaskFailure, TransportError};
pub use event::LifecycleEvent;
pub use gateway::{FrameStream, GatewayReply, GatewayTransport, HttpGateway, SseFrame};
pub use model::{ObservationMode, StreamClosePolicy, Submission, TaskId};
pub use normalizer::{
    FrameEvent, StatusProbe, classify_frame, extract_task_id, extract_terminal_message,
};
pub use observer::{ObservationOutcome, ObservationStrategy, PollObserver, StreamObserver};
pub use run::{CancelHandle, TaskRun};
pub use submitter::TaskSubmitter;
