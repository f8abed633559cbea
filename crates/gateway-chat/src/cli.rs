use clap::Parser;
use gateway_task_client::{ObservationMode, StreamClosePolicy};

/// Send prompts to an agent gateway and print the replies.
///
/// Settings not given as flags are read from `GATEWAY_*` environment
/// variables, including a `.env` file in the working directory.
#[derive(Parser, Debug)]
#[command(name = "gateway-chat", version)]
pub struct Args {
    /// Prompt to send. Without it, prompts are read from stdin, one per line.
    pub prompt: Option<String>,

    /// Gateway API root (`GATEWAY_BASE_URL`).
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Bearer token (`GATEWAY_TOKEN`).
    #[arg(long, value_name = "TOKEN")]
    pub token: Option<String>,

    /// Agent to route prompts to (`GATEWAY_AGENT_NAME`).
    #[arg(long = "agent", value_name = "NAME")]
    pub agent_name: Option<String>,

    /// `poll` or `stream` (`GATEWAY_MODE`).
    #[arg(long, value_name = "MODE")]
    pub mode: Option<ObservationMode>,

    /// Delay between status probes in poll mode (`GATEWAY_POLL_INTERVAL_MS`).
    #[arg(long, value_name = "MS")]
    pub poll_interval_ms: Option<u64>,

    /// `fail` or `complete-with-last-text` (`GATEWAY_STREAM_CLOSE_POLICY`).
    #[arg(long, value_name = "POLICY")]
    pub close_policy: Option<StreamClosePolicy>,

    /// Print every lifecycle event as a JSON line instead of plain replies.
    #[arg(long)]
    pub json: bool,

    /// Print progress text to stderr while a task runs, and debug logs from
    /// the client unless `GATEWAY_LOG_LEVEL` or `RUST_LOG` is set.
    #[arg(short, long)]
    pub verbose: bool,
}
