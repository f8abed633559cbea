//! Terminal chat client for agent gateways.

mod cli;
mod config;
mod observability;
mod output;

use anyhow::Context as _;
use clap::Parser as _;
use gateway_task_client::{LifecycleEvent, TaskClient};
use tokio::io::{AsyncBufReadExt as _, AsyncWriteExt as _, BufReader};

use crate::cli::Args;
use crate::output::Output;

/// How a single prompt ended.
enum Ended {
    Completed,
    Failed,
    Cancelled,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    config::load_dotenv();
    let args = Args::parse();
    observability::init_observability(&observability::LogSettings::resolve(
        args.verbose,
        |key| std::env::var(key).ok(),
    ));

    let (gateway, client_config) =
        config::resolve(&args, |key| std::env::var(key).ok()).context("invalid configuration")?;
    let client =
        TaskClient::from_config(gateway, client_config).context("failed to create gateway client")?;
    let output = Output {
        json: args.json,
        verbose: args.verbose,
    };

    match args.prompt.as_deref() {
        Some(prompt) => match ask(&client, prompt, output).await {
            Ended::Completed => Ok(()),
            Ended::Failed => anyhow::bail!("task failed"),
            Ended::Cancelled => anyhow::bail!("cancelled"),
        },
        None => chat(&client, output).await,
    }
}

/// Sends one prompt and prints its events. Ctrl-C cancels the task.
async fn ask(client: &TaskClient, prompt: &str, output: Output) -> Ended {
    let mut run = client.run(prompt);
    let cancel = run.cancel_handle();
    tracing::debug!(run_id = %run.run_id(), "prompt sent");

    loop {
        let event = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                cancel.cancel();
                eprintln!("cancelled");
                return Ended::Cancelled;
            }
            event = run.next_event() => event,
        };
        let Some(event) = event else {
            return Ended::Cancelled;
        };
        output.print(&event);
        match event {
            LifecycleEvent::Progress { .. } => {}
            LifecycleEvent::Completed { .. } => return Ended::Completed,
            LifecycleEvent::Failed { .. } => return Ended::Failed,
        }
    }
}

/// Reads prompts from stdin until EOF, `exit`, or Ctrl-C at the prompt.
async fn chat(client: &TaskClient, output: Output) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stderr = tokio::io::stderr();

    loop {
        stderr.write_all(b"> ").await?;
        stderr.flush().await?;

        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => line.context("failed to read stdin")?,
        };
        let Some(line) = line else {
            break;
        };
        let prompt = line.trim();
        if prompt.is_empty() {
            continue;
        }
        if matches!(prompt, "exit" | "quit") {
            break;
        }
        ask(client, prompt, output).await;
    }
    Ok(())
}
