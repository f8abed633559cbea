use gateway_task_client::prelude::*;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), ClientError> {
    let client = TaskClient::from_config(
        GatewayConfig::from_env()?,
        ClientConfig::from_env()?.mode(ObservationMode::Stream),
    )?;

    let mut run = client.run("Forecast demand for next week.");
    while let Some(event) = run.next_event().await {
        match event {
            LifecycleEvent::Progress { raw, .. } => {
                if let Some(text) = raw.text_fragment() {
                    eprintln!("... {text}");
                }
            }
            LifecycleEvent::Completed { message, .. } => println!("{}", message.text),
            LifecycleEvent::Failed { reason, .. } => eprintln!("task failed: {reason}"),
        }
    }
    Ok(())
}
