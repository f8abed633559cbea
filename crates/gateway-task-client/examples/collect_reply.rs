use gateway_task_client::prelude::*;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), ClientError> {
    let client = TaskClient::from_env()?;

    let reply = client
        .run("Summarize yesterday's line 3 downtime.")
        .collect_message()
        .await?;

    println!("{}", reply.text);
    Ok(())
}
