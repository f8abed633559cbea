use std::time::Duration;

use gateway_task_client::prelude::*;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "test-token";

async fn client(server: &MockServer, config: ClientConfig) -> TaskClient {
    TaskClient::from_config(
        GatewayConfig::new(TOKEN)
            .base_url(format!("{}/api/v2", server.uri()))
            .agent_name("Planner"),
        config,
    )
    .expect("client")
}

fn fast_polling() -> ClientConfig {
    ClientConfig::default().poll_interval(Duration::from_millis(20))
}

fn event_stream(frames: &[&str]) -> ResponseTemplate {
    let body: String = frames.iter().map(|f| format!("data: {f}\n\n")).collect();
    ResponseTemplate::new(200).set_body_raw(body, "text/event-stream")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn poll_mode_submits_a_form_and_polls_until_completed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v2/tasks"))
        .and(header("authorization", "Bearer test-token"))
        .and(body_string_contains("name=\"agent_name\""))
        .and(body_string_contains("name=\"prompt\""))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"taskId":"abc"}"#))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/tasks/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/tasks/abc"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"status":{"state":"completed","message":{"parts":[{"text":"hi"}]}}}"#,
        ))
        .mount(&server)
        .await;

    let mut run = client(&server, fast_polling()).await.run("hello");
    let mut events = Vec::new();
    while let Some(event) = run.next_event().await {
        events.push(event);
    }

    assert_eq!(
        events,
        vec![LifecycleEvent::Completed {
            task_id: TaskId::new("abc"),
            message: NormalizedMessage::agent("hi"),
        }]
    );
    assert_eq!(run.task_id(), Some(TaskId::new("abc")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn poll_mode_submission_is_multipart_form_data() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v2/tasks"))
        .respond_with(ResponseTemplate::new(500).set_body_string("stop here"))
        .expect(1)
        .mount(&server)
        .await;

    let result = client(&server, fast_polling())
        .await
        .run("forecast line 2")
        .collect_message()
        .await;
    assert!(matches!(
        result,
        Err(ClientError::RunFailed(TaskFailure::SubmissionFailed { status_code: 500, .. }))
    ));

    let requests = server.received_requests().await.expect("request recording");
    assert_eq!(requests.len(), 1);
    let content_type = requests[0]
        .headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(content_type.starts_with("multipart/form-data"), "{content_type}");

    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("name=\"agent_name\"\r\n\r\nPlanner\r\n"), "{body}");
    assert!(body.contains("name=\"prompt\"\r\n\r\nforecast line 2\r\n"), "{body}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn rejected_submission_fails_without_polling() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v2/tasks"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let result = client(&server, fast_polling())
        .await
        .run("hello")
        .collect_message()
        .await;

    assert_eq!(
        result,
        Err(ClientError::RunFailed(TaskFailure::SubmissionFailed {
            status_code: 500,
            body: "boom".into(),
        }))
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unreachable_gateway_is_a_transport_failure() {
    let config = GatewayConfig::new(TOKEN)
        .base_url("http://127.0.0.1:1/api/v2")
        .request_timeout(Duration::from_secs(5));

    let result = TaskClient::from_config(config, fast_polling())
        .expect("client")
        .run("hello")
        .collect_message()
        .await;

    assert!(matches!(
        result,
        Err(ClientError::RunFailed(TaskFailure::Transport { .. }))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stream_mode_subscribes_and_completes_on_terminal_frame() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v2/message:stream"))
        .and(header("authorization", "Bearer test-token"))
        .and(body_partial_json(serde_json::json!({
            "method": "message/stream",
            "params": { "message": { "parts": [{ "kind": "text", "text": "hello" }] } }
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"{"jsonrpc":"2.0","result":{"id":"s-9"}}"#),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/sse/subscribe/s-9"))
        .and(header("accept", "text/event-stream"))
        .respond_with(event_stream(&[
            r#"{"result":{"kind":"status-update","status":{"state":"working"}}}"#,
            r#"{"result":{"kind":"status-update","final":true,"status":{"state":"completed","message":{"parts":[{"text":"forecast ready"}]}}}}"#,
        ]))
        .expect(1)
        .mount(&server)
        .await;

    let mut run = client(&server, ClientConfig::default().mode(ObservationMode::Stream))
        .await
        .run("hello");
    let mut events = Vec::new();
    while let Some(event) = run.next_event().await {
        events.push(event);
    }

    assert_eq!(events.len(), 2);
    assert!(matches!(&events[0], LifecycleEvent::Progress { task_id, .. } if task_id.as_str() == "s-9"));
    assert_eq!(
        events[1],
        LifecycleEvent::Completed {
            task_id: TaskId::new("s-9"),
            message: NormalizedMessage::agent("forecast ready"),
        }
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stream_closing_early_fails_the_task() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v2/message:stream"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"id":"s-1"}"#))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/sse/subscribe/s-1"))
        .respond_with(event_stream(&[r#"{"kind":"message","parts":[{"text":"partial"}]}"#]))
        .mount(&server)
        .await;

    let result = client(&server, ClientConfig::default().mode(ObservationMode::Stream))
        .await
        .run("hello")
        .collect_message()
        .await;
    assert_eq!(result, Err(ClientError::RunFailed(TaskFailure::StreamClosed)));

    let result = client(
        &server,
        ClientConfig::default()
            .mode(ObservationMode::Stream)
            .stream_close_policy(StreamClosePolicy::CompleteWithLastText),
    )
    .await
    .run("hello")
    .collect_message()
    .await;
    assert_eq!(result, Ok(NormalizedMessage::agent("partial")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn refused_subscription_fails_the_task() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v2/message:stream"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"id":"s-2"}"#))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/sse/subscribe/s-2"))
        .respond_with(ResponseTemplate::new(404).set_body_string("unknown task"))
        .mount(&server)
        .await;

    let result = client(&server, ClientConfig::default().mode(ObservationMode::Stream))
        .await
        .run("hello")
        .collect_message()
        .await;

    assert!(matches!(
        result,
        Err(ClientError::RunFailed(TaskFailure::Transport { message })) if message.contains("404")
    ));
}
