use std::path::Path;
use std::time::Duration;

use gateway_task_client::{ClientConfig, ClientError, GatewayConfig};

use crate::cli::Args;

/// Loads `.env` next to the crate manifest, then from the working directory.
/// Variables already set in the process win.
pub fn load_dotenv() {
    let _ = dotenvy::from_path(Path::new(env!("CARGO_MANIFEST_DIR")).join(".env"));
    dotenvy::dotenv().ok();
}

/// Merges command-line flags over `GATEWAY_*` variables from `lookup`.
pub fn resolve(
    args: &Args,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(GatewayConfig, ClientConfig), ClientError> {
    let gateway = GatewayConfig::from_lookup(|key| {
        let flag = match key {
            "GATEWAY_TOKEN" => args.token.clone(),
            "GATEWAY_BASE_URL" => args.base_url.clone(),
            "GATEWAY_AGENT_NAME" => args.agent_name.clone(),
            _ => None,
        };
        flag.or_else(|| lookup(key))
    })?;

    let mut client = ClientConfig::from_lookup(&lookup)?;
    if let Some(mode) = args.mode {
        client = client.mode(mode);
    }
    if let Some(ms) = args.poll_interval_ms {
        client = client.poll_interval(Duration::from_millis(ms));
    }
    if let Some(policy) = args.close_policy {
        client = client.stream_close_policy(policy);
    }
    Ok((gateway, client))
}

#[cfg(test)]
mod tests {
    use clap::Parser as _;
    use gateway_task_client::{ObservationMode, StreamClosePolicy};

    use super::*;

    fn env(key: &str) -> Option<String> {
        match key {
            "GATEWAY_TOKEN" => Some("from-env".into()),
            "GATEWAY_BASE_URL" => Some("http://gw.internal/api/v2".into()),
            "GATEWAY_MODE" => Some("stream".into()),
            "GATEWAY_STREAM_CLOSE_POLICY" => Some("complete".into()),
            _ => None,
        }
    }

    #[test]
    fn flags_override_environment() {
        let args = Args::try_parse_from([
            "gateway-chat",
            "--token",
            "from-flag",
            "--mode",
            "poll",
            "--poll-interval-ms",
            "100",
        ])
        .expect("args");
        let (gateway, client) = resolve(&args, env).expect("config");

        assert_eq!(gateway.token, "from-flag");
        assert_eq!(gateway.base_url, "http://gw.internal/api/v2");
        assert_eq!(client.mode, ObservationMode::Poll);
        assert_eq!(client.poll_interval, Duration::from_millis(100));
        assert_eq!(client.stream_close_policy, StreamClosePolicy::CompleteWithLastText);
    }

    #[test]
    fn missing_token_is_a_config_error() {
        let args = Args::try_parse_from(["gateway-chat"]).expect("args");
        assert!(matches!(
            resolve(&args, |_| None),
            Err(ClientError::Config(msg)) if msg.contains("GATEWAY_TOKEN")
        ));
    }
}
