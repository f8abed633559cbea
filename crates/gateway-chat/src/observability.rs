use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

static INIT: OnceCell<()> = OnceCell::new();

const DEFAULT_FILTER: &str = "warn";
const VERBOSE_FILTER: &str = "warn,gateway_task_client=debug";
const DEFAULT_LOG_FILE: &str = "gateway-chat.logs.jsonl";

/// Where diagnostics go and how much of them.
///
/// Replies go to stdout, so diagnostics use stderr unless a JSONL file is set.
#[derive(Debug, Default, PartialEq)]
pub struct LogSettings {
    /// Explicit filter directive (`GATEWAY_LOG_LEVEL`, then `RUST_LOG`).
    pub directive: Option<String>,
    /// JSONL destination (`GATEWAY_JSON_LOG_PATH`).
    pub json_path: Option<PathBuf>,
    /// `--verbose`: client lifecycle logs at `debug` when no directive is set.
    pub verbose: bool,
}

impl LogSettings {
    pub fn resolve(verbose: bool, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_blank = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        Self {
            directive: non_blank("GATEWAY_LOG_LEVEL").or_else(|| non_blank("RUST_LOG")),
            json_path: non_blank("GATEWAY_JSON_LOG_PATH").map(PathBuf::from),
            verbose,
        }
    }

    /// Builds the filter. An unparsable directive falls back to the default.
    pub fn filter(&self) -> EnvFilter {
        let fallback = if self.verbose {
            VERBOSE_FILTER
        } else {
            DEFAULT_FILTER
        };
        self.directive
            .as_deref()
            .and_then(|directive| EnvFilter::try_new(directive).ok())
            .unwrap_or_else(|| EnvFilter::new(fallback))
    }
}

fn split_log_path(path: &Path) -> (PathBuf, String) {
    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(DEFAULT_LOG_FILE)
        .to_string();
    (dir, file_name)
}

/// Installs the global subscriber. Later calls do nothing.
pub fn init_observability(settings: &LogSettings) {
    INIT.get_or_init(|| {
        let registry = tracing_subscriber::registry().with(settings.filter());
        match &settings.json_path {
            Some(path) => {
                let (dir, file_name) = split_log_path(path);
                let _ = std::fs::create_dir_all(&dir);
                let json_layer = tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_writer(tracing_appender::rolling::never(dir, file_name));
                let _ = registry.with(json_layer).try_init();
            }
            None => {
                let console_layer = tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr);
                let _ = registry.with(console_layer).try_init();
            }
        }
    });
}
