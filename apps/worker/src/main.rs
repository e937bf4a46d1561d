//! Wardlog reconciliation worker runtime.
//!
//! Replays an NDJSON feed of entity mutations and audit trail entries from
//! stdin and writes reconciled log records to the configured sink.

#![forbid(unsafe_code)]

mod feed;

use std::env;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use wardlog_application::{
    Clock, LogSink, ReconciliationConfig, ReconciliationEngine, WindowBoundary,
};
use wardlog_core::{AppError, AppResult};
use wardlog_infrastructure::{HttpLogSink, InMemoryAuditTrail, JsonLinesLogSink, SystemClock};

use crate::feed::FeedEvent;

#[derive(Debug, Clone)]
struct WorkerConfig {
    reconciliation: ReconciliationConfig,
    sink_webhook_url: Option<String>,
    sink_max_attempts: u8,
    sink_retry_backoff_ms: u64,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = WorkerConfig::load()?;
    let audit_trail = Arc::new(InMemoryAuditTrail::new());
    let clock = Arc::new(SystemClock);
    let sink = build_sink(&config)?;
    let (engine, flush_worker) = ReconciliationEngine::new(
        config.reconciliation.clone(),
        audit_trail.clone(),
        sink,
        clock.clone(),
    )?;
    let flush_task = tokio::spawn(flush_worker.run());

    info!(
        flush_delay_ms = config.reconciliation.flush_delay.as_millis(),
        recency_window_ms = config.reconciliation.recency_window.as_millis(),
        window_boundary = ?config.reconciliation.window_boundary,
        webhook_sink = config.sink_webhook_url.is_some(),
        "wardlog-worker started"
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut line_number = 0_u64;
    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|error| AppError::Internal(format!("failed to read feed: {error}")))?
    {
        line_number = line_number.saturating_add(1);
        if line.trim().is_empty() {
            continue;
        }

        let event = match feed::parse_line(&line) {
            Ok(event) => event,
            Err(error) => {
                warn!(line = line_number, error = %error, "skipping malformed feed line");
                continue;
            }
        };

        match event {
            FeedEvent::ChannelUpdate(mutation) => {
                engine
                    .handle_channel_update(mutation.into_notification(clock.now()))
                    .await;
            }
            FeedEvent::MemberUpdate(mutation) => {
                engine
                    .handle_member_update(mutation.into_notification(clock.now()))
                    .await;
            }
            FeedEvent::AuditEntry(entry) => {
                let (guild_id, entry) = entry.into_entry(clock.now());
                audit_trail.record(guild_id, entry).await;
            }
        }
    }

    info!(
        lines = line_number,
        pending = engine.pending_episodes().await,
        "feed closed, waiting for pending episodes"
    );
    tokio::time::sleep(engine.flush_delay()).await;

    let drained = engine.shutdown().await;
    if let Err(error) = flush_task.await {
        warn!(error = %error, "flush worker task failed");
    }
    info!(drained = drained.len(), "wardlog-worker stopped");

    Ok(())
}

fn build_sink(config: &WorkerConfig) -> AppResult<Arc<dyn LogSink>> {
    let Some(webhook_url) = config.sink_webhook_url.as_deref() else {
        return Ok(Arc::new(JsonLinesLogSink::stdout()));
    };

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .build()
        .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))?;

    Ok(Arc::new(HttpLogSink::new(
        http_client,
        webhook_url,
        config.sink_max_attempts,
        config.sink_retry_backoff_ms,
    )))
}

impl WorkerConfig {
    fn load() -> AppResult<Self> {
        let defaults = ReconciliationConfig::default();
        let window_boundary = if parse_env_bool("WARDLOG_WINDOW_INCLUSIVE", false)? {
            WindowBoundary::Inclusive
        } else {
            WindowBoundary::Exclusive
        };

        let reconciliation = ReconciliationConfig {
            flush_delay: parse_env_duration_ms("WARDLOG_FLUSH_DELAY_MS", defaults.flush_delay)?,
            recency_window: parse_env_duration_ms(
                "WARDLOG_RECENCY_WINDOW_MS",
                defaults.recency_window,
            )?,
            window_boundary,
            audit_query_timeout: parse_env_duration_ms(
                "WARDLOG_AUDIT_TIMEOUT_MS",
                defaults.audit_query_timeout,
            )?,
            audit_propagation_latency: parse_env_duration_ms(
                "WARDLOG_AUDIT_LATENCY_MS",
                defaults.audit_propagation_latency,
            )?,
            notification_jitter: parse_env_duration_ms(
                "WARDLOG_NOTIFICATION_JITTER_MS",
                defaults.notification_jitter,
            )?,
            severity: defaults.severity,
        };
        reconciliation.validate()?;

        let sink_webhook_url = env::var("WARDLOG_SINK_WEBHOOK_URL")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());
        let sink_max_attempts = parse_env_u8("WARDLOG_SINK_MAX_ATTEMPTS", 3)?;
        let sink_retry_backoff_ms = parse_env_u64("WARDLOG_SINK_RETRY_BACKOFF_MS", 250)?;

        if sink_max_attempts == 0 {
            return Err(AppError::Validation(
                "WARDLOG_SINK_MAX_ATTEMPTS must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            reconciliation,
            sink_webhook_url,
            sink_max_attempts,
            sink_retry_backoff_ms,
        })
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn parse_env_u8(name: &str, default: u8) -> AppResult<u8> {
    match env::var(name) {
        Ok(value) => value.parse::<u8>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}

fn parse_env_u64(name: &str, default: u64) -> AppResult<u64> {
    match env::var(name) {
        Ok(value) => value.parse::<u64>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}

fn parse_env_duration_ms(name: &str, default: Duration) -> AppResult<Duration> {
    let default_ms = u64::try_from(default.as_millis()).unwrap_or(u64::MAX);
    parse_env_u64(name, default_ms).map(Duration::from_millis)
}

fn parse_env_bool(name: &str, default: bool) -> AppResult<bool> {
    match env::var(name) {
        Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" => Ok(false),
            _ => Err(AppError::Validation(format!(
                "invalid {name} value '{value}': expected true or false"
            ))),
        },
        Err(_) => Ok(default),
    }
}
