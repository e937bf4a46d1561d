use std::time::Duration;

use async_trait::async_trait;
use wardlog_application::LogSink;
use wardlog_core::{AppError, AppResult};
use wardlog_domain::LogRecord;

/// Log sink posting each record to a webhook endpoint.
///
/// Every attempt carries the record id as `Idempotency-Key` so receivers can
/// deduplicate retried deliveries.
pub struct HttpLogSink {
    http_client: reqwest::Client,
    endpoint: String,
    max_attempts: u8,
    retry_backoff_ms: u64,
}

impl HttpLogSink {
    /// Creates a new webhook log sink.
    #[must_use]
    pub fn new(
        http_client: reqwest::Client,
        endpoint: impl Into<String>,
        max_attempts: u8,
        retry_backoff_ms: u64,
    ) -> Self {
        Self {
            http_client,
            endpoint: endpoint.into(),
            max_attempts: max_attempts.max(1),
            retry_backoff_ms: retry_backoff_ms.max(50),
        }
    }
}

#[async_trait]
impl LogSink for HttpLogSink {
    async fn append(&self, record: LogRecord) -> AppResult<()> {
        let idempotency_key = record.record_id.to_string();
        let mut attempt = 0_u8;
        let mut last_error: Option<String> = None;

        while attempt < self.max_attempts {
            attempt = attempt.saturating_add(1);
            let response = self
                .http_client
                .post(&self.endpoint)
                .header("Idempotency-Key", idempotency_key.as_str())
                .header("X-Wardlog-Record-Type", record.record_type.as_str())
                .json(&record)
                .send()
                .await;

            match response {
                Ok(response) if response.status().is_success() => return Ok(()),
                Ok(response)
                    if response.status().is_server_error()
                        || response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS =>
                {
                    last_error = Some(format!(
                        "transient HTTP status {} for log record '{idempotency_key}'",
                        response.status()
                    ));
                }
                Ok(response) => {
                    let status = response.status();
                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "<response body unavailable>".to_owned());
                    return Err(AppError::Validation(format!(
                        "log sink rejected record '{idempotency_key}' with status {status}: {body}"
                    )));
                }
                Err(error) => {
                    last_error = Some(format!("log sink transport error: {error}"));
                }
            }

            if attempt < self.max_attempts {
                let delay = self.retry_backoff_ms.saturating_mul(u64::from(attempt));
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
        }

        Err(AppError::Internal(last_error.unwrap_or_else(|| {
            "log sink delivery exhausted retries".to_owned()
        })))
    }
}
