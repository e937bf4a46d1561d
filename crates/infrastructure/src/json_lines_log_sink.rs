use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt, Stdout};
use tokio::sync::Mutex;
use wardlog_application::LogSink;
use wardlog_core::{AppError, AppResult};
use wardlog_domain::LogRecord;

/// Log sink writing one JSON document per line.
pub struct JsonLinesLogSink<W> {
    writer: Mutex<W>,
}

impl JsonLinesLogSink<Stdout> {
    /// Creates a sink writing to standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl<W> JsonLinesLogSink<W> {
    /// Creates a sink over any async writer.
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

#[async_trait]
impl<W> LogSink for JsonLinesLogSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn append(&self, record: LogRecord) -> AppResult<()> {
        let mut line = serde_json::to_vec(&record).map_err(|error| {
            AppError::Internal(format!(
                "failed to serialize log record '{}': {error}",
                record.record_id
            ))
        })?;
        line.push(b'\n');

        let mut writer = self.writer.lock().await;
        writer
            .write_all(&line)
            .await
            .map_err(|error| AppError::Internal(format!("failed to write log record: {error}")))?;
        writer
            .flush()
            .await
            .map_err(|error| AppError::Internal(format!("failed to flush log sink: {error}")))
    }
}
