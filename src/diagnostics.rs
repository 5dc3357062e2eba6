use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

/// Operator-facing plain-text log.
///
/// Lines are queued on an unbounded channel and appended by a background
/// task, so recording never blocks the caller and write failures stay in
/// that task.
#[derive(Debug, Clone)]
pub struct DiagnosticLog {
    sender: Option<mpsc::UnboundedSender<String>>,
    path: Option<PathBuf>,
}

impl DiagnosticLog {
    /// Spawns the writer task. Must be called from inside a tokio runtime.
    pub fn spawn(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (sender, mut receiver) = mpsc::unbounded_channel::<String>();

        let writer_path = path.clone();
        tokio::spawn(async move {
            while let Some(line) = receiver.recv().await {
                if let Err(e) = append_line(&writer_path, &line).await {
                    tracing::error!(
                        path = %writer_path.display(),
                        error = %e,
                        "Failed to write diagnostic log"
                    );
                }
            }
        });

        tracing::info!(path = %path.display(), "Diagnostic log enabled");
        Self {
            sender: Some(sender),
            path: Some(path),
        }
    }

    /// A log that drops everything. Used where no file is wanted.
    pub fn disabled() -> Self {
        Self {
            sender: None,
            path: None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Queues a timestamped line.
    pub fn record(&self, message: impl AsRef<str>) {
        let Some(sender) = &self.sender else {
            return;
        };

        let line = format!(
            "[{}] {}\n",
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            message.as_ref().trim_end()
        );
        if sender.send(line).is_err() {
            tracing::warn!("Diagnostic log writer has stopped");
        }
    }
}

async fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path).await?;
    file.write_all(line.as_bytes()).await?;
    file.flush().await
}
