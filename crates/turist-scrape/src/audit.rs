//! JSONL run log: append-only record of every progress event.
//!
//! - One JSON object per line, each stamped with an RFC 3339 time
//! - Rotated when the file exceeds [`MAX_LOG_SIZE`] (10 MB)
//! - Rotated files named `.1`, `.2`, `.3` (oldest dropped)

use crate::progress::{ProgressEvent, ProgressReceiver};
use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Maximum run log size before rotation (10 MB).
pub const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Maximum number of rotated log files to keep.
pub const MAX_ROTATIONS: u32 = 3;

#[derive(Serialize)]
struct Entry<'a> {
    timestamp: String,
    #[serde(flatten)]
    event: &'a ProgressEvent,
}

/// Append-only JSONL run log with automatic rotation.
pub struct RunLog {
    file: File,
    path: PathBuf,
    max_size: u64,
    /// Approximate current size.
    current_size: u64,
}

impl RunLog {
    /// Open or create the run log file.
    pub fn open(path: &Path) -> Result<Self> {
        Self::with_limit(path, MAX_LOG_SIZE)
    }

    /// Open with a custom rotation threshold.
    pub fn with_limit(path: &Path, max_size: u64) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let file = open_append(path)?;
        let current_size = file.metadata().map(|m| m.len()).unwrap_or(0);

        Ok(Self {
            file,
            path: path.to_path_buf(),
            max_size,
            current_size,
        })
    }

    /// Append one event.
    pub fn log(&mut self, event: &ProgressEvent) -> Result<()> {
        if self.current_size >= self.max_size {
            self.rotate()?;
        }

        let json = serde_json::to_string(&Entry {
            timestamp: Utc::now().to_rfc3339(),
            event,
        })?;
        writeln!(self.file, "{json}")?;
        self.current_size += json.len() as u64 + 1;
        Ok(())
    }

    /// Drain `rx` into the log until the channel closes.
    pub async fn follow(mut self, mut rx: ProgressReceiver) {
        use tokio::sync::broadcast::error::RecvError;
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Err(e) = self.log(&event) {
                        tracing::warn!("run log write failed: {e:#}");
                    }
                }
                Err(RecvError::Lagged(n)) => {
                    tracing::warn!("run log lagged, {n} events dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
        let _ = self.file.flush();
    }

    /// Rotate: run.jsonl -> run.jsonl.1, .1 -> .2, and so on.
    fn rotate(&mut self) -> Result<()> {
        self.file.flush()?;

        let oldest = rotation_path(&self.path, MAX_ROTATIONS);
        if oldest.exists() {
            let _ = std::fs::remove_file(&oldest);
        }
        for i in (1..MAX_ROTATIONS).rev() {
            let from = rotation_path(&self.path, i);
            if from.exists() {
                let _ = std::fs::rename(&from, rotation_path(&self.path, i + 1));
            }
        }
        let _ = std::fs::rename(&self.path, rotation_path(&self.path, 1));

        self.file = open_append(&self.path).context("failed to reopen run log after rotation")?;
        self.current_size = 0;
        Ok(())
    }
}

fn open_append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open run log: {}", path.display()))
}

/// Path of a rotated log file: `run.jsonl.1`, `run.jsonl.2`, etc.
pub fn rotation_path(base: &Path, index: u32) -> PathBuf {
    let name = format!(
        "{}.{index}",
        base.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("run.jsonl")
    );
    base.with_file_name(name)
}
