//! File-append pipeline layout
//!
//! The data plane must stay responsive, so file output is buffered and
//! flushed when the queue goes idle rather than on every record. An open
//! failure is terminal for the instance: recovery/reopen policy belongs to
//! the embedding engine, not this layout.

use super::{Layout, Pipeline};
use crate::constants::FILE_FLUSH_INTERVAL_MS;
use crate::worker::EventLoopHandle;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncWriteExt, BufWriter};

/// Blueprint for "append every record to this file".
pub struct FileAppendLayout {
    path: PathBuf,
}

impl FileAppendLayout {
    pub fn new(path: impl Into<PathBuf>) -> Arc<Self> {
        Arc::new(Self { path: path.into() })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Layout for FileAppendLayout {
    fn name(&self) -> &str {
        "file-append"
    }

    fn instantiate(self: Arc<Self>, ctx: &EventLoopHandle) -> Pipeline {
        let path = self.path.clone();
        ctx.spawn_pipeline("file-append", move |mut rx| async move {
            let file = match OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .await
            {
                Ok(f) => f,
                Err(e) => {
                    tracing::error!(path = %path.display(), error = %e, "cannot open log file");
                    // Consume and discard so producers see one error, not
                    // a warning per record.
                    while rx.recv().await.is_some() {}
                    return;
                }
            };

            let flush_interval = Duration::from_millis(FILE_FLUSH_INTERVAL_MS);
            let mut writer = BufWriter::new(file);
            let mut dirty = false;

            loop {
                match tokio::time::timeout(flush_interval, rx.recv()).await {
                    Ok(Some(record)) => {
                        if let Err(e) = writer.write_all(&record).await {
                            tracing::warn!(path = %path.display(), error = %e, "write failed");
                        } else {
                            dirty = true;
                        }
                    }
                    Ok(None) => break,
                    Err(_) => {
                        if dirty {
                            let _ = writer.flush().await;
                            dirty = false;
                        }
                    }
                }
            }
            let _ = writer.flush().await;
        })
    }
}
