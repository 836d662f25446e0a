//! Log delivery targets
//!
//! A target accepts a binary record and disposes of it. The closed set of
//! variants:
//! - `StdoutTarget` - direct pass-through to a process output stream
//! - `FileTarget` - hands records to a file-append pipeline
//! - `HttpTarget` - batches records and ships them over HTTP (see `http`)

use super::http::HttpTarget;
use crate::pipeline::{FileAppendLayout, Layout, Pipeline};
use crate::worker::EventLoopHandle;
use bytes::Bytes;
use parking_lot::Mutex;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One delivery target owned by a logger.
pub enum Target {
    Stdout(StdoutTarget),
    File(FileTarget),
    Http(HttpTarget),
}

impl Target {
    pub fn write(&self, record: &Bytes) {
        match self {
            Target::Stdout(t) => t.write(record),
            Target::File(t) => t.write(record),
            Target::Http(t) => t.write(record),
        }
    }
}

/// Direct pass-through to a process output stream.
pub struct StdoutTarget {
    stream: Mutex<Box<dyn Write + Send>>,
}

impl StdoutTarget {
    pub fn new() -> Self {
        Self::with_stream(Box::new(std::io::stdout()))
    }

    /// Bind to an arbitrary stream (a captured descriptor, a test sink).
    pub fn with_stream(stream: Box<dyn Write + Send>) -> Self {
        Self {
            stream: Mutex::new(stream),
        }
    }

    pub fn write(&self, record: &Bytes) {
        let mut stream = self.stream.lock();
        let _ = stream.write_all(record);
        let _ = stream.flush();
    }
}

impl Default for StdoutTarget {
    fn default() -> Self {
        Self::new()
    }
}

/// Hands records to a file-append pipeline hosted on a worker loop.
///
/// Retry/reopen policy on I/O failure belongs to the pipeline engine; this
/// type's contract is only "feed the bytes to the file pipeline".
pub struct FileTarget {
    layout: Arc<FileAppendLayout>,
    pipeline: Pipeline,
}

impl FileTarget {
    pub fn new(path: impl Into<PathBuf>, ctx: &EventLoopHandle) -> Self {
        let layout = FileAppendLayout::new(path);
        let pipeline = layout.clone().instantiate(ctx);
        Self { layout, pipeline }
    }

    pub fn path(&self) -> &Path {
        self.layout.path()
    }

    pub fn write(&self, record: &Bytes) {
        self.pipeline.feed(record.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::{PipelineHost, WorkerThread};

    struct EmptyHost;

    impl PipelineHost for EmptyHost {
        fn build(&self, _ctx: &EventLoopHandle) -> crate::Result<Vec<Pipeline>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_file_target_delivers_through_pipeline() {
        let dir = std::env::temp_dir().join(format!(
            "pipehost-target-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("target.log");

        let mut worker = WorkerThread::new(0, Arc::new(EmptyHost));
        assert!(worker.start());
        let ctx = worker.handle().unwrap();

        let target = Target::File(FileTarget::new(&path, &ctx));
        target.write(&Bytes::from_static(b"hello\n"));
        target.write(&Bytes::from_static(b"world\n"));
        drop(target);

        assert!(worker.stop(false).is_clean());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello\nworld\n");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_file_target_reports_path() {
        let mut worker = WorkerThread::new(0, Arc::new(EmptyHost));
        assert!(worker.start());
        let ctx = worker.handle().unwrap();

        let target = FileTarget::new("/tmp/pipehost-path-check.log", &ctx);
        assert_eq!(target.path(), Path::new("/tmp/pipehost-path-check.log"));

        drop(target);
        assert!(worker.stop(false).is_clean());
    }
}
