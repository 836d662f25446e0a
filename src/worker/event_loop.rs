//! Event loop handle - the capability to host work on one worker's loop
//!
//! Each worker thread drives a single-threaded tokio runtime. The handle is
//! cheap to clone and may be used from any thread: pipeline layouts use it to
//! spawn their processing task onto the owning loop, and record producers
//! keep only the resulting `Pipeline` handle.

use super::gate::DrainGate;
use crate::constants::PIPELINE_CHANNEL_CAPACITY;
use crate::pipeline::Pipeline;
use bytes::Bytes;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Handle to one worker's event loop (I/O execution context).
#[derive(Clone)]
pub struct EventLoopHandle {
    index: usize,
    runtime: tokio::runtime::Handle,
    gate: Arc<DrainGate>,
}

impl EventLoopHandle {
    pub(crate) fn new(
        index: usize,
        runtime: tokio::runtime::Handle,
        gate: Arc<DrainGate>,
    ) -> Self {
        Self {
            index,
            runtime,
            gate,
        }
    }

    /// Index of the worker that owns this loop.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of pipelines currently executing on this loop.
    pub fn pending_pipelines(&self) -> usize {
        self.gate.pending()
    }

    /// Spawn a pipeline task onto this loop and return the feed handle.
    ///
    /// `run` receives the record queue and is driven on the owning worker's
    /// loop. The pipeline counts toward the worker's drain gate from this
    /// call until the task finishes; the task sees the queue close once every
    /// `Pipeline` handle is dropped, drains what is already buffered, and
    /// exits.
    pub fn spawn_pipeline<F, Fut>(&self, name: &str, run: F) -> Pipeline
    where
        F: FnOnce(mpsc::Receiver<Bytes>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<Bytes>(PIPELINE_CHANNEL_CAPACITY);
        let permit = self.gate.clone().enter();
        let task = run(rx);
        self.runtime.spawn(async move {
            task.await;
            drop(permit);
        });
        Pipeline::new(name.into(), tx)
    }

    /// Spawn a plain task onto this loop.
    ///
    /// The task is not tracked by the drain gate; it is abandoned when the
    /// worker's runtime shuts down. Use for timers and other housekeeping
    /// that must not hold up a graceful stop.
    pub fn spawn<Fut>(&self, task: Fut)
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.runtime.spawn(task);
    }
}
