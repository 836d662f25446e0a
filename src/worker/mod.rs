//! Worker thread lifecycle
//!
//! A `WorkerThread` owns one OS thread driving a single-threaded event loop
//! that hosts data-processing pipelines. The lifecycle contract:
//!
//! - `start` spawns the thread, builds the loop and the hosted pipeline set,
//!   and reports success only once the loop is live (or failed).
//! - `reload` swaps the hosted pipeline set in place without touching the
//!   thread or the loop.
//! - `stop` drains in-flight pipelines before returning, or abandons them
//!   when forced.

mod event_loop;
mod gate;
mod pool;

pub use event_loop::EventLoopHandle;
pub use gate::{DrainGate, DrainPermit};
pub use pool::WorkerPool;

use crate::constants::DRAIN_POLL_INTERVAL_MS;
use crate::pipeline::Pipeline;
use crate::Result;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc;

/// Builds the pipeline set a worker hosts.
///
/// Called on the worker's own thread at start and again on every reload, so
/// an implementation reads whatever configuration is current at call time.
pub trait PipelineHost: Send + Sync + 'static {
    fn build(&self, ctx: &EventLoopHandle) -> Result<Vec<Pipeline>>;
}

/// Outcome of `WorkerThread::stop`.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopStatus {
    /// All in-flight pipelines drained before the loop was torn down
    Clean = 0,
    /// The worker had already failed to start
    StartupFailed = 1,
    /// Forced termination abandoned pipelines still in flight
    Aborted = 2,
}

impl StopStatus {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn is_clean(self) -> bool {
        matches!(self, StopStatus::Clean)
    }

    fn worst(self, other: StopStatus) -> StopStatus {
        if other.code() > self.code() {
            other
        } else {
            self
        }
    }
}

enum Command {
    Reload,
    Stop,
}

#[derive(Default)]
struct Flags {
    started: bool,
    failed: bool,
    shutdown: bool,
    forced: bool,
}

struct Shared {
    flags: Mutex<Flags>,
    cond: Condvar,
    handle: Mutex<Option<EventLoopHandle>>,
}

impl Shared {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            flags: Mutex::new(Flags::default()),
            cond: Condvar::new(),
            handle: Mutex::new(None),
        })
    }

    fn mark_started(&self) {
        self.flags.lock().started = true;
        self.cond.notify_all();
    }

    fn fail(&self) {
        self.flags.lock().failed = true;
        self.cond.notify_all();
    }

    fn is_forced(&self) -> bool {
        self.flags.lock().forced
    }
}

/// One worker slot: an OS thread, its event loop, and the pipelines it hosts.
pub struct WorkerThread {
    index: usize,
    host: Arc<dyn PipelineHost>,
    gate: Arc<DrainGate>,
    shared: Arc<Shared>,
    control: Option<mpsc::UnboundedSender<Command>>,
    thread: Option<thread::JoinHandle<()>>,
}

impl WorkerThread {
    pub fn new(index: usize, host: Arc<dyn PipelineHost>) -> Self {
        Self {
            index,
            host,
            gate: DrainGate::new(),
            shared: Shared::new(),
            control: None,
            thread: None,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Handle to this worker's loop, available once `start` has returned true.
    pub fn handle(&self) -> Option<EventLoopHandle> {
        self.shared.handle.lock().clone()
    }

    /// Number of pipelines currently executing on this worker.
    pub fn pending_pipelines(&self) -> usize {
        self.gate.pending()
    }

    /// Spawn the worker thread and build its hosted pipelines.
    ///
    /// Blocks until the loop is live or creation failed; returns `false` on
    /// failure (the slot is terminal - it is not retried here) and on
    /// re-entry for an instance that already started.
    pub fn start(&mut self) -> bool {
        {
            let flags = self.shared.flags.lock();
            if flags.started || flags.failed || self.thread.is_some() {
                tracing::warn!(index = self.index, "start called on a live worker");
                return false;
            }
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let index = self.index;
        let host = self.host.clone();
        let shared = self.shared.clone();
        let gate = self.gate.clone();

        let spawned = thread::Builder::new()
            .name(format!("pipehost-worker-{}", index))
            .spawn(move || run_worker(index, host, shared, gate, rx));

        match spawned {
            Ok(handle) => self.thread = Some(handle),
            Err(e) => {
                tracing::error!(index, error = %e, "worker thread creation failed");
                self.shared.fail();
                return false;
            }
        }
        self.control = Some(tx);

        let mut flags = self.shared.flags.lock();
        while !flags.started && !flags.failed {
            self.shared.cond.wait(&mut flags);
        }
        !flags.failed
    }

    /// Ask the worker to discard its hosted pipelines and rebuild them from
    /// current configuration.
    ///
    /// Posted to the worker's loop; returns before the rebuild completes, so
    /// callers must not assume the new pipelines are active on return. Safe
    /// to call from any thread.
    pub fn reload(&self) {
        if self.shared.flags.lock().shutdown {
            tracing::warn!(index = self.index, "reload ignored, worker shutting down");
            return;
        }
        match &self.control {
            Some(tx) => {
                if tx.send(Command::Reload).is_err() {
                    tracing::warn!(index = self.index, "reload ignored, worker loop gone");
                }
            }
            None => tracing::warn!(index = self.index, "reload ignored, worker not started"),
        }
    }

    /// Stop the worker.
    ///
    /// Graceful (`force = false`): blocks the calling thread until every
    /// pipeline on this worker has finished, then joins the thread. A
    /// pipeline only finishes once all its feed handles are dropped, so
    /// owners (loggers, targets) must be torn down first or the call will
    /// wait for them.
    ///
    /// Forced (`force = true`): tears the loop down immediately, abandoning
    /// in-flight pipelines, and returns `Aborted` if any were pending.
    pub fn stop(&mut self, force: bool) -> StopStatus {
        {
            let mut flags = self.shared.flags.lock();
            if flags.failed {
                drop(flags);
                self.join();
                return StopStatus::StartupFailed;
            }
            if self.thread.is_none() {
                return StopStatus::Clean;
            }
            flags.shutdown = true;
            if force {
                flags.forced = true;
            }
        }

        let abandoned = self.gate.pending();
        if let Some(tx) = &self.control {
            let _ = tx.send(Command::Stop);
        }

        if !force {
            self.gate.wait_idle();
        }
        self.join();

        if force && abandoned > 0 {
            StopStatus::Aborted
        } else {
            StopStatus::Clean
        }
    }

    fn join(&mut self) {
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
        self.control = None;
    }
}

impl Drop for WorkerThread {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.stop(true);
        }
    }
}

/// Body of the worker OS thread: build the loop, host pipelines, serve
/// lifecycle commands, then drain or abandon.
fn run_worker(
    index: usize,
    host: Arc<dyn PipelineHost>,
    shared: Arc<Shared>,
    gate: Arc<DrainGate>,
    mut control: mpsc::UnboundedReceiver<Command>,
) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!(index, error = %e, "event loop creation failed");
            shared.fail();
            return;
        }
    };

    let ctx = EventLoopHandle::new(index, runtime.handle().clone(), gate.clone());

    let live = runtime.block_on(async {
        let mut hosted = match host.build(&ctx) {
            Ok(pipelines) => pipelines,
            Err(e) => {
                tracing::error!(index, error = %e, "pipeline build failed");
                shared.fail();
                return false;
            }
        };
        tracing::debug!(index, pipelines = hosted.len(), "worker started");
        *shared.handle.lock() = Some(ctx.clone());
        shared.mark_started();

        loop {
            match control.recv().await {
                Some(Command::Reload) => {
                    // Discard first so the old set starts draining while the
                    // new one is built.
                    hosted.clear();
                    match host.build(&ctx) {
                        Ok(pipelines) => {
                            tracing::info!(index, pipelines = pipelines.len(), "worker reloaded");
                            hosted = pipelines;
                        }
                        Err(e) => {
                            tracing::warn!(index, error = %e, "reload failed, hosting no pipelines");
                        }
                    }
                }
                Some(Command::Stop) | None => break,
            }
        }
        drop(hosted);
        true
    });

    if !live {
        // Partial builds are cancelled when the runtime drops.
        return;
    }

    if shared.is_forced() {
        runtime.shutdown_background();
    } else {
        // Keep the loop running until every pipeline task has drained; the
        // stopping thread is blocked on the gate's condvar meanwhile.
        runtime.block_on(async {
            while gate.pending() > 0 {
                tokio::time::sleep(Duration::from_millis(DRAIN_POLL_INTERVAL_MS)).await;
            }
        });
    }
}
