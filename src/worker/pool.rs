//! Worker pool - fleet-wide lifecycle fan-out
//!
//! A fixed array of `WorkerThread` slots sharing one `PipelineHost`. The pool
//! adds no policy beyond the single-worker contract: start is all-or-nothing,
//! reload and stop fan out to every member.

use super::{EventLoopHandle, PipelineHost, StopStatus, WorkerThread};
use crate::error::{Error, Result};
use std::sync::Arc;

pub struct WorkerPool {
    workers: Vec<WorkerThread>,
}

impl WorkerPool {
    /// Create `count` worker slots, indexed `0..count`, all building their
    /// hosted pipelines through the same `host`.
    pub fn new(count: usize, host: Arc<dyn PipelineHost>) -> Self {
        let workers = (0..count)
            .map(|index| WorkerThread::new(index, host.clone()))
            .collect();
        Self { workers }
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Handle to one member's event loop.
    pub fn handle(&self, index: usize) -> Option<EventLoopHandle> {
        self.workers.get(index).and_then(WorkerThread::handle)
    }

    /// Start every worker. If any slot fails, the already-started members are
    /// force-stopped and the failing index is reported.
    pub fn start(&mut self) -> Result<()> {
        for i in 0..self.workers.len() {
            if !self.workers[i].start() {
                for worker in &mut self.workers[..i] {
                    worker.stop(true);
                }
                return Err(Error::WorkerStart { index: i });
            }
        }
        Ok(())
    }

    /// Post a reload to every worker.
    pub fn reload(&self) {
        for worker in &self.workers {
            worker.reload();
        }
    }

    /// Stop every worker, returning the worst member status.
    pub fn stop(&mut self, force: bool) -> StopStatus {
        let mut status = StopStatus::Clean;
        for worker in &mut self.workers {
            status = status.worst(worker.stop(force));
        }
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Pipeline;

    struct EmptyHost;

    impl PipelineHost for EmptyHost {
        fn build(&self, _ctx: &EventLoopHandle) -> Result<Vec<Pipeline>> {
            Ok(Vec::new())
        }
    }

    struct FailOnIndexHost {
        failing: usize,
    }

    impl PipelineHost for FailOnIndexHost {
        fn build(&self, ctx: &EventLoopHandle) -> Result<Vec<Pipeline>> {
            if ctx.index() == self.failing {
                return Err(Error::PipelineBuild {
                    pipeline: "sink".into(),
                    reason: "bad slot".into(),
                });
            }
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_pool_start_reload_stop() {
        let mut pool = WorkerPool::new(3, Arc::new(EmptyHost));
        assert_eq!(pool.len(), 3);

        pool.start().unwrap();
        for i in 0..3 {
            let handle = pool.handle(i).unwrap();
            assert_eq!(handle.index(), i);
        }

        pool.reload();
        assert!(pool.stop(false).is_clean());
    }

    #[test]
    fn test_pool_start_reports_failing_slot() {
        let mut pool = WorkerPool::new(3, Arc::new(FailOnIndexHost { failing: 1 }));
        match pool.start() {
            Err(Error::WorkerStart { index }) => assert_eq!(index, 1),
            other => panic!("expected WorkerStart error, got {:?}", other.err()),
        }
    }
}
