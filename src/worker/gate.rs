//! Drain gate - pipeline completion accounting for graceful stop
//!
//! A mutex/condvar pair around a single integer: every pipeline hosted on a
//! worker holds a `DrainPermit` for as long as it executes, and a stopping
//! thread blocks in `wait_idle` until the count reaches zero. The permit is
//! RAII so the count stays balanced on success, error, and unwind alike.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;

/// Counts pipelines in flight on one worker's event loop.
pub struct DrainGate {
    count: Mutex<usize>,
    cond: Condvar,
}

impl DrainGate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            count: Mutex::new(0),
            cond: Condvar::new(),
        })
    }

    /// Register one executing pipeline. The returned permit decrements the
    /// count when dropped.
    pub fn enter(self: Arc<Self>) -> DrainPermit {
        *self.count.lock() += 1;
        DrainPermit { gate: self }
    }

    /// Number of pipelines currently in flight.
    pub fn pending(&self) -> usize {
        *self.count.lock()
    }

    /// Block the calling thread until no pipelines are in flight.
    pub fn wait_idle(&self) {
        let mut count = self.count.lock();
        while *count > 0 {
            self.cond.wait(&mut count);
        }
    }

    fn leave(&self) {
        let mut count = self.count.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.cond.notify_all();
        }
    }
}

/// RAII handle for one executing pipeline.
pub struct DrainPermit {
    gate: Arc<DrainGate>,
}

impl Drop for DrainPermit {
    fn drop(&mut self) {
        self.gate.leave();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::{Duration, Instant};

    #[test]
    fn test_permit_balance() {
        let gate = DrainGate::new();
        assert_eq!(gate.pending(), 0);

        let a = gate.clone().enter();
        let b = gate.clone().enter();
        assert_eq!(gate.pending(), 2);

        drop(a);
        assert_eq!(gate.pending(), 1);
        drop(b);
        assert_eq!(gate.pending(), 0);
    }

    #[test]
    fn test_wait_idle_returns_immediately_when_idle() {
        let gate = DrainGate::new();
        gate.wait_idle();
    }

    #[test]
    fn test_wait_idle_blocks_until_last_permit_dropped() {
        let gate = DrainGate::new();
        let permit = gate.clone().enter();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            drop(permit);
        });

        let start = Instant::now();
        gate.wait_idle();
        assert!(start.elapsed() >= Duration::from_millis(40));
        assert_eq!(gate.pending(), 0);

        handle.join().unwrap();
    }

    #[test]
    fn test_concurrent_permits_from_many_threads() {
        let gate = DrainGate::new();
        let mut handles = Vec::new();

        for _ in 0..8 {
            let gate = gate.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    let _permit = gate.clone().enter();
                }
            }));
        }

        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(gate.pending(), 0);
    }

    #[test]
    fn test_permit_released_on_unwind() {
        let gate = DrainGate::new();
        let permit = gate.clone().enter();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _held = permit;
            panic!("pipeline failed");
        }));

        assert!(result.is_err());
        assert_eq!(gate.pending(), 0);
    }
}
