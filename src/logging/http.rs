//! HTTP batching target - best-effort log shipper
//!
//! Records accumulate in a buffer, each preceded by `separator` except the
//! first. The buffer is wrapped in `head`...`tail` and handed to the HTTP
//! request pipeline when either trigger fires:
//! - size: the buffer reached `size` bytes after an append
//! - time: `interval` elapsed since the last flush
//!
//! `write` never blocks on network I/O; request execution (and its `timeout`
//! deadline) happens on the hosting worker's loop. A failed flush drops the
//! batch and the target keeps buffering - bounded loss over unbounded
//! queueing.

use crate::constants::{
    DEFAULT_BATCH_SIZE, DEFAULT_FLUSH_INTERVAL_SECS, DEFAULT_REQUEST_TIMEOUT_SECS,
};
use crate::error::Result;
use crate::pipeline::{HttpConnectLayout, HttpRequestLayout, Layout, Pipeline};
use crate::worker::EventLoopHandle;
use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

/// Batching and request configuration for an `HttpTarget`.
#[derive(Debug, Clone)]
pub struct HttpTargetOptions {
    /// Byte threshold that triggers an eager flush
    pub size: usize,
    /// Deadline for one outstanding flush request
    pub timeout: Duration,
    /// Maximum time records may sit buffered before a flush is forced
    pub interval: Duration,
    /// Literal prepended to every batch body
    pub head: String,
    /// Literal appended to every batch body
    pub tail: String,
    /// Literal between adjacent records in a batch
    pub separator: String,
    /// Request method
    pub method: String,
    /// Request headers
    pub headers: HashMap<String, String>,
}

impl Default for HttpTargetOptions {
    fn default() -> Self {
        Self {
            size: DEFAULT_BATCH_SIZE,
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            interval: Duration::from_secs(DEFAULT_FLUSH_INTERVAL_SECS),
            head: String::new(),
            tail: String::new(),
            separator: String::new(),
            method: "POST".to_string(),
            headers: HashMap::new(),
        }
    }
}

struct Batch {
    buf: BytesMut,
    last_flush: Instant,
}

struct Inner {
    opts: HttpTargetOptions,
    batch: Mutex<Batch>,
    pipeline: Pipeline,
}

impl Inner {
    /// Take the buffered records, framed as one batch body. Caller holds the
    /// batch lock; the returned body is fed outside it.
    fn take_body(&self, batch: &mut Batch) -> Bytes {
        let mut body = BytesMut::with_capacity(
            self.opts.head.len() + batch.buf.len() + self.opts.tail.len(),
        );
        body.extend_from_slice(self.opts.head.as_bytes());
        body.extend_from_slice(&batch.buf.split());
        body.extend_from_slice(self.opts.tail.as_bytes());
        batch.last_flush = Instant::now();
        body.freeze()
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        // Ship whatever is still buffered before the pipeline goes away.
        let body = {
            let mut batch = self.batch.lock();
            if batch.buf.is_empty() {
                None
            } else {
                Some(self.take_body(&mut batch))
            }
        };
        if let Some(body) = body {
            self.pipeline.feed(body);
        }
    }
}

/// Size/time-bounded batching target shipping records as HTTP requests.
pub struct HttpTarget {
    inner: Arc<Inner>,
}

impl HttpTarget {
    /// Build the connect and request layouts for `url` and instantiate the
    /// request pipeline on `ctx`.
    pub fn new(url: &str, options: HttpTargetOptions, ctx: &EventLoopHandle) -> Result<Self> {
        let connect = HttpConnectLayout::new(url, options.timeout)?;
        let request = HttpRequestLayout::new(connect, &options.method, &options.headers)?;
        let pipeline = request.instantiate(ctx);
        Ok(Self::with_pipeline(options, pipeline, ctx))
    }

    /// Wire the batcher to an already-instantiated pipeline.
    pub(crate) fn with_pipeline(
        options: HttpTargetOptions,
        pipeline: Pipeline,
        ctx: &EventLoopHandle,
    ) -> Self {
        let inner = Arc::new(Inner {
            batch: Mutex::new(Batch {
                buf: BytesMut::new(),
                last_flush: Instant::now(),
            }),
            opts: options,
            pipeline,
        });
        spawn_flush_timer(ctx, &inner);
        Self { inner }
    }

    /// Append one record to the batch buffer; flush if the size threshold is
    /// crossed. Never blocks on I/O.
    pub fn write(&self, record: &Bytes) {
        let body = {
            let mut batch = self.inner.batch.lock();
            if !batch.buf.is_empty() {
                batch.buf.extend_from_slice(self.inner.opts.separator.as_bytes());
            }
            batch.buf.extend_from_slice(record);
            if batch.buf.len() >= self.inner.opts.size {
                Some(self.inner.take_body(&mut batch))
            } else {
                None
            }
        };
        if let Some(body) = body {
            self.inner.pipeline.feed(body);
        }
    }
}

/// Interval trigger: a plain loop task (deliberately not a pipeline, so it
/// cannot hold the worker's drain gate open) keyed by a weak reference that
/// dies with the target.
fn spawn_flush_timer(ctx: &EventLoopHandle, inner: &Arc<Inner>) {
    let weak: Weak<Inner> = Arc::downgrade(inner);
    ctx.spawn(async move {
        loop {
            let (sleep_for, body, pipeline) = {
                let Some(inner) = weak.upgrade() else { break };
                let mut batch = inner.batch.lock();
                let now = Instant::now();
                let due = batch.last_flush + inner.opts.interval;
                if now >= due {
                    let body = if batch.buf.is_empty() {
                        batch.last_flush = now;
                        None
                    } else {
                        Some(inner.take_body(&mut batch))
                    };
                    drop(batch);
                    (inner.opts.interval, body, Some(inner.pipeline.clone()))
                } else {
                    (due - now, None, None)
                }
            };
            if let (Some(body), Some(pipeline)) = (body, pipeline) {
                pipeline.feed(body);
            }
            tokio::time::sleep(sleep_for).await;
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::{PipelineHost, WorkerThread};
    use proptest::prelude::*;

    struct EmptyHost;

    impl PipelineHost for EmptyHost {
        fn build(&self, _ctx: &EventLoopHandle) -> crate::Result<Vec<Pipeline>> {
            Ok(Vec::new())
        }
    }

    fn started_worker() -> WorkerThread {
        let mut worker = WorkerThread::new(0, Arc::new(EmptyHost));
        assert!(worker.start());
        worker
    }

    fn capture_pipeline(ctx: &EventLoopHandle) -> (Pipeline, Arc<Mutex<Vec<Bytes>>>) {
        let captured: Arc<Mutex<Vec<Bytes>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = captured.clone();
        let pipeline = ctx.spawn_pipeline("capture", move |mut rx| async move {
            while let Some(body) = rx.recv().await {
                sink.lock().push(body);
            }
        });
        (pipeline, captured)
    }

    fn wait_for<F: Fn() -> bool>(cond: F, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        cond()
    }

    #[test]
    fn test_size_threshold_flushes_exactly_once_per_crossing() {
        let mut worker = started_worker();
        let ctx = worker.handle().unwrap();
        let (pipeline, captured) = capture_pipeline(&ctx);

        let options = HttpTargetOptions {
            size: 10,
            interval: Duration::from_secs(60),
            ..Default::default()
        };
        let target = HttpTarget::with_pipeline(options, pipeline, &ctx);

        target.write(&Bytes::from_static(b"123456"));
        std::thread::sleep(Duration::from_millis(50));
        assert!(captured.lock().is_empty(), "flushed below threshold");

        target.write(&Bytes::from_static(b"789012"));
        assert!(wait_for(|| captured.lock().len() == 1, Duration::from_secs(2)));
        assert_eq!(captured.lock()[0].as_ref(), b"123456789012");

        // Below threshold again: no extra flush for the same crossing.
        target.write(&Bytes::from_static(b"abc"));
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(captured.lock().len(), 1);

        drop(target);
        assert!(worker.stop(false).is_clean());
        // The remainder ships on teardown.
        assert_eq!(captured.lock().len(), 2);
        assert_eq!(captured.lock()[1].as_ref(), b"abc");
    }

    #[test]
    fn test_interval_flushes_accumulated_batch() {
        let mut worker = started_worker();
        let ctx = worker.handle().unwrap();
        let (pipeline, captured) = capture_pipeline(&ctx);

        let options = HttpTargetOptions {
            size: 1_000_000,
            interval: Duration::from_millis(100),
            head: "[".to_string(),
            tail: "]".to_string(),
            separator: ",".to_string(),
            ..Default::default()
        };
        let target = HttpTarget::with_pipeline(options, pipeline, &ctx);

        target.write(&Bytes::from_static(br#"{"x":1}"#));
        target.write(&Bytes::from_static(br#"{"x":2}"#));

        assert!(wait_for(|| !captured.lock().is_empty(), Duration::from_secs(2)));
        assert_eq!(captured.lock()[0].as_ref(), br#"[{"x":1},{"x":2}]"#);

        drop(target);
        assert!(worker.stop(false).is_clean());
    }

    #[test]
    fn test_empty_buffer_is_not_flushed_by_interval() {
        let mut worker = started_worker();
        let ctx = worker.handle().unwrap();
        let (pipeline, captured) = capture_pipeline(&ctx);

        let options = HttpTargetOptions {
            interval: Duration::from_millis(50),
            ..Default::default()
        };
        let target = HttpTarget::with_pipeline(options, pipeline, &ctx);

        std::thread::sleep(Duration::from_millis(200));
        assert!(captured.lock().is_empty());

        drop(target);
        assert!(worker.stop(false).is_clean());
        assert!(captured.lock().is_empty());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn test_batch_body_is_head_join_tail(
            records in proptest::collection::vec("[a-z0-9]{1,12}", 1..8),
            head in "[a-z\\[{]{0,3}",
            tail in "[a-z\\]}]{0,3}",
            separator in "[,;|]{0,2}",
        ) {
            let mut worker = started_worker();
            let ctx = worker.handle().unwrap();
            let (pipeline, captured) = capture_pipeline(&ctx);

            let options = HttpTargetOptions {
                size: usize::MAX,
                interval: Duration::from_secs(60),
                head: head.clone(),
                tail: tail.clone(),
                separator: separator.clone(),
                ..Default::default()
            };
            let target = HttpTarget::with_pipeline(options, pipeline, &ctx);

            for record in &records {
                target.write(&Bytes::from(record.clone()));
            }
            drop(target); // teardown ships the batch

            prop_assert!(worker.stop(false).is_clean());
            let expected = format!("{}{}{}", head, records.join(&separator), tail);
            let bodies = captured.lock();
            prop_assert_eq!(bodies.len(), 1);
            prop_assert_eq!(bodies[0].as_ref(), expected.as_bytes());
        }
    }
}
