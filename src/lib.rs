//! pipehost - worker-thread pipeline hosting and log delivery
//!
//! The runtime backbone of a programmable network data plane:
//!
//! - `worker`: a pool of OS threads, each owning a single-threaded event
//!   loop that hosts data-processing pipelines. Workers support start,
//!   in-place reload, and graceful or forced stop with drain accounting.
//! - `pipeline`: the narrow hosting contract (`Layout` -> `Pipeline` ->
//!   `feed`) plus the two built-in layouts the log subsystem needs
//!   (file append, HTTP request).
//! - `logging`: named loggers fanning records out to stdout, file, and
//!   HTTP-batching targets, with an optional side-channel to a
//!   control-plane link.
//! - `admin`: the consumed control-plane contracts (`AdminService`,
//!   `AdminLink`).
//!
//! # Example
//!
//! ```ignore
//! let mut worker = WorkerThread::new(0, host);
//! assert!(worker.start());
//! let ctx = worker.handle().unwrap();
//!
//! let logger = Logger::new("access", LogFormat::Text);
//! logger.add_target(Target::File(FileTarget::new("/var/log/access.log", &ctx)));
//! logger.log(&["GET /".into()])?;
//!
//! drop(logger);
//! worker.stop(false); // drains the file pipeline before returning
//! ```

pub mod admin;
pub mod constants;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod worker;

pub use error::{Error, Result};
