//! Logger - named fan-out point for log records
//!
//! A `Logger` owns an ordered list of targets and forwards every record to
//! each of them in registration order, plus (when enabled) to the
//! process-wide admin link. The format variant decides how call-time
//! arguments become a binary record.
//!
//! Process-wide state: every live `Logger` is tracked in a registry for bulk
//! operations (`Logger::for_each`), and the admin service/link collaborators
//! are installed once during single-threaded startup, before any worker
//! thread begins logging.

use super::target::Target;
use crate::admin::{AdminLink, AdminService};
use crate::error::{Error, Result};
use bytes::{Bytes, BytesMut};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

static ALL_LOGGERS: Mutex<Vec<Weak<Logger>>> = Mutex::new(Vec::new());
static ADMIN_SERVICE: RwLock<Option<Arc<dyn AdminService>>> = RwLock::new(None);
static ADMIN_LINK: RwLock<Option<Arc<dyn AdminLink>>> = RwLock::new(None);

/// One argument of a `log` call.
#[derive(Debug, Clone)]
pub enum LogValue {
    Bytes(Bytes),
    String(String),
    Json(serde_json::Value),
}

impl From<&str> for LogValue {
    fn from(s: &str) -> Self {
        LogValue::String(s.to_string())
    }
}

impl From<String> for LogValue {
    fn from(s: String) -> Self {
        LogValue::String(s)
    }
}

impl From<Bytes> for LogValue {
    fn from(b: Bytes) -> Self {
        LogValue::Bytes(b)
    }
}

impl From<serde_json::Value> for LogValue {
    fn from(v: serde_json::Value) -> Self {
        LogValue::Json(v)
    }
}

/// How a logger's call-time arguments are serialized into a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Byte-sequence arguments concatenated verbatim, no added framing
    Binary,
    /// Arguments stringified and concatenated, one trailing newline
    Text,
    /// Arguments serialized as a single JSON value
    Json,
}

impl LogFormat {
    /// Encode one call's arguments into a record. The record is produced
    /// completely or not at all - a failing call writes nothing.
    pub fn encode(self, logger: &str, args: &[LogValue]) -> Result<Bytes> {
        match self {
            LogFormat::Binary => {
                let mut buf = BytesMut::new();
                for arg in args {
                    match arg {
                        LogValue::Bytes(b) => buf.extend_from_slice(b),
                        LogValue::String(s) => buf.extend_from_slice(s.as_bytes()),
                        LogValue::Json(_) => {
                            return Err(Error::ArgumentType {
                                logger: logger.to_string(),
                                expected: "byte-sequence arguments",
                            })
                        }
                    }
                }
                Ok(buf.freeze())
            }
            LogFormat::Text => {
                let mut out = String::new();
                for arg in args {
                    match arg {
                        LogValue::String(s) => out.push_str(s),
                        LogValue::Json(serde_json::Value::String(s)) => out.push_str(s),
                        LogValue::Json(v) => out.push_str(&v.to_string()),
                        LogValue::Bytes(_) => {
                            return Err(Error::ArgumentType {
                                logger: logger.to_string(),
                                expected: "stringifiable arguments",
                            })
                        }
                    }
                }
                out.push('\n');
                Ok(Bytes::from(out))
            }
            LogFormat::Json => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    match arg {
                        LogValue::Json(v) => values.push(v.clone()),
                        LogValue::String(s) => {
                            values.push(serde_json::Value::String(s.clone()))
                        }
                        LogValue::Bytes(_) => {
                            return Err(Error::ArgumentType {
                                logger: logger.to_string(),
                                expected: "JSON-representable arguments",
                            })
                        }
                    }
                }
                let value = if values.len() == 1 {
                    values.remove(0)
                } else {
                    serde_json::Value::Array(values)
                };
                Ok(Bytes::from(value.to_string()))
            }
        }
    }
}

/// Named log source fanning records out to its targets.
pub struct Logger {
    name: Arc<str>,
    format: LogFormat,
    targets: Mutex<Vec<Target>>,
    admin_link_enabled: AtomicBool,
}

impl Logger {
    /// Create and register a logger. Names are not deduplicated; two loggers
    /// may share a name (confusing, but permitted).
    pub fn new(name: impl Into<Arc<str>>, format: LogFormat) -> Arc<Self> {
        let logger = Arc::new(Self {
            name: name.into(),
            format,
            targets: Mutex::new(Vec::new()),
            admin_link_enabled: AtomicBool::new(false),
        });
        ALL_LOGGERS.lock().push(Arc::downgrade(&logger));
        logger
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn format(&self) -> LogFormat {
        self.format
    }

    /// Append a target; records reach targets in the order they were added.
    pub fn add_target(&self, target: Target) {
        self.targets.lock().push(target);
    }

    /// Also copy every record to the process-wide admin link.
    pub fn enable_admin_link(&self, enabled: bool) {
        self.admin_link_enabled.store(enabled, Ordering::Relaxed);
    }

    /// Forward one record to every target, in registration order, and to the
    /// admin link when enabled. Never fails: delivery problems stay inside
    /// the targets.
    pub fn write(&self, record: Bytes) {
        {
            let targets = self.targets.lock();
            for target in targets.iter() {
                target.write(&record);
            }
        }
        if self.admin_link_enabled.load(Ordering::Relaxed) {
            if let Some(link) = Self::admin_link() {
                link.send(&self.name, &record);
            }
        }
    }

    /// Encode one call's arguments per this logger's format and write the
    /// record. Fails only on argument/format mismatch; nothing is written
    /// in that case.
    pub fn log(&self, args: &[LogValue]) -> Result<()> {
        let record = self.format.encode(&self.name, args)?;
        self.write(record);
        Ok(())
    }

    // === Process-wide state ===

    /// Visit every live logger. Snapshot semantics: loggers registered or
    /// dropped concurrently may or may not be visited, but any logger alive
    /// for the whole call is visited exactly once per registration.
    pub fn for_each<F: FnMut(&Arc<Logger>)>(mut cb: F) {
        let snapshot: Vec<Arc<Logger>> =
            ALL_LOGGERS.lock().iter().filter_map(Weak::upgrade).collect();
        for logger in &snapshot {
            cb(logger);
        }
    }

    /// Install the admin service handle. Last write wins; call during
    /// single-threaded startup.
    pub fn set_admin_service(service: Arc<dyn AdminService>) {
        *ADMIN_SERVICE.write() = Some(service);
    }

    pub fn admin_service() -> Option<Arc<dyn AdminService>> {
        ADMIN_SERVICE.read().clone()
    }

    /// Install the admin link sink. Last write wins; call during
    /// single-threaded startup.
    pub fn set_admin_link(link: Arc<dyn AdminLink>) {
        *ADMIN_LINK.write() = Some(link);
    }

    pub fn admin_link() -> Option<Arc<dyn AdminLink>> {
        ADMIN_LINK.read().clone()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        ALL_LOGGERS.lock().retain(|weak| weak.strong_count() > 0);
    }
}
