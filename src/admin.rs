//! Control-plane contracts consumed by the log subsystem
//!
//! Both collaborators are injected once during single-threaded startup (see
//! `Logger::set_admin_service` / `Logger::set_admin_link`) and live for the
//! rest of the process.

use bytes::Bytes;

/// Push-style side-channel that receives a live copy of log records for
/// remote observability. `send` is called on the log write path and must not
/// block.
pub trait AdminLink: Send + Sync {
    fn send(&self, logger: &str, record: &Bytes);
}

/// Opaque handle to the administrative control-plane service. The core
/// stores it for targets and pipelines that need it but never exercises it
/// itself.
pub trait AdminService: Send + Sync {}
