//! Log delivery subsystem
//!
//! Centralizes the record-delivery types:
//! - `Logger` - named fan-out point with a process-wide registry
//! - `LogFormat` / `LogValue` - per-logger record encodings (binary, text, JSON)
//! - `Target` - where records go (stdout stream, file pipeline, HTTP batches)
//! - `broadcast` - UDP admin-link implementation (record side-channel)
//!
//! Delivered records never pass through `tracing`; `tracing` carries this
//! crate's own diagnostics only.

pub mod broadcast;
pub mod http;
pub mod logger;
pub mod target;

pub use broadcast::UdpBroadcastLink;
pub use http::{HttpTarget, HttpTargetOptions};
pub use logger::{LogFormat, LogValue, Logger};
pub use target::{FileTarget, StdoutTarget, Target};

/// Initialize internal tracing for runtime diagnostics
///
/// Call early in startup before any logging occurs.
/// Set `verbose` to true for debug-level output.
pub fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = if verbose { "debug" } else { "warn" };

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_file(false)
                .compact(),
        )
        .with(tracing_subscriber::EnvFilter::new(level))
        .try_init();
}
