//! Runtime-wide constants
//!
//! Centralized constants to avoid duplication and ensure consistency.

// =============================================================================
// Buffers
// =============================================================================

/// Queue depth of a hosted pipeline (records buffered between `feed` and the
/// pipeline task; overflow is dropped)
pub const PIPELINE_CHANNEL_CAPACITY: usize = 256;

/// Queue depth between `AdminLink::send` and the broadcast sender thread
pub const ADMIN_LINK_CHANNEL_CAPACITY: usize = 256;

// =============================================================================
// Timing
// =============================================================================

/// How often a draining worker re-checks its pending-pipeline count (milliseconds)
pub const DRAIN_POLL_INTERVAL_MS: u64 = 10;

/// Idle interval after which the file-append pipeline flushes buffered writes
/// (milliseconds)
pub const FILE_FLUSH_INTERVAL_MS: u64 = 250;

// =============================================================================
// Batching defaults
// =============================================================================

/// Default byte threshold that triggers an eager HTTP batch flush
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Default deadline for one outstanding HTTP flush request (seconds)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 5;

/// Default maximum time records may sit buffered before a flush is forced (seconds)
pub const DEFAULT_FLUSH_INTERVAL_SECS: u64 = 5;

// =============================================================================
// Network
// =============================================================================

/// Default UDP port for admin-link record broadcasting
pub const DEFAULT_ADMIN_BROADCAST_PORT: u16 = 9002;
