//! Centralized error types for the runtime
//!
//! All runtime errors are represented by the `Error` enum.
//! Use `Result<T>` as shorthand for `std::result::Result<T, Error>`.

use std::fmt;

/// All runtime errors
#[derive(Debug)]
pub enum Error {
    // === Worker ===
    /// A worker slot failed to start (event loop, thread, or pipeline build)
    WorkerStart { index: usize },
    /// A pipeline could not be built from its layout
    PipelineBuild { pipeline: String, reason: String },

    // === Logging ===
    /// A `log` call's arguments don't match the logger's format
    ArgumentType {
        logger: String,
        expected: &'static str,
    },
    /// Failed to open the admin-link broadcast socket
    LinkSocket { source: std::io::Error },

    // === HTTP target ===
    /// Target URL could not be parsed
    InvalidUrl { url: String, reason: String },
    /// HTTP method string is not a valid method token
    InvalidMethod { method: String },
    /// Header name or value is not representable on the wire
    InvalidHeader { name: String },
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::LinkSocket { source } => Some(source),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WorkerStart { index } => write!(f, "Worker {} failed to start", index),
            Self::PipelineBuild { pipeline, reason } => {
                write!(f, "Cannot build pipeline {}: {}", pipeline, reason)
            }
            Self::ArgumentType { logger, expected } => {
                write!(f, "Logger {}: expected {}", logger, expected)
            }
            Self::LinkSocket { .. } => write!(f, "Cannot open admin-link socket"),
            Self::InvalidUrl { url, reason } => write!(f, "Invalid URL {}: {}", url, reason),
            Self::InvalidMethod { method } => write!(f, "Invalid HTTP method: {}", method),
            Self::InvalidHeader { name } => write!(f, "Invalid HTTP header: {}", name),
        }
    }
}

/// Alias for Result with the runtime's Error
pub type Result<T> = std::result::Result<T, Error>;
