//! Pipeline hosting contract
//!
//! The pipeline *engine* is an external collaborator; this core only needs
//! three operations: build a layout, instantiate it against an event loop,
//! and feed the instance a message. `Layout` is the reusable blueprint,
//! `Pipeline` the feed handle of one live instance. The two layouts the log
//! subsystem ships with live in `file` and `http`.

pub mod file;
pub mod http;

pub use file::FileAppendLayout;
pub use http::{HttpConnectLayout, HttpRequestLayout};

use crate::worker::EventLoopHandle;
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// A compiled, reusable pipeline blueprint.
///
/// Layouts are shared (`Arc`) between their owner and the hosting loop;
/// instantiation spawns the processing task onto the given loop and hands
/// back the feed side.
pub trait Layout: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn instantiate(self: Arc<Self>, ctx: &EventLoopHandle) -> Pipeline;
}

/// Feed handle of one live pipeline instance.
///
/// Records are delivered to the instance in feed order. `feed` never blocks:
/// when the instance's queue is full or the instance is gone the record is
/// dropped with a diagnostic.
#[derive(Clone)]
pub struct Pipeline {
    name: Arc<str>,
    tx: mpsc::Sender<Bytes>,
}

impl Pipeline {
    pub(crate) fn new(name: Arc<str>, tx: mpsc::Sender<Bytes>) -> Self {
        Self { name, tx }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn feed(&self, msg: Bytes) {
        match self.tx.try_send(msg) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::warn!(pipeline = %self.name, "record dropped, queue full");
            }
            Err(TrySendError::Closed(_)) => {
                tracing::warn!(pipeline = %self.name, "record dropped, pipeline gone");
            }
        }
    }
}
