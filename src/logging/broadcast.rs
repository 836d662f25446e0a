//! UDP admin-link broadcaster
//!
//! Ships a live copy of log records to a localhost control-plane collector,
//! one JSON datagram per record. The log write path must stay non-blocking,
//! so records go through a bounded queue to a dedicated sender thread and
//! are dropped on overflow.

use crate::admin::AdminLink;
use crate::constants::{ADMIN_LINK_CHANNEL_CAPACITY, DEFAULT_ADMIN_BROADCAST_PORT};
use crate::error::{Error, Result};
use bytes::Bytes;
use serde::Serialize;
use std::borrow::Cow;
use std::net::UdpSocket;
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::thread;

/// One broadcast datagram.
#[derive(Serialize)]
struct BroadcastFrame<'a> {
    timestamp: String, // HH:MM:SS.mmm
    logger: &'a str,
    record: Cow<'a, str>,
}

/// Concrete `AdminLink` shipping records over UDP to `127.0.0.1:port`.
pub struct UdpBroadcastLink {
    tx: SyncSender<(String, Bytes)>,
}

impl UdpBroadcastLink {
    pub fn new(port: u16) -> Result<Self> {
        let socket =
            UdpSocket::bind("127.0.0.1:0").map_err(|e| Error::LinkSocket { source: e })?;
        let target = format!("127.0.0.1:{}", port);
        let (tx, rx) = sync_channel::<(String, Bytes)>(ADMIN_LINK_CHANNEL_CAPACITY);

        thread::Builder::new()
            .name("pipehost-admin-link".to_string())
            .spawn(move || run_broadcaster(rx, socket, target))
            .map_err(|e| Error::LinkSocket { source: e })?;

        Ok(Self { tx })
    }

    /// Link to the conventional local collector port.
    pub fn local() -> Result<Self> {
        Self::new(DEFAULT_ADMIN_BROADCAST_PORT)
    }
}

impl AdminLink for UdpBroadcastLink {
    fn send(&self, logger: &str, record: &Bytes) {
        // Non-blocking; drop on overflow or after the sender thread exits.
        let _ = self.tx.try_send((logger.to_string(), record.clone()));
    }
}

/// Run the sender loop (blocking, runs in thread)
fn run_broadcaster(rx: Receiver<(String, Bytes)>, socket: UdpSocket, target: String) {
    // Process records until the link is dropped and the channel closes.
    for (logger, record) in rx {
        let frame = BroadcastFrame {
            timestamp: chrono::Local::now().format("%H:%M:%S%.3f").to_string(),
            logger: &logger,
            record: String::from_utf8_lossy(&record),
        };
        if let Ok(json) = serde_json::to_string(&frame) {
            let msg = format!("{}\n", json);
            let _ = socket.send_to(msg.as_bytes(), &target);
        }
    }
}
