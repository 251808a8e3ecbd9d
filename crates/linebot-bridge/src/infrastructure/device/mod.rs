//! Device access: the robot's serial port.
//!
//! # Testability
//!
//! The relay talks to the robot only through the [`DevicePort`] trait.  The
//! production implementation is [`serial::SerialDevice`]; tests use
//! [`mock::MockDevice`], which records writes instead of touching hardware.
//!
//! # Threading
//!
//! ```text
//! serial reader thread ──(String lines)──► run_line_pump task ──► Relay
//! ```
//!
//! Serial reads are blocking, so they run on a dedicated OS thread that
//! pushes complete lines into a tokio channel.  [`run_line_pump`] drains that
//! channel on the async runtime.

use std::io;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

use crate::application::relay::Relay;
use crate::domain::messages::DeviceInfo;

pub mod mock;
pub mod serial;

pub use serial::SerialDevice;

/// Error type for device operations.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// A write was attempted with no port open.
    #[error("no device is open")]
    NotOpen,

    /// The named port could not be opened.
    #[error("failed to open {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: io::Error,
    },

    /// The list of ports could not be read from the OS.
    #[error("failed to enumerate serial ports: {0}")]
    Enumerate(#[source] io::Error),

    /// A read or write on an open port failed.
    #[error("device I/O error: {0}")]
    Io(#[from] io::Error),
}

/// The robot connection as seen by the relay.
///
/// Every method takes `&self`; implementations synchronise internally so one
/// instance can be shared as `Arc<dyn DevicePort>` between sessions.
pub trait DevicePort: Send + Sync {
    /// Lists the ports a client may select.
    fn list_ports(&self) -> Result<Vec<DeviceInfo>, DeviceError>;

    /// Opens `port`, closing any port that was open before.
    fn select(&self, port: &str) -> Result<(), DeviceError>;

    /// Closes the current port.  No-op when nothing is open.
    fn close(&self);

    /// `true` while a port is open and has not failed.
    fn is_open(&self) -> bool;

    /// Writes one command line; the implementation appends the terminator.
    fn write_line(&self, line: &str) -> Result<(), DeviceError>;
}

/// Feeds every line received from the device into the relay.
///
/// Returns when all senders of `lines` have been dropped.
pub async fn run_line_pump(mut lines: mpsc::Receiver<String>, relay: Arc<Relay>) {
    while let Some(line) = lines.recv().await {
        relay.on_device_line(&line);
    }
    debug!("device line channel closed; pump exiting");
}
