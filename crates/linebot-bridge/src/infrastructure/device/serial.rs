//! Serial-port implementation of [`DevicePort`] using the `serialport` crate.
//!
//! The port is opened 8N1 with no flow control.  A short read timeout lets
//! the reader thread notice a close request promptly.

use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, SerialPortType, StopBits};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{DeviceError, DevicePort};
use crate::domain::messages::DeviceInfo;

/// How long a blocking read waits before re-checking the `alive` flag.
const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// A line longer than this without a terminator is discarded.
const MAX_LINE_BYTES: usize = 4096;

/// State of the currently open port.
struct OpenPort {
    name: String,
    writer: Box<dyn SerialPort>,
    /// Shared with the reader thread.  Cleared on close or I/O failure.
    alive: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
}

impl OpenPort {
    /// Stops the reader thread and waits for it, releasing the port's lock.
    fn shut_down(mut self) {
        self.alive.store(false, Ordering::Release);
        if let Some(reader) = self.reader.take() {
            if reader.join().is_err() {
                warn!("reader thread for {} panicked", self.name);
            }
        }
    }
}

/// The robot's serial connection.
///
/// At most one port is open at a time.  Lines read from it are delivered to
/// the `line_tx` channel given at construction.
pub struct SerialDevice {
    baud_rate: u32,
    line_tx: mpsc::Sender<String>,
    current: Mutex<Option<OpenPort>>,
}

impl SerialDevice {
    pub fn new(baud_rate: u32, line_tx: mpsc::Sender<String>) -> Self {
        Self {
            baud_rate,
            line_tx,
            current: Mutex::new(None),
        }
    }

    /// Name of the open port, if any.
    pub fn port_name(&self) -> Option<String> {
        self.lock().as_ref().map(|p| p.name.clone())
    }

    fn lock(&self) -> MutexGuard<'_, Option<OpenPort>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn open(&self, port: &str) -> Result<OpenPort, DeviceError> {
        let open_err = |source: io::Error| DeviceError::Open {
            port: port.to_string(),
            source,
        };

        let writer = serialport::new(port, self.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|e| open_err(e.into()))?;
        let reader = writer.try_clone().map_err(|e| open_err(e.into()))?;

        let alive = Arc::new(AtomicBool::new(true));
        let thread_alive = Arc::clone(&alive);
        let line_tx = self.line_tx.clone();
        let thread_port = port.to_string();

        let reader = thread::Builder::new()
            .name(format!("serial-reader-{port}"))
            .spawn(move || read_lines(reader, &thread_port, &thread_alive, &line_tx))
            .map_err(open_err)?;

        Ok(OpenPort {
            name: port.to_string(),
            writer,
            alive,
            reader: Some(reader),
        })
    }
}

impl DevicePort for SerialDevice {
    fn list_ports(&self) -> Result<Vec<DeviceInfo>, DeviceError> {
        let ports = serialport::available_ports().map_err(|e| DeviceError::Enumerate(e.into()))?;
        Ok(ports
            .into_iter()
            .map(|p| {
                let desc = match p.port_type {
                    SerialPortType::UsbPort(usb) => usb.product,
                    _ => None,
                }
                .unwrap_or_else(|| format!("Serial Port {}", p.port_name));
                DeviceInfo {
                    port: p.port_name,
                    desc,
                }
            })
            .collect())
    }

    fn select(&self, port: &str) -> Result<(), DeviceError> {
        // The old port, even when it is the same one, must be fully released
        // before reopening: the open takes an exclusive lock.
        if let Some(previous) = self.port_name() {
            debug!("switching from {previous} to {port}");
        }
        self.close();
        let opened = self.open(port)?;
        info!("opened serial port {port} at {} baud", self.baud_rate);
        let replaced = self.lock().replace(opened);
        if let Some(replaced) = replaced {
            replaced.shut_down();
        }
        Ok(())
    }

    fn close(&self) {
        let old = self.lock().take();
        if let Some(old) = old {
            let name = old.name.clone();
            old.shut_down();
            info!("closed serial port {name}");
        }
    }

    fn is_open(&self) -> bool {
        self.lock()
            .as_ref()
            .is_some_and(|p| p.alive.load(Ordering::Acquire))
    }

    fn write_line(&self, line: &str) -> Result<(), DeviceError> {
        let mut guard = self.lock();
        let port = match guard.as_mut() {
            Some(p) if p.alive.load(Ordering::Acquire) => p,
            _ => return Err(DeviceError::NotOpen),
        };

        if let Err(e) = write_terminated(&mut *port.writer, line) {
            port.alive.store(false, Ordering::Release);
            warn!("write to {} failed, marking device not live: {e}", port.name);
            return Err(DeviceError::Io(e));
        }
        debug!("→ {}: {line}", port.name);
        Ok(())
    }
}

impl Drop for SerialDevice {
    fn drop(&mut self) {
        self.close();
    }
}

fn write_terminated(writer: &mut dyn SerialPort, line: &str) -> io::Result<()> {
    writer.write_all(line.as_bytes())?;
    writer.write_all(b"\n")?;
    writer.flush()
}

/// Reader thread body: splits the byte stream into lines and forwards them.
fn read_lines(
    mut reader: Box<dyn SerialPort>,
    port: &str,
    alive: &AtomicBool,
    line_tx: &mpsc::Sender<String>,
) {
    let mut chunk = [0u8; 256];
    let mut pending: Vec<u8> = Vec::with_capacity(256);

    while alive.load(Ordering::Acquire) {
        let n = match reader.read(&mut chunk) {
            Ok(n) => n,
            Err(_) if !alive.load(Ordering::Acquire) => break,
            Err(e) if e.kind() == io::ErrorKind::TimedOut => continue,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!("read from {port} failed, marking device not live: {e}");
                alive.store(false, Ordering::Release);
                break;
            }
        };

        // Data that arrives after a close belongs to nobody.
        if !alive.load(Ordering::Acquire) {
            break;
        }
        pending.extend_from_slice(&chunk[..n]);

        while let Some(end) = pending.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = pending.drain(..=end).collect();
            let line = String::from_utf8_lossy(&raw[..end]);
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            if !alive.load(Ordering::Acquire) {
                break;
            }
            if line_tx.blocking_send(line.to_string()).is_err() {
                debug!("line consumer gone; stopping reader for {port}");
                return;
            }
        }

        if pending.len() > MAX_LINE_BYTES {
            debug!("discarding {} unterminated bytes from {port}", pending.len());
            pending.clear();
        }
    }

    debug!("reader thread for {port} exiting");
}

// ── Tests ─────────────────────────────────────────────────────────────────────
