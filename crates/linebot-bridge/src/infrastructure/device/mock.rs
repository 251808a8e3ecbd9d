//! Mock device for tests.
//!
//! Records every line written to it and exposes a fixed list of ports, so
//! relay and server tests can run without a robot attached.

use std::io;
use std::sync::Mutex;

use super::{DeviceError, DevicePort};
use crate::domain::messages::DeviceInfo;

#[derive(Debug, Default)]
struct MockState {
    open_port: Option<String>,
    written: Vec<String>,
    fail_writes: bool,
}

/// A [`DevicePort`] that records writes instead of sending them.
#[derive(Debug, Default)]
pub struct MockDevice {
    ports: Vec<DeviceInfo>,
    state: Mutex<MockState>,
}

impl MockDevice {
    /// Creates a mock with no ports and nothing open.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock that lists the given port names as selectable.
    pub fn with_ports<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ports = names
            .into_iter()
            .map(|name| {
                let port = name.into();
                DeviceInfo {
                    desc: format!("Serial Port {port}"),
                    port,
                }
            })
            .collect();
        Self {
            ports,
            state: Mutex::default(),
        }
    }

    /// Every line written so far, oldest first, without terminators.
    pub fn written(&self) -> Vec<String> {
        self.state.lock().expect("lock poisoned").written.clone()
    }

    /// The currently open port, if any.
    pub fn open_port(&self) -> Option<String> {
        self.state.lock().expect("lock poisoned").open_port.clone()
    }

    /// Makes the next write fail with an I/O error, which also closes the
    /// device as a real port would.
    pub fn fail_next_write(&self) {
        self.state.lock().expect("lock poisoned").fail_writes = true;
    }
}

impl DevicePort for MockDevice {
    fn list_ports(&self) -> Result<Vec<DeviceInfo>, DeviceError> {
        Ok(self.ports.clone())
    }

    fn select(&self, port: &str) -> Result<(), DeviceError> {
        let mut state = self.state.lock().expect("lock poisoned");
        state.open_port = None;
        if self.ports.iter().any(|p| p.port == port) {
            state.open_port = Some(port.to_string());
            Ok(())
        } else {
            Err(DeviceError::Open {
                port: port.to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "no such port"),
            })
        }
    }

    fn close(&self) {
        self.state.lock().expect("lock poisoned").open_port = None;
    }

    fn is_open(&self) -> bool {
        self.state.lock().expect("lock poisoned").open_port.is_some()
    }

    fn write_line(&self, line: &str) -> Result<(), DeviceError> {
        let mut state = self.state.lock().expect("lock poisoned");
        if state.open_port.is_none() {
            return Err(DeviceError::NotOpen);
        }
        if state.fail_writes {
            state.fail_writes = false;
            state.open_port = None;
            return Err(DeviceError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "device unplugged",
            )));
        }
        state.written.push(line.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_device_lists_configured_ports() {
        let device = MockDevice::with_ports(["/dev/ttyUSB0", "/dev/ttyACM0"]);

        let ports = device.list_ports().expect("listing never fails");

        assert_eq!(ports.len(), 2);
        assert_eq!(ports[0].port, "/dev/ttyUSB0");
        assert_eq!(ports[0].desc, "Serial Port /dev/ttyUSB0");
    }

    #[test]
    fn test_mock_device_select_unknown_port_fails() {
        let device = MockDevice::with_ports(["COM3"]);

        let result = device.select("COM9");

        assert!(matches!(result, Err(DeviceError::Open { .. })));
        assert!(!device.is_open());
    }

    #[test]
    fn test_mock_device_records_writes_while_open() {
        // Arrange
        let device = MockDevice::with_ports(["COM3"]);
        device.select("COM3").expect("port is listed");

        // Act
        device.write_line("4").unwrap();
        device.write_line("1,-120").unwrap();

        // Assert
        assert_eq!(device.written(), vec!["4", "1,-120"]);
        assert_eq!(device.open_port().as_deref(), Some("COM3"));
    }

    #[test]
    fn test_mock_device_rejects_writes_when_closed() {
        let device = MockDevice::new();
        assert!(matches!(device.write_line("4"), Err(DeviceError::NotOpen)));
        assert!(device.written().is_empty());
    }

    #[test]
    fn test_mock_device_failed_write_closes_device() {
        let device = MockDevice::with_ports(["COM3"]);
        device.select("COM3").unwrap();
        device.fail_next_write();

        assert!(matches!(device.write_line("5"), Err(DeviceError::Io(_))));
        assert!(!device.is_open());
    }
}
