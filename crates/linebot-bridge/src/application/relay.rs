//! The relay: the one place where device lines, client requests, the
//! registry and the device meet.
//!
//! ```text
//! device line ──► FrameDecoder ──► encode_telemetry ──► JSON ──► ClientRegistry::broadcast
//! client JSON ──► ClientMessage ──► CommandRequest ──► encode_command ──► DevicePort::write_line
//! ```
//!
//! Nothing here blocks on a client: broadcasts use `try_send`, so a stalled
//! dashboard cannot slow down decoding.

use std::sync::Arc;

use tracing::{debug, error, info, trace, warn};

use linebot_core::protocol::command::operation_mode_name;
use linebot_core::{encode_command, CommandRequest, FirmwareSchema, FrameDecoder};

use crate::application::bridge_service::{encode_telemetry, translate_client_message};
use crate::application::registry::{BroadcastReport, ClientRegistry};
use crate::domain::messages::{ClientMessage, ServerMessage};
use crate::infrastructure::device::DevicePort;

/// Reply text after a successful `select_device`.
pub const DEVICE_CONNECTED: &str = "Dispositivo conectado";

/// Reply text after `disconnect_device`.
pub const DEVICE_DISCONNECTED: &str = "Dispositivo desconectado";

/// Routes traffic between the device and the connected clients.
///
/// All state is owned and passed in at construction; one `Arc<Relay>` is
/// shared by every session task and the device line pump.
pub struct Relay {
    decoder: FrameDecoder,
    registry: Arc<ClientRegistry>,
    device: Arc<dyn DevicePort>,
}

impl Relay {
    pub fn new(
        decoder: FrameDecoder,
        registry: Arc<ClientRegistry>,
        device: Arc<dyn DevicePort>,
    ) -> Self {
        Self {
            decoder,
            registry,
            device,
        }
    }

    pub fn schema(&self) -> FirmwareSchema {
        self.decoder.schema()
    }

    pub fn registry(&self) -> &Arc<ClientRegistry> {
        &self.registry
    }

    // ── Device → clients ──────────────────────────────────────────────────────

    /// Decodes one device line and broadcasts it to every registered client.
    ///
    /// Returns `None` when the line produced no record (malformed or of an
    /// unknown kind); nothing is broadcast in that case.
    pub fn on_device_line(&self, line: &str) -> Option<BroadcastReport> {
        let record = match self.decoder.try_decode(line) {
            Ok(record) => record,
            Err(e) if e.is_unknown_type() => {
                trace!("ignoring device line: {e}");
                return None;
            }
            Err(e) => {
                debug!("malformed device line {line:?}: {e}");
                return None;
            }
        };

        let message = encode_telemetry(&record);
        let json: Arc<str> = match serde_json::to_string(&message) {
            Ok(json) => json.into(),
            Err(e) => {
                error!("failed to serialize {} message: {e}", record.message_type());
                return None;
            }
        };

        let report = self.registry.broadcast(&json);
        if report.lagged > 0 {
            debug!(
                "{} message skipped for {} lagging client(s)",
                record.message_type(),
                report.lagged
            );
        }
        for id in &report.removed {
            debug!("removed closed client sink {id}");
        }
        Some(report)
    }

    // ── Clients → device ──────────────────────────────────────────────────────

    /// Encodes `request` and writes it to the device.
    ///
    /// Dropped without error when no device is open or the write fails.
    /// Returns whether the line was written.
    pub fn on_client_request(&self, request: &CommandRequest) -> bool {
        let code = request.code();
        if !self.device.is_open() {
            debug!("no device open; dropping {} command", code.name());
            return false;
        }

        let line = encode_command(request);
        if let Err(e) = self.device.write_line(&line) {
            warn!("failed to send {} command: {e}", code.name());
            return false;
        }

        match request {
            CommandRequest::SetMode { mode } => info!(
                "command sent: {} {}",
                code.name(),
                operation_mode_name(*mode).unwrap_or("UNKNOWN")
            ),
            _ => info!("command sent: {} ({line})", code.name()),
        }
        true
    }

    /// Handles one parsed client message and returns the reply meant for
    /// the requesting client only, if there is one.
    ///
    /// | Message             | Effect                         | Reply                  |
    /// |---------------------|--------------------------------|------------------------|
    /// | `get_devices`       | enumerate ports                | `devices`              |
    /// | `select_device`     | open the port                  | `system` (status text) |
    /// | `disconnect_device` | close the port                 | `system`               |
    /// | device commands     | [`Relay::on_client_request`]   | none                   |
    pub fn handle_client_message(&self, msg: ClientMessage) -> Option<ServerMessage> {
        match msg {
            ClientMessage::GetDevices => {
                let devices = self.device.list_ports().unwrap_or_else(|e| {
                    warn!("{e}");
                    Vec::new()
                });
                debug!("listing {} serial port(s)", devices.len());
                Some(ServerMessage::Devices { devices })
            }
            ClientMessage::SelectDevice { port } => match self.device.select(&port) {
                Ok(()) => {
                    info!("device connected on {port}");
                    Some(ServerMessage::system(DEVICE_CONNECTED))
                }
                Err(e) => {
                    warn!("{e}");
                    Some(ServerMessage::system(format!("Error: {e}")))
                }
            },
            ClientMessage::DisconnectDevice => {
                self.device.close();
                Some(ServerMessage::system(DEVICE_DISCONNECTED))
            }
            other => {
                match translate_client_message(&other, self.schema()) {
                    Ok(request) => {
                        self.on_client_request(&request);
                    }
                    Err(e) => warn!("rejected client command: {e}"),
                }
                None
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::registry::ClientSink;
    use crate::domain::messages::DeviceInfo;
    use crate::infrastructure::device::DeviceError;
    use mockall::{mock, Sequence};
    use serde_json::Value;

    mock! {
        Port {}

        impl DevicePort for Port {
            fn list_ports(&self) -> Result<Vec<DeviceInfo>, DeviceError>;
            fn select(&self, port: &str) -> Result<(), DeviceError>;
            fn close(&self);
            fn is_open(&self) -> bool;
            fn write_line(&self, line: &str) -> Result<(), DeviceError>;
        }
    }

    fn relay_with(schema: FirmwareSchema, port: MockPort) -> Relay {
        Relay::new(
            FrameDecoder::new(schema),
            Arc::new(ClientRegistry::new()),
            Arc::new(port),
        )
    }

    /// A device mock that must never be touched.
    fn idle_port() -> MockPort {
        let mut port = MockPort::new();
        port.expect_write_line().never();
        port
    }

    // ── on_device_line ────────────────────────────────────────────────────────

    #[test]
    fn test_device_line_is_broadcast_as_json() {
        // Arrange
        let relay = relay_with(FirmwareSchema::Unified, idle_port());
        let (sink, mut rx) = ClientSink::channel(8);
        relay.registry().register(sink);

        // Act
        let report = relay.on_device_line("0,Dispositivo conectado");

        // Assert
        assert_eq!(report.map(|r| r.delivered), Some(1));
        let json = rx.try_recv().unwrap();
        assert_eq!(
            json.as_ref(),
            r#"{"type":"system","message":"Dispositivo conectado"}"#
        );
    }

    #[test]
    fn test_unknown_frame_is_not_broadcast() {
        let relay = relay_with(FirmwareSchema::Unified, idle_port());
        let (sink, mut rx) = ClientSink::channel(8);
        relay.registry().register(sink);

        assert!(relay.on_device_line("9,1,2,3").is_none());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_short_frame_is_not_broadcast() {
        let relay = relay_with(FirmwareSchema::Discrete, idle_port());
        let (sink, mut rx) = ClientSink::channel(8);
        relay.registry().register(sink);

        assert!(relay.on_device_line("2,77,1.5").is_none());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_broadcast_survives_a_dead_client() {
        // Arrange: three clients, the second has disconnected.
        let relay = relay_with(FirmwareSchema::Discrete, idle_port());
        let (a, mut rx_a) = ClientSink::channel(8);
        let (b, rx_b) = ClientSink::channel(8);
        let (c, mut rx_c) = ClientSink::channel(8);
        relay.registry().register(a);
        let dead = relay.registry().register(b);
        relay.registry().register(c);
        drop(rx_b);

        // Act
        let report = relay.on_device_line("7,1,-100,100").unwrap();

        // Assert
        assert_eq!(report.delivered, 2);
        assert_eq!(report.removed, vec![dead]);
        assert!(!relay.registry().contains(dead));
        for rx in [&mut rx_a, &mut rx_c] {
            let value: Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
            assert_eq!(value["type"], "remote_status");
            assert_eq!(value["connected"], true);
            assert_eq!(value["left_speed"], -100);
        }
    }

    #[test]
    fn test_float_degradation_keeps_siblings() {
        let relay = relay_with(FirmwareSchema::Discrete, idle_port());
        let (sink, mut rx) = ClientSink::channel(8);
        relay.registry().register(sink);

        relay.on_device_line("5,inf,0.5,garbage,2.0");

        let value: Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(value["kp"], 0.0);
        assert_eq!(value["ki"], 0.5);
        assert_eq!(value["kd"], 0.0);
        assert_eq!(value["integral"], 2.0);
    }

    // ── on_client_request ─────────────────────────────────────────────────────

    #[test]
    fn test_request_is_written_when_device_open() {
        // Arrange
        let mut port = MockPort::new();
        port.expect_is_open().return_const(true);
        port.expect_write_line()
            .withf(|line| line == "1,-120")
            .times(1)
            .returning(|_| Ok(()));
        let relay = relay_with(FirmwareSchema::Unified, port);

        // Act
        let sent = relay.on_client_request(&CommandRequest::SetSpeed { speed: -120 });

        // Assert
        assert!(sent);
    }

    #[test]
    fn test_request_is_dropped_when_device_closed() {
        let mut port = MockPort::new();
        port.expect_is_open().return_const(false);
        port.expect_write_line().never();
        let relay = relay_with(FirmwareSchema::Unified, port);

        assert!(!relay.on_client_request(&CommandRequest::Start));
    }

    #[test]
    fn test_failed_write_reports_not_sent() {
        let mut port = MockPort::new();
        port.expect_is_open().return_const(true);
        port.expect_write_line().times(1).returning(|_| {
            Err(DeviceError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "unplugged",
            )))
        });
        let relay = relay_with(FirmwareSchema::Unified, port);

        assert!(!relay.on_client_request(&CommandRequest::Stop));
    }

    // ── handle_client_message ─────────────────────────────────────────────────

    #[test]
    fn test_get_devices_replies_with_port_list() {
        let mut port = MockPort::new();
        port.expect_list_ports().times(1).returning(|| {
            Ok(vec![DeviceInfo {
                port: "COM3".to_string(),
                desc: "Serial Port COM3".to_string(),
            }])
        });
        let relay = relay_with(FirmwareSchema::Unified, port);

        let reply = relay.handle_client_message(ClientMessage::GetDevices);

        assert_eq!(
            reply,
            Some(ServerMessage::Devices {
                devices: vec![DeviceInfo {
                    port: "COM3".to_string(),
                    desc: "Serial Port COM3".to_string(),
                }]
            })
        );
    }

    #[test]
    fn test_get_devices_enumeration_failure_replies_empty_list() {
        let mut port = MockPort::new();
        port.expect_list_ports().returning(|| {
            Err(DeviceError::Enumerate(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "denied",
            )))
        });
        let relay = relay_with(FirmwareSchema::Unified, port);

        let reply = relay.handle_client_message(ClientMessage::GetDevices);

        assert_eq!(reply, Some(ServerMessage::Devices { devices: vec![] }));
    }

    #[test]
    fn test_select_device_success_replies_connected() {
        let mut port = MockPort::new();
        port.expect_select()
            .withf(|name| name == "/dev/ttyUSB0")
            .times(1)
            .returning(|_| Ok(()));
        let relay = relay_with(FirmwareSchema::Unified, port);

        let reply = relay.handle_client_message(ClientMessage::SelectDevice {
            port: "/dev/ttyUSB0".to_string(),
        });

        assert_eq!(reply, Some(ServerMessage::system(DEVICE_CONNECTED)));
    }

    #[test]
    fn test_select_device_failure_replies_error_text() {
        let mut port = MockPort::new();
        port.expect_select().returning(|name| {
            Err(DeviceError::Open {
                port: name.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such port"),
            })
        });
        let relay = relay_with(FirmwareSchema::Unified, port);

        let reply = relay.handle_client_message(ClientMessage::SelectDevice {
            port: "COM9".to_string(),
        });

        let Some(ServerMessage::System { message }) = &reply else {
            panic!("expected a system reply, got {reply:?}");
        };
        assert!(message.starts_with("Error: "), "got {message:?}");
        assert!(message.contains("COM9"));
    }

    #[test]
    fn test_disconnect_device_closes_port() {
        let mut port = MockPort::new();
        port.expect_close().times(1).return_const(());
        let relay = relay_with(FirmwareSchema::Unified, port);

        let reply = relay.handle_client_message(ClientMessage::DisconnectDevice);

        assert_eq!(reply, Some(ServerMessage::system(DEVICE_DISCONNECTED)));
    }

    #[test]
    fn test_device_commands_have_no_reply_and_are_written_in_order() {
        // Arrange
        let mut seq = Sequence::new();
        let mut port = MockPort::new();
        port.expect_is_open().return_const(true);
        port.expect_write_line()
            .withf(|line| line == "0,2.500000,0.000000,0.750000")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        port.expect_write_line()
            .withf(|line| line == "2,1")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        let relay = relay_with(FirmwareSchema::Discrete, port);

        // Act
        let first = relay.handle_client_message(ClientMessage::SetPid {
            kp: 2.5,
            ki: 0.0,
            kd: 0.75,
        });
        let second = relay.handle_client_message(ClientMessage::SetMode { mode: 1 });

        // Assert
        assert_eq!(first, None);
        assert_eq!(second, None);
    }

    #[test]
    fn test_toggle_telemetry_is_not_sent_to_discrete_firmware() {
        let mut port = MockPort::new();
        port.expect_is_open().return_const(true);
        port.expect_write_line().never();
        let relay = relay_with(FirmwareSchema::Discrete, port);

        assert_eq!(
            relay.handle_client_message(ClientMessage::ToggleTelemetry),
            None
        );
    }

    #[test]
    fn test_toggle_telemetry_is_sent_to_unified_firmware() {
        let mut port = MockPort::new();
        port.expect_is_open().return_const(true);
        port.expect_write_line()
            .withf(|line| line == "7")
            .times(1)
            .returning(|_| Ok(()));
        let relay = relay_with(FirmwareSchema::Unified, port);

        relay.handle_client_message(ClientMessage::ToggleTelemetry);
    }
}
