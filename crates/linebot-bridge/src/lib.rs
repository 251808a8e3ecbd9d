//! linebot-bridge library crate.
//!
//! Relays telemetry from a line-following robot's serial port to any number
//! of WebSocket clients, and relays their commands back to the robot.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Robot (CSV lines over serial, 9600 baud)
//!         ↕
//! [linebot-bridge]
//!   ├── domain/           Pure types: JSON message enums, BridgeConfig
//!   ├── application/      TelemetryRecord → JSON, ClientRegistry, Relay
//!   └── infrastructure/
//!         ├── device/      DevicePort trait, serial port (serialport), mock
//!         ├── ws_server/   WebSocket accept loop (tokio-tungstenite)
//!         └── config_file/ Optional TOML settings file
//!         ↕
//! Dashboards (JSON over WebSocket)
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O and no async.
//! - `application` depends on `domain` and `linebot-core`; it reaches the
//!   serial port only through the [`infrastructure::device::DevicePort`] trait.
//! - `infrastructure` depends on all other layers plus `tokio`,
//!   `tungstenite` and `serialport`.
//!
//! # For beginners: why the `DevicePort` trait?
//!
//! The relay needs to write to the robot, but tests have no robot attached.
//! Depending on a trait instead of the concrete serial type lets the tests
//! hand the relay a fake device and inspect what it would have written.

/// Domain layer: pure business-logic types (no I/O).
pub mod domain;

/// Application layer: translation, client registry and relay.
pub mod application;

/// Infrastructure layer: serial device, WebSocket server, config file.
pub mod infrastructure;
