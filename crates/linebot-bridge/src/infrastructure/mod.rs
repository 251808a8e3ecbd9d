//! Infrastructure layer for linebot-bridge.
//!
//! Handles all I/O:
//!
//! - Opening, reading and writing the robot's serial port ([`device`])
//! - Accepting WebSocket clients and running their sessions ([`ws_server`])
//! - Reading the optional TOML settings file ([`config_file`])
//!
//! Translation logic lives in the application layer and message types in the
//! domain layer.

pub mod config_file;
pub mod device;
pub mod ws_server;

pub use device::{run_line_pump, DeviceError, DevicePort, SerialDevice};
pub use ws_server::{run_server, serve};
