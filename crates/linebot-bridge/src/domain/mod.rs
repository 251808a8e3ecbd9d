//! Domain layer for linebot-bridge.
//!
//! Pure types with no dependencies on I/O, networking, or the async runtime:
//!
//! - The JSON "language" spoken with WebSocket clients ([`messages`])
//! - The runtime configuration ([`config`])
//!
//! Anything that opens a port, reads a file, or spawns a task belongs in the
//! infrastructure layer instead.

pub mod config;
pub mod messages;

pub use config::BridgeConfig;
pub use messages::{ClientMessage, DeviceInfo, ServerMessage};
