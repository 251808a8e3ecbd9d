//! Bridge configuration types.
//!
//! [`BridgeConfig`] is the single source of truth for all runtime settings.
//! `main.rs` builds it from CLI arguments, environment variables and an
//! optional TOML file; tests build it directly with [`BridgeConfig::new`].

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use linebot_core::FirmwareSchema;

/// WebSocket port used when nothing else is configured.
pub const DEFAULT_WS_PORT: u16 = 8080;

/// Line speed of the robot firmware's serial console.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Outbound messages buffered per client before new ones are dropped for it.
pub const DEFAULT_SINK_BUFFER: usize = 64;

/// All runtime configuration for the bridge.
///
/// Has no `Default` impl; every construction path names a firmware schema.
///
/// # Example
///
/// ```rust
/// use linebot_bridge::domain::BridgeConfig;
/// use linebot_core::FirmwareSchema;
///
/// let cfg = BridgeConfig::new(FirmwareSchema::Unified);
/// assert_eq!(cfg.ws_bind_addr.port(), 8080);
/// assert_eq!(cfg.baud_rate, 9600);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Address the WebSocket server binds to.
    ///
    /// `0.0.0.0` accepts dashboards from the whole LAN; `127.0.0.1` keeps the
    /// bridge local to the laptop the robot is plugged into.
    pub ws_bind_addr: SocketAddr,

    /// Which firmware generation is on the other end of the serial line.
    pub schema: FirmwareSchema,

    /// Serial line speed.  8 data bits, no parity, 1 stop bit are fixed.
    pub baud_rate: u32,

    /// Port to open at startup, if any.  Clients can still pick another one
    /// with `select_device`.
    pub serial_port: Option<String>,

    /// Capacity of each client's outbound channel.
    pub sink_buffer: usize,
}

impl BridgeConfig {
    /// Returns a configuration with default network and serial settings for
    /// the given schema.
    ///
    /// | Field         | Default        |
    /// |---------------|----------------|
    /// | ws_bind_addr  | `0.0.0.0:8080` |
    /// | baud_rate     | `9600`         |
    /// | serial_port   | none           |
    /// | sink_buffer   | `64`           |
    pub fn new(schema: FirmwareSchema) -> Self {
        Self {
            ws_bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_WS_PORT),
            schema,
            baud_rate: DEFAULT_BAUD_RATE,
            serial_port: None,
            sink_buffer: DEFAULT_SINK_BUFFER,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
