//! Linebot serial bridge entry point.
//!
//! This binary opens the robot's serial line, decodes every CSV telemetry line
//! it prints, and broadcasts the result as JSON to all connected WebSocket
//! clients.  Clients send JSON commands back, which are encoded as CSV command
//! lines and written to the robot.
//!
//! # Usage
//!
//! ```text
//! linebot-bridge --schema <unified|discrete> [OPTIONS]
//!
//! Options:
//!   --schema      <NAME>   Firmware message-type schema (required here or in the file)
//!   --ws-port     <PORT>   WebSocket listener port [default: 8080]
//!   --ws-bind     <IP>     WebSocket bind address [default: 0.0.0.0]
//!   --port        <NAME>   Serial port to open at startup
//!   --baud        <RATE>   Serial line speed [default: 9600]
//!   --sink-buffer <N>      Outbound messages buffered per client [default: 64]
//!   --config      <PATH>   Optional TOML settings file
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable              | Flag            |
//! |-----------------------|-----------------|
//! | `LINEBOT_SCHEMA`      | `--schema`      |
//! | `LINEBOT_WS_PORT`     | `--ws-port`     |
//! | `LINEBOT_WS_BIND`     | `--ws-bind`     |
//! | `LINEBOT_SERIAL_PORT` | `--port`        |
//! | `LINEBOT_BAUD`        | `--baud`        |
//! | `LINEBOT_SINK_BUFFER` | `--sink-buffer` |
//! | `LINEBOT_CONFIG`      | `--config`      |
//!
//! Flags and environment variables beat the settings file, which beats the
//! built-in defaults.
//!
//! # Architecture overview
//!
//! ```text
//! Dashboards  (JSON over WebSocket)
//!       ↕
//! linebot-bridge  ← this process
//!   domain/       JSON message types, BridgeConfig
//!   application/  Decode/encode, client registry, relay
//!   infrastructure/
//!     ws_server/  Accept WebSocket connections
//!     device/     Serial port reader and writer
//!       ↕
//! Robot firmware  (CSV lines over serial)
//! ```

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::{bail, Context};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use linebot_bridge::application::{ClientRegistry, Relay};
use linebot_bridge::domain::config::{
    DEFAULT_BAUD_RATE, DEFAULT_SINK_BUFFER, DEFAULT_WS_PORT,
};
use linebot_bridge::domain::BridgeConfig;
use linebot_bridge::infrastructure::config_file::{load_config, FileConfig};
use linebot_bridge::infrastructure::{run_line_pump, run_server, DevicePort, SerialDevice};
use linebot_core::{FirmwareSchema, FrameDecoder};

/// Lines buffered between the serial reader thread and the relay.
const LINE_CHANNEL_CAPACITY: usize = 256;

const DEFAULT_WS_BIND: &str = "0.0.0.0";

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Serial-to-WebSocket bridge for the line-following robot.
///
/// Every option is optional on the command line so that the settings file can
/// fill the gaps; defaults are applied in [`Cli::into_bridge_config`].
#[derive(Debug, Parser)]
#[command(
    name = "linebot-bridge",
    about = "Serial-to-WebSocket telemetry bridge for the line-following robot",
    version
)]
struct Cli {
    /// Firmware message-type schema: `unified` or `discrete`.
    ///
    /// Nothing on the wire identifies the firmware generation, so this must be
    /// given here, through `LINEBOT_SCHEMA`, or in the settings file.
    #[arg(long, env = "LINEBOT_SCHEMA")]
    schema: Option<FirmwareSchema>,

    /// TCP port for the WebSocket server.
    #[arg(long, env = "LINEBOT_WS_PORT")]
    ws_port: Option<u16>,

    /// IP address to bind the WebSocket server to.
    ///
    /// Use `0.0.0.0` to accept dashboards from the LAN, or `127.0.0.1` to
    /// accept only local connections.
    #[arg(long, env = "LINEBOT_WS_BIND")]
    ws_bind: Option<String>,

    /// Serial port to open at startup (e.g. `/dev/ttyUSB0` or `COM3`).
    #[arg(long = "port", env = "LINEBOT_SERIAL_PORT")]
    serial_port: Option<String>,

    /// Serial line speed in baud.
    #[arg(long = "baud", env = "LINEBOT_BAUD")]
    baud_rate: Option<u32>,

    /// Outbound messages buffered per client before new ones are dropped.
    #[arg(long, env = "LINEBOT_SINK_BUFFER")]
    sink_buffer: Option<usize>,

    /// Path of an optional TOML settings file.
    #[arg(long, env = "LINEBOT_CONFIG")]
    config: Option<PathBuf>,
}

impl Cli {
    /// Merges the parsed arguments over `file` into a [`BridgeConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if no schema is given anywhere, if a schema or bind
    /// address cannot be parsed, or if the sink buffer is zero.
    fn into_bridge_config(self, file: FileConfig) -> anyhow::Result<BridgeConfig> {
        let schema = match self.schema {
            Some(schema) => schema,
            None => match file.robot.schema {
                Some(name) => name
                    .parse::<FirmwareSchema>()
                    .context("invalid [robot] schema in settings file")?,
                None => bail!(
                    "no firmware schema given; pass --schema unified|discrete, \
                     set LINEBOT_SCHEMA, or set [robot] schema in the settings file"
                ),
            },
        };

        let ws_bind = self
            .ws_bind
            .or(file.network.bind_address)
            .unwrap_or_else(|| DEFAULT_WS_BIND.to_string());
        let ws_port = self
            .ws_port
            .or(file.network.ws_port)
            .unwrap_or(DEFAULT_WS_PORT);
        let ip: IpAddr = ws_bind
            .parse()
            .with_context(|| format!("invalid WebSocket bind address: '{ws_bind}'"))?;

        let sink_buffer = self
            .sink_buffer
            .or(file.network.sink_buffer)
            .unwrap_or(DEFAULT_SINK_BUFFER);
        if sink_buffer == 0 {
            bail!("sink buffer must hold at least one message");
        }

        Ok(BridgeConfig {
            ws_bind_addr: SocketAddr::new(ip, ws_port),
            schema,
            baud_rate: self
                .baud_rate
                .or(file.serial.baud_rate)
                .unwrap_or(DEFAULT_BAUD_RATE),
            serial_port: self.serial_port.or(file.serial.port),
            sink_buffer,
        })
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Program entry point.
///
/// # What happens at startup
///
/// 1. CLI arguments are parsed and the settings file, if any, is loaded.
/// 2. `tracing_subscriber` is initialised.  `RUST_LOG` wins; otherwise the
///    file's `log_level`, otherwise `info`.
/// 3. The serial device, client registry and relay are wired together, and
///    the startup port (if configured) is opened.
/// 4. The device line pump is spawned.
/// 5. A Ctrl+C handler clears a shared `AtomicBool`.
/// 6. [`run_server`] accepts clients until the flag is cleared.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let file = match &cli.config {
        Some(path) => load_config(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => FileConfig::default(),
    };

    // ── Logging setup ─────────────────────────────────────────────────────────
    let default_filter = file.log_level.clone().unwrap_or_else(|| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let config = cli.into_bridge_config(file)?;

    info!(
        "linebot bridge starting: ws={}, schema={}, baud={}",
        config.ws_bind_addr, config.schema, config.baud_rate
    );

    // ── Wiring ────────────────────────────────────────────────────────────────
    let (line_tx, line_rx) = mpsc::channel(LINE_CHANNEL_CAPACITY);
    let device = Arc::new(SerialDevice::new(config.baud_rate, line_tx));
    let registry = Arc::new(ClientRegistry::new());
    let relay = Arc::new(Relay::new(
        FrameDecoder::new(config.schema),
        Arc::clone(&registry),
        Arc::clone(&device) as Arc<dyn DevicePort>,
    ));

    if let Some(port) = &config.serial_port {
        if let Err(e) = device.select(port) {
            warn!("could not open serial port {port}: {e}; waiting for select_device");
        }
    }

    tokio::spawn(run_line_pump(line_rx, Arc::clone(&relay)));

    // ── Graceful shutdown flag ────────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C; initiating graceful shutdown");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    // ── Main server loop ──────────────────────────────────────────────────────
    run_server(&config, relay, running).await?;

    // Closing joins the serial reader thread.
    tokio::task::spawn_blocking(move || device.close())
        .await
        .context("serial shutdown task failed")?;
    info!("linebot bridge stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
