//! Application layer for linebot-bridge.
//!
//! Knows *what* to do with traffic in both directions and delegates *how*
//! bytes move to the infrastructure layer.
//!
//! # Responsibilities
//!
//! - Rendering telemetry records as client JSON ([`bridge_service`])
//! - Translating client commands into device requests ([`bridge_service`])
//! - Tracking connected clients and fanning messages out ([`registry`])
//! - Tying decoder, registry and device together ([`relay`])
//!
//! # What does NOT belong here?
//!
//! - Opening sockets or serial ports
//! - Spawning tasks or threads
//! - WebSocket framing (handled by tokio-tungstenite)

pub mod bridge_service;
pub mod registry;
pub mod relay;

pub use bridge_service::{encode_telemetry, translate_client_message, BridgeError};
pub use registry::{BroadcastReport, ClientRegistry, ClientSink, SinkId};
pub use relay::Relay;
