//! # linebot-core
//!
//! Shared protocol library for the linebot serial bridge.  It knows how the
//! robot firmware talks over its serial line and nothing else: no sockets, no
//! async runtime, no logging.
//!
//! # Architecture overview (for beginners)
//!
//! The robot prints one comma-separated line per telemetry frame, for example:
//!
//! ```text
//! 2,123456,1,2,-80,80,120.5,118.0,...
//! ^ message type code, then positional fields
//! ```
//!
//! and accepts short comma-separated command lines such as `1,-120`
//! ("set speed to -120").
//!
//! This crate defines:
//!
//! - **`protocol::schema`** – Which message type codes exist.  Two firmware
//!   generations assign different meanings to the same codes, so every decoder
//!   is built for one explicit [`FirmwareSchema`].
//!
//! - **`protocol::frame`** – The [`FrameDecoder`] that turns one raw line into
//!   a strongly typed [`TelemetryRecord`].
//!
//! - **`protocol::command`** – The [`CommandRequest`] type and
//!   [`encode_command`], which renders a request as the CSV line the firmware
//!   parses.

pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `linebot_core::FrameDecoder` instead of the full module path.
pub use protocol::command::{encode_command, CommandCode, CommandRequest};
pub use protocol::frame::{FrameDecoder, FrameError, RawFrame};
pub use protocol::schema::{FirmwareSchema, MessageType, SchemaParseError};
pub use protocol::telemetry::TelemetryRecord;
