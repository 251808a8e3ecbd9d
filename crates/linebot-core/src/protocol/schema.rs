//! Firmware schema selection and the per-schema message type tables.
//!
//! Two firmware generations speak the same line format but disagree on what
//! each message type code means:
//!
//! | Code | `unified`           | `discrete`      |
//! |------|---------------------|-----------------|
//! | 0    | system              | system          |
//! | 1    | command_ack         | sensor_data     |
//! | 2    | unified_telemetry   | odometry        |
//! | 3    | –                   | state           |
//! | 4    | –                   | mode_change     |
//! | 5    | –                   | pid_tuning      |
//! | 6    | –                   | competition     |
//! | 7    | –                   | remote_status   |
//! | 8    | –                   | command_ack     |
//!
//! Nothing on the wire says which generation is talking, so the schema is
//! always supplied from outside (CLI flag or config file) and never guessed.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Error returned when a schema name is not recognised.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown firmware schema {0:?} (expected \"unified\" or \"discrete\")")]
pub struct SchemaParseError(pub String);

/// The firmware message-type enumeration a decoder is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FirmwareSchema {
    /// Three frame kinds; all live telemetry arrives in one wide
    /// `unified_telemetry` frame.  Supports the `toggle_telemetry` command.
    Unified,
    /// Nine narrow frame kinds, one per subsystem (sensors, odometry, PID, ...).
    Discrete,
}

impl FirmwareSchema {
    /// Canonical lowercase name, as accepted by [`FromStr`].
    pub fn as_str(self) -> &'static str {
        match self {
            FirmwareSchema::Unified => "unified",
            FirmwareSchema::Discrete => "discrete",
        }
    }

    /// Maps a message type code to the frame kind it denotes in this schema.
    ///
    /// Returns `None` for codes the schema does not define.
    pub fn message_type(self, code: u8) -> Option<MessageType> {
        match (self, code) {
            (_, 0) => Some(MessageType::System),
            (FirmwareSchema::Unified, 1) => Some(MessageType::CommandAck),
            (FirmwareSchema::Unified, 2) => Some(MessageType::UnifiedTelemetry),
            (FirmwareSchema::Discrete, 1) => Some(MessageType::SensorData),
            (FirmwareSchema::Discrete, 2) => Some(MessageType::Odometry),
            (FirmwareSchema::Discrete, 3) => Some(MessageType::State),
            (FirmwareSchema::Discrete, 4) => Some(MessageType::ModeChange),
            (FirmwareSchema::Discrete, 5) => Some(MessageType::PidTuning),
            (FirmwareSchema::Discrete, 6) => Some(MessageType::Competition),
            (FirmwareSchema::Discrete, 7) => Some(MessageType::RemoteStatus),
            (FirmwareSchema::Discrete, 8) => Some(MessageType::CommandAck),
            _ => None,
        }
    }
}

impl fmt::Display for FirmwareSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FirmwareSchema {
    type Err = SchemaParseError;

    /// Accepts `unified` / `a` and `discrete` / `b`, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unified" | "a" => Ok(FirmwareSchema::Unified),
            "discrete" | "b" => Ok(FirmwareSchema::Discrete),
            _ => Err(SchemaParseError(s.to_string())),
        }
    }
}

/// Every frame kind known to either schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    System,
    CommandAck,
    UnifiedTelemetry,
    SensorData,
    Odometry,
    State,
    ModeChange,
    PidTuning,
    Competition,
    RemoteStatus,
}

impl MessageType {
    /// Minimum number of fields (after the type code) a frame must carry
    /// before it can be decoded.
    ///
    /// Most frame kinds tolerate a missing final field, which then decodes as
    /// zero.
    pub fn min_fields(self, schema: FirmwareSchema) -> usize {
        match (self, schema) {
            (MessageType::System, _) => 0,
            (MessageType::CommandAck, FirmwareSchema::Unified) => 1,
            (MessageType::CommandAck, FirmwareSchema::Discrete) => 0,
            (MessageType::UnifiedTelemetry, _) => 30,
            (MessageType::SensorData, _) => 8,
            (MessageType::Odometry, _) => 3,
            (MessageType::State, _) => 2,
            (MessageType::ModeChange, _) => 2,
            (MessageType::PidTuning, _) => 3,
            (MessageType::Competition, _) => 2,
            (MessageType::RemoteStatus, _) => 2,
        }
    }

    /// The `"type"` discriminator used for this frame kind in JSON output.
    pub fn name(self) -> &'static str {
        match self {
            MessageType::System => "system",
            MessageType::CommandAck => "command_ack",
            MessageType::UnifiedTelemetry => "unified_telemetry",
            MessageType::SensorData => "sensor_data",
            MessageType::Odometry => "odometry",
            MessageType::State => "state",
            MessageType::ModeChange => "mode_change",
            MessageType::PidTuning => "pid_tuning",
            MessageType::Competition => "competition",
            MessageType::RemoteStatus => "remote_status",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
