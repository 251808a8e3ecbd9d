//! JSON message types for the client-facing WebSocket protocol.
//!
//! # Message flow
//!
//! ```text
//! Client → Bridge:  JSON text frame  →  ClientMessage
//! Bridge → Client:  TelemetryRecord  →  ServerMessage  →  JSON text frame
//! ```
//!
//! # JSON discriminant
//!
//! Every message is a single JSON object whose `"type"` field names the
//! variant; all other fields sit next to it:
//!
//! ```json
//! {"type":"set_speed","speed":-120}
//! {"type":"odometry","timestamp":77,"x":1.5,"y":2.5,"theta":-0.25}
//! ```
//!
//! Discriminators are `snake_case`.  Field names follow whatever the firmware
//! generation's dashboard expects: `camelCase` for the unified frame,
//! `snake_case` everywhere else.

use serde::{Deserialize, Serialize};

// ── Client → Bridge messages ──────────────────────────────────────────────────

/// Every request a client may send over its WebSocket.
///
/// A frame that does not deserialize into one of these (unknown `type`,
/// missing key, wrong value type) is logged and ignored by the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// List the serial ports present on the host.
    GetDevices,

    /// Open `port`, closing whichever port was open before.
    SelectDevice { port: String },

    /// Close the current port, if any.
    DisconnectDevice,

    SetPid { kp: f32, ki: f32, kd: f32 },

    /// Signed base speed for both motors.
    SetSpeed { speed: i16 },

    /// Operation mode: 0 calibration, 1 competition, 2 tuning, 3 debug,
    /// 4 remote control.
    SetMode { mode: u8 },

    Calibrate,
    Start,
    Stop,
    GetStatus,

    /// Unified firmware only.
    ToggleTelemetry,
}

impl ClientMessage {
    /// The `type` discriminator, for log lines.
    pub fn type_name(&self) -> &'static str {
        match self {
            ClientMessage::GetDevices => "get_devices",
            ClientMessage::SelectDevice { .. } => "select_device",
            ClientMessage::DisconnectDevice => "disconnect_device",
            ClientMessage::SetPid { .. } => "set_pid",
            ClientMessage::SetSpeed { .. } => "set_speed",
            ClientMessage::SetMode { .. } => "set_mode",
            ClientMessage::Calibrate => "calibrate",
            ClientMessage::Start => "start",
            ClientMessage::Stop => "stop",
            ClientMessage::GetStatus => "get_status",
            ClientMessage::ToggleTelemetry => "toggle_telemetry",
        }
    }
}

// ── Bridge → Client messages ──────────────────────────────────────────────────

/// One serial port as listed in a `devices` reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// OS name of the port, e.g. `/dev/ttyUSB0` or `COM3`.
    pub port: String,
    /// Human-readable description.
    pub desc: String,
}

/// Every message the bridge sends to clients.
///
/// All variants except `Devices` are broadcast to every client; `Devices` and
/// the `System` replies to device-management requests go only to the client
/// that asked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    System {
        message: String,
    },

    CommandAck {
        command_type: u8,
    },

    /// The wide frame from unified firmware.  Keys are camelCase.
    #[serde(rename_all = "camelCase")]
    UnifiedTelemetry {
        timestamp: u32,
        operation_mode: u8,
        robot_state: u8,
        pwm_left: i16,
        pwm_right: i16,
        rpm_left: f32,
        rpm_right: f32,
        distance_traveled: f32,
        ultrasonic_distance: f32,
        sensors: [i16; 6],
        sensor_error: i16,
        sensor_sum: i16,
        odometry_x: f32,
        odometry_y: f32,
        odometry_theta: f32,
        line_pid_kp: f32,
        line_pid_ki: f32,
        line_pid_kd: f32,
        line_pid_integral: f32,
        motor_pid_kp: f32,
        motor_pid_ki: f32,
        motor_pid_kd: f32,
        motor_pid_integral: f32,
        remote_connected: u8,
        remote_left_speed: i16,
        remote_right_speed: i16,
    },

    SensorData {
        timestamp: u32,
        sensors: [i16; 6],
        error: i16,
        sum: i16,
    },

    Odometry {
        timestamp: u32,
        x: f32,
        y: f32,
        theta: f32,
    },

    State {
        timestamp: u32,
        state: u8,
        distance: f32,
    },

    ModeChange {
        old_mode: u8,
        new_mode: u8,
        serial_enabled: u8,
    },

    PidTuning {
        kp: f32,
        ki: f32,
        kd: f32,
        integral: f32,
    },

    Competition {
        mode: u8,
        /// Milliseconds.
        time: u32,
        lap_count: u8,
    },

    RemoteStatus {
        connected: bool,
        left_speed: i16,
        right_speed: i16,
    },

    /// Reply to `get_devices`.
    Devices {
        devices: Vec<DeviceInfo>,
    },
}

impl ServerMessage {
    /// Shorthand for a `system` message.
    pub fn system(message: impl Into<String>) -> Self {
        ServerMessage::System {
            message: message.into(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
