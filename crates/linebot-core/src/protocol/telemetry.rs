//! Typed telemetry records produced by the frame decoder.
//!
//! Every record is built fresh from one device line and dropped once it has
//! been rendered for the clients; nothing here is retained.

use crate::protocol::schema::MessageType;

/// Number of line sensors reported in a single frame.
pub const SENSOR_COUNT: usize = 6;

/// Position estimate from wheel odometry.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    pub x: f32,
    pub y: f32,
    /// Heading in radians.
    pub theta: f32,
}

/// Gains and accumulated integral term of one PID loop.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PidState {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
    pub integral: f32,
}

/// Status of the remote-control link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RemoteState {
    /// Raw flag as sent by the firmware (`0` = disconnected).
    pub connected: u8,
    pub left_speed: i16,
    pub right_speed: i16,
}

/// The single wide frame emitted by `unified` firmware.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UnifiedTelemetry {
    /// Milliseconds since the robot booted.
    pub timestamp: u32,
    pub operation_mode: u8,
    pub robot_state: u8,
    pub pwm_left: i16,
    pub pwm_right: i16,
    pub rpm_left: f32,
    pub rpm_right: f32,
    pub distance_traveled: f32,
    pub ultrasonic_distance: f32,
    pub sensors: [i16; SENSOR_COUNT],
    pub sensor_error: i16,
    pub sensor_sum: i16,
    pub odometry: Pose,
    pub line_pid: PidState,
    pub motor_pid: PidState,
    pub remote: RemoteState,
}

/// Raw line-sensor readings (`discrete` firmware).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SensorData {
    pub timestamp: u32,
    pub sensors: [i16; SENSOR_COUNT],
    pub error: i16,
    pub sum: i16,
}

/// One decoded device frame.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryRecord {
    /// Free-text status line.
    System { message: String },

    /// The firmware acknowledged a command; `command_type` echoes its code.
    CommandAck { command_type: u8 },

    UnifiedTelemetry(UnifiedTelemetry),

    SensorData(SensorData),

    Odometry { timestamp: u32, pose: Pose },

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

    PidTuning(PidState),

    Competition {
        mode: u8,
        /// Elapsed run time in milliseconds.
        time: u32,
        lap_count: u8,
    },

    RemoteStatus(RemoteState),
}

impl TelemetryRecord {
    /// Returns the frame kind this record was decoded from.
    pub fn message_type(&self) -> MessageType {
        match self {
            TelemetryRecord::System { .. } => MessageType::System,
            TelemetryRecord::CommandAck { .. } => MessageType::CommandAck,
            TelemetryRecord::UnifiedTelemetry(_) => MessageType::UnifiedTelemetry,
            TelemetryRecord::SensorData(_) => MessageType::SensorData,
            TelemetryRecord::Odometry { .. } => MessageType::Odometry,
            TelemetryRecord::State { .. } => MessageType::State,
            TelemetryRecord::ModeChange { .. } => MessageType::ModeChange,
            TelemetryRecord::PidTuning(_) => MessageType::PidTuning,
            TelemetryRecord::Competition { .. } => MessageType::Competition,
            TelemetryRecord::RemoteStatus(_) => MessageType::RemoteStatus,
        }
    }
}
