//! Core translation logic between the robot protocol and the client JSON
//! protocol.
//!
//! Pure functions, no I/O:
//!
//! ```text
//! Robot → Client:  TelemetryRecord → ServerMessage     encode_telemetry()
//! Client → Robot:  ClientMessage   → CommandRequest    translate_client_message()
//! ```

use thiserror::Error;

use linebot_core::protocol::telemetry::{PidState, RemoteState, SensorData, UnifiedTelemetry};
use linebot_core::{CommandRequest, FirmwareSchema, TelemetryRecord};

use crate::domain::messages::{ClientMessage, ServerMessage};

// ── Error type ────────────────────────────────────────────────────────────────

/// Reasons a client message cannot become a device command.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BridgeError {
    /// The connected firmware generation has no such command.
    #[error("{command} is not supported by {schema} firmware")]
    UnsupportedCommand {
        command: &'static str,
        schema: FirmwareSchema,
    },

    /// The message is a device-management request answered by the bridge
    /// itself (`get_devices`, `select_device`, `disconnect_device`).
    #[error("{0} is handled by the bridge and has no device command")]
    NotADeviceCommand(&'static str),
}

// ── Robot → Client ────────────────────────────────────────────────────────────

/// Renders a decoded telemetry record as the JSON message sent to clients.
///
/// Total: every record has exactly one rendering.
///
/// # Example
///
/// ```rust
/// use linebot_bridge::application::encode_telemetry;
/// use linebot_bridge::domain::ServerMessage;
/// use linebot_core::TelemetryRecord;
///
/// let record = TelemetryRecord::CommandAck { command_type: 4 };
/// assert_eq!(encode_telemetry(&record), ServerMessage::CommandAck { command_type: 4 });
/// ```
pub fn encode_telemetry(record: &TelemetryRecord) -> ServerMessage {
    match record {
        TelemetryRecord::System { message } => ServerMessage::System {
            message: message.clone(),
        },
        TelemetryRecord::CommandAck { command_type } => ServerMessage::CommandAck {
            command_type: *command_type,
        },
        TelemetryRecord::UnifiedTelemetry(t) => encode_unified(t),
        TelemetryRecord::SensorData(SensorData {
            timestamp,
            sensors,
            error,
            sum,
        }) => ServerMessage::SensorData {
            timestamp: *timestamp,
            sensors: *sensors,
            error: *error,
            sum: *sum,
        },
        TelemetryRecord::Odometry { timestamp, pose } => ServerMessage::Odometry {
            timestamp: *timestamp,
            x: pose.x,
            y: pose.y,
            theta: pose.theta,
        },
        TelemetryRecord::State {
            timestamp,
            state,
            distance,
        } => ServerMessage::State {
            timestamp: *timestamp,
            state: *state,
            distance: *distance,
        },
        TelemetryRecord::ModeChange {
            old_mode,
            new_mode,
            serial_enabled,
        } => ServerMessage::ModeChange {
            old_mode: *old_mode,
            new_mode: *new_mode,
            serial_enabled: *serial_enabled,
        },
        TelemetryRecord::PidTuning(PidState {
            kp,
            ki,
            kd,
            integral,
        }) => ServerMessage::PidTuning {
            kp: *kp,
            ki: *ki,
            kd: *kd,
            integral: *integral,
        },
        TelemetryRecord::Competition {
            mode,
            time,
            lap_count,
        } => ServerMessage::Competition {
            mode: *mode,
            time: *time,
            lap_count: *lap_count,
        },
        TelemetryRecord::RemoteStatus(RemoteState {
            connected,
            left_speed,
            right_speed,
        }) => ServerMessage::RemoteStatus {
            connected: *connected != 0,
            left_speed: *left_speed,
            right_speed: *right_speed,
        },
    }
}

fn encode_unified(t: &UnifiedTelemetry) -> ServerMessage {
    ServerMessage::UnifiedTelemetry {
        timestamp: t.timestamp,
        operation_mode: t.operation_mode,
        robot_state: t.robot_state,
        pwm_left: t.pwm_left,
        pwm_right: t.pwm_right,
        rpm_left: t.rpm_left,
        rpm_right: t.rpm_right,
        distance_traveled: t.distance_traveled,
        ultrasonic_distance: t.ultrasonic_distance,
        sensors: t.sensors,
        sensor_error: t.sensor_error,
        sensor_sum: t.sensor_sum,
        odometry_x: t.odometry.x,
        odometry_y: t.odometry.y,
        odometry_theta: t.odometry.theta,
        line_pid_kp: t.line_pid.kp,
        line_pid_ki: t.line_pid.ki,
        line_pid_kd: t.line_pid.kd,
        line_pid_integral: t.line_pid.integral,
        motor_pid_kp: t.motor_pid.kp,
        motor_pid_ki: t.motor_pid.ki,
        motor_pid_kd: t.motor_pid.kd,
        motor_pid_integral: t.motor_pid.integral,
        remote_connected: t.remote.connected,
        remote_left_speed: t.remote.left_speed,
        remote_right_speed: t.remote.right_speed,
    }
}

// ── Client → Robot ────────────────────────────────────────────────────────────

/// Translates a client command into the request the device understands.
///
/// # Errors
///
/// - [`BridgeError::NotADeviceCommand`] for device-management messages.
/// - [`BridgeError::UnsupportedCommand`] when `schema` lacks the command
///   (`toggle_telemetry` on discrete firmware).
pub fn translate_client_message(
    msg: &ClientMessage,
    schema: FirmwareSchema,
) -> Result<CommandRequest, BridgeError> {
    let request = match *msg {
        ClientMessage::GetDevices
        | ClientMessage::SelectDevice { .. }
        | ClientMessage::DisconnectDevice => {
            return Err(BridgeError::NotADeviceCommand(msg.type_name()))
        }
        ClientMessage::SetPid { kp, ki, kd } => CommandRequest::SetPid { kp, ki, kd },
        ClientMessage::SetSpeed { speed } => CommandRequest::SetSpeed { speed },
        ClientMessage::SetMode { mode } => CommandRequest::SetMode { mode },
        ClientMessage::Calibrate => CommandRequest::Calibrate,
        ClientMessage::Start => CommandRequest::Start,
        ClientMessage::Stop => CommandRequest::Stop,
        ClientMessage::GetStatus => CommandRequest::GetStatus,
        ClientMessage::ToggleTelemetry => CommandRequest::ToggleTelemetry,
    };

    if !request.is_supported_by(schema) {
        return Err(BridgeError::UnsupportedCommand {
            command: msg.type_name(),
            schema,
        });
    }

    Ok(request)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
