//! Commands sent from clients to the robot and their CSV encoding.
//!
//! Each command is one line: the numeric code followed by its arguments,
//! separated by commas.  The line terminator is appended by the transport,
//! not here.
//!
//! | Code | Command            | Arguments                       |
//! |------|--------------------|---------------------------------|
//! | 0    | `set_pid`          | `kp,ki,kd` (6 decimal places)   |
//! | 1    | `set_speed`        | signed integer                  |
//! | 2    | `set_mode`         | `0..=255`                       |
//! | 3    | `calibrate`        | –                               |
//! | 4    | `start`            | –                               |
//! | 5    | `stop`             | –                               |
//! | 6    | `get_status`       | –                               |
//! | 7    | `toggle_telemetry` | – (`unified` firmware only)     |

use crate::protocol::schema::FirmwareSchema;

/// Numeric command codes understood by the firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommandCode {
    SetPid = 0,
    SetSpeed = 1,
    SetMode = 2,
    Calibrate = 3,
    Start = 4,
    Stop = 5,
    GetStatus = 6,
    ToggleTelemetry = 7,
}

impl CommandCode {
    /// Upper-case name used in log lines.
    pub fn name(self) -> &'static str {
        match self {
            CommandCode::SetPid => "SET_PID",
            CommandCode::SetSpeed => "SET_SPEED",
            CommandCode::SetMode => "SET_MODE",
            CommandCode::Calibrate => "CALIBRATE",
            CommandCode::Start => "START",
            CommandCode::Stop => "STOP",
            CommandCode::GetStatus => "GET_STATUS",
            CommandCode::ToggleTelemetry => "TOGGLE_TELEMETRY",
        }
    }

    /// Whether firmware of the given schema accepts this command.
    pub fn is_supported_by(self, schema: FirmwareSchema) -> bool {
        match self {
            CommandCode::ToggleTelemetry => schema == FirmwareSchema::Unified,
            _ => true,
        }
    }
}

/// A validated command ready to be encoded for the device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CommandRequest {
    SetPid { kp: f32, ki: f32, kd: f32 },
    SetSpeed { speed: i16 },
    SetMode { mode: u8 },
    Calibrate,
    Start,
    Stop,
    GetStatus,
    ToggleTelemetry,
}

impl CommandRequest {
    pub fn code(&self) -> CommandCode {
        match self {
            CommandRequest::SetPid { .. } => CommandCode::SetPid,
            CommandRequest::SetSpeed { .. } => CommandCode::SetSpeed,
            CommandRequest::SetMode { .. } => CommandCode::SetMode,
            CommandRequest::Calibrate => CommandCode::Calibrate,
            CommandRequest::Start => CommandCode::Start,
            CommandRequest::Stop => CommandCode::Stop,
            CommandRequest::GetStatus => CommandCode::GetStatus,
            CommandRequest::ToggleTelemetry => CommandCode::ToggleTelemetry,
        }
    }

    pub fn is_supported_by(&self, schema: FirmwareSchema) -> bool {
        self.code().is_supported_by(schema)
    }
}

/// Renders a command as the CSV line the firmware parses, without a line
/// terminator.
///
/// PID gains always carry exactly six digits after the decimal point and use
/// `.` as the decimal separator regardless of locale.
///
/// # Example
///
/// ```rust
/// use linebot_core::{encode_command, CommandRequest};
///
/// let line = encode_command(&CommandRequest::SetPid { kp: 1.5, ki: 0.0, kd: 2.25 });
/// assert_eq!(line, "0,1.500000,0.000000,2.250000");
/// ```
pub fn encode_command(request: &CommandRequest) -> String {
    let code = request.code() as u8;
    match *request {
        CommandRequest::SetPid { kp, ki, kd } => format!("{code},{kp:.6},{ki:.6},{kd:.6}"),
        CommandRequest::SetSpeed { speed } => format!("{code},{speed}"),
        CommandRequest::SetMode { mode } => format!("{code},{mode}"),
        CommandRequest::Calibrate
        | CommandRequest::Start
        | CommandRequest::Stop
        | CommandRequest::GetStatus
        | CommandRequest::ToggleTelemetry => code.to_string(),
    }
}

/// Human-readable name of an operation mode, for logging `set_mode`.
pub fn operation_mode_name(mode: u8) -> Option<&'static str> {
    match mode {
        0 => Some("CALIBRATION"),
        1 => Some("COMPETITION"),
        2 => Some("TUNING"),
        3 => Some("DEBUG"),
        4 => Some("REMOTE_CONTROL"),
        _ => None,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
