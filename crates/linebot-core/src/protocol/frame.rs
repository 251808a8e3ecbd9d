//! CSV frame decoder.
//!
//! Wire format (one frame per line, no quoting, no escaping):
//! ```text
//! <type_code>,<field_0>,<field_1>,...,<field_n>
//! ```
//!
//! # Field handling
//!
//! | Target type        | Token fails to parse           | Token absent (past minimum) |
//! |--------------------|--------------------------------|-----------------------------|
//! | `u8`, `i16`, `u32` | whole frame rejected           | `0`                         |
//! | `f32`              | `0.0` (also for NaN / ±inf)    | `0.0`                       |
//! | sensor array entry | `0`                            | n/a (always required)       |
//! | text               | n/a                            | empty string                |
//!
//! The decoder is a pure function of its input.  It never logs; callers that
//! want to know *why* a line produced nothing use [`FrameDecoder::try_decode`]
//! and log the returned [`FrameError`] themselves.

use std::any::type_name;
use std::str::FromStr;

use thiserror::Error;

use crate::protocol::schema::{FirmwareSchema, MessageType};
use crate::protocol::telemetry::{
    PidState, Pose, RemoteState, SensorData, TelemetryRecord, UnifiedTelemetry, SENSOR_COUNT,
};

/// Separator between tokens on a device line.
pub const FIELD_DELIMITER: char = ',';

/// Reasons a device line did not produce a [`TelemetryRecord`].
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FrameError {
    /// The first token is not a non-negative integer that fits in a byte.
    #[error("invalid message type code: {0:?}")]
    InvalidTypeCode(String),

    /// The code is well-formed but the active schema does not define it.
    #[error("unknown message type code {code} for {schema} firmware")]
    UnknownMessageType { code: u8, schema: FirmwareSchema },

    /// The frame has fewer fields than its kind requires.
    #[error("{message_type} frame needs at least {needed} fields, got {available}")]
    InsufficientFields {
        message_type: MessageType,
        needed: usize,
        available: usize,
    },

    /// A required integer field could not be parsed.
    #[error("{message_type} field {index} is not a valid {expected}: {value:?}")]
    InvalidField {
        message_type: MessageType,
        index: usize,
        expected: &'static str,
        value: String,
    },
}

impl FrameError {
    /// `true` when the line was simply of a kind this schema ignores, as
    /// opposed to a damaged frame.
    pub fn is_unknown_type(&self) -> bool {
        matches!(self, FrameError::UnknownMessageType { .. })
    }
}

// ── Raw frame ─────────────────────────────────────────────────────────────────

/// A device line split into its type-code token and positional field tokens.
///
/// Tokens borrow from the original line; no allocation beyond the token list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame<'a> {
    code: &'a str,
    fields: Vec<&'a str>,
}

impl<'a> RawFrame<'a> {
    /// Splits `line` on [`FIELD_DELIMITER`] after stripping any trailing line
    /// terminator.
    pub fn parse(line: &'a str) -> Self {
        let line = line.trim_end_matches(['\r', '\n']);
        let mut tokens = line.split(FIELD_DELIMITER);
        // `split` always yields at least one (possibly empty) token.
        let code = tokens.next().unwrap_or_default();
        Self {
            code,
            fields: tokens.collect(),
        }
    }

    /// Parses the message type code token.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::InvalidTypeCode`] when the token is empty,
    /// negative, non-numeric, or larger than `u8::MAX`.
    pub fn code(&self) -> Result<u8, FrameError> {
        self.code
            .trim()
            .parse::<u8>()
            .map_err(|_| FrameError::InvalidTypeCode(self.code.to_string()))
    }

    /// The positional field tokens following the type code.
    pub fn fields(&self) -> &[&'a str] {
        &self.fields
    }
}

// ── Decoder ───────────────────────────────────────────────────────────────────

/// Decodes device lines into [`TelemetryRecord`]s for one fixed schema.
///
/// # Example
///
/// ```rust
/// use linebot_core::{FirmwareSchema, FrameDecoder, TelemetryRecord};
///
/// let decoder = FrameDecoder::new(FirmwareSchema::Unified);
/// let record = decoder.decode("0,Dispositivo conectado").unwrap();
/// assert_eq!(
///     record,
///     TelemetryRecord::System { message: "Dispositivo conectado".to_string() }
/// );
/// assert!(decoder.decode("9,1,2,3").is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameDecoder {
    schema: FirmwareSchema,
}

impl FrameDecoder {
    pub fn new(schema: FirmwareSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> FirmwareSchema {
        self.schema
    }

    /// Decodes one line, returning `None` for anything that is not a
    /// well-formed frame of a known kind.
    pub fn decode(&self, line: &str) -> Option<TelemetryRecord> {
        self.try_decode(line).ok()
    }

    /// Decodes one line, reporting why no record was produced.
    ///
    /// # Errors
    ///
    /// See [`FrameError`] for the individual failure cases.
    pub fn try_decode(&self, line: &str) -> Result<TelemetryRecord, FrameError> {
        let frame = RawFrame::parse(line);
        let code = frame.code()?;
        let message_type =
            self.schema
                .message_type(code)
                .ok_or(FrameError::UnknownMessageType {
                    code,
                    schema: self.schema,
                })?;

        let needed = message_type.min_fields(self.schema);
        if frame.fields().len() < needed {
            return Err(FrameError::InsufficientFields {
                message_type,
                needed,
                available: frame.fields().len(),
            });
        }

        let f = Fields {
            message_type,
            tokens: frame.fields(),
        };

        let record = match message_type {
            MessageType::System => TelemetryRecord::System {
                message: f.text(0),
            },
            MessageType::CommandAck => TelemetryRecord::CommandAck {
                command_type: f.int(0)?,
            },
            MessageType::UnifiedTelemetry => {
                TelemetryRecord::UnifiedTelemetry(decode_unified(&f)?)
            }
            MessageType::SensorData => TelemetryRecord::SensorData(SensorData {
                timestamp: f.int(0)?,
                sensors: f.int_array(1)?,
                error: f.int(7)?,
                sum: f.int(8)?,
            }),
            MessageType::Odometry => TelemetryRecord::Odometry {
                timestamp: f.int(0)?,
                pose: f.pose(1),
            },
            MessageType::State => TelemetryRecord::State {
                timestamp: f.int(0)?,
                state: f.int(1)?,
                distance: f.float(2),
            },
            MessageType::ModeChange => TelemetryRecord::ModeChange {
                old_mode: f.int(0)?,
                new_mode: f.int(1)?,
                serial_enabled: f.int(2)?,
            },
            MessageType::PidTuning => TelemetryRecord::PidTuning(f.pid(0)),
            MessageType::Competition => TelemetryRecord::Competition {
                mode: f.int(0)?,
                time: f.int(1)?,
                lap_count: f.int(2)?,
            },
            MessageType::RemoteStatus => TelemetryRecord::RemoteStatus(f.remote(0)?),
        };

        Ok(record)
    }
}

/// Field layout of the 31-field `unified_telemetry` frame.
fn decode_unified(f: &Fields<'_>) -> Result<UnifiedTelemetry, FrameError> {
    Ok(UnifiedTelemetry {
        timestamp: f.int(0)?,
        operation_mode: f.int(1)?,
        robot_state: f.int(2)?,
        pwm_left: f.int(3)?,
        pwm_right: f.int(4)?,
        rpm_left: f.float(5),
        rpm_right: f.float(6),
        distance_traveled: f.float(7),
        ultrasonic_distance: f.float(8),
        sensors: f.lenient_int_array(9),
        sensor_error: f.int(15)?,
        sensor_sum: f.int(16)?,
        odometry: f.pose(17),
        line_pid: f.pid(20),
        motor_pid: f.pid(24),
        remote: f.remote(28)?,
    })
}

// ── Field access helpers ──────────────────────────────────────────────────────

/// Typed, index-based view over a frame's field tokens.
///
/// The minimum-count check has already run, so a missing token here can only
/// be an optional trailing field.
struct Fields<'a> {
    message_type: MessageType,
    tokens: &'a [&'a str],
}

impl Fields<'_> {
    fn text(&self, index: usize) -> String {
        self.tokens
            .get(index)
            .map(|t| (*t).to_string())
            .unwrap_or_default()
    }

    /// Required integer: a malformed token rejects the frame.
    fn int<T>(&self, index: usize) -> Result<T, FrameError>
    where
        T: FromStr + Default,
    {
        match self.tokens.get(index) {
            None => Ok(T::default()),
            Some(token) => token.trim().parse().map_err(|_| FrameError::InvalidField {
                message_type: self.message_type,
                index,
                expected: type_name::<T>(),
                value: (*token).to_string(),
            }),
        }
    }

    /// Integer that falls back to zero when malformed.
    fn lenient_int<T>(&self, index: usize) -> T
    where
        T: FromStr + Default,
    {
        self.tokens
            .get(index)
            .and_then(|t| t.trim().parse().ok())
            .unwrap_or_default()
    }

    /// Float that degrades to `0.0` when missing, malformed, or non-finite.
    fn float(&self, index: usize) -> f32 {
        self.tokens
            .get(index)
            .and_then(|t| t.trim().parse::<f32>().ok())
            .filter(|v| v.is_finite())
            .unwrap_or(0.0)
    }

    fn int_array(&self, start: usize) -> Result<[i16; SENSOR_COUNT], FrameError> {
        let mut out = [0i16; SENSOR_COUNT];
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = self.int(start + i)?;
        }
        Ok(out)
    }

    fn lenient_int_array(&self, start: usize) -> [i16; SENSOR_COUNT] {
        std::array::from_fn(|i| self.lenient_int(start + i))
    }

    fn pose(&self, start: usize) -> Pose {
        Pose {
            x: self.float(start),
            y: self.float(start + 1),
            theta: self.float(start + 2),
        }
    }

    fn pid(&self, start: usize) -> PidState {
        PidState {
            kp: self.float(start),
            ki: self.float(start + 1),
            kd: self.float(start + 2),
            integral: self.float(start + 3),
        }
    }

    fn remote(&self, start: usize) -> Result<RemoteState, FrameError> {
        Ok(RemoteState {
            connected: self.int(start)?,
            left_speed: self.int(start + 1)?,
            right_speed: self.int(start + 2)?,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// A complete 31-field unified frame with easily recognisable values.
    fn unified_line() -> String {
        [
            "2", "123456", "1", "2", "-80", "85", "120.5", "118.25", "42.75", "17.5", "100",
            "200", "300", "400", "500", "600", "-12", "2100", "1.5", "-2.25", "0.5", "2.5",
            "0.01", "0.75", "3.125", "1.25", "0.5", "0.125", "-4.5", "1", "-150", "150",
        ]
        .join(",")
    }

    fn unified() -> FrameDecoder {
        FrameDecoder::new(FirmwareSchema::Unified)
    }

    fn discrete() -> FrameDecoder {
        FrameDecoder::new(FirmwareSchema::Discrete)
    }

    // ── RawFrame ──────────────────────────────────────────────────────────────

    #[test]
    fn test_raw_frame_splits_code_and_fields() {
        let frame = RawFrame::parse("5,1.0,2.0,3.0");
        assert_eq!(frame.code(), Ok(5));
        assert_eq!(frame.fields(), &["1.0", "2.0", "3.0"]);
    }

    #[test]
    fn test_raw_frame_strips_crlf() {
        let frame = RawFrame::parse("1,7\r\n");
        assert_eq!(frame.fields(), &["7"]);
    }

    #[test]
    fn test_raw_frame_empty_line_has_invalid_code() {
        let frame = RawFrame::parse("");
        assert_eq!(frame.code(), Err(FrameError::InvalidTypeCode(String::new())));
        assert!(frame.fields().is_empty());
    }

    #[test]
    fn test_raw_frame_rejects_negative_and_oversized_codes() {
        assert!(RawFrame::parse("-1,foo").code().is_err());
        assert!(RawFrame::parse("256").code().is_err());
        assert!(RawFrame::parse("x,1").code().is_err());
    }

    // ── System / command ack ──────────────────────────────────────────────────

    #[test]
    fn test_decode_system_message() {
        let record = unified().decode("0,Dispositivo conectado");
        assert_eq!(
            record,
            Some(TelemetryRecord::System {
                message: "Dispositivo conectado".to_string()
            })
        );
    }

    #[test]
    fn test_decode_system_without_text_yields_empty_message() {
        let record = discrete().decode("0");
        assert_eq!(
            record,
            Some(TelemetryRecord::System {
                message: String::new()
            })
        );
    }

    #[test]
    fn test_decode_system_keeps_only_first_token() {
        let record = unified().decode("0,Hola, mundo");
        assert_eq!(
            record,
            Some(TelemetryRecord::System {
                message: "Hola".to_string()
            })
        );
    }

    #[test]
    fn test_decode_unified_command_ack() {
        assert_eq!(
            unified().decode("1,4"),
            Some(TelemetryRecord::CommandAck { command_type: 4 })
        );
    }

    #[test]
    fn test_decode_unified_command_ack_requires_field() {
        assert_eq!(
            unified().try_decode("1"),
            Err(FrameError::InsufficientFields {
                message_type: MessageType::CommandAck,
                needed: 1,
                available: 0,
            })
        );
    }

    #[test]
    fn test_decode_discrete_command_ack_without_field_defaults_to_zero() {
        assert_eq!(
            discrete().decode("8"),
            Some(TelemetryRecord::CommandAck { command_type: 0 })
        );
    }

    #[test]
    fn test_decode_command_ack_rejects_non_numeric_code() {
        let err = unified().try_decode("1,abc").unwrap_err();
        assert!(matches!(
            err,
            FrameError::InvalidField {
                message_type: MessageType::CommandAck,
                index: 0,
                expected: "u8",
                ..
            }
        ));
    }

    // ── Unified telemetry ─────────────────────────────────────────────────────

    #[test]
    fn test_decode_unified_telemetry_all_fields() {
        let record = unified().decode(&unified_line()).unwrap();
        let TelemetryRecord::UnifiedTelemetry(t) = &record else {
            panic!("expected unified telemetry, got {record:?}");
        };

        assert_eq!(t.timestamp, 123_456);
        assert_eq!(t.operation_mode, 1);
        assert_eq!(t.robot_state, 2);
        assert_eq!(t.pwm_left, -80);
        assert_eq!(t.pwm_right, 85);
        assert_eq!(t.rpm_left, 120.5);
        assert_eq!(t.rpm_right, 118.25);
        assert_eq!(t.distance_traveled, 42.75);
        assert_eq!(t.ultrasonic_distance, 17.5);
        assert_eq!(t.sensors, [100, 200, 300, 400, 500, 600]);
        assert_eq!(t.sensor_error, -12);
        assert_eq!(t.sensor_sum, 2100);
        assert_eq!(
            t.odometry,
            Pose {
                x: 1.5,
                y: -2.25,
                theta: 0.5
            }
        );
        assert_eq!(t.line_pid.kp, 2.5);
        assert_eq!(t.line_pid.ki, 0.01);
        assert_eq!(t.line_pid.kd, 0.75);
        assert_eq!(t.line_pid.integral, 3.125);
        assert_eq!(
            t.motor_pid,
            PidState {
                kp: 1.25,
                ki: 0.5,
                kd: 0.125,
                integral: -4.5
            }
        );
        assert_eq!(
            t.remote,
            RemoteState {
                connected: 1,
                left_speed: -150,
                right_speed: 150
            }
        );
    }

    #[test]
    fn test_decode_unified_telemetry_with_29_fields_is_rejected() {
        let line = unified_line();
        let short: Vec<&str> = line.split(',').take(30).collect();
        let result = unified().try_decode(&short.join(","));
        assert_eq!(
            result,
            Err(FrameError::InsufficientFields {
                message_type: MessageType::UnifiedTelemetry,
                needed: 30,
                available: 29,
            })
        );
    }

    #[test]
    fn test_decode_unified_telemetry_missing_last_field_defaults_to_zero() {
        let line = unified_line();
        let trimmed: Vec<&str> = line.split(',').take(31).collect();
        let record = unified().decode(&trimmed.join(",")).unwrap();
        let TelemetryRecord::UnifiedTelemetry(t) = &record else {
            panic!("expected unified telemetry");
        };
        assert_eq!(t.remote.left_speed, -150);
        assert_eq!(t.remote.right_speed, 0);
    }

    #[test]
    fn test_decode_unified_telemetry_degrades_bad_floats_only() {
        let line = unified_line();
        let mut tokens: Vec<&str> = line.split(',').collect();
        tokens[6] = "nan"; // rpmLeft
        tokens[7] = "inf"; // rpmRight
        tokens[18] = "garbage"; // odometryX
        let record = unified().decode(&tokens.join(",")).unwrap();
        let TelemetryRecord::UnifiedTelemetry(t) = &record else {
            panic!("expected unified telemetry");
        };

        assert_eq!(t.rpm_left, 0.0);
        assert_eq!(t.rpm_right, 0.0);
        assert_eq!(t.odometry.x, 0.0);
        // Siblings untouched.
        assert_eq!(t.distance_traveled, 42.75);
        assert_eq!(t.odometry.y, -2.25);
        assert_eq!(t.pwm_left, -80);
    }

    #[test]
    fn test_decode_unified_telemetry_bad_sensor_reading_becomes_zero() {
        let line = unified_line();
        let mut tokens: Vec<&str> = line.split(',').collect();
        tokens[12] = "??"; // sensors[2]
        let record = unified().decode(&tokens.join(",")).unwrap();
        let TelemetryRecord::UnifiedTelemetry(t) = &record else {
            panic!("expected unified telemetry");
        };
        assert_eq!(t.sensors, [100, 200, 0, 400, 500, 600]);
    }

    #[test]
    fn test_decode_unified_telemetry_bad_integer_rejects_frame() {
        let line = unified_line();
        let mut tokens: Vec<&str> = line.split(',').collect();
        tokens[4] = "40000"; // pwmLeft, out of i16 range
        let err = unified().try_decode(&tokens.join(",")).unwrap_err();
        assert_eq!(
            err,
            FrameError::InvalidField {
                message_type: MessageType::UnifiedTelemetry,
                index: 3,
                expected: "i16",
                value: "40000".to_string(),
            }
        );
    }

    // ── Discrete schema ───────────────────────────────────────────────────────

    #[test]
    fn test_decode_sensor_data() {
        let record = discrete().decode("1,5000,10,20,30,40,50,60,-3,210");
        assert_eq!(
            record,
            Some(TelemetryRecord::SensorData(SensorData {
                timestamp: 5000,
                sensors: [10, 20, 30, 40, 50, 60],
                error: -3,
                sum: 210,
            }))
        );
    }

    #[test]
    fn test_decode_sensor_data_rejects_seven_fields() {
        assert!(discrete().decode("1,5000,10,20,30,40,50,60").is_none());
    }

    #[test]
    fn test_decode_sensor_data_bad_sensor_rejects_frame() {
        assert!(discrete().decode("1,5000,10,x,30,40,50,60,-3,210").is_none());
    }

    #[test]
    fn test_decode_odometry() {
        assert_eq!(
            discrete().decode("2,77,1.5,2.5,-0.25"),
            Some(TelemetryRecord::Odometry {
                timestamp: 77,
                pose: Pose {
                    x: 1.5,
                    y: 2.5,
                    theta: -0.25
                },
            })
        );
    }

    #[test]
    fn test_decode_state() {
        assert_eq!(
            discrete().decode("3,900,4,12.5"),
            Some(TelemetryRecord::State {
                timestamp: 900,
                state: 4,
                distance: 12.5,
            })
        );
    }

    #[test]
    fn test_decode_mode_change() {
        assert_eq!(
            discrete().decode("4,0,1,1"),
            Some(TelemetryRecord::ModeChange {
                old_mode: 0,
                new_mode: 1,
                serial_enabled: 1,
            })
        );
    }

    #[test]
    fn test_decode_pid_tuning_with_infinite_gain() {
        assert_eq!(
            discrete().decode("5,2.0,-inf,0.5,1.0"),
            Some(TelemetryRecord::PidTuning(PidState {
                kp: 2.0,
                ki: 0.0,
                kd: 0.5,
                integral: 1.0,
            }))
        );
    }

    #[test]
    fn test_decode_competition() {
        assert_eq!(
            discrete().decode("6,1,65000,3"),
            Some(TelemetryRecord::Competition {
                mode: 1,
                time: 65_000,
                lap_count: 3,
            })
        );
    }

    #[test]
    fn test_decode_remote_status() {
        assert_eq!(
            discrete().decode("7,1,-100,100"),
            Some(TelemetryRecord::RemoteStatus(RemoteState {
                connected: 1,
                left_speed: -100,
                right_speed: 100,
            }))
        );
    }

    #[test]
    fn test_decode_remote_status_rejects_single_field() {
        assert!(discrete().decode("7,1").is_none());
    }

    // ── Unknown / malformed ───────────────────────────────────────────────────

    #[test]
    fn test_decode_unknown_code_returns_none() {
        assert!(unified().decode("9,1,2,3").is_none());
        assert!(discrete().decode("9,1,2,3").is_none());
    }

    #[test]
    fn test_unknown_code_error_is_flagged_as_unknown_type() {
        let err = unified().try_decode("3,1,2").unwrap_err();
        assert!(err.is_unknown_type());
        assert_eq!(
            err,
            FrameError::UnknownMessageType {
                code: 3,
                schema: FirmwareSchema::Unified,
            }
        );
    }

    #[test]
    fn test_decode_non_numeric_type_code_returns_none() {
        assert!(unified().decode("abc,1,2").is_none());
        assert!(unified().decode("").is_none());
        assert!(unified().decode(",,,").is_none());
    }

    #[test]
    fn test_malformed_error_is_not_flagged_as_unknown_type() {
        let err = unified().try_decode("x").unwrap_err();
        assert!(!err.is_unknown_type());
    }
}
