//! Protocol module containing the schema tables, the frame decoder, and the
//! command encoder.

pub mod command;
pub mod frame;
pub mod schema;
pub mod telemetry;

pub use command::{encode_command, operation_mode_name, CommandCode, CommandRequest};
pub use frame::{FrameDecoder, FrameError, RawFrame, FIELD_DELIMITER};
pub use schema::{FirmwareSchema, MessageType, SchemaParseError};
pub use telemetry::*;
