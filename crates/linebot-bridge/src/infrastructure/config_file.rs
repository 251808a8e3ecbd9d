//! Optional TOML settings file.
//!
//! Every key is optional; whatever the file leaves out falls back to the
//! built-in defaults, and CLI flags or environment variables override
//! whatever the file sets.
//!
//! ```toml
//! log_level = "debug"
//!
//! [robot]
//! schema = "unified"
//!
//! [serial]
//! port = "/dev/ttyUSB0"
//! baud_rate = 9600
//!
//! [network]
//! bind_address = "0.0.0.0"
//! ws_port = 8080
//! sink_buffer = 64
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for config file loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level layout of the settings file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Default `tracing` filter when `RUST_LOG` is not set.
    pub log_level: Option<String>,
    pub robot: RobotSection,
    pub serial: SerialSection,
    pub network: NetworkSection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RobotSection {
    /// `"unified"` or `"discrete"`.
    pub schema: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SerialSection {
    pub port: Option<String>,
    pub baud_rate: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkSection {
    pub bind_address: Option<String>,
    pub ws_port: Option<u16>,
    pub sink_buffer: Option<usize>,
}

/// Parses settings from TOML text.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] for malformed TOML, unknown keys, or
/// values of the wrong type.
pub fn parse_config(text: &str) -> Result<FileConfig, ConfigError> {
    Ok(toml::from_str(text)?)
}

/// Reads and parses the settings file at `path`.
///
/// A missing file is an error: the path was asked for explicitly.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read and
/// [`ConfigError::Parse`] if its content is invalid.
pub fn load_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&text)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
