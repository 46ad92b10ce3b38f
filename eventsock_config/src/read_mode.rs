//! Read-mode controller
//!
//! Selects how the next armed read decides it is complete: after a fixed
//! number of bytes, or once a delimiter has been received.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a read decides it is complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadMode {
    /// Read exactly `size` bytes.
    FixedSize,
    /// Read until `delimiter` has been received (delimiter included).
    UntilDelimiter,
}

impl ReadMode {
    /// Legacy numeric code (`READ_SOME = 0x1B`, `READ_UNTIL = 0x2B`).
    pub fn code(&self) -> u8 {
        match self {
            ReadMode::FixedSize => 0x1B,
            ReadMode::UntilDelimiter => 0x2B,
        }
    }
}

impl fmt::Display for ReadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadMode::FixedSize => write!(f, "fixed_size"),
            ReadMode::UntilDelimiter => write!(f, "until_delimiter"),
        }
    }
}

impl FromStr for ReadMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed_size" | "fixed" => Ok(ReadMode::FixedSize),
            "until_delimiter" | "until" | "delimiter" => Ok(ReadMode::UntilDelimiter),
            other => Err(format!("unknown read mode `{}`", other)),
        }
    }
}

/// Read-mode configuration
///
/// Pure storage. A read snapshots this value at the moment it is armed, so
/// changing it afterwards never affects a read that is already in flight.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadModeConfig {
    /// Completion rule
    #[serde(default = "default_mode")]
    pub mode: ReadMode,

    /// Byte count used by [`ReadMode::FixedSize`]
    #[serde(default = "default_size")]
    pub size: usize,

    /// Delimiter used by [`ReadMode::UntilDelimiter`]
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
}

impl ReadModeConfig {
    /// Fixed-size reads of `size` bytes, keeping the default delimiter.
    pub fn fixed(size: usize) -> Self {
        Self {
            mode: ReadMode::FixedSize,
            size,
            ..Default::default()
        }
    }

    /// Delimited reads, keeping the default size.
    pub fn until(delimiter: impl Into<String>) -> Self {
        Self {
            mode: ReadMode::UntilDelimiter,
            delimiter: delimiter.into(),
            ..Default::default()
        }
    }

    /// Change the completion rule, keeping size and delimiter
    pub fn set_mode(&mut self, mode: ReadMode) {
        self.mode = mode;
    }

    /// Delimiter used by `UntilDelimiter` reads
    pub fn set_delimiter(&mut self, delimiter: impl Into<String>) {
        self.delimiter = delimiter.into();
    }

    /// Frame length used by `FixedSize` reads
    pub fn set_size(&mut self, size: usize) {
        self.size = size;
    }

    /// Delimiter as raw bytes
    pub fn delimiter_bytes(&self) -> &[u8] {
        self.delimiter.as_bytes()
    }
}

impl Default for ReadModeConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            size: default_size(),
            delimiter: default_delimiter(),
        }
    }
}

fn default_mode() -> ReadMode {
    ReadMode::UntilDelimiter
}

fn default_size() -> usize {
    8192
}

fn default_delimiter() -> String {
    "\n".to_string()
}
