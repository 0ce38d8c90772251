// Layout configuration: integer width, byte ordering and padding

use crate::bitwise::types::{Endianness, IntegerWidth, Padding};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid integer width: {0} (expected 16, 32 or 64)")]
    InvalidIntegerWidth(String),

    #[error("invalid byte ordering: {0} (expected little or big)")]
    InvalidOrdering(String),

    #[error("invalid padding: {0} (expected none, short, int or long)")]
    InvalidPadding(String),

    #[error("Failed to parse config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Construction parameters of a layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub width: IntegerWidth,
    pub ordering: Endianness,
    pub padding: Padding,
}

impl LayoutConfig {
    pub fn new(width: IntegerWidth, ordering: Endianness, padding: Padding) -> Self {
        Self {
            width,
            ordering,
            padding,
        }
    }

    /// Parse a config from JSON, e.g. `{"width": 32, "ordering": "little", "padding": "int"}`
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl TryFrom<u32> for IntegerWidth {
    type Error = ConfigError;

    fn try_from(bits: u32) -> Result<Self> {
        match bits {
            16 => Ok(IntegerWidth::Bits16),
            32 => Ok(IntegerWidth::Bits32),
            64 => Ok(IntegerWidth::Bits64),
            other => Err(ConfigError::InvalidIntegerWidth(other.to_string())),
        }
    }
}

impl FromStr for IntegerWidth {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        let bits = s
            .trim()
            .parse::<u32>()
            .map_err(|_| ConfigError::InvalidIntegerWidth(s.to_string()))?;
        IntegerWidth::try_from(bits)
    }
}

impl FromStr for Endianness {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "little" => Ok(Endianness::Little),
            "big" => Ok(Endianness::Big),
            _ => Err(ConfigError::InvalidOrdering(s.to_string())),
        }
    }
}

impl FromStr for Padding {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Padding::None),
            "short" => Ok(Padding::Short),
            "int" => Ok(Padding::Int),
            "long" => Ok(Padding::Long),
            _ => Err(ConfigError::InvalidPadding(s.to_string())),
        }
    }
}
