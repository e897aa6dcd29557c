//! Pure value conversions applied when a reading is recorded.

use thiserror::Error;

/// Errors produced when a raw value cannot be converted.
#[derive(Debug, Error)]
pub enum MapError {
    /// Value could not be parsed as a number.
    #[error("invalid numeric value: {0:?}")]
    Number(String),

    /// Value could not be parsed as a boolean.
    #[error("invalid boolean value: {0:?}")]
    Boolean(String),
}

/// Conversion from the API's raw textual value to a gauge value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueMapper {
    /// Parse as a floating point number, verbatim.
    Float,

    /// Parse as kilometers and convert to meters.
    KilometersToMeters,

    /// Parse a textual boolean; true becomes 1.0.
    Bool,

    /// Parse a textual boolean and invert it. Used where the API's
    /// "false" means "open" but the metric wants open = 1.0.
    BoolInverted,
}

impl ValueMapper {
    /// Apply the conversion to a raw value.
    pub fn apply(&self, raw: &str) -> Result<f64, MapError> {
        match self {
            Self::Float => parse_float(raw),
            Self::KilometersToMeters => parse_float(raw).map(|km| km * 1000.0),
            Self::Bool => parse_bool(raw).map(to_gauge),
            Self::BoolInverted => parse_bool(raw).map(|b| to_gauge(!b)),
        }
    }
}

fn parse_float(raw: &str) -> Result<f64, MapError> {
    raw.trim()
        .parse()
        .map_err(|_| MapError::Number(raw.to_string()))
}

fn parse_bool(raw: &str) -> Result<bool, MapError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(MapError::Boolean(raw.to_string())),
    }
}

fn to_gauge(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}
