use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// One inbound telemetry message. `z` is altitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    #[error("payload is not valid JSON: {0}")]
    Malformed(String),
    #[error("payload is not a JSON object")]
    NotAnObject,
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    #[error("field `{0}` is not a number")]
    NotNumeric(&'static str),
}

impl TelemetrySample {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Decode a text frame. Extra fields are ignored; missing or non-numeric
    /// `x`/`y`/`z` are errors, never coerced to zero.
    pub fn decode(text: &str) -> Result<Self, ParseError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| ParseError::Malformed(e.to_string()))?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self, ParseError> {
        let obj = value.as_object().ok_or(ParseError::NotAnObject)?;
        Ok(Self {
            x: numeric_field(obj, "x")?,
            y: numeric_field(obj, "y")?,
            z: numeric_field(obj, "z")?,
        })
    }

    pub fn to_json(&self) -> String {
        serde_json::json!({ "x": self.x, "y": self.y, "z": self.z }).to_string()
    }
}

fn numeric_field(obj: &Map<String, Value>, name: &'static str) -> Result<f64, ParseError> {
    obj.get(name)
        .ok_or(ParseError::MissingField(name))?
        .as_f64()
        .ok_or(ParseError::NotNumeric(name))
}
