//! Three-component vector in the legacy `<x, y, z>` textual form.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A position or direction inside a region, in meters.
///
/// The wire format carries vectors as text (`"<128, 128, 70>"`), so this
/// type round-trips through `Display`/`FromStr` rather than a JSON object.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub const ZERO: Vector3 = Vector3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    /// Unit vector along Y, the legacy placeholder for unknown positions.
    pub const UNIT_Y: Vector3 = Vector3 {
        x: 0.0,
        y: 1.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for Vector3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}, {}, {}>", self.x, self.y, self.z)
    }
}

/// Error returned when a textual vector cannot be parsed.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("malformed vector literal")]
pub struct ParseVectorError;

impl FromStr for Vector3 {
    type Err = ParseVectorError;

    /// Accepts `<x, y, z>` with or without the angle brackets, tolerating
    /// surrounding whitespace on each component.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s
            .trim()
            .trim_start_matches('<')
            .trim_end_matches('>')
            .trim();
        let mut parts = trimmed.split(',');
        let mut next = || -> Result<f32, ParseVectorError> {
            parts
                .next()
                .ok_or(ParseVectorError)?
                .trim()
                .parse::<f32>()
                .map_err(|_| ParseVectorError)
        };
        let x = next()?;
        let y = next()?;
        let z = next()?;
        if parts.next().is_some() {
            return Err(ParseVectorError);
        }
        Ok(Vector3 { x, y, z })
    }
}
