//! Error types for the GeoNet environment abstraction.

use crate::types::SensorId;
use thiserror::Error;

/// Errors raised synchronously by field access, setters and graph operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoNetError {
    /// Coordinate outside the field on read or write
    #[error("Placement error: ({x}, {y}) is outside the {width}x{height} field")]
    Placement {
        x: f64,
        y: f64,
        width: u32,
        height: u32,
    },

    /// Argument rejected by a setter or constructor
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Sensor id not owned by the graph
    #[error("Unknown sensor: {0}")]
    UnknownSensor(SensorId),
}

impl GeoNetError {
    /// Creates an invalid value error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidValue(msg.into())
    }

    /// Creates an unknown sensor error.
    pub fn unknown(id: SensorId) -> Self {
        Self::UnknownSensor(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placement_message() {
        let err = GeoNetError::Placement {
            x: 60.0,
            y: 3.0,
            width: 55,
            height: 55,
        };
        assert_eq!(
            err.to_string(),
            "Placement error: (60, 3) is outside the 55x55 field"
        );
    }

    #[test]
    fn test_constructors() {
        assert!(matches!(
            GeoNetError::invalid("bad"),
            GeoNetError::InvalidValue(msg) if msg == "bad"
        ));

        let id = SensorId::from_seed(7);
        assert_eq!(GeoNetError::unknown(id), GeoNetError::UnknownSensor(id));
    }
}
