//! Error type for the simulation host.

use geonet_env::GeoNetError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Network(#[from] GeoNetError),

    #[error("Unknown scenario: {0}")]
    UnknownScenario(String),

    #[error("Cannot place {requested} sensors on a field with {cells} cells")]
    FieldTooSmall { requested: usize, cells: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
