//! Render hand-off: what a viewer needs after each tick.

use crate::graph::SensorGraph;
use geonet_env::{Color, Coordinate, SensorId};
use serde::{Deserialize, Serialize};

/// One sensor as drawn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorFrame {
    pub id: SensorId,
    pub position: Coordinate,
    pub color: Color,
}

/// One edge as drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeFrame {
    pub a: SensorId,
    pub b: SensorId,
    pub transmitting: bool,
}

/// Read-only picture of the network at the end of a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    pub tick: u64,

    /// Sensors in insertion order
    pub sensors: Vec<SensorFrame>,

    pub edges: Vec<EdgeFrame>,
}

impl NetworkSnapshot {
    pub fn transmitting_edges(&self) -> usize {
        self.edges.iter().filter(|e| e.transmitting).count()
    }
}

impl<S> SensorGraph<S> {
    pub fn snapshot(&self) -> NetworkSnapshot {
        NetworkSnapshot {
            tick: self.tick_count,
            sensors: self
                .list_sensors()
                .map(|s| SensorFrame {
                    id: s.id(),
                    position: s.position(),
                    color: s.display_color(),
                })
                .collect(),
            edges: self
                .list_edges()
                .map(|e| EdgeFrame {
                    a: e.a,
                    b: e.b,
                    transmitting: e.transmitting,
                })
                .collect(),
        }
    }
}
