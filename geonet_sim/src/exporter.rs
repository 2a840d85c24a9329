//! JSON exporter for recorded runs.
//!
//! Writes every tick's network snapshot and report, plus scenario events,
//! so a run can be replayed or plotted outside the simulator.

use crate::error::SimError;

use geonet_core::{NetworkSnapshot, TickReport};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// A single frame of simulation data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimFrame {
    pub tick: u64,

    /// Sensors and edges after the tick
    pub network: NetworkSnapshot,

    /// Counters for the tick
    pub report: TickReport,
}

impl SimFrame {
    pub fn new(network: NetworkSnapshot, report: TickReport) -> Self {
        Self {
            tick: report.tick,
            network,
            report,
        }
    }
}

/// Simulation event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimEvent {
    pub tick: u64,
    pub message: String,
}

impl SimEvent {
    pub fn new(tick: u64, message: impl Into<String>) -> Self {
        Self {
            tick,
            message: message.into(),
        }
    }
}

/// Complete simulation export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Cells per side of the field
    pub grid_size: u32,

    /// All frames
    pub frames: Vec<SimFrame>,

    /// Scenario events (layout changes and the like)
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub events: Vec<SimEvent>,

    /// Final results
    pub passed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl SimExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, seed: u64, grid_size: u32) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            grid_size,
            frames: Vec::new(),
            events: Vec::new(),
            passed: false,
            failure_reason: None,
        }
    }

    /// Adds a frame.
    pub fn add_frame(&mut self, frame: SimFrame) {
        self.frames.push(frame);
    }

    pub fn add_events(&mut self, events: impl IntoIterator<Item = SimEvent>) {
        self.events.extend(events);
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, passed: bool, failure_reason: Option<String>) {
        self.passed = passed;
        self.failure_reason = failure_reason;
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), SimError> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geonet_core::SensorGraph;

    #[test]
    fn test_frames_and_finalize() {
        let graph: SensorGraph<()> = SensorGraph::new();
        let mut export = SimExport::new("flood_chain", 42, 55);
        let report = TickReport {
            tick: 3,
            ..Default::default()
        };

        export.add_frame(SimFrame::new(graph.snapshot(), report));
        export.add_events([SimEvent::new(1, "painted layout cross")]);
        export.finalize(false, Some("flood stalled".into()));

        assert_eq!(export.frames[0].tick, 3);
        assert_eq!(export.events.len(), 1);
        assert!(!export.passed);
    }

    #[test]
    fn test_json_shape() {
        let mut export = SimExport::new("static_rain", 7, 55);
        export.finalize(true, None);

        let value = serde_json::to_value(&export).unwrap();
        assert_eq!(value["scenario"], "static_rain");
        assert_eq!(value["passed"], true);
        assert!(value.get("failure_reason").is_none());
        assert!(value.get("events").is_none());
    }

    #[test]
    fn test_write_to_file() {
        let path = std::env::temp_dir().join(format!("geonet_export_{}.json", std::process::id()));
        let export = SimExport::new("flood_udg", 1, 55);
        export.write_to_file(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let back: SimExport = serde_json::from_str(&text).unwrap();
        assert_eq!(back.scenario, "flood_udg");
        std::fs::remove_file(&path).unwrap();
    }
}
