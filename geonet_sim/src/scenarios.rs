//! Built-in simulation scenarios.

use crate::error::SimError;
use serde::{Deserialize, Serialize};

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioId {
    /// Flood over a chain with a star hub part-way along
    FloodChain,

    /// Flood over a fixed-radius unit-disk graph
    FloodUdg,

    /// Flood over the sparsest connected unit-disk graph
    FloodAutotune,

    /// Flood over a Gabriel graph
    FloodGabriel,

    // ═══════════════════════════════════════════════════
    // BOUNDARY ESTIMATION - classify sensors against rain
    // ═══════════════════════════════════════════════════
    /// One layout, one two-round classification
    StaticRain,

    /// Layout repainted every 7 ticks, classification restarted every 4
    DynamicRain,

    /// Classification driven by measurement changes
    PropagatingRain,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        let mut all = Self::floods();
        all.extend(Self::rains());
        all
    }

    /// Returns the flood scenarios.
    pub fn floods() -> Vec<ScenarioId> {
        vec![
            ScenarioId::FloodChain,
            ScenarioId::FloodUdg,
            ScenarioId::FloodAutotune,
            ScenarioId::FloodGabriel,
        ]
    }

    /// Returns the boundary estimation scenarios.
    pub fn rains() -> Vec<ScenarioId> {
        vec![
            ScenarioId::StaticRain,
            ScenarioId::DynamicRain,
            ScenarioId::PropagatingRain,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::FloodChain => "flood_chain",
            ScenarioId::FloodUdg => "flood_udg",
            ScenarioId::FloodAutotune => "flood_autotune",
            ScenarioId::FloodGabriel => "flood_gabriel",
            ScenarioId::StaticRain => "static_rain",
            ScenarioId::DynamicRain => "dynamic_rain",
            ScenarioId::PropagatingRain => "propagating_rain",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::FloodChain => "20 sensors in a chain, hub at sensor 10, flood from sensor 0",
            ScenarioId::FloodUdg => "30 sensors, unit-disk radius 8, flood from sensor 0",
            ScenarioId::FloodAutotune => "100 sensors, MST auto-tuned unit-disk, flood from sensor 0",
            ScenarioId::FloodGabriel => "80 sensors, Gabriel graph, flood from sensor 0",
            ScenarioId::StaticRain => "150 sensors on a Gabriel graph classify a fixed rain layout",
            ScenarioId::DynamicRain => "90 sensors reclassify every 4 ticks while rain moves every 7",
            ScenarioId::PropagatingRain => {
                "90 sensors reclassify on reading changes while rain moves every 7"
            }
        }
    }

    /// Sensor population used when none is given.
    pub fn default_sensors(&self) -> usize {
        match self {
            ScenarioId::FloodChain => 20,
            ScenarioId::FloodUdg => 30,
            ScenarioId::FloodAutotune => 100,
            ScenarioId::FloodGabriel => 80,
            ScenarioId::StaticRain => 150,
            ScenarioId::DynamicRain | ScenarioId::PropagatingRain => 90,
        }
    }

    /// Returns true if this is a boundary estimation scenario.
    pub fn is_rain(&self) -> bool {
        matches!(
            self,
            ScenarioId::StaticRain | ScenarioId::DynamicRain | ScenarioId::PropagatingRain
        )
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "flood_chain" | "chain" | "hello_network" => Ok(ScenarioId::FloodChain),
            "flood_udg" | "udg" => Ok(ScenarioId::FloodUdg),
            "flood_autotune" | "autotune" => Ok(ScenarioId::FloodAutotune),
            "flood_gabriel" | "gabriel" | "gg" => Ok(ScenarioId::FloodGabriel),
            "static_rain" => Ok(ScenarioId::StaticRain),
            "dynamic_rain" => Ok(ScenarioId::DynamicRain),
            "propagating_rain" => Ok(ScenarioId::PropagatingRain),
            _ => Err(SimError::UnknownScenario(s.to_string())),
        }
    }
}
