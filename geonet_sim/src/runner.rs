//! Scenario runner - executes built-in scenarios and checks them.

use crate::boundary::{self, RainMode, RainState};
use crate::error::SimError;
use crate::exporter::{SimExport, SimFrame};
use crate::flood::{self, FloodState, FloodTopology};
use crate::scenarios::ScenarioId;
use crate::world::{SimConfig, SimWorld};

use geonet_core::{SensorGraph, TickReport};
use serde::Serialize;
use tracing::{error, info, warn};

/// Radius of the fixed unit-disk flood.
const FLOOD_UDG_RADIUS: f64 = 8.0;

/// Results from running a scenario.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Total ticks executed
    pub total_ticks: u64,

    /// Failure message if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScenarioMetrics {
    pub sensors: usize,
    pub edges: usize,
    pub components: usize,

    /// Unit-disk radius, for unit-disk floods
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,

    pub messages_sent: usize,
    pub messages_delivered: usize,
    pub receive_calls: usize,
    pub measurement_changes: usize,

    /// Most edges transmitting in a single tick
    pub peak_active_edges: usize,

    /// Sensors the flood reached
    pub reached: usize,

    /// Rain labels compared with the field
    pub checked: usize,

    /// Rain labels that disagreed with the field
    pub mismatches: usize,

    /// Rain labels left unchecked because the layout moved mid-round
    pub skipped: usize,
}

impl ScenarioMetrics {
    fn observe(&mut self, report: &TickReport) {
        self.messages_sent += report.messages_sent;
        self.messages_delivered += report.messages_delivered;
        self.receive_calls += report.receive_calls;
        self.measurement_changes += report.measurement_changes;
        self.peak_active_edges = self.peak_active_edges.max(report.active_edges);
    }

    fn record_topology<S>(&mut self, graph: &SensorGraph<S>) {
        let stats = graph.stats();
        self.sensors = stats.sensors;
        self.edges = stats.edges;
        self.components = stats.components;
    }
}

/// Folds a finished tick into the metrics and, when recording, the export.
fn observe<S>(
    metrics: &mut ScenarioMetrics,
    export: Option<&mut SimExport>,
    graph: &SensorGraph<S>,
    report: &TickReport,
) {
    metrics.observe(report);
    if let Some(export) = export {
        export.add_frame(SimFrame::new(graph.snapshot(), *report));
    }
}

/// How a scenario is wired and checked.
#[derive(Debug, Clone, Copy)]
enum Plan {
    Flood(FloodTopology),
    Rain(RainMode),
}

impl Plan {
    fn of(scenario: ScenarioId) -> Self {
        match scenario {
            ScenarioId::FloodChain => Plan::Flood(FloodTopology::ChainWithHub),
            ScenarioId::FloodUdg => Plan::Flood(FloodTopology::UnitDisk(FLOOD_UDG_RADIUS)),
            ScenarioId::FloodAutotune => Plan::Flood(FloodTopology::AutoTuned),
            ScenarioId::FloodGabriel => Plan::Flood(FloodTopology::Gabriel),
            ScenarioId::StaticRain => Plan::Rain(RainMode::Static),
            ScenarioId::DynamicRain => Plan::Rain(RainMode::Dynamic),
            ScenarioId::PropagatingRain => Plan::Rain(RainMode::Propagating),
        }
    }
}

/// Runs built-in scenarios.
pub struct ScenarioRunner {
    config: SimConfig,

    /// Population override; `None` uses each scenario's default
    sensors: Option<usize>,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            sensors: None,
        }
    }

    /// Overrides the sensor population of every scenario.
    pub fn with_sensors(mut self, sensors: Option<usize>) -> Self {
        self.sensors = sensors;
        self
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        self.run_recorded(scenario, None)
    }

    /// Runs a scenario, appending a frame per tick to `export` if given.
    ///
    /// Errors inside the run are reported as a failed result.
    pub fn run_recorded(
        &self,
        scenario: ScenarioId,
        mut export: Option<&mut SimExport>,
    ) -> ScenarioResult {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.config.seed);
        let sensors = self.sensors.unwrap_or_else(|| scenario.default_sensors());

        let recording = export.as_deref_mut();
        let outcome = match Plan::of(scenario) {
            Plan::Flood(topology) => self.run_flood(scenario, sensors, topology, recording),
            Plan::Rain(mode) => self.run_rain(scenario, sensors, mode, recording),
        };

        let result = outcome.unwrap_or_else(|err| {
            error!("{} aborted: {}", scenario.name(), err);
            ScenarioResult {
                scenario,
                seed: self.config.seed,
                passed: false,
                total_ticks: 0,
                failure_reason: Some(err.to_string()),
                metrics: ScenarioMetrics::default(),
            }
        });

        if let Some(export) = export {
            export.finalize(result.passed, result.failure_reason.clone());
        }
        result
    }

    /// Flood scenarios: every reachable sensor must hear the flood exactly
    /// one tick per hop after it started.
    fn run_flood(
        &self,
        scenario: ScenarioId,
        sensors: usize,
        topology: FloodTopology,
        mut export: Option<&mut SimExport>,
    ) -> Result<ScenarioResult, SimError> {
        let mut world: SimWorld<FloodState> = SimWorld::new(self.config.clone());
        let mut metrics = ScenarioMetrics::default();

        let outcome = world.run(
            |w| flood::setup(w, sensors, topology),
            flood::update,
            |graph, report| observe(&mut metrics, export.as_deref_mut(), graph, report),
        )?;

        let verdict = flood::verify(&world.graph, &outcome.global);
        metrics.record_topology(&world.graph);
        metrics.radius = outcome.global.radius;
        metrics.reached = verdict.reached;

        if verdict.passed() {
            info!(
                "✓ {} complete: reached {}/{} sensors in {} ticks",
                scenario.name(),
                verdict.reached,
                world.graph.len(),
                outcome.ticks
            );
        } else {
            warn!(?verdict, "{} flood check failed", scenario.name());
        }

        Ok(ScenarioResult {
            scenario,
            seed: self.config.seed,
            passed: verdict.passed(),
            total_ticks: outcome.ticks,
            failure_reason: verdict.failure_reason(),
            metrics,
        })
    }

    /// Rain scenarios: every label a sensor settles on must match the one
    /// computed from the field.
    fn run_rain(
        &self,
        scenario: ScenarioId,
        sensors: usize,
        mode: RainMode,
        mut export: Option<&mut SimExport>,
    ) -> Result<ScenarioResult, SimError> {
        let mut world: SimWorld<RainState> = SimWorld::new(self.config.clone());
        let mut metrics = ScenarioMetrics::default();

        let outcome = world.run(
            |w| boundary::setup(w, sensors, mode),
            boundary::update,
            |graph, report| observe(&mut metrics, export.as_deref_mut(), graph, report),
        )?;

        let global = outcome.global;
        metrics.record_topology(&world.graph);
        metrics.checked = global.checked;
        metrics.mismatches = global.mismatches;
        metrics.skipped = global.skipped;

        if global.passed() {
            info!(
                "✓ {} complete: {} labels checked, {} skipped, {} layouts",
                scenario.name(),
                global.checked,
                global.skipped,
                global.repaints
            );
        } else {
            warn!(
                checked = global.checked,
                mismatches = global.mismatches,
                "{} boundary check failed",
                scenario.name()
            );
        }

        let passed = global.passed();
        let failure_reason = global.failure_reason();
        if let Some(export) = export {
            export.add_events(global.events);
        }

        Ok(ScenarioResult {
            scenario,
            seed: self.config.seed,
            passed,
            total_ticks: outcome.ticks,
            failure_reason,
            metrics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner() -> ScenarioRunner {
        ScenarioRunner::new(SimConfig {
            update_interval_ms: 0,
            ..Default::default()
        })
    }

    #[test]
    fn test_flood_chain_metrics() {
        let result = runner().run(ScenarioId::FloodChain);

        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.metrics.sensors, 20);
        assert_eq!(result.metrics.edges, 22);
        assert_eq!(result.metrics.components, 1);
        assert_eq!(result.metrics.reached, 20);
        assert_eq!(result.total_ticks, 17);
        assert!(result.metrics.messages_sent > 0);
    }

    #[test]
    fn test_flood_udg_reports_radius() {
        let result = runner().run(ScenarioId::FloodUdg);
        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.metrics.radius, Some(FLOOD_UDG_RADIUS));
    }

    #[test]
    fn test_sensor_override() {
        let result = runner().with_sensors(Some(12)).run(ScenarioId::FloodGabriel);
        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.metrics.sensors, 12);
    }

    #[test]
    fn test_overfull_field_fails_cleanly() {
        let runner = ScenarioRunner::new(SimConfig {
            grid_size: 3,
            update_interval_ms: 0,
            ..Default::default()
        });
        let result = runner.run(ScenarioId::FloodChain);

        assert!(!result.passed);
        assert_eq!(result.total_ticks, 0);
        assert!(result.failure_reason.unwrap().contains("20"));
    }

    #[test]
    fn test_recorded_run_fills_export() {
        let runner = runner();
        let mut export = SimExport::new("static_rain", 42, 55);
        let result = runner.run_recorded(ScenarioId::StaticRain, Some(&mut export));

        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(export.frames.len() as u64, result.total_ticks);
        assert!(export.passed);
        assert!(!export.events.is_empty());
    }
}
