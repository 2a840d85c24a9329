//! SimWorld - the host loop around a sensor graph and its field.

use crate::error::SimError;
use crate::placement;

use geonet_core::{Callbacks, SensorGraph, TickReport};
use geonet_env::{Bounds, GeoNetError, PatchesGrid, SensorId};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Configuration for a simulation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Cells per side of the square field
    pub grid_size: u32,

    /// Wall-clock pause between ticks in milliseconds (0 = unpaced)
    pub update_interval_ms: u64,

    /// Master seed for determinism
    pub seed: u64,

    /// Maximum number of ticks to run
    pub max_ticks: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            grid_size: 55,
            update_interval_ms: 700,
            seed: 42,
            max_ticks: 60,
        }
    }
}

impl SimConfig {
    /// Loads a config from a JSON file. Missing keys take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::square(self.grid_size)
    }
}

/// Shared stop request, checked by the host loop before every tick.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// How a run ended.
#[derive(Debug, Clone)]
pub struct RunOutcome<G> {
    /// Global state after the last tick
    pub global: G,

    /// Ticks executed
    pub ticks: u64,

    /// True if the run stopped on the cancel flag rather than the tick limit
    pub cancelled: bool,
}

/// The SimWorld - container for one simulation.
pub struct SimWorld<S> {
    /// Configuration
    pub config: SimConfig,

    /// The network under simulation
    pub graph: SensorGraph<S>,

    /// The environment field sensors sample
    pub field: PatchesGrid,

    /// Placement randomness
    rng: ChaCha8Rng,

    cancel: CancelFlag,

    /// Seed offset for the next batch of sensor ids
    next_id: u64,
}

impl<S> SimWorld<S> {
    /// Creates an empty world with a black field.
    pub fn new(config: SimConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        let field = PatchesGrid::new(config.grid_size);

        Self {
            config,
            graph: SensorGraph::new(),
            field,
            rng,
            cancel: CancelFlag::new(),
            next_id: 0,
        }
    }

    /// A fresh RNG for a subsystem, derived from the master seed and `salt`.
    ///
    /// Subsystems never share a stream, so adding draws in one cannot shift
    /// another's results.
    pub fn subsystem_rng(&self, salt: u64) -> ChaCha8Rng {
        let seed = self
            .config
            .seed
            .wrapping_mul(0x9e3779b97f4a7c15)
            .wrapping_add(salt.wrapping_mul(0x517cc1b727220a95));
        ChaCha8Rng::seed_from_u64(seed)
    }

    /// Returns a handle to this world's cancel flag.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn tick_count(&self) -> u64 {
        self.graph.tick_count()
    }

    /// Places `amount` sensors on distinct random cells and appends them.
    /// Returns their ids in creation order.
    pub fn create_and_append_sensors(
        &mut self,
        amount: usize,
        initial_state: S,
        callbacks: &Callbacks<S>,
    ) -> Result<Vec<SensorId>, SimError>
    where
        S: Clone,
    {
        let bounds = self.config.bounds();
        let sensors = placement::create_sensors(
            &mut self.rng,
            bounds,
            amount,
            self.next_id,
            initial_state,
            callbacks,
        )?;
        self.next_id += amount as u64;

        let ids = self.graph.append_all(sensors);
        debug!(amount, total = self.graph.len(), "Placed sensors");
        Ok(ids)
    }

    /// Runs `setup` once, then ticks until `max_ticks` or cancellation.
    ///
    /// `update` is called inside every tick after the receive phase.
    /// `on_frame` sees the graph and report after every completed tick and
    /// is where rendering or recording hooks in. Ticks are paced by
    /// `update_interval_ms`.
    pub fn run<G, Setup, Update, Frame>(
        &mut self,
        setup: Setup,
        mut update: Update,
        mut on_frame: Frame,
    ) -> Result<RunOutcome<G>, SimError>
    where
        Setup: FnOnce(&mut SimWorld<S>) -> Result<G, SimError>,
        Update: FnMut(&mut SensorGraph<S>, &mut PatchesGrid, G) -> Result<G, GeoNetError>,
        Frame: FnMut(&SensorGraph<S>, &TickReport),
    {
        let mut global = setup(self)?;
        info!(
            sensors = self.graph.len(),
            edges = self.graph.edge_count(),
            "Setup complete"
        );

        let interval = self.config.update_interval();
        let mut ticks = 0;
        while ticks < self.config.max_ticks {
            if self.cancel.is_cancelled() {
                debug!(ticks, "Run cancelled");
                break;
            }

            let (next, report) = self.graph.tick(&mut self.field, global, &mut update)?;
            global = next;
            ticks += 1;
            on_frame(&self.graph, &report);

            if !interval.is_zero() {
                std::thread::sleep(interval);
            }
        }

        Ok(RunOutcome {
            global,
            ticks,
            cancelled: self.cancel.is_cancelled(),
        })
    }
}
