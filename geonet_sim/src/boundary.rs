//! Boundary estimation: sensors label themselves against a rained-on region.
//!
//! A sensor is *wet* when the field under it is [`RAIN`]. Comparing its own
//! wetness with its neighbours' gives four labels:
//!
//! | Own | Neighbours      | Label           | Colour |
//! |-----|-----------------|-----------------|--------|
//! | wet | all wet         | `Inside`        | CYAN   |
//! | wet | some dry        | `Boundary`      | FOREST |
//! | dry | all dry         | `Outside`       | CREAM  |
//! | dry | some wet        | `OuterBoundary` | RED    |
//!
//! Three protocols reach the labels differently:
//! - **Static**: one layout; the host pokes every `Init` sensor, which then
//!   broadcasts its wetness; the next batch it receives is its neighbours'
//!   wetness and it classifies on that.
//! - **Dynamic**: the same two rounds, restarted every 4 ticks while the
//!   layout is repainted every 7.
//! - **Propagating**: a reading change wakes a sensor, which classifies from
//!   its neighbours' cached readings and pings them to do the same.

use crate::error::SimError;
use crate::exporter::SimEvent;
use crate::layouts::{RainLayout, RAIN};
use crate::world::{CancelFlag, SimWorld};

use geonet_core::{euclidean, Callbacks, Gabriel, SensorContext, SensorGraph};
use geonet_env::{Color, EnvironmentField, GeoNetError, PatchesGrid, SensorId};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Payload of a wake-up ping.
pub const PING: [f64; 1] = [0.0];

/// Salt for the layout RNG stream.
const LAYOUT_SALT: u64 = 0x5241494e;

pub fn is_wet(reading: Option<Color>) -> bool {
    reading == Some(RAIN)
}

/// Wetness as a message value: `1.0` wet, `0.0` dry.
pub fn wet_value(reading: Option<Color>) -> f64 {
    if is_wet(reading) {
        1.0
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RainLabel {
    Inside,
    Boundary,
    OuterBoundary,
    Outside,
}

impl RainLabel {
    /// Labels a sensor from its own and its neighbours' wetness. With no
    /// neighbours a sensor counts as fully inside or outside.
    pub fn classify(own_wet: bool, neighbors_wet: impl IntoIterator<Item = bool>) -> Self {
        let mut neighbors = neighbors_wet.into_iter();
        if own_wet {
            if neighbors.all(|wet| wet) {
                RainLabel::Inside
            } else {
                RainLabel::Boundary
            }
        } else if neighbors.any(|wet| wet) {
            RainLabel::OuterBoundary
        } else {
            RainLabel::Outside
        }
    }

    pub fn color(&self) -> Color {
        match self {
            RainLabel::Inside => Color::CYAN,
            RainLabel::Boundary => Color::FOREST,
            RainLabel::OuterBoundary => Color::RED,
            RainLabel::Outside => Color::CREAM,
        }
    }
}

/// Where a sensor is in the current classification round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    /// Waiting for the host's poke
    Init,

    /// Waiting for neighbour input
    Listening,

    /// Done until the next restart
    Classified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RainState {
    pub phase: RoundPhase,
    pub label: Option<RainLabel>,
    pub classified_at: Option<u64>,
}

impl RainState {
    pub fn starting(phase: RoundPhase) -> Self {
        Self {
            phase,
            label: None,
            classified_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RainMode {
    Static,
    Dynamic,
    Propagating,
}

impl RainMode {
    /// Ticks between repaints of the layout.
    pub fn repaint_every(&self) -> Option<u64> {
        match self {
            RainMode::Static => None,
            RainMode::Dynamic | RainMode::Propagating => Some(7),
        }
    }

    /// Ticks between classification restarts.
    pub fn restart_every(&self) -> Option<u64> {
        match self {
            RainMode::Dynamic => Some(4),
            RainMode::Static | RainMode::Propagating => None,
        }
    }

    /// Phase a sensor starts each round in.
    pub fn initial_phase(&self) -> RoundPhase {
        match self {
            RainMode::Static | RainMode::Dynamic => RoundPhase::Init,
            RainMode::Propagating => RoundPhase::Listening,
        }
    }

    /// Colour of a sensor before its first classification.
    pub fn resting_color(&self) -> Color {
        match self {
            RainMode::Static => Color::SAGE,
            RainMode::Dynamic | RainMode::Propagating => Color::CREAM,
        }
    }

    /// True when a sensor's inputs are sampled over two ticks, so a repaint
    /// in between makes its label stale by construction.
    fn samples_across_ticks(&self) -> bool {
        !matches!(self, RainMode::Propagating)
    }

    pub fn callbacks(&self) -> Callbacks<RainState> {
        match self {
            RainMode::Static | RainMode::Dynamic => two_round_callbacks(),
            RainMode::Propagating => propagating_callbacks(),
        }
    }
}

fn finish(ctx: &mut SensorContext<'_, RainState>, label: RainLabel) {
    let tick = ctx.tick();
    let state = ctx.state_mut();
    state.phase = RoundPhase::Classified;
    state.label = Some(label);
    state.classified_at = Some(tick);
    ctx.set_display_color(label.color());
}

/// Poked sensors share their wetness; listening sensors classify on the
/// values their neighbours shared.
fn two_round_callbacks() -> Callbacks<RainState> {
    Callbacks::<RainState>::new().on_receive(|ctx, values| {
        let phase = ctx.state().phase;
        match phase {
            RoundPhase::Init => {
                ctx.state_mut().phase = RoundPhase::Listening;
                let value = wet_value(ctx.reading());
                ctx.broadcast(&[value]);
            }
            RoundPhase::Listening => {
                let own = is_wet(ctx.reading());
                let label = RainLabel::classify(own, values.iter().map(|v| *v == 1.0));
                finish(ctx, label);
            }
            RoundPhase::Classified => {}
        }
        Ok(())
    })
}

/// Reading changes wake the sensor and its neighbours; a woken listener
/// classifies from cached neighbour readings and passes the wake-up on.
fn propagating_callbacks() -> Callbacks<RainState> {
    Callbacks::<RainState>::new()
        .on_measurement_change(|ctx, _| {
            if ctx.state().phase == RoundPhase::Listening {
                let id = ctx.id();
                ctx.transmit(id, &PING);
                ctx.broadcast(&PING);
            }
            Ok(())
        })
        .on_receive(|ctx, _| {
            if ctx.state().phase != RoundPhase::Listening {
                return Ok(());
            }
            let own = is_wet(ctx.reading());
            let neighbors = ctx.neighbors().iter().map(|n| is_wet(n.reading));
            let label = RainLabel::classify(own, neighbors);
            finish(ctx, label);
            ctx.broadcast(&PING);
            Ok(())
        })
}

/// The label a sensor should carry on the field as it is now.
pub fn expected_label<S>(
    graph: &SensorGraph<S>,
    field: &PatchesGrid,
    id: SensorId,
) -> Result<RainLabel, GeoNetError> {
    let wet_at = |sensor: SensorId| -> Result<bool, GeoNetError> {
        Ok(field.get_color(graph.sensor(sensor)?.position())? == RAIN)
    };

    let own = wet_at(id)?;
    let neighbors = graph
        .neighbors(id)?
        .into_iter()
        .map(wet_at)
        .collect::<Result<Vec<bool>, GeoNetError>>()?;
    Ok(RainLabel::classify(own, neighbors))
}

/// Global state threaded through a rain run.
#[derive(Debug, Clone)]
pub struct RainGlobal {
    pub mode: RainMode,

    /// Hook invocations so far
    pub count: u64,

    pub layout: Option<RainLayout>,

    /// Layouts painted so far
    pub repaints: u64,

    /// Value of `repaints` when the current round started
    round_repaints: u64,

    /// Classifications compared with the ground truth
    pub checked: usize,

    /// Classifications that disagreed with the ground truth
    pub mismatches: usize,

    /// Classifications not compared because the layout moved mid-round
    pub skipped: usize,

    pub events: Vec<SimEvent>,

    rng: ChaCha8Rng,

    cancel: CancelFlag,
}

impl RainGlobal {
    fn new(mode: RainMode, rng: ChaCha8Rng, cancel: CancelFlag) -> Self {
        Self {
            mode,
            count: 0,
            layout: None,
            repaints: 0,
            round_repaints: 0,
            checked: 0,
            mismatches: 0,
            skipped: 0,
            events: Vec::new(),
            rng,
            cancel,
        }
    }

    /// Clears the field and paints a randomly chosen layout.
    fn repaint(&mut self, field: &mut PatchesGrid, tick: u64) -> Result<(), GeoNetError> {
        let layout = RainLayout::random(&mut self.rng);
        field.clear_color();
        layout.paint(field)?;

        self.layout = Some(layout);
        self.repaints += 1;
        self.events.push(SimEvent::new(tick, format!("painted layout {}", layout)));
        debug!(tick, layout = %layout, "Rain repainted");
        Ok(())
    }

    /// Compares every label assigned this tick with the ground truth.
    fn audit(
        &mut self,
        graph: &SensorGraph<RainState>,
        field: &PatchesGrid,
        tick: u64,
    ) -> Result<(), GeoNetError> {
        let fresh: Vec<(SensorId, Option<RainLabel>)> = graph
            .list_sensors()
            .filter(|s| s.state().classified_at == Some(tick))
            .map(|s| (s.id(), s.state().label))
            .collect();
        if fresh.is_empty() {
            return Ok(());
        }

        if self.mode.samples_across_ticks() && self.repaints != self.round_repaints {
            self.skipped += fresh.len();
            return Ok(());
        }

        for (id, label) in fresh {
            let expected = expected_label(graph, field, id)?;
            self.checked += 1;
            if label != Some(expected) {
                self.mismatches += 1;
                warn!(tick, sensor = %id, ?label, ?expected, "Label disagrees with the field");
            }
        }
        Ok(())
    }

    pub fn passed(&self) -> bool {
        self.checked > 0 && self.mismatches == 0
    }

    pub fn failure_reason(&self) -> Option<String> {
        if self.passed() {
            None
        } else if self.checked == 0 {
            Some("no classification could be checked".to_string())
        } else {
            Some(format!(
                "{}/{} labels disagree with the field",
                self.mismatches, self.checked
            ))
        }
    }
}

/// Places sensors on a Gabriel graph and prepares the first layout.
pub fn setup(
    world: &mut SimWorld<RainState>,
    sensors: usize,
    mode: RainMode,
) -> Result<RainGlobal, SimError> {
    let rng = world.subsystem_rng(LAYOUT_SALT);
    let mut global = RainGlobal::new(mode, rng, world.cancel_flag());
    if mode == RainMode::Static {
        global.repaint(&mut world.field, 0)?;
        global.round_repaints = global.repaints;
    }

    let ids = world.create_and_append_sensors(
        sensors,
        RainState::starting(mode.initial_phase()),
        &mode.callbacks(),
    )?;
    for id in &ids {
        world.graph.sensor_mut(*id)?.set_display_color(mode.resting_color());
    }
    world.graph.connect_if(&ids, &Gabriel, euclidean)?;

    info!(
        mode = ?mode,
        sensors = ids.len(),
        edges = world.graph.edge_count(),
        "Rain network ready"
    );
    Ok(global)
}

/// Per-tick hook: audits this tick's labels, then repaints, restarts and
/// pokes sensors as the mode requires.
pub fn update(
    graph: &mut SensorGraph<RainState>,
    field: &mut PatchesGrid,
    mut global: RainGlobal,
) -> Result<RainGlobal, GeoNetError> {
    let tick = graph.tick_count();
    global.audit(graph, field, tick)?;

    let repainted = match global.mode.repaint_every() {
        Some(every) if global.count % every == 0 => {
            global.repaint(field, tick)?;
            true
        }
        _ => false,
    };

    let restart = match global.mode.restart_every() {
        Some(every) => global.count % every == 0,
        None => repainted,
    };
    if restart {
        let phase = global.mode.initial_phase();
        for id in graph.ids().to_vec() {
            let state = graph.state_mut(id)?;
            state.phase = phase;
            state.classified_at = None;
        }
        global.round_repaints = global.repaints;
    }
    global.count += 1;

    if global.mode.initial_phase() == RoundPhase::Init {
        let poked: Vec<(SensorId, f64)> = graph
            .list_sensors()
            .filter(|s| s.state().phase == RoundPhase::Init)
            .map(|s| (s.id(), wet_value(s.reading())))
            .collect();
        for (id, value) in poked {
            graph.transmit(id, id, &[value])?;
        }
    }

    if global.mode == RainMode::Static {
        let pending = graph
            .list_sensors()
            .filter(|s| s.degree() > 0 && s.state().phase != RoundPhase::Classified)
            .count();
        if pending == 0 {
            global.cancel.cancel();
        }
    }

    Ok(global)
}
