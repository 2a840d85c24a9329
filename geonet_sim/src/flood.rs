//! Flooding: one message spreads from an origin sensor to everything it can reach.
//!
//! Each sensor relays the first batch it receives to all neighbours and
//! then goes quiet. With one tick of latency per hop, a sensor `h` hops
//! from the origin must first hear the flood at tick `h + 1`.

use crate::error::SimError;
use crate::world::{CancelFlag, SimWorld};

use geonet_core::{euclidean, Callbacks, Gabriel, SensorGraph, UnitDisk};
use geonet_env::{Color, GeoNetError, PatchesGrid, SensorId};
use std::collections::HashMap;
use tracing::{debug, info};

/// Colour of a sensor that has been reached.
pub const REACHED: Color = Color::GREEN;

/// Per-sensor flood state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FloodState {
    /// Tick at which the flood first arrived
    pub reached_at: Option<u64>,
}

/// How the flood network is wired.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FloodTopology {
    /// Chain over all sensors plus a star from sensor 10 to sensors 11..15
    ChainWithHub,

    /// Unit-disk graph with a fixed radius
    UnitDisk(f64),

    /// Unit-disk graph with the radius tuned to the placement
    AutoTuned,

    Gabriel,
}

/// Global state threaded through a flood run.
#[derive(Debug, Clone)]
pub struct FloodGlobal {
    pub origin: SensorId,

    /// Hop count of every sensor reachable from the origin
    pub hops: HashMap<SensorId, usize>,

    /// Sensors reached so far
    pub reached: usize,

    /// Radius used by unit-disk topologies
    pub radius: Option<f64>,

    cancel: CancelFlag,
}

/// Oracle verdict for a finished flood.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FloodVerdict {
    pub reachable: usize,
    pub reached: usize,

    /// Sensors reached at a tick other than `hops + 1`
    pub mistimed: usize,

    /// Sensors reached despite having no path from the origin
    pub stray: usize,
}

impl FloodVerdict {
    pub fn passed(&self) -> bool {
        self.reached == self.reachable && self.mistimed == 0 && self.stray == 0
    }

    pub fn failure_reason(&self) -> Option<String> {
        if self.passed() {
            None
        } else if self.mistimed > 0 || self.stray > 0 {
            Some(format!(
                "{} sensors reached off-schedule, {} reached without a path",
                self.mistimed, self.stray
            ))
        } else {
            Some(format!(
                "flood reached {}/{} reachable sensors before the tick limit",
                self.reached, self.reachable
            ))
        }
    }
}

/// Relays the first received batch to every neighbour and turns green.
pub fn flood_callbacks() -> Callbacks<FloodState> {
    Callbacks::<FloodState>::new().on_receive(|ctx, msgs| {
        if ctx.state().reached_at.is_some() {
            return Ok(());
        }
        let tick = ctx.tick();
        ctx.state_mut().reached_at = Some(tick);
        ctx.set_display_color(REACHED);
        ctx.broadcast(msgs);
        Ok(())
    })
}

/// Places sensors, wires them and seeds the flood at the first sensor.
pub fn setup(
    world: &mut SimWorld<FloodState>,
    sensors: usize,
    topology: FloodTopology,
) -> Result<FloodGlobal, SimError> {
    let ids = world.create_and_append_sensors(sensors, FloodState::default(), &flood_callbacks())?;
    let Some(&origin) = ids.first() else {
        return Err(GeoNetError::invalid("a flood needs at least one sensor").into());
    };

    let radius = match topology {
        FloodTopology::ChainWithHub => {
            world.graph.chain(&ids, euclidean)?;
            if let (Some(hub), Some(leaves)) = (ids.get(10), ids.get(11..ids.len().min(15))) {
                world.graph.star(*hub, leaves, euclidean)?;
            }
            None
        }
        FloodTopology::UnitDisk(radius) => {
            let rule = UnitDisk::new(radius)?;
            world.graph.connect_if(&ids, &rule, euclidean)?;
            Some(rule.radius())
        }
        FloodTopology::AutoTuned => {
            let rule = UnitDisk::autotuned(&world.graph.points(&ids)?);
            world.graph.connect_if(&ids, &rule, euclidean)?;
            Some(rule.radius())
        }
        FloodTopology::Gabriel => {
            world.graph.connect_if(&ids, &Gabriel, euclidean)?;
            None
        }
    };

    world.graph.transmit(origin, origin, &[1.0])?;
    let hops = world.graph.hop_distances(origin)?;
    info!(
        origin = %origin,
        reachable = hops.len(),
        edges = world.graph.edge_count(),
        "Flood seeded"
    );

    Ok(FloodGlobal {
        origin,
        hops,
        reached: 0,
        radius,
        cancel: world.cancel_flag(),
    })
}

/// Per-tick hook: counts reached sensors and stops the run once every
/// reachable sensor has heard the flood.
pub fn update(
    graph: &mut SensorGraph<FloodState>,
    _field: &mut PatchesGrid,
    global: FloodGlobal,
) -> Result<FloodGlobal, GeoNetError> {
    let reached = graph.list_sensors().filter(|s| s.state().reached_at.is_some()).count();
    if reached != global.reached {
        debug!(tick = graph.tick_count(), reached, "Flood advanced");
    }
    if reached >= global.hops.len() {
        global.cancel.cancel();
    }
    Ok(FloodGlobal { reached, ..global })
}

/// Checks every sensor's arrival tick against its hop distance.
pub fn verify(graph: &SensorGraph<FloodState>, global: &FloodGlobal) -> FloodVerdict {
    let mut verdict = FloodVerdict {
        reachable: global.hops.len(),
        ..Default::default()
    };

    for sensor in graph.list_sensors() {
        let Some(tick) = sensor.state().reached_at else {
            continue;
        };
        verdict.reached += 1;
        match global.hops.get(&sensor.id()) {
            Some(hops) if tick == *hops as u64 + 1 => {}
            Some(_) => verdict.mistimed += 1,
            None => verdict.stray += 1,
        }
    }
    verdict
}
