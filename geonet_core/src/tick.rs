//! Tick orchestration: one synchronous step of the network.
//!
//! ```text
//!   ┌───────┐   ┌───────┐   ┌───────┐   ┌─────────┐   ┌────────┐   ┌────────┐
//!   │ Flush │──►│ Reset │──►│ Sense │──►│ Receive │──►│ Update │──►│ Commit │
//!   └───────┘   └───────┘   └───────┘   └─────────┘   └────────┘   └────────┘
//!   pending→     edge        field →     active →      host hook    new global
//!   active       markers     callbacks   callbacks                  state
//! ```
//!
//! Every phase completes for all sensors before the next starts. Messages
//! sent in Sense, Receive or Update land in pending queues and are first
//! readable after the next tick's Flush.

use crate::graph::SensorGraph;
use crate::sensor::{CallbackEnv, NeighborView, Outbox};
use geonet_env::{Color, EnvironmentField, GeoNetError, SensorId};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Counters for one processed tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    /// 1-based tick number
    pub tick: u64,

    /// Messages promoted from pending to active
    pub flushed: usize,

    /// Sensors whose field reading changed
    pub measurement_changes: usize,

    /// Sensors that had messages handed to `on_receive`
    pub receive_calls: usize,

    /// Messages handed to `on_receive` in total
    pub messages_delivered: usize,

    /// Deposits made by callbacks during this tick
    pub messages_sent: usize,

    /// Edges marked transmitting at the end of the tick
    pub active_edges: usize,
}

impl<S> SensorGraph<S> {
    /// Runs one tick against `field`.
    ///
    /// `update` is the host's global hook. It receives the previous global
    /// state by value and returns the next one, so nothing from the old
    /// value survives the tick boundary. Any error aborts the tick at the
    /// failing phase.
    pub fn tick<F, G, H>(&mut self, field: &mut F, global: G, update: H) -> Result<(G, TickReport), GeoNetError>
    where
        F: EnvironmentField,
        H: FnOnce(&mut SensorGraph<S>, &mut F, G) -> Result<G, GeoNetError>,
    {
        self.tick_count += 1;
        let mut report = TickReport {
            tick: self.tick_count,
            ..Default::default()
        };

        // Flush
        report.flushed = self.sensors_mut().map(|s| s.flush()).sum();

        // Reset
        for edge in self.edges_mut() {
            edge.transmitting = false;
        }

        // Sense
        let readings = self.sample(field)?;
        let bounds = field.bounds();
        let views = self.phase_views()?;
        for ((id, color), views) in readings.into_iter().zip(&views) {
            let mut outbox = Outbox::new();
            let changed = self
                .sensor_mut(id)?
                .measurement_update(color, CallbackEnv::new(views, bounds, report.tick, &mut outbox))?;
            if changed {
                report.measurement_changes += 1;
            }
            report.messages_sent += self.deliver(outbox)?;
        }

        // Receive
        let views = self.phase_views()?;
        for (idx, views) in views.iter().enumerate() {
            let id = self.ids()[idx];
            let mut outbox = Outbox::new();
            let delivered = self
                .sensor_mut(id)?
                .receive(CallbackEnv::new(views, bounds, report.tick, &mut outbox))?;
            if let Some(batch) = delivered {
                report.receive_calls += 1;
                report.messages_delivered += batch.len();
            }
            report.messages_sent += self.deliver(outbox)?;
        }

        trace!(
            tick = report.tick,
            flushed = report.flushed,
            changes = report.measurement_changes,
            delivered = report.messages_delivered,
            "Callbacks done"
        );

        // Update
        let next = update(self, field, global)?;

        // Commit
        report.active_edges = self.list_edges().filter(|e| e.transmitting).count();
        debug!(
            tick = report.tick,
            receive_calls = report.receive_calls,
            sent = report.messages_sent,
            active_edges = report.active_edges,
            "Tick complete"
        );
        Ok((next, report))
    }

    /// Reads the field under every sensor, in insertion order. Fails before
    /// any callback runs if a sensor sits outside the field.
    fn sample<F: EnvironmentField>(&self, field: &F) -> Result<Vec<(SensorId, Color)>, GeoNetError> {
        self.list_sensors()
            .map(|s| -> Result<(SensorId, Color), GeoNetError> {
                Ok((s.id(), field.get_color(s.position())?))
            })
            .collect()
    }

    /// Neighbour views for every sensor in insertion order, taken before a
    /// phase starts so no callback sees another's mid-phase writes.
    fn phase_views(&self) -> Result<Vec<Vec<NeighborView>>, GeoNetError> {
        self.ids().iter().map(|&id| self.neighbor_views(id)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::euclidean;
    use crate::sensor::{Callbacks, Sensor};
    use geonet_env::{Coordinate, PatchesGrid};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn noop<S>(_: &mut SensorGraph<S>, _: &mut PatchesGrid, g: u32) -> Result<u32, GeoNetError> {
        Ok(g + 1)
    }

    #[test]
    fn test_global_state_is_threaded() {
        let mut graph: SensorGraph<()> = SensorGraph::new();
        let mut field = PatchesGrid::new(5);

        let (g, report) = graph.tick(&mut field, 0u32, noop).unwrap();
        let (g, report2) = graph.tick(&mut field, g, noop).unwrap();

        assert_eq!(g, 2);
        assert_eq!(report.tick, 1);
        assert_eq!(report2.tick, 2);
        assert_eq!(graph.tick_count(), 2);
    }

    #[test]
    fn test_first_sense_counts_as_change() {
        let mut graph = SensorGraph::new();
        let mut field = PatchesGrid::new(5);
        graph.append(Sensor::new(Coordinate::new(1.0, 1.0), ()).unwrap());

        let (_, first) = graph.tick(&mut field, 0u32, noop).unwrap();
        let (_, second) = graph.tick(&mut field, 0u32, noop).unwrap();
        field.set_color(Coordinate::new(1.0, 1.0), Color::NAVY).unwrap();
        let (_, third) = graph.tick(&mut field, 0u32, noop).unwrap();

        assert_eq!(first.measurement_changes, 1);
        assert_eq!(second.measurement_changes, 0);
        assert_eq!(third.measurement_changes, 1);
    }

    #[test]
    fn test_out_of_field_sensor_aborts_before_callbacks() {
        let fired = Rc::new(RefCell::new(0));
        let counter = fired.clone();
        let callbacks = Callbacks::new().on_measurement_change(move |_, _| {
            *counter.borrow_mut() += 1;
            Ok(())
        });

        let mut graph = SensorGraph::new();
        let mut field = PatchesGrid::new(5);
        graph.append(Sensor::new(Coordinate::new(1.0, 1.0), ()).unwrap().with_callbacks(callbacks.clone()));
        graph.append(Sensor::new(Coordinate::new(9.0, 1.0), ()).unwrap().with_callbacks(callbacks));

        let result = graph.tick(&mut field, 0u32, noop);
        assert!(matches!(result, Err(GeoNetError::Placement { .. })));
        assert_eq!(*fired.borrow(), 0);
    }

    #[test]
    fn test_hook_error_aborts_tick() {
        let mut graph: SensorGraph<()> = SensorGraph::new();
        let mut field = PatchesGrid::new(5);

        let result = graph.tick(&mut field, 0u32, |_, _, _| Err(GeoNetError::invalid("stop")));
        assert_eq!(result, Err(GeoNetError::InvalidValue("stop".to_string())));
    }

    #[test]
    fn test_transmitting_marks_reset_each_tick() {
        let relay = Callbacks::new().on_receive(|ctx, msgs| {
            ctx.broadcast(msgs);
            Ok(())
        });
        let mut graph = SensorGraph::new();
        let mut field = PatchesGrid::new(5);
        let a = SensorId::from_seed(1);
        let b = SensorId::from_seed(2);
        graph.append(Sensor::with_id(a, Coordinate::new(0.0, 0.0), ()).unwrap());
        graph.append(Sensor::with_id(b, Coordinate::new(1.0, 0.0), ()).unwrap().with_callbacks(relay));
        graph.connect(a, b, euclidean).unwrap();

        graph.transmit(a, b, &[1.0]).unwrap();
        assert!(graph.edge(a, b).unwrap().transmitting);

        // b relays back to a, which marks the edge again
        let (_, report) = graph.tick(&mut field, 0u32, noop).unwrap();
        assert_eq!(report.messages_sent, 1);
        assert_eq!(report.active_edges, 1);

        // a has no callback, so nothing crosses the edge this time
        let (_, report) = graph.tick(&mut field, 0u32, noop).unwrap();
        assert_eq!(report.receive_calls, 1);
        assert_eq!(report.active_edges, 0);
        assert!(!graph.edge(a, b).unwrap().transmitting);
    }

    #[test]
    fn test_hook_sees_completed_receive_phase() {
        let mut graph = SensorGraph::new();
        let mut field = PatchesGrid::new(5);
        let id = SensorId::from_seed(3);
        let sink = Callbacks::<f64>::new().on_receive(|ctx, msgs| {
            *ctx.state_mut() += msgs.iter().sum::<f64>();
            Ok(())
        });
        graph.append(Sensor::with_id(id, Coordinate::new(2.0, 2.0), 0.0).unwrap().with_callbacks(sink));
        graph.transmit(id, id, &[2.0, 3.0]).unwrap();

        let (seen, _) = graph
            .tick(&mut field, 0.0, |g, _, _| Ok(*g.state(id)?))
            .unwrap();
        assert_eq!(seen, 5.0);
    }

    #[test]
    fn test_callback_moving_out_of_field_is_rejected() {
        let mut graph = SensorGraph::new();
        let mut field = PatchesGrid::new(5);
        let id = SensorId::from_seed(4);
        let mover = Callbacks::new().on_measurement_change(|ctx, _| ctx.set_position(Coordinate::new(70.0, 0.0)));
        graph.append(Sensor::with_id(id, Coordinate::new(2.0, 2.0), ()).unwrap().with_callbacks(mover));

        let result = graph.tick(&mut field, 0u32, noop);
        assert!(matches!(result, Err(GeoNetError::Placement { .. })));
        assert_eq!(graph.sensor(id).unwrap().position(), Coordinate::new(2.0, 2.0));
    }

    #[test]
    fn test_receive_callback_error_aborts_tick() {
        let mut graph = SensorGraph::new();
        let mut field = PatchesGrid::new(5);
        let id = SensorId::from_seed(5);
        let mover = Callbacks::new().on_receive(|ctx, _| ctx.set_position(Coordinate::new(2.0, f64::NAN)));
        graph.append(Sensor::with_id(id, Coordinate::new(2.0, 2.0), ()).unwrap().with_callbacks(mover));
        graph.transmit(id, id, &[1.0]).unwrap();

        let hook_ran = Rc::new(RefCell::new(false));
        let flag = hook_ran.clone();
        let result = graph.tick(&mut field, 0u32, move |_, _, g| {
            *flag.borrow_mut() = true;
            Ok(g)
        });

        assert!(result.is_err());
        assert!(!*hook_ran.borrow());
        assert_eq!(graph.sensor(id).unwrap().position(), Coordinate::new(2.0, 2.0));
    }

    #[test]
    fn test_sense_callbacks_see_pre_tick_neighbor_readings() {
        let seen: Rc<RefCell<Vec<(SensorId, Option<Color>)>>> = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        let watcher = Callbacks::new().on_measurement_change(move |ctx, _| {
            let neighbor = ctx.neighbors()[0].reading;
            log.borrow_mut().push((ctx.id(), neighbor));
            Ok(())
        });

        let mut graph = SensorGraph::new();
        let mut field = PatchesGrid::new(5);
        let a = SensorId::from_seed(6);
        let b = SensorId::from_seed(7);
        let at_a = Coordinate::new(1.0, 1.0);
        let at_b = Coordinate::new(3.0, 1.0);
        graph.append(Sensor::with_id(a, at_a, ()).unwrap().with_callbacks(watcher.clone()));
        graph.append(Sensor::with_id(b, at_b, ()).unwrap().with_callbacks(watcher));
        graph.connect(a, b, euclidean).unwrap();

        graph.tick(&mut field, 0u32, noop).unwrap();
        seen.borrow_mut().clear();

        // Both cells change in the same tick
        let before = field.get_color(at_a).unwrap();
        field.set_color(at_a, Color::NAVY).unwrap();
        field.set_color(at_b, Color::NAVY).unwrap();
        let (_, report) = graph.tick(&mut field, 0u32, noop).unwrap();

        assert_eq!(report.measurement_changes, 2);
        assert_eq!(*seen.borrow(), vec![(a, Some(before)), (b, Some(before))]);
    }
}
