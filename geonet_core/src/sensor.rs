//! The Sensor entity and the context handed to its callbacks.
//!
//! A sensor owns two message buffers:
//!
//! ```text
//!   transmit() ──► pending_queue ──flush()──► active_queue ──receive()──► on_receive
//!                  (this tick)                (next tick)
//! ```
//!
//! Nothing written during a tick is visible to `receive()` before the next
//! flush, which gives exactly one tick of latency per hop.

use geonet_env::{Bounds, Color, Coordinate, GeoNetError, SensorId};
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

/// Callback invoked with the batch of messages delivered this tick.
///
/// An `Err` aborts the tick that ran it.
pub type ReceiveFn<S> = Rc<dyn Fn(&mut SensorContext<'_, S>, &[f64]) -> Result<(), GeoNetError>>;

/// Callback invoked when the sampled field colour differs from the cached one.
pub type MeasurementFn<S> = Rc<dyn Fn(&mut SensorContext<'_, S>, Color) -> Result<(), GeoNetError>>;

/// Optional user callbacks supplied at construction.
///
/// Cloning is cheap: handles are reference counted so a population of
/// sensors can share one behaviour.
pub struct Callbacks<S> {
    on_receive: Option<ReceiveFn<S>>,
    on_measurement_change: Option<MeasurementFn<S>>,
}

impl<S> Callbacks<S> {
    /// Creates an empty callback set (both absent).
    pub fn new() -> Self {
        Self {
            on_receive: None,
            on_measurement_change: None,
        }
    }

    /// Sets the receive callback.
    pub fn on_receive(
        mut self,
        f: impl Fn(&mut SensorContext<'_, S>, &[f64]) -> Result<(), GeoNetError> + 'static,
    ) -> Self {
        self.on_receive = Some(Rc::new(f));
        self
    }

    /// Sets the measurement-change callback.
    pub fn on_measurement_change(
        mut self,
        f: impl Fn(&mut SensorContext<'_, S>, Color) -> Result<(), GeoNetError> + 'static,
    ) -> Self {
        self.on_measurement_change = Some(Rc::new(f));
        self
    }

    pub fn has_on_receive(&self) -> bool {
        self.on_receive.is_some()
    }

    pub fn has_on_measurement_change(&self) -> bool {
        self.on_measurement_change.is_some()
    }
}

impl<S> Default for Callbacks<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Clone for Callbacks<S> {
    fn clone(&self) -> Self {
        Self {
            on_receive: self.on_receive.clone(),
            on_measurement_change: self.on_measurement_change.clone(),
        }
    }
}

impl<S> fmt::Debug for Callbacks<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_receive", &self.has_on_receive())
            .field("on_measurement_change", &self.has_on_measurement_change())
            .finish()
    }
}

/// A message deposit produced by a callback, applied by the graph after the
/// callback returns.
#[derive(Debug, Clone, PartialEq)]
pub struct Transmission {
    pub from: SensorId,
    pub to: SensorId,
    pub values: Vec<f64>,
}

/// Deposits collected while a callback runs.
#[derive(Debug, Default)]
pub struct Outbox {
    transmissions: Vec<Transmission>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `values` for `to`. Empty batches are dropped.
    pub fn push(&mut self, from: SensorId, to: SensorId, values: &[f64]) {
        if values.is_empty() {
            return;
        }
        self.transmissions.push(Transmission {
            from,
            to,
            values: values.to_vec(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.transmissions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.transmissions.len()
    }

    /// Consumes the outbox.
    pub fn into_transmissions(self) -> Vec<Transmission> {
        self.transmissions
    }
}

/// Read-only view of a neighbour, as seen from inside a callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeighborView {
    pub id: SensorId,
    pub position: Coordinate,
    /// The neighbour's cached field reading (`None` before its first sense)
    pub reading: Option<Color>,
}

/// Everything a callback may touch besides its own sensor.
pub struct CallbackEnv<'a> {
    neighbors: &'a [NeighborView],
    bounds: Bounds,
    tick: u64,
    outbox: &'a mut Outbox,
}

impl<'a> CallbackEnv<'a> {
    pub fn new(neighbors: &'a [NeighborView], bounds: Bounds, tick: u64, outbox: &'a mut Outbox) -> Self {
        Self {
            neighbors,
            bounds,
            tick,
            outbox,
        }
    }
}

/// Scoped mutable access to one sensor, handed to its callbacks.
///
/// Transmissions go to an outbox and land in the targets' pending queues
/// when the callback returns.
pub struct SensorContext<'a, S> {
    sensor: &'a mut Sensor<S>,
    env: CallbackEnv<'a>,
}

impl<'a, S> SensorContext<'a, S> {
    pub fn id(&self) -> SensorId {
        self.sensor.id
    }

    pub fn position(&self) -> Coordinate {
        self.sensor.position
    }

    /// The tick currently being processed (1-based).
    pub fn tick(&self) -> u64 {
        self.env.tick
    }

    /// The cached field reading at this sensor's position.
    pub fn reading(&self) -> Option<Color> {
        self.sensor.last_field_reading
    }

    pub fn state(&self) -> &S {
        &self.sensor.state
    }

    pub fn state_mut(&mut self) -> &mut S {
        &mut self.sensor.state
    }

    pub fn set_state(&mut self, state: S) {
        self.sensor.state = state;
    }

    pub fn display_color(&self) -> Color {
        self.sensor.display_color
    }

    pub fn set_display_color(&mut self, color: Color) {
        self.sensor.display_color = color;
    }

    /// Moves the sensor, rejecting non-finite or out-of-field positions.
    pub fn set_position(&mut self, position: Coordinate) -> Result<(), GeoNetError> {
        position.validate()?;
        self.env.bounds.check(position)?;
        self.sensor.position = position;
        Ok(())
    }

    pub fn neighbors(&self) -> &[NeighborView] {
        self.env.neighbors
    }

    /// Deposits `values` into `target`'s pending queue. No-op if empty.
    pub fn transmit(&mut self, target: SensorId, values: &[f64]) {
        self.env.outbox.push(self.sensor.id, target, values);
    }

    /// Transmits `values` to every current neighbour.
    pub fn broadcast(&mut self, values: &[f64]) {
        let from = self.sensor.id;
        for n in self.env.neighbors {
            self.env.outbox.push(from, n.id, values);
        }
    }
}

/// An addressable network participant.
///
/// The graph owns every sensor record; a sensor's `neighbors` set mirrors
/// the edges incident to it and is only changed by the graph.
pub struct Sensor<S> {
    id: SensorId,
    position: Coordinate,
    state: S,
    display_color: Color,
    active_queue: Vec<f64>,
    pending_queue: Vec<f64>,
    last_field_reading: Option<Color>,
    pub(crate) neighbors: BTreeSet<SensorId>,
    callbacks: Callbacks<S>,
}

impl<S> Sensor<S> {
    /// Creates a sensor with a fresh random id.
    pub fn new(position: Coordinate, state: S) -> Result<Self, GeoNetError> {
        Self::with_id(SensorId::new(), position, state)
    }

    /// Creates a sensor with a caller-chosen id (for reproducible runs).
    pub fn with_id(id: SensorId, position: Coordinate, state: S) -> Result<Self, GeoNetError> {
        position.validate()?;
        Ok(Self {
            id,
            position,
            state,
            display_color: Color::CYAN,
            active_queue: Vec::new(),
            pending_queue: Vec::new(),
            last_field_reading: None,
            neighbors: BTreeSet::new(),
            callbacks: Callbacks::new(),
        })
    }

    /// Attaches callbacks.
    pub fn with_callbacks(mut self, callbacks: Callbacks<S>) -> Self {
        self.callbacks = callbacks;
        self
    }

    /// Sets the initial display colour.
    pub fn with_color(mut self, color: Color) -> Self {
        self.display_color = color;
        self
    }

    pub fn id(&self) -> SensorId {
        self.id
    }

    pub fn position(&self) -> Coordinate {
        self.position
    }

    /// Moves the sensor. Field bounds are checked by the graph and at sense time.
    pub fn set_position(&mut self, position: Coordinate) -> Result<(), GeoNetError> {
        position.validate()?;
        self.position = position;
        Ok(())
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    pub fn set_state(&mut self, state: S) {
        self.state = state;
    }

    pub fn display_color(&self) -> Color {
        self.display_color
    }

    pub fn set_display_color(&mut self, color: Color) {
        self.display_color = color;
    }

    /// The last field reading observed in a sense phase.
    pub fn reading(&self) -> Option<Color> {
        self.last_field_reading
    }

    /// Ids of adjacent sensors, in id order.
    pub fn neighbors(&self) -> impl Iterator<Item = SensorId> + '_ {
        self.neighbors.iter().copied()
    }

    pub fn degree(&self) -> usize {
        self.neighbors.len()
    }

    /// Messages readable by this tick's receive.
    pub fn active_queue(&self) -> &[f64] {
        &self.active_queue
    }

    /// Messages deposited this tick, invisible until the next flush.
    pub fn pending_queue(&self) -> &[f64] {
        &self.pending_queue
    }

    pub fn callbacks(&self) -> &Callbacks<S> {
        &self.callbacks
    }

    /// Appends to the pending queue. No-op if `values` is empty.
    pub(crate) fn deposit(&mut self, values: &[f64]) {
        self.pending_queue.extend_from_slice(values);
    }

    /// Promotes pending messages to active. Returns how many were promoted.
    pub fn flush(&mut self) -> usize {
        self.active_queue = std::mem::take(&mut self.pending_queue);
        self.active_queue.len()
    }

    /// Hands the active queue to `on_receive` and clears it.
    ///
    /// Returns the delivered batch, or `None` (without invoking the
    /// callback) when the queue was empty. A callback error is passed on.
    pub fn receive(&mut self, env: CallbackEnv<'_>) -> Result<Option<Vec<f64>>, GeoNetError> {
        if self.active_queue.is_empty() {
            return Ok(None);
        }

        let messages = std::mem::take(&mut self.active_queue);
        if let Some(callback) = self.callbacks.on_receive.clone() {
            let mut ctx = SensorContext { sensor: self, env };
            callback(&mut ctx, &messages)?;
        }
        Ok(Some(messages))
    }

    /// Compares a fresh field sample with the cache.
    ///
    /// On change, fires `on_measurement_change` before updating the cache and
    /// returns true. Identical readings fire nothing. If the callback fails
    /// the cache keeps its old value.
    pub fn measurement_update(&mut self, new_color: Color, env: CallbackEnv<'_>) -> Result<bool, GeoNetError> {
        if self.last_field_reading == Some(new_color) {
            return Ok(false);
        }

        if let Some(callback) = self.callbacks.on_measurement_change.clone() {
            let mut ctx = SensorContext { sensor: self, env };
            callback(&mut ctx, new_color)?;
        }
        self.last_field_reading = Some(new_color);
        Ok(true)
    }
}

impl<S: fmt::Debug> fmt::Debug for Sensor<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sensor")
            .field("id", &self.id)
            .field("position", &self.position)
            .field("state", &self.state)
            .field("display_color", &self.display_color)
            .field("active_queue", &self.active_queue)
            .field("pending_queue", &self.pending_queue)
            .field("last_field_reading", &self.last_field_reading)
            .field("neighbors", &self.neighbors.len())
            .field("callbacks", &self.callbacks)
            .finish()
    }
}

impl<S> fmt::Display for Sensor<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sensor {} at {}", self.id, self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    fn env<'a>(neighbors: &'a [NeighborView], outbox: &'a mut Outbox) -> CallbackEnv<'a> {
        CallbackEnv::new(neighbors, Bounds::square(10), 1, outbox)
    }

    #[test]
    fn test_new_rejects_non_finite_position() {
        assert!(Sensor::new(Coordinate::new(f64::NAN, 0.0), ()).is_err());
        assert!(Sensor::new(Coordinate::new(1.0, 2.0), ()).is_ok());
    }

    #[test]
    fn test_flush_promotes_pending() {
        let mut sensor = Sensor::new(Coordinate::new(0.0, 0.0), ()).unwrap();
        sensor.deposit(&[1.0, 2.0]);

        assert_eq!(sensor.pending_queue(), &[1.0, 2.0]);
        assert!(sensor.active_queue().is_empty());

        assert_eq!(sensor.flush(), 2);
        assert_eq!(sensor.active_queue(), &[1.0, 2.0]);
        assert!(sensor.pending_queue().is_empty());
    }

    #[test]
    fn test_receive_skips_callback_when_empty() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let mut sensor = Sensor::new(Coordinate::new(0.0, 0.0), ())
            .unwrap()
            .with_callbacks(Callbacks::new().on_receive(move |_, _| {
                counter.set(counter.get() + 1);
                Ok(())
            }));

        let mut outbox = Outbox::new();
        assert_eq!(sensor.receive(env(&[], &mut outbox)), Ok(None));
        assert_eq!(calls.get(), 0);

        sensor.deposit(&[4.0]);
        sensor.flush();
        assert_eq!(sensor.receive(env(&[], &mut outbox)), Ok(Some(vec![4.0])));
        assert_eq!(calls.get(), 1);
        assert!(sensor.active_queue().is_empty());
    }

    #[test]
    fn test_receive_callback_sees_messages_and_mutates_state() {
        let mut sensor = Sensor::new(Coordinate::new(0.0, 0.0), 0.0f64)
            .unwrap()
            .with_callbacks(Callbacks::<f64>::new().on_receive(|ctx, msgs| {
                *ctx.state_mut() += msgs.iter().sum::<f64>();
                ctx.set_display_color(Color::GREEN);
                Ok(())
            }));

        sensor.deposit(&[1.5, 2.5]);
        sensor.flush();
        let mut outbox = Outbox::new();
        sensor.receive(env(&[], &mut outbox)).unwrap();

        assert_eq!(*sensor.state(), 4.0);
        assert_eq!(sensor.display_color(), Color::GREEN);
    }

    #[test]
    fn test_measurement_update_fires_before_cache_update() {
        let seen: Rc<RefCell<Vec<(Option<Color>, Color)>>> = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        let mut sensor = Sensor::new(Coordinate::new(0.0, 0.0), ())
            .unwrap()
            .with_callbacks(Callbacks::new().on_measurement_change(move |ctx, color| {
                log.borrow_mut().push((ctx.reading(), color));
                Ok(())
            }));

        let mut outbox = Outbox::new();
        assert_eq!(sensor.measurement_update(Color::BLACK, env(&[], &mut outbox)), Ok(true));
        assert_eq!(sensor.measurement_update(Color::BLACK, env(&[], &mut outbox)), Ok(false));
        assert_eq!(sensor.measurement_update(Color::NAVY, env(&[], &mut outbox)), Ok(true));

        assert_eq!(
            *seen.borrow(),
            vec![(None, Color::BLACK), (Some(Color::BLACK), Color::NAVY)]
        );
        assert_eq!(sensor.reading(), Some(Color::NAVY));
    }

    #[test]
    fn test_broadcast_reaches_every_neighbor() {
        let a = SensorId::from_seed(1);
        let b = SensorId::from_seed(2);
        let neighbors = [
            NeighborView { id: a, position: Coordinate::new(1.0, 0.0), reading: None },
            NeighborView { id: b, position: Coordinate::new(0.0, 1.0), reading: None },
        ];

        let mut sensor = Sensor::new(Coordinate::new(0.0, 0.0), ())
            .unwrap()
            .with_callbacks(Callbacks::new().on_receive(|ctx, msgs| {
                ctx.broadcast(msgs);
                ctx.broadcast(&[]);
                Ok(())
            }));
        sensor.deposit(&[7.0]);
        sensor.flush();

        let mut outbox = Outbox::new();
        sensor.receive(env(&neighbors, &mut outbox)).unwrap();

        let sent = outbox.into_transmissions();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].to, a);
        assert_eq!(sent[1].to, b);
        assert!(sent.iter().all(|t| t.values == vec![7.0]));
    }

    #[test]
    fn test_context_set_position_is_validated() {
        let result = Rc::new(RefCell::new(Vec::new()));
        let log = result.clone();
        let mut sensor = Sensor::new(Coordinate::new(0.0, 0.0), ())
            .unwrap()
            .with_callbacks(Callbacks::new().on_receive(move |ctx, _| {
                log.borrow_mut().push(ctx.set_position(Coordinate::new(42.0, 0.0)).is_err());
                log.borrow_mut().push(ctx.set_position(Coordinate::new(3.0, 4.0)).is_ok());
                Ok(())
            }));
        sensor.deposit(&[1.0]);
        sensor.flush();

        let mut outbox = Outbox::new();
        sensor.receive(env(&[], &mut outbox)).unwrap();

        assert_eq!(*result.borrow(), vec![true, true]);
        assert_eq!(sensor.position(), Coordinate::new(3.0, 4.0));
    }

    #[test]
    fn test_failed_measurement_callback_keeps_cache() {
        let mut sensor = Sensor::new(Coordinate::new(0.0, 0.0), ())
            .unwrap()
            .with_callbacks(Callbacks::new().on_measurement_change(|ctx, _| {
                ctx.set_position(Coordinate::new(70.0, 0.0))
            }));

        let mut outbox = Outbox::new();
        let result = sensor.measurement_update(Color::BLACK, env(&[], &mut outbox));

        assert!(matches!(result, Err(GeoNetError::Placement { .. })));
        assert_eq!(sensor.reading(), None);
        assert_eq!(sensor.position(), Coordinate::new(0.0, 0.0));
    }
}
