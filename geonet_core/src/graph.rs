//! The sensor graph: owner of every sensor record and of the edge set.
//!
//! Edges live in a map keyed by the sorted id pair, which makes the graph
//! simple and undirected by construction. Each sensor's `neighbors` set is a
//! mirror of this map and is only ever changed together with it.

use crate::connectivity::{ConnectionRule, SensorPoint};
use crate::sensor::{NeighborView, Outbox, Sensor};
use geonet_env::{Bounds, Coordinate, GeoNetError, SensorId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Euclidean distance, the default edge metric.
pub fn euclidean(a: &Coordinate, b: &Coordinate) -> f64 {
    a.distance(b)
}

/// Canonical key of an undirected edge: the smaller id first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct EdgeKey(SensorId, SensorId);

impl EdgeKey {
    fn new(a: SensorId, b: SensorId) -> Self {
        if a <= b {
            Self(a, b)
        } else {
            Self(b, a)
        }
    }
}

/// An undirected edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub a: SensorId,
    pub b: SensorId,

    /// Metric value at creation time. Not recomputed when sensors move.
    pub weight: f64,

    /// Set when a message crossed this edge during the current tick
    pub transmitting: bool,
}

impl Edge {
    /// Returns true if `id` is one of the endpoints.
    pub fn touches(&self, id: SensorId) -> bool {
        self.a == id || self.b == id
    }
}

/// One end of a [`SensorGraph::connect_sensors`] call: a sensor already in
/// the graph, or one to append first.
#[derive(Debug)]
pub enum Endpoint<S> {
    Id(SensorId),
    New(Sensor<S>),
}

impl<S> Endpoint<S> {
    pub fn id(&self) -> SensorId {
        match self {
            Endpoint::Id(id) => *id,
            Endpoint::New(sensor) => sensor.id(),
        }
    }
}

impl<S> From<SensorId> for Endpoint<S> {
    fn from(id: SensorId) -> Self {
        Endpoint::Id(id)
    }
}

impl<S> From<Sensor<S>> for Endpoint<S> {
    fn from(sensor: Sensor<S>) -> Self {
        Endpoint::New(sensor)
    }
}

/// The network graph and sensor manager.
pub struct SensorGraph<S> {
    sensors: HashMap<SensorId, Sensor<S>>,

    /// Insertion order, used for every per-sensor iteration
    order: Vec<SensorId>,

    edges: BTreeMap<EdgeKey, Edge>,

    pub(crate) tick_count: u64,
}

impl<S> Default for SensorGraph<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> SensorGraph<S> {
    pub fn new() -> Self {
        Self {
            sensors: HashMap::new(),
            order: Vec::new(),
            edges: BTreeMap::new(),
            tick_count: 0,
        }
    }

    /// Adds a sensor. Returns false and leaves the existing record untouched
    /// if the id is already present.
    pub fn append(&mut self, sensor: Sensor<S>) -> bool {
        let id = sensor.id();
        if self.sensors.contains_key(&id) {
            return false;
        }

        let mut sensor = sensor;
        sensor.neighbors.clear();
        self.sensors.insert(id, sensor);
        self.order.push(id);
        true
    }

    /// Appends every sensor, returning the ids in input order.
    pub fn append_all(&mut self, sensors: impl IntoIterator<Item = Sensor<S>>) -> Vec<SensorId> {
        sensors
            .into_iter()
            .map(|sensor| {
                let id = sensor.id();
                self.append(sensor);
                id
            })
            .collect()
    }

    pub fn contains(&self, id: SensorId) -> bool {
        self.sensors.contains_key(&id)
    }

    /// Number of sensors.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Number of ticks processed so far.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn sensor(&self, id: SensorId) -> Result<&Sensor<S>, GeoNetError> {
        self.sensors.get(&id).ok_or(GeoNetError::UnknownSensor(id))
    }

    pub fn sensor_mut(&mut self, id: SensorId) -> Result<&mut Sensor<S>, GeoNetError> {
        self.sensors.get_mut(&id).ok_or(GeoNetError::UnknownSensor(id))
    }

    pub fn state(&self, id: SensorId) -> Result<&S, GeoNetError> {
        self.sensor(id).map(|s| s.state())
    }

    pub fn state_mut(&mut self, id: SensorId) -> Result<&mut S, GeoNetError> {
        self.sensor_mut(id).map(|s| s.state_mut())
    }

    /// Sensor ids in insertion order.
    pub fn ids(&self) -> &[SensorId] {
        &self.order
    }

    /// Sensors in insertion order.
    pub fn list_sensors(&self) -> impl Iterator<Item = &Sensor<S>> + '_ {
        self.order.iter().filter_map(move |id| self.sensors.get(id))
    }

    /// Edges in canonical key order.
    pub fn list_edges(&self) -> impl Iterator<Item = &Edge> + '_ {
        self.edges.values()
    }

    pub fn edge(&self, a: SensorId, b: SensorId) -> Option<&Edge> {
        self.edges.get(&EdgeKey::new(a, b))
    }

    pub fn has_edge(&self, a: SensorId, b: SensorId) -> bool {
        self.edges.contains_key(&EdgeKey::new(a, b))
    }

    /// Neighbour ids of `id`, in id order.
    pub fn neighbors(&self, id: SensorId) -> Result<Vec<SensorId>, GeoNetError> {
        Ok(self.sensor(id)?.neighbors().collect())
    }

    /// Moves a sensor after checking the new position against `bounds`.
    /// Edge weights keep their creation-time values.
    pub fn set_position(&mut self, id: SensorId, position: Coordinate, bounds: Bounds) -> Result<(), GeoNetError> {
        position.validate()?;
        bounds.check(position)?;
        self.sensor_mut(id)?.set_position(position)
    }

    /// Links `a` and `b` with weight `metric(a, b)`.
    ///
    /// Returns true if a new edge was inserted. Existing edges and self-pairs
    /// are left as they are. Both ids must already be in the graph.
    pub fn connect<M>(&mut self, a: SensorId, b: SensorId, metric: M) -> Result<bool, GeoNetError>
    where
        M: Fn(&Coordinate, &Coordinate) -> f64,
    {
        let pa = self.sensor(a)?.position();
        let pb = self.sensor(b)?.position();
        if a == b {
            return Ok(false);
        }

        let key = EdgeKey::new(a, b);
        if self.edges.contains_key(&key) {
            return Ok(false);
        }

        let weight = metric(&pa, &pb);
        self.edges.insert(
            key,
            Edge {
                a: key.0,
                b: key.1,
                weight,
                transmitting: false,
            },
        );
        self.link(a, b);
        Ok(true)
    }

    /// Like [`connect`](Self::connect), but either end may be a sensor that
    /// is not in the graph yet. Such a sensor is appended first; one whose id
    /// is already present is dropped, as with [`append`](Self::append).
    pub fn connect_sensors<M>(
        &mut self,
        a: impl Into<Endpoint<S>>,
        b: impl Into<Endpoint<S>>,
        metric: M,
    ) -> Result<bool, GeoNetError>
    where
        M: Fn(&Coordinate, &Coordinate) -> f64,
    {
        let (a, b) = (a.into(), b.into());
        let (ida, idb) = (a.id(), b.id());
        for end in [&a, &b] {
            if let Endpoint::Id(id) = end {
                self.sensor(*id)?;
            }
        }

        for end in [a, b] {
            if let Endpoint::New(sensor) = end {
                self.append(sensor);
            }
        }
        self.connect(ida, idb, metric)
    }

    /// Removes the edge between `a` and `b`. Returns false, changing
    /// nothing, when there is no such edge.
    pub fn disconnect(&mut self, a: SensorId, b: SensorId) -> bool {
        if self.edges.remove(&EdgeKey::new(a, b)).is_none() {
            return false;
        }
        if let Some(sa) = self.sensors.get_mut(&a) {
            sa.neighbors.remove(&b);
        }
        if let Some(sb) = self.sensors.get_mut(&b) {
            sb.neighbors.remove(&a);
        }
        true
    }

    /// Removes every edge among `ids`. Returns how many were removed.
    pub fn disconnect_all(&mut self, ids: &[SensorId]) -> usize {
        let mut removed = 0;
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                if self.disconnect(*a, *b) {
                    removed += 1;
                }
            }
        }
        removed
    }

    /// Connects consecutive pairs of `ids` into a path.
    pub fn chain<M>(&mut self, ids: &[SensorId], metric: M) -> Result<usize, GeoNetError>
    where
        M: Fn(&Coordinate, &Coordinate) -> f64,
    {
        self.ensure_known(ids)?;
        let mut added = 0;
        for pair in ids.windows(2) {
            if self.connect(pair[0], pair[1], &metric)? {
                added += 1;
            }
        }
        debug!(sensors = ids.len(), added, "Built chain");
        Ok(added)
    }

    /// Connects `center` to every other sensor in `ids`.
    pub fn star<M>(&mut self, center: SensorId, ids: &[SensorId], metric: M) -> Result<usize, GeoNetError>
    where
        M: Fn(&Coordinate, &Coordinate) -> f64,
    {
        self.ensure_known(&[center])?;
        self.ensure_known(ids)?;
        let mut added = 0;
        for id in ids {
            if self.connect(center, *id, &metric)? {
                added += 1;
            }
        }
        debug!(center = %center, leaves = ids.len(), added, "Built star");
        Ok(added)
    }

    /// Connects every unordered pair in `ids`.
    pub fn mesh<M>(&mut self, ids: &[SensorId], metric: M) -> Result<usize, GeoNetError>
    where
        M: Fn(&Coordinate, &Coordinate) -> f64,
    {
        self.connect_if(ids, &|_: &SensorPoint, _: &SensorPoint, _: &[SensorPoint]| true, metric)
    }

    /// Connects every unordered pair in `ids` for which `rule` holds.
    ///
    /// The rule sees all of `ids` as its candidate set. Positions are read
    /// once up front, so the decision does not depend on evaluation order.
    pub fn connect_if<R, M>(&mut self, ids: &[SensorId], rule: &R, metric: M) -> Result<usize, GeoNetError>
    where
        R: ConnectionRule + ?Sized,
        M: Fn(&Coordinate, &Coordinate) -> f64,
    {
        let candidates = self.points(ids)?;

        let mut added = 0;
        for (i, a) in candidates.iter().enumerate() {
            for b in &candidates[i + 1..] {
                if rule.should_connect(a, b, &candidates) && self.connect(a.id, b.id, &metric)? {
                    added += 1;
                }
            }
        }
        debug!(candidates = candidates.len(), added, edges = self.edges.len(), "Connected by rule");
        Ok(added)
    }

    /// Positions of `ids`, as rule candidates.
    pub fn points(&self, ids: &[SensorId]) -> Result<Vec<SensorPoint>, GeoNetError> {
        ids.iter()
            .map(|id| -> Result<SensorPoint, GeoNetError> {
                Ok(SensorPoint::new(*id, self.sensor(*id)?.position()))
            })
            .collect()
    }

    /// Deposits `values` into `to`'s pending queue and marks the `from`-`to`
    /// edge as transmitting if there is one. Self-transmission is allowed.
    /// Empty batches change nothing.
    pub fn transmit(&mut self, from: SensorId, to: SensorId, values: &[f64]) -> Result<(), GeoNetError> {
        self.ensure_known(&[from, to])?;
        if values.is_empty() {
            return Ok(());
        }

        if let Some(target) = self.sensors.get_mut(&to) {
            target.deposit(values);
        }
        if let Some(edge) = self.edges.get_mut(&EdgeKey::new(from, to)) {
            edge.transmitting = true;
        }
        Ok(())
    }

    /// Transmits `values` from `from` to each of its neighbours. Returns the
    /// number of neighbours reached.
    pub fn broadcast(&mut self, from: SensorId, values: &[f64]) -> Result<usize, GeoNetError> {
        let targets = self.neighbors(from)?;
        if values.is_empty() {
            return Ok(0);
        }
        for to in &targets {
            self.transmit(from, *to, values)?;
        }
        Ok(targets.len())
    }

    /// Applies the deposits a callback produced. All targets are checked
    /// before any queue is written. Returns the number of deposits.
    pub fn deliver(&mut self, outbox: Outbox) -> Result<usize, GeoNetError> {
        let transmissions = outbox.into_transmissions();
        for t in &transmissions {
            self.ensure_known(&[t.from, t.to])?;
        }
        for t in &transmissions {
            self.transmit(t.from, t.to, &t.values)?;
        }
        Ok(transmissions.len())
    }

    /// Read-only views of `id`'s neighbours for a callback.
    pub fn neighbor_views(&self, id: SensorId) -> Result<Vec<NeighborView>, GeoNetError> {
        let sensor = self.sensor(id)?;
        Ok(sensor
            .neighbors()
            .filter_map(|n| self.sensors.get(&n))
            .map(|n| NeighborView {
                id: n.id(),
                position: n.position(),
                reading: n.reading(),
            })
            .collect())
    }

    /// Checks that edges and neighbour sets mirror each other exactly.
    pub fn is_consistent(&self) -> bool {
        let edges_ok = self.edges.iter().all(|(key, edge)| {
            key.0 != key.1
                && edge.a == key.0
                && edge.b == key.1
                && self.sensors.get(&edge.a).is_some_and(|s| s.neighbors.contains(&edge.b))
                && self.sensors.get(&edge.b).is_some_and(|s| s.neighbors.contains(&edge.a))
        });
        let degree_sum: usize = self.sensors.values().map(|s| s.degree()).sum();
        edges_ok && degree_sum == 2 * self.edges.len()
    }

    pub(crate) fn sensors_mut(&mut self) -> impl Iterator<Item = &mut Sensor<S>> + '_ {
        self.sensors.values_mut()
    }

    pub(crate) fn edges_mut(&mut self) -> impl Iterator<Item = &mut Edge> + '_ {
        self.edges.values_mut()
    }

    fn ensure_known(&self, ids: &[SensorId]) -> Result<(), GeoNetError> {
        match ids.iter().find(|id| !self.sensors.contains_key(id)) {
            Some(id) => Err(GeoNetError::UnknownSensor(*id)),
            None => Ok(()),
        }
    }

    fn link(&mut self, a: SensorId, b: SensorId) {
        if let Some(sa) = self.sensors.get_mut(&a) {
            sa.neighbors.insert(b);
        }
        if let Some(sb) = self.sensors.get_mut(&b) {
            sb.neighbors.insert(a);
        }
    }
}

impl<S> std::fmt::Debug for SensorGraph<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorGraph")
            .field("sensors", &self.order.len())
            .field("edges", &self.edges.len())
            .field("tick_count", &self.tick_count)
            .finish()
    }
}
