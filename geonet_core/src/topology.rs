//! Structural queries over the sensor graph.

use crate::graph::SensorGraph;
use crate::mst::DisjointSet;
use geonet_env::{GeoNetError, SensorId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// Summary statistics of a graph's shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TopologyStats {
    pub sensors: usize,
    pub edges: usize,
    pub components: usize,
    pub largest_component: usize,
    pub isolated: usize,
    pub min_degree: usize,
    pub max_degree: usize,
    pub mean_degree: f64,
}

impl<S> SensorGraph<S> {
    /// Connected components. Each component lists its ids in insertion
    /// order, and components are ordered by their first member.
    pub fn connected_components(&self) -> Vec<Vec<SensorId>> {
        let index: HashMap<SensorId, usize> = self.ids().iter().enumerate().map(|(i, id)| (*id, i)).collect();

        let mut sets = DisjointSet::new(index.len());
        for edge in self.list_edges() {
            if let (Some(a), Some(b)) = (index.get(&edge.a), index.get(&edge.b)) {
                sets.union(*a, *b);
            }
        }

        let mut slot_of_root: HashMap<usize, usize> = HashMap::new();
        let mut components: Vec<Vec<SensorId>> = Vec::new();
        for (i, id) in self.ids().iter().enumerate() {
            let root = sets.find(i);
            let slot = *slot_of_root.entry(root).or_insert_with(|| {
                components.push(Vec::new());
                components.len() - 1
            });
            components[slot].push(*id);
        }
        components
    }

    /// Returns true if every sensor can reach every other (vacuously true
    /// for an empty graph).
    pub fn is_connected(&self) -> bool {
        self.connected_components().len() <= 1
    }

    pub fn degree(&self, id: SensorId) -> Result<usize, GeoNetError> {
        Ok(self.sensor(id)?.degree())
    }

    /// Hop counts from `origin` to every sensor it can reach (breadth-first).
    pub fn hop_distances(&self, origin: SensorId) -> Result<HashMap<SensorId, usize>, GeoNetError> {
        self.sensor(origin)?;

        let mut hops = HashMap::from([(origin, 0usize)]);
        let mut queue = VecDeque::from([origin]);
        while let Some(current) = queue.pop_front() {
            let next_hop = hops[&current] + 1;
            for n in self.sensor(current)?.neighbors() {
                if !hops.contains_key(&n) {
                    hops.insert(n, next_hop);
                    queue.push_back(n);
                }
            }
        }
        Ok(hops)
    }

    pub fn stats(&self) -> TopologyStats {
        let degrees: Vec<usize> = self.list_sensors().map(|s| s.degree()).collect();
        let components = self.connected_components();

        TopologyStats {
            sensors: self.len(),
            edges: self.edge_count(),
            components: components.len(),
            largest_component: components.iter().map(Vec::len).max().unwrap_or(0),
            isolated: degrees.iter().filter(|d| **d == 0).count(),
            min_degree: degrees.iter().copied().min().unwrap_or(0),
            max_degree: degrees.iter().copied().max().unwrap_or(0),
            mean_degree: if degrees.is_empty() {
                0.0
            } else {
                degrees.iter().sum::<usize>() as f64 / degrees.len() as f64
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::euclidean;
    use crate::sensor::Sensor;
    use geonet_env::Coordinate;

    fn line(n: usize) -> (SensorGraph<()>, Vec<SensorId>) {
        let mut graph = SensorGraph::new();
        let ids = graph.append_all(
            (0..n).map(|i| Sensor::with_id(SensorId::from_seed(i as u64), Coordinate::new(i as f64, 0.0), ()).unwrap()),
        );
        (graph, ids)
    }

    #[test]
    fn test_components_follow_insertion_order() {
        let (mut graph, ids) = line(5);
        graph.connect(ids[3], ids[4], euclidean).unwrap();
        graph.connect(ids[0], ids[2], euclidean).unwrap();

        assert_eq!(
            graph.connected_components(),
            vec![vec![ids[0], ids[2]], vec![ids[1]], vec![ids[3], ids[4]]]
        );
        assert!(!graph.is_connected());
    }

    #[test]
    fn test_hop_distances_on_chain() {
        let (mut graph, ids) = line(4);
        graph.chain(&ids[..3], euclidean).unwrap();

        let hops = graph.hop_distances(ids[0]).unwrap();
        assert_eq!(hops[&ids[0]], 0);
        assert_eq!(hops[&ids[2]], 2);
        assert!(!hops.contains_key(&ids[3]));

        assert!(graph.hop_distances(SensorId::from_seed(50)).is_err());
    }

    #[test]
    fn test_stats() {
        let (mut graph, ids) = line(5);
        graph.star(ids[0], &ids[1..4], euclidean).unwrap();

        let stats = graph.stats();
        assert_eq!(stats.sensors, 5);
        assert_eq!(stats.edges, 3);
        assert_eq!(stats.components, 2);
        assert_eq!(stats.largest_component, 4);
        assert_eq!(stats.isolated, 1);
        assert_eq!(stats.min_degree, 0);
        assert_eq!(stats.max_degree, 3);
        assert!((stats.mean_degree - 1.2).abs() < 1e-12);
        assert_eq!(graph.degree(ids[0]).unwrap(), 3);
    }

    #[test]
    fn test_empty_graph_stats() {
        let graph: SensorGraph<()> = SensorGraph::new();
        assert_eq!(graph.stats(), TopologyStats::default());
        assert!(graph.is_connected());
    }
}
