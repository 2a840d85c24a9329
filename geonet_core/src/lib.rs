//! GeoNet Core - Sensor Network Topology and Tick-Based Propagation
//!
//! This library owns the two parts of a GeoNet simulation that carry real
//! algorithmic weight:
//! 1. **Topology construction**: a simple undirected graph of sensors built
//!    from chains, stars, meshes or geometric rules (unit-disk, MST
//!    auto-tuned unit-disk, Gabriel)
//! 2. **Message propagation**: a phase-ordered tick in which every message
//!    takes exactly one tick per hop
//!
//! # Example
//!
//! ```
//! use geonet_core::{euclidean, Gabriel, Sensor, SensorGraph};
//! use geonet_env::{Coordinate, PatchesGrid};
//!
//! let mut graph = SensorGraph::new();
//! let ids = graph.append_all(
//!     [(0.0, 0.0), (4.0, 0.0), (2.0, 3.0)]
//!         .into_iter()
//!         .map(|(x, y)| Sensor::new(Coordinate::new(x, y), ()).unwrap()),
//! );
//! graph.connect_if(&ids, &Gabriel, euclidean).unwrap();
//! assert!(graph.is_connected());
//!
//! let mut field = PatchesGrid::new(10);
//! let (ticks, report) = graph.tick(&mut field, 0u32, |_, _, n| Ok(n + 1)).unwrap();
//! assert_eq!((ticks, report.tick), (1, 1));
//! ```

pub mod connectivity;
pub mod graph;
pub mod mst;
pub mod sensor;
pub mod snapshot;
pub mod tick;
pub mod topology;

// Re-export key types for convenience
pub use connectivity::{ConnectionRule, Gabriel, SensorPoint, UnitDisk};
pub use graph::{euclidean, Edge, Endpoint, SensorGraph};
pub use sensor::{Callbacks, NeighborView, Sensor, SensorContext};
pub use snapshot::{EdgeFrame, NetworkSnapshot, SensorFrame};
pub use tick::TickReport;
pub use topology::TopologyStats;
