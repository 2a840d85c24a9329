//! GeoNet Simulation Host
//!
//! Drives a [`geonet_core::SensorGraph`] over a [`geonet_env::PatchesGrid`]
//! and checks the result against ground truth.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────┐
//! │                    SimWorld                        │
//! │  ┌──────────────┐   sense    ┌──────────────────┐  │
//! │  │ PatchesGrid  │◄───────────│   SensorGraph    │  │
//! │  │   (field)    │            │ (tick, messages) │  │
//! │  └──────▲───────┘            └────────▲─────────┘  │
//! │         │ repaint                     │ transmit   │
//! │  ┌──────┴─────────────────────────────┴─────────┐  │
//! │  │        Scenario hook (flood / boundary)      │  │
//! │  └──────────────────────────────────────────────┘  │
//! └────────────────────────────────────────────────────┘
//! ```
//!
//! All randomness (placement and layout choice) derives from one seed, so
//! the same [`SimConfig`] always yields the same run.
//!
//! # Usage
//!
//! ```
//! use geonet_sim::{ScenarioId, ScenarioRunner, SimConfig};
//!
//! let config = SimConfig {
//!     update_interval_ms: 0,
//!     ..Default::default()
//! };
//! let result = ScenarioRunner::new(config).run(ScenarioId::FloodChain);
//! assert!(result.passed);
//! ```

pub mod boundary;
mod error;
pub mod exporter;
pub mod flood;
pub mod layouts;
pub mod placement;
mod runner;
pub mod scenarios;
mod world;

pub use boundary::{RainLabel, RainMode, RainState};
pub use error::SimError;
pub use exporter::{SimEvent, SimExport, SimFrame};
pub use flood::{FloodState, FloodTopology};
pub use layouts::{RainLayout, RAIN};
pub use placement::{create_sensors, random_cells};
pub use runner::{ScenarioMetrics, ScenarioResult, ScenarioRunner};
pub use scenarios::ScenarioId;
pub use world::{CancelFlag, RunOutcome, SimConfig, SimWorld};
