//! GeoNet Environment Abstraction Layer
//!
//! This crate provides the vocabulary shared by the network core and the
//! simulation host: points on the field, colours, sensor identities, and the
//! environment field sensors sample every tick.
//!
//! # Core Concept: The Field Contract
//!
//! The core never looks inside the field. It only calls:
//! - `get_color(coordinate)` during the sense phase of a tick
//! - `bounds()` to validate positions a callback tries to set
//!
//! Scenarios paint the field through `set_color`, `set_color_rect` and
//! `clear`, all of which are bounds-checked and fail before writing.
//!
//! # Example
//!
//! ```
//! use geonet_env::{Color, Coordinate, EnvironmentField, PatchesGrid};
//!
//! let mut grid = PatchesGrid::new(55);
//! grid.set_color_rect(Coordinate::new(12.0, 25.0), 35, 15, Color::NAVY).unwrap();
//!
//! assert_eq!(grid.get_color(Coordinate::new(20.0, 30.0)).unwrap(), Color::NAVY);
//! assert!(grid.get_color(Coordinate::new(55.0, 0.0)).is_err());
//! ```

mod color;
mod error;
mod field;
mod patches;
mod types;

pub use color::Color;
pub use error::GeoNetError;
pub use field::EnvironmentField;
pub use patches::PatchesGrid;
pub use types::{Bounds, Coordinate, SensorId};
