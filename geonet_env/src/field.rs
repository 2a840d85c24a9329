//! Environment field trait sampled by sensors.

use crate::color::Color;
use crate::error::GeoNetError;
use crate::types::{Bounds, Coordinate};

/// The central interface for the environment sensors observe.
///
/// This trait abstracts the "world" so that the network core can sample
/// colours without knowing how they are stored or drawn.
///
/// # Implementations
///
/// - **Grid**: `PatchesGrid` - a square grid of coloured cells
///
/// # Failure semantics
///
/// Every coordinate-taking method is bounds-checked and fails with
/// `GeoNetError::Placement` before mutating anything.
pub trait EnvironmentField {
    /// Returns the extent of the field.
    fn bounds(&self) -> Bounds;

    /// Returns the colour at a coordinate.
    fn get_color(&self, at: Coordinate) -> Result<Color, GeoNetError>;

    /// Sets the colour of the cell containing `at`.
    fn set_color(&mut self, at: Coordinate, color: Color) -> Result<(), GeoNetError>;

    /// Fills the `width x height` rectangle whose top-left cell contains `origin`.
    ///
    /// Every cell is validated before any cell is written.
    fn set_color_rect(
        &mut self,
        origin: Coordinate,
        width: u32,
        height: u32,
        color: Color,
    ) -> Result<(), GeoNetError>;

    /// Fills the entire field with a single colour.
    fn clear(&mut self, color: Color);
}
