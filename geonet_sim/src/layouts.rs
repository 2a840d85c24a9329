//! Rain layouts: fixed unions of NAVY rectangles painted onto the field.

use geonet_env::{Color, Coordinate, EnvironmentField, GeoNetError};
use rand::Rng;

/// Colour of a rained-on cell.
pub const RAIN: Color = Color::NAVY;

/// A rectangle as `(x, y, width, height)` in cells.
pub type Rect = (u32, u32, u32, u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RainLayout {
    /// Three overlapping blocks in the middle of the field
    Cloudbank,

    /// Two overlapping blocks towards the top left
    Overlap,

    /// A thin band feeding a tall block on the right
    Scattered,

    /// Criss-crossing strips around a central square
    Cross,

    /// Two disjoint vertical bands
    TwinBands,
}

impl RainLayout {
    pub fn all() -> [RainLayout; 5] {
        [
            RainLayout::Cloudbank,
            RainLayout::Overlap,
            RainLayout::Scattered,
            RainLayout::Cross,
            RainLayout::TwinBands,
        ]
    }

    /// Picks a layout uniformly at random.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let all = Self::all();
        all[rng.gen_range(0..all.len())]
    }

    pub fn name(&self) -> &'static str {
        match self {
            RainLayout::Cloudbank => "cloudbank",
            RainLayout::Overlap => "overlap",
            RainLayout::Scattered => "scattered",
            RainLayout::Cross => "cross",
            RainLayout::TwinBands => "twin_bands",
        }
    }

    pub fn rects(&self) -> &'static [Rect] {
        match self {
            RainLayout::Cloudbank => &[(12, 25, 35, 15), (15, 22, 25, 20), (20, 10, 25, 20)],
            RainLayout::Overlap => &[(3, 4, 30, 20), (23, 10, 20, 25)],
            RainLayout::Scattered => &[(10, 30, 20, 3), (15, 27, 20, 7), (30, 20, 20, 30), (12, 15, 10, 20)],
            RainLayout::Cross => &[
                (2, 20, 20, 3),
                (12, 17, 20, 3),
                (16, 17, 10, 20),
                (20, 20, 20, 20),
                (22, 15, 18, 30),
            ],
            RainLayout::TwinBands => &[(2, 2, 20, 30), (30, 10, 15, 35)],
        }
    }

    /// Paints the layout over whatever is on the field.
    ///
    /// Every rectangle is bounds-checked before it is written, so a field
    /// too small for the layout fails on the first rectangle that overflows.
    pub fn paint<F: EnvironmentField + ?Sized>(&self, field: &mut F) -> Result<(), GeoNetError> {
        for &(x, y, width, height) in self.rects() {
            field.set_color_rect(Coordinate::new(x as f64, y as f64), width, height, RAIN)?;
        }
        Ok(())
    }
}

impl std::fmt::Display for RainLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
