//! Grid implementation of EnvironmentField.

use crate::color::Color;
use crate::error::GeoNetError;
use crate::field::EnvironmentField;
use crate::types::{Bounds, Coordinate};

/// A square grid of coloured patches.
///
/// Coordinates map to cells by flooring, so `(3.7, 2.2)` reads cell `(3, 2)`.
/// The grid starts filled with `Color::BLACK`.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchesGrid {
    /// Cells per side
    size: u32,

    /// Row-major cell colours
    cells: Vec<Color>,
}

impl PatchesGrid {
    /// Creates a `size x size` grid filled with black.
    pub fn new(size: u32) -> Self {
        Self {
            size,
            cells: vec![Color::BLACK; size as usize * size as usize],
        }
    }

    /// Returns the number of cells per side.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Resets every cell to black.
    pub fn clear_color(&mut self) {
        self.clear(Color::BLACK);
    }

    /// Counts the cells currently painted with `color`.
    pub fn count(&self, color: Color) -> usize {
        self.cells.iter().filter(|c| **c == color).count()
    }

    fn index(&self, at: Coordinate) -> Result<usize, GeoNetError> {
        let (col, row) = self.bounds().cell(at)?;
        Ok(row as usize * self.size as usize + col as usize)
    }
}

impl EnvironmentField for PatchesGrid {
    fn bounds(&self) -> Bounds {
        Bounds::square(self.size)
    }

    fn get_color(&self, at: Coordinate) -> Result<Color, GeoNetError> {
        let idx = self.index(at)?;
        Ok(self.cells[idx])
    }

    fn set_color(&mut self, at: Coordinate, color: Color) -> Result<(), GeoNetError> {
        let idx = self.index(at)?;
        self.cells[idx] = color;
        Ok(())
    }

    fn set_color_rect(
        &mut self,
        origin: Coordinate,
        width: u32,
        height: u32,
        color: Color,
    ) -> Result<(), GeoNetError> {
        if width == 0 || height == 0 {
            return Err(GeoNetError::invalid(format!(
                "rectangle must have positive size, got {}x{}",
                width, height
            )));
        }

        // Both corners in bounds implies every cell in between is
        let (col, row) = self.bounds().cell(origin)?;
        let far = Coordinate::new(
            col as f64 + (width - 1) as f64,
            row as f64 + (height - 1) as f64,
        );
        self.bounds().check(far)?;

        for r in row..row + height {
            let start = r as usize * self.size as usize + col as usize;
            self.cells[start..start + width as usize].fill(color);
        }
        Ok(())
    }

    fn clear(&mut self, color: Color) {
        self.cells.fill(color);
    }
}
