//! RGB colours and the fixed GeoNet palette.

use crate::error::GeoNetError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// An RGB colour.
///
/// Components are `u8`, so every constructed colour is in range. Conversions
/// from wider integers or hex strings validate and fail with `InvalidValue`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(20, 20, 30);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const GRAY: Color = Color::rgb(128, 128, 128);
    pub const CONNECTION_GRAY: Color = Color::rgb(90, 90, 90);
    pub const LIGHT_GRAY: Color = Color::rgb(64, 64, 64);

    pub const GREEN: Color = Color::rgb(0, 255, 0);
    pub const RED: Color = Color::rgb(255, 100, 100);
    pub const BLUE: Color = Color::rgb(100, 100, 255);
    pub const CYAN: Color = Color::rgb(0, 255, 255);

    pub const CREAM: Color = Color::rgb(245, 245, 220);
    pub const SAGE: Color = Color::rgb(188, 184, 138);
    pub const LAVENDER: Color = Color::rgb(230, 230, 250);
    pub const SAND: Color = Color::rgb(194, 178, 128);
    pub const MINT: Color = Color::rgb(152, 255, 152);
    pub const DUSTY_ROSE: Color = Color::rgb(220, 180, 180);
    pub const NAVY: Color = Color::rgb(0, 0, 128);
    pub const FOREST: Color = Color::rgb(34, 139, 34);

    /// Creates a colour from in-range components.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Creates a colour from arbitrary integers, rejecting components outside 0-255.
    pub fn try_rgb(r: i64, g: i64, b: i64) -> Result<Self, GeoNetError> {
        let channel = |name: &str, v: i64| {
            u8::try_from(v).map_err(|_| {
                GeoNetError::invalid(format!("{} component must be within 0..=255, got {}", name, v))
            })
        };
        Ok(Self::rgb(channel("r", r)?, channel("g", g)?, channel("b", b)?))
    }

    /// Returns the colour as an `(r, g, b)` tuple.
    pub fn to_tuple(self) -> (u8, u8, u8) {
        (self.r, self.g, self.b)
    }

    /// Formats as `#rrggbb`.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::CYAN
    }
}

impl TryFrom<(i64, i64, i64)> for Color {
    type Error = GeoNetError;

    fn try_from((r, g, b): (i64, i64, i64)) -> Result<Self, Self::Error> {
        Color::try_rgb(r, g, b)
    }
}

impl FromStr for Color {
    type Err = GeoNetError;

    /// Parses `#rrggbb` or `rrggbb`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(GeoNetError::invalid(format!("malformed hex colour: {:?}", s)));
        }

        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16)
                .map_err(|_| GeoNetError::invalid(format!("malformed hex colour: {:?}", s)))
        };
        Ok(Self::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
