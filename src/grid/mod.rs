//! Occupancy raster output.
//!
//! Converts a painted canvas into the published grid format: one `i8` per
//! cell, `-1` for never-observed cells and `0..=100` occupancy likelihood
//! otherwise (dark pixels = high occupancy). The raster is row-major
//! starting at the bottom-left cell, so canvas rows are emitted last row
//! first.

use crate::compose::Canvas;

/// Published occupancy raster.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OccupancyGrid {
    /// Stamp of the metadata batch this grid was painted from.
    pub stamp_us: u64,
    pub frame_id: String,
    /// Meters per cell.
    pub resolution: f64,
    pub width: u32,
    pub height: u32,
    /// World x of the bottom-left cell.
    pub origin_x: f64,
    /// World y of the bottom-left cell. Rotation is always zero.
    pub origin_y: f64,
    /// Row-major from the bottom-left cell, `-1` or `0..=100`.
    pub data: Vec<i8>,
}

impl OccupancyGrid {
    /// Fraction of cells with a known occupancy value.
    pub fn known_ratio(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        let known = self.data.iter().filter(|&&value| value >= 0).count();
        known as f64 / self.data.len() as f64
    }
}

/// Encode a painted canvas into an occupancy raster.
///
/// A zero-size canvas yields an empty raster.
pub fn encode(canvas: &Canvas, resolution: f64, stamp_us: u64, frame_id: &str) -> OccupancyGrid {
    let width = canvas.width();
    let height = canvas.height();

    let mut data = Vec::with_capacity(width as usize * height as usize);
    for y in (0..height).rev() {
        for x in 0..width {
            let value = if canvas.observed(x, y) == 0 {
                -1
            } else {
                occupancy_value(canvas.intensity(x, y))
            };
            data.push(value);
        }
    }

    OccupancyGrid {
        stamp_us,
        frame_id: frame_id.to_string(),
        resolution,
        width,
        height,
        origin_x: -canvas.origin_x() * resolution,
        origin_y: (-(height as f64) + canvas.origin_y()) * resolution,
        data,
    }
}

/// Reflectivity byte to occupancy likelihood: dark cells are occupied.
#[inline]
fn occupancy_value(intensity: u8) -> i8 {
    ((1.0 - intensity as f64 / 255.0) * 100.0).round() as i8
}
