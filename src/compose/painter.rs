//! Snapshot painter.
//!
//! Coordinate conventions:
//! - a tile pixel (u, v) has its center at ((u + 0.5)·r, (v + 0.5)·r) in
//!   the slice frame, r being the tile's own resolution;
//! - the slice frame reaches the world through `pose ∘ slice_pose`,
//!   projected onto the horizontal plane (translation x/y plus yaw);
//! - canvas +x is world +x and canvas +y is world −y, with the canvas
//!   origin holding the pixel coordinates of world (0, 0). The occupancy
//!   encoder flips rows back to the bottom-up raster convention.
//!
//! Tiles are sampled nearest-neighbor by inverse-mapping each covered
//! canvas pixel center into the slice frame, so rotated tiles leave no
//! seams.

use crate::cache::SubmapSnapshot;
use crate::core::{Bounds, Rigid3};
use crate::texture::SubmapTexture;

use super::canvas::Canvas;

/// Planar restriction of a rigid transform.
#[derive(Clone, Copy, Debug)]
struct PlanarPose {
    cos: f64,
    sin: f64,
    tx: f64,
    ty: f64,
}

impl PlanarPose {
    fn from_rigid(transform: Rigid3) -> Self {
        let (sin, cos) = transform.rotation.yaw().sin_cos();
        Self {
            cos,
            sin,
            tx: transform.translation.x,
            ty: transform.translation.y,
        }
    }

    /// Slice frame to world.
    #[inline]
    fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.cos * x - self.sin * y + self.tx,
            self.sin * x + self.cos * y + self.ty,
        )
    }

    /// World back into the slice frame.
    #[inline]
    fn unapply(&self, x: f64, y: f64) -> (f64, f64) {
        let dx = x - self.tx;
        let dy = y - self.ty;
        (
            self.cos * dx + self.sin * dy,
            -self.sin * dx + self.cos * dy,
        )
    }
}

/// Paint every textured tile of `snapshot` into one canvas at the given
/// output resolution (meters per canvas pixel).
///
/// Entries without pixels are skipped; they render as absent. When nothing
/// is paintable the returned canvas is zero-size.
pub fn paint_slices(snapshot: &SubmapSnapshot, resolution: f64) -> Canvas {
    let mut bounds = Bounds::empty();
    let mut tiles: Vec<(&SubmapTexture, PlanarPose)> = Vec::new();

    for entry in &snapshot.entries {
        let Some(texture) = entry.texture.as_deref() else {
            continue;
        };
        let planar = PlanarPose::from_rigid(entry.pose * texture.slice_pose);
        let extent_x = texture.width as f64 * texture.resolution;
        let extent_y = texture.height as f64 * texture.resolution;
        for (cx, cy) in [
            (0.0, 0.0),
            (extent_x, 0.0),
            (0.0, extent_y),
            (extent_x, extent_y),
        ] {
            let (x, y) = planar.apply(cx, cy);
            bounds.expand_to_include(x, y);
        }
        tiles.push((texture, planar));
    }

    if bounds.is_empty() {
        return Canvas::empty();
    }

    // Rotated corners carry one-ulp noise; without the epsilon that noise
    // rounds the canvas up by a whole row or column.
    const SIZE_EPSILON: f64 = 1e-6;
    let width = (bounds.width() / resolution - SIZE_EPSILON).ceil().max(1.0) as u32;
    let height = (bounds.height() / resolution - SIZE_EPSILON).ceil().max(1.0) as u32;
    let origin_x = -bounds.min_x / resolution;
    let origin_y = bounds.max_y / resolution;
    let mut canvas = Canvas::new(width, height, origin_x, origin_y);

    // Snapshot entries are ordered by ascending submap id, so later
    // submaps paint over earlier ones where they overlap.
    for (texture, planar) in tiles {
        paint_tile(&mut canvas, texture, planar, resolution);
    }
    canvas
}

fn paint_tile(canvas: &mut Canvas, texture: &SubmapTexture, planar: PlanarPose, resolution: f64) {
    let extent_x = texture.width as f64 * texture.resolution;
    let extent_y = texture.height as f64 * texture.resolution;

    // Canvas-space bounding box of this tile, clamped to the canvas.
    let mut covered = Bounds::empty();
    for (cx, cy) in [
        (0.0, 0.0),
        (extent_x, 0.0),
        (0.0, extent_y),
        (extent_x, extent_y),
    ] {
        let (x, y) = planar.apply(cx, cy);
        covered.expand_to_include(
            canvas.origin_x() + x / resolution,
            canvas.origin_y() - y / resolution,
        );
    }
    let x_begin = covered.min_x.floor().max(0.0) as u32;
    let y_begin = covered.min_y.floor().max(0.0) as u32;
    let x_end = (covered.max_x.ceil().max(0.0) as u32).min(canvas.width());
    let y_end = (covered.max_y.ceil().max(0.0) as u32).min(canvas.height());

    let tile_width = texture.width as usize;
    let inv_tile_resolution = texture.resolution.recip();

    for py in y_begin..y_end {
        for px in x_begin..x_end {
            // Canvas pixel center back into the slice frame.
            let world_x = (px as f64 + 0.5 - canvas.origin_x()) * resolution;
            let world_y = (canvas.origin_y() - (py as f64 + 0.5)) * resolution;
            let (slice_x, slice_y) = planar.unapply(world_x, world_y);

            let u = (slice_x * inv_tile_resolution).floor();
            let v = (slice_y * inv_tile_resolution).floor();
            if u < 0.0 || v < 0.0 || u >= texture.width as f64 || v >= texture.height as f64 {
                continue;
            }
            let index = v as usize * tile_width + u as usize;
            canvas.blend_pixel(px, py, texture.intensity[index], texture.alpha[index]);
        }
    }
}
