//! Tile compositing.
//!
//! [`paint_slices`] projects every textured submap of a snapshot into a
//! shared painting frame, sizes a [`Canvas`] around their union bounding
//! box, and alpha-blends the tiles in ascending submap-id order.

mod canvas;
mod painter;

pub use canvas::Canvas;
pub use painter::paint_slices;
