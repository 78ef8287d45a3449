//! # Darpan-Map: Submap Texture Cache and Occupancy Compositor
//!
//! A versioned cache of posed submap textures plus the machinery to keep it
//! fresh and turn it into output: a background fetch pool that re-requests
//! stale imagery from a map builder, an alpha-over compositor that paints
//! every cached tile into one world-frame canvas, an occupancy-raster
//! encoder for 2D consumers, and distance-based fade values for 3D
//! renderers.
//!
//! ## Quick Start
//!
//! ```rust
//! use darpan_map::cache::SubmapCache;
//! use darpan_map::compose::paint_slices;
//! use darpan_map::core::{Rigid3, SubmapId};
//! use darpan_map::grid;
//!
//! let cache = SubmapCache::new();
//!
//! // Metadata batches keep the cache current; fetched pixels arrive
//! // later through apply_texture.
//! cache.apply_metadata(SubmapId::new(0, 0), Rigid3::identity(), 1);
//!
//! // Painting works from a detached snapshot, never under the lock.
//! let snapshot = cache.snapshot();
//! let canvas = paint_slices(&snapshot, 0.05);
//! let raster = grid::encode(&canvas, 0.05, snapshot.stamp_us, &snapshot.frame_id);
//! println!("{}x{} cells", raster.width, raster.height);
//! ```
//!
//! ## Coordinate Frames
//!
//! - World: right-handed, x-forward, y-left, z-up; submap poses and slice
//!   poses are `Rigid3` transforms in this frame.
//! - Tile: pixel `(u, v)` has its center at `((u+0.5)·res, (v+0.5)·res)`
//!   in the slice frame; a pixel's world position is
//!   `pose ∘ slice_pose ∘ tile_point`.
//! - Canvas: pixel x grows with world x, pixel y grows against world y;
//!   the canvas origin records where world `(0, 0)` lands in pixel
//!   coordinates.
//! - Occupancy raster: row-major from the bottom-left cell, origin at the
//!   bottom-left cell's world position.
//!
//! ## Architecture
//!
//! - [`core`]: Foundation types (SubmapId, Vec3, Quat, Rigid3, Bounds)
//! - [`texture`]: Tile payloads and the gzip cell codec
//! - [`cache`]: The shared versioned cache, single lock, snapshot out
//! - [`fetch`]: TextureQuery seam and the fetch worker pool
//! - [`compose`]: Canvas and the alpha-over painter
//! - [`grid`]: Occupancy raster encoding
//! - [`view`]: Distance faders and 3D overlay values
//! - [`io`]: Listing messages, grid sink, simulated map builder
//! - [`threads`]: Ingest and publish threads of the daemon
//!
//! ## Data Flow
//!
//! ```text
//!  metadata batches          fetch workers
//!  (id, pose, version)       ┌──────────────┐
//!        │                   │ fetch_textures│
//!        ▼                   │ decode cells  │
//!  ┌──────────────┐  stale   └──────┬───────┘
//!  │  SubmapCache │──ids──▶ admit──┘│apply_texture
//!  │  (one lock)  │◀────────────────┘
//!  └──────┬───────┘
//!         │ snapshot()
//!         ▼
//!  ┌──────────────┐     ┌────────────────┐    ┌─────────────┐
//!  │ paint_slices │────▶│ grid::encode   │───▶│  GridSink   │
//!  │ (alpha-over) │     │ (bottom-up i8) │    │ (2D output) │
//!  └──────┬───────┘     └────────────────┘    └─────────────┘
//!         │
//!         ▼
//!  ┌──────────────┐
//!  │  OverlaySet  │───▶ per-tile (pose, alpha, texture) (3D output)
//!  └──────────────┘
//! ```

pub mod cache;
pub mod compose;
pub mod core;
pub mod fetch;
pub mod grid;
pub mod io;
pub mod texture;
pub mod threads;
pub mod view;

// Most common types at the crate root.
pub use crate::cache::{FetchGate, SubmapCache, SubmapSnapshot, TextureOutcome};
pub use crate::compose::{paint_slices, Canvas};
pub use crate::core::{Rigid3, SubmapId};
pub use crate::fetch::{
    FetchError, FetchHandle, FetchOutcome, FetchScheduler, FetchSchedulerConfig, TextureQuery,
};
pub use crate::grid::OccupancyGrid;
pub use crate::texture::{SubmapTexture, TextureResponse};
pub use crate::view::{DistanceFader, OverlaySet, SubmapOverlay};
