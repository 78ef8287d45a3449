//! Submap texture data model.
//!
//! A texture is the rasterized image of one submap: an intensity channel
//! (how strongly cells reflect) and an alpha channel (how well observed
//! they are). On the wire both channels travel gzip-compressed and
//! interleaved per pixel in row-major order:
//!
//! ```text
//! decompressed cells, 2·width·height bytes:
//! ┌───────────┬───────┬───────────┬───────┬────
//! │ intensity │ alpha │ intensity │ alpha │ ...
//! │  pixel 0  │ px 0  │  pixel 1  │ px 1  │
//! └───────────┴───────┴───────────┴───────┴────
//! ```
//!
//! [`codec`] validates and splits that stream; [`SubmapTexture`] is the
//! decoded, cache-resident form.

pub mod codec;

use crate::core::Rigid3;

pub use codec::{CodecError, TileCells};

/// One texture of a fetch response, still compressed.
#[derive(Clone, Debug)]
pub struct EncodedTexture {
    pub width: u32,
    pub height: u32,
    /// Meters per pixel.
    pub resolution: f64,
    /// Offset of the pixel frame from the submap frame.
    pub slice_pose: Rigid3,
    /// Gzip-compressed interleaved intensity/alpha bytes.
    pub cells: Vec<u8>,
}

/// Response of the texture query RPC.
///
/// `textures` may hold several resolutions; by convention the first entry
/// is the highest-resolution one and the only one consumed here.
#[derive(Clone, Debug)]
pub struct TextureResponse {
    pub submap_version: i32,
    pub textures: Vec<EncodedTexture>,
}

/// Decoded submap texture as held by the cache.
#[derive(Clone, Debug)]
pub struct SubmapTexture {
    /// Row-major reflectivity bytes, `width * height` long.
    pub intensity: Vec<u8>,
    /// Row-major observation alpha bytes, `width * height` long.
    pub alpha: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub resolution: f64,
    pub slice_pose: Rigid3,
}

impl SubmapTexture {
    /// Decompress and split one wire texture.
    pub fn decode(encoded: &EncodedTexture) -> Result<Self, CodecError> {
        let cells = codec::decode_cells(&encoded.cells, encoded.width, encoded.height)?;
        Ok(Self {
            intensity: cells.intensity,
            alpha: cells.alpha,
            width: encoded.width,
            height: encoded.height,
            resolution: encoded.resolution,
            slice_pose: encoded.slice_pose,
        })
    }

    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}
