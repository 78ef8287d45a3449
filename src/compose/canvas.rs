//! Paint target for submap compositing.
//!
//! Each cell packs three channels into one word:
//!
//! ```text
//! bit 31..24   alpha      accumulated coverage
//! bit 23..16   intensity  blended reflectivity
//! bit 15..8    observed   0 only while no tile ever wrote the cell
//! bit  7..0    unused
//! ```
//!
//! Blending is straightforward alpha-over in byte arithmetic; a source
//! pixel with alpha 0 contributes nothing, so untouched and fully
//! transparent regions stay "unobserved" for the occupancy encoder.

/// Ephemeral packed-pixel paint target.
#[derive(Clone, Debug, PartialEq)]
pub struct Canvas {
    width: u32,
    height: u32,
    /// Canvas pixel x of world x = 0.
    origin_x: f64,
    /// Canvas pixel y of world y = 0 (canvas rows grow toward -y).
    origin_y: f64,
    pixels: Vec<u32>,
}

impl Canvas {
    pub fn new(width: u32, height: u32, origin_x: f64, origin_y: f64) -> Self {
        Self {
            width,
            height,
            origin_x,
            origin_y,
            pixels: vec![0; width as usize * height as usize],
        }
    }

    /// Zero-size canvas: the "nothing to paint" value.
    pub fn empty() -> Self {
        Self::new(0, 0, 0.0, 0.0)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn origin_x(&self) -> f64 {
        self.origin_x
    }

    #[inline]
    pub fn origin_y(&self) -> f64 {
        self.origin_y
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Alpha-over blend one source pixel into the canvas.
    pub fn blend_pixel(&mut self, x: u32, y: u32, intensity: u8, alpha: u8) {
        if alpha == 0 {
            return;
        }
        let index = self.index(x, y);
        let dst = self.pixels[index];

        let sa = alpha as u32;
        let inv = 255 - sa;
        let dst_alpha = (dst >> 24) & 0xff;
        let dst_intensity = (dst >> 16) & 0xff;
        let dst_observed = (dst >> 8) & 0xff;

        let out_alpha = sa + (dst_alpha * inv + 127) / 255;
        let out_intensity = (intensity as u32 * sa + dst_intensity * inv + 127) / 255;
        let out_observed = (255 * sa + dst_observed * inv + 127) / 255;

        self.pixels[index] = (out_alpha << 24) | (out_intensity << 16) | (out_observed << 8);
    }

    #[inline]
    pub fn alpha(&self, x: u32, y: u32) -> u8 {
        (self.pixels[self.index(x, y)] >> 24) as u8
    }

    #[inline]
    pub fn intensity(&self, x: u32, y: u32) -> u8 {
        (self.pixels[self.index(x, y)] >> 16) as u8
    }

    /// 0 only if no tile ever covered this cell.
    #[inline]
    pub fn observed(&self, x: u32, y: u32) -> u8 {
        (self.pixels[self.index(x, y)] >> 8) as u8
    }
}
