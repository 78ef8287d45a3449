//! Axis-aligned bounding box over world-frame x/y coordinates.
//!
//! The compositor projects every tile's corners into the painting frame and
//! grows one of these boxes around them to size the output canvas.

/// Axis-aligned bounding box in meters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    /// Create an empty (invalid) bounding box.
    ///
    /// The empty bounds has min > max, so it will expand to fit any point.
    #[inline]
    pub fn empty() -> Self {
        Self {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }

    /// Check if the bounds are empty (no point ever included).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    /// Expand bounds to include a point.
    #[inline]
    pub fn expand_to_include(&mut self, x: f64, y: f64) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    /// Width of the bounding box (x extent).
    #[inline]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the bounding box (y extent).
    #[inline]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        let bounds = Bounds::empty();
        assert!(bounds.is_empty());
    }

    #[test]
    fn test_expand_to_include() {
        let mut bounds = Bounds::empty();

        bounds.expand_to_include(5.0, 5.0);
        assert!(!bounds.is_empty());
        assert_eq!(bounds.min_x, 5.0);
        assert_eq!(bounds.max_x, 5.0);

        bounds.expand_to_include(0.0, 10.0);
        assert_eq!(bounds.min_x, 0.0);
        assert_eq!(bounds.min_y, 5.0);
        assert_eq!(bounds.max_x, 5.0);
        assert_eq!(bounds.max_y, 10.0);
    }

    #[test]
    fn test_dimensions() {
        let mut bounds = Bounds::empty();
        bounds.expand_to_include(1.0, 2.0);
        bounds.expand_to_include(5.0, 8.0);

        assert_eq!(bounds.width(), 4.0);
        assert_eq!(bounds.height(), 6.0);
    }
}
