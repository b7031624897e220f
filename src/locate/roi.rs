//! Region of interest geometry.

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Roi {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Roi {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Number of pixels covered.
    #[inline]
    pub fn area(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Returns true if `(x, y)` lies inside the rectangle.
    #[inline]
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && y >= self.y && x - self.x < self.width && y - self.y < self.height
    }

    /// Splits the rectangle into `count` equal horizontal bands and
    /// narrows each to a strip around its midline.
    ///
    /// `strip_fraction` is the share of the band height kept; every strip
    /// is at least one row tall. Bands are returned top to bottom.
    pub fn bands(&self, count: usize, strip_fraction: f64) -> Vec<Roi> {
        if count == 0 || self.is_empty() {
            return Vec::new();
        }
        let count = count as u32;
        (0..count)
            .map(|i| {
                let top = self.y + i * self.height / count;
                let bottom = self.y + (i + 1) * self.height / count;
                let band = (bottom - top).max(1);
                let strip = ((f64::from(band) * strip_fraction.clamp(0.0, 1.0)).round() as u32)
                    .clamp(1, band);
                let mid = top + band / 2;
                let strip_top = mid.saturating_sub(strip / 2).max(top);
                Roi::new(self.x, strip_top, self.width, strip.min(bottom.max(top + 1) - strip_top))
            })
            .collect()
    }
}

impl std::fmt::Display for Roi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}@({},{})", self.width, self.height, self.x, self.y)
    }
}
