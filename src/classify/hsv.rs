//! HSV color space conversion on the 8-bit scale.
//!
//! Hue is stored in half-degrees (0-179) so that it fits a byte, with
//! saturation and value in 0-255. Threshold ranges in configuration files
//! use the same scale.

use serde::{Deserialize, Serialize};

/// HSV color on the 8-bit scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hsv {
    /// Hue in half-degrees, 0-179.
    pub h: u8,
    /// Saturation, 0-255.
    pub s: u8,
    /// Value (max channel), 0-255.
    pub v: u8,
}

/// Converts an RGB triple to HSV.
#[inline]
pub fn rgb_to_hsv([r, g, b]: [u8; 3]) -> Hsv {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = f32::from(max - min);

    if max == 0 {
        return Hsv { h: 0, s: 0, v: 0 };
    }

    let s = (delta * 255.0 / f32::from(max)).round() as u8;

    // Achromatic case
    if max == min {
        return Hsv { h: 0, s, v: max };
    }

    let (r, g, b) = (f32::from(r), f32::from(g), f32::from(b));
    let degrees = if max as f32 == r {
        60.0 * (g - b) / delta
    } else if max as f32 == g {
        60.0 * (b - r) / delta + 120.0
    } else {
        60.0 * (r - g) / delta + 240.0
    };
    let degrees = if degrees < 0.0 { degrees + 360.0 } else { degrees };
    let h = ((degrees / 2.0).round() as u16 % 180) as u8;

    Hsv { h, s, v: max }
}

/// Rec. 601 luma of an RGB triple, 0-255.
#[inline]
pub fn luminance([r, g, b]: [u8; 3]) -> f32 {
    0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b)
}

/// Inclusive HSV box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HsvRange {
    /// Lower bound `[h, s, v]`.
    pub lower: [u8; 3],
    /// Upper bound `[h, s, v]`.
    pub upper: [u8; 3],
}

impl HsvRange {
    pub const fn new(lower: [u8; 3], upper: [u8; 3]) -> Self {
        Self { lower, upper }
    }

    /// Returns true when every channel lies within the bounds.
    #[inline]
    pub fn contains(&self, hsv: Hsv) -> bool {
        let Hsv { h, s, v } = hsv;
        (self.lower[0]..=self.upper[0]).contains(&h)
            && (self.lower[1]..=self.upper[1]).contains(&s)
            && (self.lower[2]..=self.upper[2]).contains(&v)
    }
}
