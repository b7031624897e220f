//! Frame type representing a captured RGB image with metadata.

use std::time::Instant;

use crate::locate::Roi;

/// Number of interleaved channels per pixel (R, G, B).
pub const CHANNELS: usize = 3;

/// A single captured frame from the camera.
///
/// Pixels are stored row-major as interleaved 8-bit RGB triples. The
/// receiver only ever reads sub-regions of a frame.
#[derive(Clone)]
pub struct Frame {
    /// Raw pixel data, `width * height * 3` bytes.
    pixels: Vec<u8>,
    /// Frame width in pixels.
    width: u32,
    /// Frame height in pixels.
    height: u32,
    /// Capture timestamp, drives settle and sampling timers.
    timestamp: Instant,
    /// Monotonic sequence number.
    sequence: u64,
}

impl Frame {
    /// Creates a new frame stamped with the current time.
    pub fn new(pixels: Vec<u8>, width: u32, height: u32, sequence: u64) -> Self {
        Self::with_timestamp(pixels, width, height, sequence, Instant::now())
    }

    /// Creates a frame with an explicit capture timestamp.
    ///
    /// Synthetic sources use this to run on a virtual clock.
    pub fn with_timestamp(
        pixels: Vec<u8>,
        width: u32,
        height: u32,
        sequence: u64,
        timestamp: Instant,
    ) -> Self {
        Self {
            pixels,
            width,
            height,
            timestamp,
            sequence,
        }
    }

    /// Creates a frame filled with a single color.
    pub fn solid(width: u32, height: u32, rgb: [u8; 3], sequence: u64) -> Self {
        let count = (width as usize) * (height as usize);
        let pixels = rgb.iter().copied().cycle().take(count * CHANNELS).collect();
        Self::new(pixels, width, height, sequence)
    }

    /// Returns a reference to the raw pixel data.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Returns the frame width.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the frame height.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the capture timestamp.
    #[inline]
    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }

    /// Returns the sequence number.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Returns the total number of pixels (width * height).
    #[inline]
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Validates that the pixel buffer size matches dimensions.
    pub fn is_valid(&self) -> bool {
        self.pixels.len() == self.pixel_count() * CHANNELS
    }

    /// Returns the RGB triple at `(x, y)`, or `None` outside the frame.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y as usize) * (self.width as usize) + x as usize) * CHANNELS;
        self.pixels
            .get(idx..idx + CHANNELS)
            .map(|p| [p[0], p[1], p[2]])
    }

    /// Clamps a region to the frame bounds.
    pub fn clip(&self, roi: &Roi) -> Roi {
        let x = roi.x.min(self.width);
        let y = roi.y.min(self.height);
        Roi {
            x,
            y,
            width: roi.width.min(self.width - x),
            height: roi.height.min(self.height - y),
        }
    }

    /// Collects the RGB pixels inside a region, row by row.
    ///
    /// The region is clipped to the frame first.
    pub fn region(&self, roi: &Roi) -> Vec<[u8; 3]> {
        let roi = self.clip(roi);
        let mut out = Vec::with_capacity(roi.area());
        let stride = self.width as usize * CHANNELS;
        for row in roi.y..roi.y + roi.height {
            let start = row as usize * stride + roi.x as usize * CHANNELS;
            let end = start + roi.width as usize * CHANNELS;
            if let Some(line) = self.pixels.get(start..end) {
                out.extend(line.chunks_exact(CHANNELS).map(|p| [p[0], p[1], p[2]]));
            }
        }
        out
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("sequence", &self.sequence)
            .field("pixel_bytes", &self.pixels.len())
            .finish()
    }
}
