//! Display overlays for an optional viewer.

use crate::capture::Frame;
use crate::locate::Roi;

/// One drawing directive in frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlay {
    Rectangle { roi: Roi, color: [u8; 3] },
    Line { from: (u32, u32), to: (u32, u32), color: [u8; 3] },
}

/// Receives each processed frame with the overlays describing the
/// receiver's view of it. Purely observational.
pub trait AnnotationSink {
    fn annotate(&mut self, frame: &Frame, overlays: &[Overlay]);
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl AnnotationSink for NullSink {
    fn annotate(&mut self, _frame: &Frame, _overlays: &[Overlay]) {}
}

impl<F> AnnotationSink for F
where
    F: FnMut(&Frame, &[Overlay]),
{
    fn annotate(&mut self, frame: &Frame, overlays: &[Overlay]) {
        self(frame, overlays)
    }
}

/// Horizontal line through the middle of `band`.
pub(crate) fn midline(band: &Roi, color: [u8; 3]) -> Overlay {
    let y = band.y + band.height / 2;
    Overlay::Line {
        from: (band.x, y),
        to: (band.x + band.width.saturating_sub(1), y),
        color,
    }
}
