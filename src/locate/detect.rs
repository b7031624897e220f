//! Marker detection: largest connected blob of matching pixels.

use super::Roi;
use crate::capture::Frame;
use crate::classify::{ColorSpec, SymbolClassifier};

/// A detected blob and its bounding rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Blob {
    /// Bounding rectangle of the blob.
    pub bounds: Roi,
    /// Number of matching pixels in the blob.
    pub area: usize,
}

/// Finds the largest 8-connected blob of pixels matching `spec`.
///
/// Blobs smaller than `min_area` pixels are ignored. Returns `None` when
/// nothing qualifies.
pub fn detect_marker(
    frame: &Frame,
    classifier: &SymbolClassifier,
    spec: &ColorSpec,
    min_area: usize,
) -> Option<Blob> {
    let mask = classifier.mask(frame, spec);
    largest_blob(&mask, frame.width() as usize, frame.height() as usize)
        .filter(|blob| blob.area >= min_area.max(1))
}

/// Labels the mask with a flood fill and keeps the blob with the most
/// pixels. Earlier blobs in scan order win ties.
pub(crate) fn largest_blob(mask: &[bool], width: usize, height: usize) -> Option<Blob> {
    if mask.len() != width * height {
        return None;
    }

    let mut visited = vec![false; mask.len()];
    let mut stack = Vec::new();
    let mut best: Option<Blob> = None;

    for start in 0..mask.len() {
        if !mask[start] || visited[start] {
            continue;
        }

        visited[start] = true;
        stack.push(start);
        let (mut min_x, mut min_y) = (usize::MAX, usize::MAX);
        let (mut max_x, mut max_y) = (0, 0);
        let mut area = 0;

        while let Some(idx) = stack.pop() {
            let (x, y) = (idx % width, idx / width);
            area += 1;
            min_x = min_x.min(x);
            max_x = max_x.max(x);
            min_y = min_y.min(y);
            max_y = max_y.max(y);

            for dy in -1i64..=1 {
                for dx in -1i64..=1 {
                    let nx = x as i64 + dx;
                    let ny = y as i64 + dy;
                    if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                        continue;
                    }
                    let n = ny as usize * width + nx as usize;
                    if mask[n] && !visited[n] {
                        visited[n] = true;
                        stack.push(n);
                    }
                }
            }
        }

        if best.map_or(true, |b| area > b.area) {
            best = Some(Blob {
                bounds: Roi::new(
                    min_x as u32,
                    min_y as u32,
                    (max_x - min_x + 1) as u32,
                    (max_y - min_y + 1) as u32,
                ),
                area,
            });
        }
    }

    best
}
