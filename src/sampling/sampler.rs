//! Timed sampling of the locked region.
//!
//! Sampling is poll-and-compare: the caller offers every frame and the
//! sampler only evaluates it once the capture interval has elapsed, so the
//! frame loop never sleeps. Ticks are scheduled on a fixed grid from the
//! last alignment point, which keeps the sampling phase from drifting by
//! up to a frame period per bit.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::capture::{ConfigError, Frame};
use crate::classify::{Symbol, SymbolClassifier};
use crate::locate::Roi;

/// What a single tick reads from the region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingMode {
    /// One symbol from the whole region, using the full channel map.
    Region,
    /// `bits_per_tick` stacked luminance bands, top to bottom.
    Lines,
}

/// Sampling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub mode: SamplingMode,
    /// Bands per tick in [`SamplingMode::Lines`].
    pub bits_per_tick: usize,
    /// Interval between bit samples while receiving, in seconds.
    pub base_capture_interval: f64,
    /// Interval between marker polls while waiting for a start, in seconds.
    pub idle_poll_interval: f64,
    /// Share of each band's height sampled around its midline.
    pub strip_fraction: f64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            mode: SamplingMode::Region,
            bits_per_tick: 1,
            base_capture_interval: 0.5,
            idle_poll_interval: 0.1,
            strip_fraction: 0.2,
        }
    }
}

impl SamplingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bits_per_tick == 0 {
            return Err(ConfigError::InvalidBitsPerTick);
        }
        for (name, value) in [
            ("capture", self.base_capture_interval),
            ("idle poll", self.idle_poll_interval),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidInterval { name, value });
            }
        }
        if !(0.0..=1.0).contains(&self.strip_fraction) {
            return Err(ConfigError::InvalidThreshold {
                name: "strip fraction",
                value: self.strip_fraction,
            });
        }
        Ok(())
    }

    /// Bits produced by one tick.
    pub fn bits_per_tick(&self) -> usize {
        match self.mode {
            SamplingMode::Region => 1,
            SamplingMode::Lines => self.bits_per_tick,
        }
    }
}

/// Samples bits from the locked region at the capture interval.
#[derive(Debug, Clone)]
pub struct BitSampler {
    classifier: SymbolClassifier,
    mode: SamplingMode,
    bits_per_tick: usize,
    strip_fraction: f64,
    interval: Duration,
    next_due: Option<Instant>,
}

impl BitSampler {
    pub fn new(classifier: SymbolClassifier, config: &SamplingConfig) -> Self {
        Self {
            classifier,
            mode: config.mode,
            bits_per_tick: config.bits_per_tick.max(1),
            strip_fraction: config.strip_fraction,
            interval: Duration::from_secs_f64(config.base_capture_interval.max(0.0)),
            next_due: None,
        }
    }

    pub fn mode(&self) -> SamplingMode {
        self.mode
    }

    /// Returns the current capture interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Replaces the capture interval; takes effect from the next tick.
    pub fn set_interval(&mut self, seconds: f64) {
        self.interval = Duration::from_secs_f64(seconds.max(0.0));
        tracing::debug!(interval_s = seconds, "Capture interval updated");
    }

    /// Schedules the first tick half an interval after `at`, so samples
    /// land mid-symbol when `at` is a symbol boundary.
    pub fn align(&mut self, at: Instant) {
        self.next_due = Some(at + self.interval / 2);
    }

    /// Schedules the next tick a full interval after `at`.
    pub fn restart(&mut self, at: Instant) {
        self.next_due = Some(at + self.interval);
    }

    /// Drops any schedule; the next poll ticks immediately.
    pub fn reset(&mut self) {
        self.next_due = None;
    }

    /// Returns true if a tick is due at `now`.
    pub fn is_due(&self, now: Instant) -> bool {
        self.next_due.map_or(true, |due| now >= due)
    }

    /// Consumes a due tick and advances the schedule.
    ///
    /// Returns false, leaving the schedule alone, if no tick is due.
    pub fn take_tick(&mut self, now: Instant) -> bool {
        if !self.is_due(now) {
            return false;
        }
        let next = self.next_due.map_or(now, |due| due) + self.interval;
        // Fell more than a whole interval behind: restart the grid.
        self.next_due = Some(if next <= now { now + self.interval } else { next });
        true
    }

    /// Samples the region if a tick is due.
    pub fn poll(&mut self, roi: &Roi, frame: &Frame) -> Option<Vec<Symbol>> {
        if self.take_tick(frame.timestamp()) {
            Some(self.sample_tick(roi, frame))
        } else {
            None
        }
    }

    /// Reads one tick's symbols from the region, ignoring timing.
    pub fn sample_tick(&self, roi: &Roi, frame: &Frame) -> Vec<Symbol> {
        match self.mode {
            SamplingMode::Region => vec![self.classifier.classify_region(frame, roi)],
            SamplingMode::Lines => self.sample_lines(roi, frame),
        }
    }

    /// One luminance bit per band, top to bottom.
    pub fn sample_lines(&self, roi: &Roi, frame: &Frame) -> Vec<Symbol> {
        roi.bands(self.bits_per_tick, self.strip_fraction)
            .iter()
            .map(|band| self.classifier.classify_luminance(&frame.region(band)))
            .collect()
    }

    /// Band rectangles sampled in lines mode, for overlays.
    pub fn bands(&self, roi: &Roi) -> Vec<Roi> {
        match self.mode {
            SamplingMode::Region => Vec::new(),
            SamplingMode::Lines => roi.bands(self.bits_per_tick, self.strip_fraction),
        }
    }
}
