//! Display timeline of a simulated sender.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::capture::ConfigError;
use crate::classify::{ChannelMap, Symbol};

/// What the sender's screen shows at one moment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayPattern {
    /// Whole screen in one color.
    Solid([u8; 3]),
    /// Horizontal bands of equal height, top to bottom.
    Bands(Vec<[u8; 3]>),
}

impl DisplayPattern {
    /// Band colors top to bottom; a solid pattern is a single band.
    pub fn bands(&self) -> &[[u8; 3]] {
        match self {
            DisplayPattern::Solid(rgb) => std::slice::from_ref(rgb),
            DisplayPattern::Bands(bands) => bands,
        }
    }
}

/// A pattern held for a fixed duration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayStep {
    pub pattern: DisplayPattern,
    pub duration: Duration,
}

impl DisplayStep {
    pub fn solid(rgb: [u8; 3], duration: Duration) -> Self {
        Self {
            pattern: DisplayPattern::Solid(rgb),
            duration,
        }
    }

    pub fn bands(bands: Vec<[u8; 3]>, duration: Duration) -> Self {
        Self {
            pattern: DisplayPattern::Bands(bands),
            duration,
        }
    }
}

/// How long the sender holds each part of a transmission, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SenderTiming {
    /// Calibration marker hold; must outlast the receiver's settle time.
    pub marker_hold: f64,
    /// Idle (black) screen between sections.
    pub idle_gap: f64,
    pub start_hold: f64,
    /// Time each data step stays on screen.
    pub bit_duration: f64,
    pub end_hold: f64,
}

impl Default for SenderTiming {
    fn default() -> Self {
        Self {
            marker_hold: 3.0,
            idle_gap: 0.5,
            start_hold: 1.0,
            bit_duration: 0.5,
            end_hold: 1.0,
        }
    }
}

impl SenderTiming {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("marker hold", self.marker_hold),
            ("idle gap", self.idle_gap),
            ("start hold", self.start_hold),
            ("bit duration", self.bit_duration),
            ("end hold", self.end_hold),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidInterval { name, value });
            }
        }
        if self.bit_duration <= 0.0 {
            return Err(ConfigError::InvalidInterval {
                name: "bit duration",
                value: self.bit_duration,
            });
        }
        Ok(())
    }
}

fn secs(value: f64) -> Duration {
    Duration::from_secs_f64(value.max(0.0))
}

/// Ordered list of display steps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SenderSchedule {
    steps: Vec<DisplayStep>,
}

impl SenderSchedule {
    pub fn from_steps(steps: Vec<DisplayStep>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[DisplayStep] {
        &self.steps
    }

    pub fn push(&mut self, step: DisplayStep) {
        if !step.duration.is_zero() {
            self.steps.push(step);
        }
    }

    pub fn total_duration(&self) -> Duration {
        self.steps.iter().map(|s| s.duration).sum()
    }

    /// Pattern on screen `offset` after the schedule began. Each step covers
    /// `[start, start + duration)`; past the last step there is nothing.
    pub fn pattern_at(&self, offset: Duration) -> Option<&DisplayPattern> {
        let mut start = Duration::ZERO;
        for step in &self.steps {
            let end = start + step.duration;
            if offset < end {
                return Some(&step.pattern);
            }
            start = end;
        }
        None
    }

    /// Appends the calibration marker followed by an idle gap.
    pub fn calibration(&mut self, map: &ChannelMap, timing: &SenderTiming) -> &mut Self {
        self.push(DisplayStep::solid(map.marker.reference_rgb(), secs(timing.marker_hold)));
        self.idle(timing)
    }

    /// Appends an idle (black) gap.
    pub fn idle(&mut self, timing: &SenderTiming) -> &mut Self {
        self.push(DisplayStep::solid([0, 0, 0], secs(timing.idle_gap)));
        self
    }

    /// Appends one transmission: start color, the bits, end color.
    ///
    /// With `bits_per_step > 1` each data step shows that many horizontal
    /// bands; a short final step is padded with zeros.
    pub fn transmission(
        &mut self,
        bits: &[u8],
        map: &ChannelMap,
        timing: &SenderTiming,
        bits_per_step: usize,
    ) -> &mut Self {
        let rgb = |symbol: Symbol| {
            map.spec_for(symbol)
                .map(|spec| spec.reference_rgb())
                .unwrap_or([0, 0, 0])
        };
        let bit_duration = secs(timing.bit_duration);

        self.push(DisplayStep::solid(rgb(Symbol::Start), secs(timing.start_hold)));
        if bits_per_step <= 1 {
            for &bit in bits {
                self.push(DisplayStep::solid(rgb(Symbol::from_bit(bit)), bit_duration));
            }
        } else {
            for chunk in bits.chunks(bits_per_step) {
                let mut bands: Vec<[u8; 3]> =
                    chunk.iter().map(|&bit| rgb(Symbol::from_bit(bit))).collect();
                bands.resize(bits_per_step, rgb(Symbol::Zero));
                self.push(DisplayStep::bands(bands, bit_duration));
            }
        }
        self.push(DisplayStep::solid(rgb(Symbol::End), secs(timing.end_hold)));
        self
    }

    /// Calibration, then each transmission separated by idle gaps.
    pub fn for_transmissions(
        transmissions: &[Vec<u8>],
        map: &ChannelMap,
        timing: &SenderTiming,
        bits_per_step: usize,
    ) -> Self {
        let mut schedule = Self::default();
        schedule.calibration(map, timing);
        for bits in transmissions {
            schedule.transmission(bits, map, timing, bits_per_step);
            schedule.idle(timing);
        }
        schedule
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn test_pattern_at_boundaries() {
        let schedule = SenderSchedule::from_steps(vec![
            DisplayStep::solid([1, 1, 1], ms(100)),
            DisplayStep::solid([2, 2, 2], ms(50)),
        ]);
        assert_eq!(schedule.total_duration(), ms(150));
        assert_eq!(schedule.pattern_at(ms(0)), Some(&DisplayPattern::Solid([1, 1, 1])));
        assert_eq!(schedule.pattern_at(ms(99)), Some(&DisplayPattern::Solid([1, 1, 1])));
        assert_eq!(schedule.pattern_at(ms(100)), Some(&DisplayPattern::Solid([2, 2, 2])));
        assert_eq!(schedule.pattern_at(ms(150)), None);
    }

    #[test]
    fn test_zero_length_steps_are_skipped() {
        let mut schedule = SenderSchedule::default();
        schedule.push(DisplayStep::solid([0, 0, 0], Duration::ZERO));
        assert!(schedule.steps().is_empty());
    }

    #[test]
    fn test_transmission_layout() {
        let map = ChannelMap::default();
        let timing = SenderTiming::default();
        let mut schedule = SenderSchedule::default();
        schedule.transmission(&[1, 0, 1], &map, &timing, 1);

        let colors: Vec<[u8; 3]> = schedule
            .steps()
            .iter()
            .map(|s| s.pattern.bands()[0])
            .collect();
        assert_eq!(
            colors,
            vec![
                map.start.reference_rgb(),
                [255, 255, 255],
                [0, 0, 0],
                [255, 255, 255],
                map.end.reference_rgb(),
            ]
        );
    }

    #[test]
    fn test_banded_transmission_pads_last_step() {
        let map = ChannelMap::default();
        let mut schedule = SenderSchedule::default();
        schedule.transmission(&[1, 1, 0, 1, 1], &map, &SenderTiming::default(), 3);

        let data: Vec<&DisplayStep> = schedule.steps()[1..3].iter().collect();
        assert_eq!(
            data[0].pattern.bands(),
            &[[255, 255, 255], [255, 255, 255], [0, 0, 0]]
        );
        assert_eq!(
            data[1].pattern.bands(),
            &[[255, 255, 255], [255, 255, 255], [0, 0, 0]]
        );
        assert_eq!(schedule.steps().len(), 4);
    }

    #[test]
    fn test_full_schedule_duration() {
        let timing = SenderTiming::default();
        let schedule = SenderSchedule::for_transmissions(
            &[vec![0, 1], vec![1]],
            &ChannelMap::default(),
            &timing,
            1,
        );
        // marker + idle, then (start + bits + end + idle) per transmission
        let expected = 3.0 + 0.5 + (1.0 + 1.0 + 1.0 + 0.5) + (1.0 + 0.5 + 1.0 + 0.5);
        assert!((schedule.total_duration().as_secs_f64() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_timing_validation() {
        assert!(SenderTiming::default().validate().is_ok());
        let timing = SenderTiming {
            bit_duration: 0.0,
            ..Default::default()
        };
        assert!(timing.validate().is_err());
    }
}
