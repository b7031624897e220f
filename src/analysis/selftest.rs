//! Closed-loop self-test: send a known pattern, measure BER, adapt.
//!
//! Each round renders the pattern through a [`ScriptedCamera`], flipping
//! bits with the configured probability to model a noisy channel, reads
//! it back with a [`Receiver`] listening on the known screen region, and
//! feeds the trailing-window BER to the [`RateController`].

use rand_chacha::ChaCha8Rng;
use rand_core::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

use super::{BerWindow, RateAdjustment, RateController, bit_error_rate};
use crate::capture::{Camera, ScriptedCamera};
use crate::config::LinkConfig;
use crate::receiver::{CancellationToken, LinkError, NullSink, Receiver, ReceiverEvent};
use crate::sender::SenderSchedule;

/// Self-test parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelfTestConfig {
    pub rounds: usize,
    /// Length of the known test pattern.
    pub pattern_bits: usize,
    /// Chance that the channel flips any one bit.
    pub flip_probability: f64,
    /// Per-channel pixel noise amplitude.
    pub pixel_noise: u8,
    /// Share of the frame covered by the simulated screen.
    pub screen_fraction: f64,
    pub seed: u64,
}

impl Default for SelfTestConfig {
    fn default() -> Self {
        Self {
            rounds: 5,
            pattern_bits: 64,
            flip_probability: 0.0,
            pixel_noise: 0,
            screen_fraction: 0.6,
            seed: 0,
        }
    }
}

/// Result of one self-test round.
#[derive(Debug, Clone, PartialEq)]
pub struct SelfTestRound {
    pub round: usize,
    /// Capture interval used for this round, in seconds.
    pub interval: f64,
    pub received_bits: usize,
    /// Error rate of this round alone.
    pub ber: f64,
    /// Error rate over the trailing window.
    pub window_ber: f64,
    pub adjustment: RateAdjustment,
    pub next_interval: f64,
}

/// Runs BER measurement rounds against a simulated sender.
#[derive(Debug)]
pub struct SelfTest {
    link: LinkConfig,
    options: SelfTestConfig,
    controller: RateController,
    window: BerWindow,
    pattern: Vec<u8>,
    rng: ChaCha8Rng,
    interval: f64,
}

impl SelfTest {
    pub fn new(link: LinkConfig, options: SelfTestConfig) -> Result<Self, LinkError> {
        link.validate()?;
        let mut rng = ChaCha8Rng::seed_from_u64(options.seed);
        let pattern = (0..options.pattern_bits.max(1))
            .map(|_| (rng.next_u32() & 1) as u8)
            .collect();

        Ok(Self {
            controller: RateController::new(link.rate.clone()),
            window: BerWindow::new(link.rate.window_bits),
            interval: link.sampling.base_capture_interval,
            link,
            options,
            pattern,
            rng,
        })
    }

    /// The known pattern every round transmits.
    pub fn pattern(&self) -> &[u8] {
        &self.pattern
    }

    /// Capture interval the next round will use.
    pub fn interval(&self) -> f64 {
        self.interval
    }

    /// Runs all configured rounds, stopping early on cancellation.
    pub fn run(&mut self, cancel: &CancellationToken) -> Result<Vec<SelfTestRound>, LinkError> {
        let mut rounds = Vec::with_capacity(self.options.rounds);
        for round in 1..=self.options.rounds {
            match self.run_round(round, cancel) {
                Ok(result) => rounds.push(result),
                Err(LinkError::Cancelled) => break,
                Err(e) => return Err(e),
            }
        }
        Ok(rounds)
    }

    /// Sends the pattern once and adapts the interval.
    pub fn run_round(
        &mut self,
        round: usize,
        cancel: &CancellationToken,
    ) -> Result<SelfTestRound, LinkError> {
        let displayed = self.through_channel();

        let mut schedule = SenderSchedule::default();
        schedule
            .idle(&self.link.sender)
            .transmission(
                &displayed,
                &self.link.channel,
                &self.link.sender,
                self.link.sampling.bits_per_tick(),
            )
            .idle(&self.link.sender);

        let screen = ScriptedCamera::centered_screen(&self.link.capture, self.options.screen_fraction);
        let mut camera = ScriptedCamera::new(schedule, screen)
            .with_noise(self.options.pixel_noise, self.options.seed.wrapping_add(round as u64));
        camera.open(&self.link.capture)?;

        let mut receiver = Receiver::with_roi(&self.link, screen)?;
        receiver.set_capture_interval(self.interval);

        let mut received = Vec::new();
        let summary = receiver.run(&mut camera, cancel, &mut NullSink, |event| {
            if let ReceiverEvent::BitsSampled(bits) = event {
                received.extend_from_slice(bits);
            }
        })?;
        if summary.stop == crate::receiver::StopReason::Cancelled {
            return Err(LinkError::Cancelled);
        }

        let ber = bit_error_rate(&self.pattern, &received);
        self.window.record(&self.pattern, &received);
        let window_ber = self.window.ber().unwrap_or(ber);
        let adjustment = self.controller.decide(window_ber);
        let next_interval = self.controller.update(self.interval, window_ber);

        tracing::info!(
            round,
            interval_s = self.interval,
            sent = self.pattern.len(),
            received = received.len(),
            ber,
            window_ber,
            "Self-test round complete"
        );

        let result = SelfTestRound {
            round,
            interval: self.interval,
            received_bits: received.len(),
            ber,
            window_ber,
            adjustment,
            next_interval,
        };
        self.interval = next_interval;
        Ok(result)
    }

    // The pattern as the channel delivers it to the screen.
    fn through_channel(&mut self) -> Vec<u8> {
        let p = self.options.flip_probability.clamp(0.0, 1.0);
        self.pattern
            .iter()
            .map(|&bit| {
                let roll = f64::from(self.rng.next_u32()) / f64::from(u32::MAX);
                if roll < p {
                    bit ^ 1
                } else {
                    bit
                }
            })
            .collect()
    }
}
