//! Metrics collection and registry.

use prometheus::{Encoder, Gauge, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use thiserror::Error;

use crate::receiver::{Receiver, ReceiverStats};

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// A snapshot of receiver state for metrics update.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    /// Whether the ROI is locked.
    pub roi_locked: bool,
    /// Receiver counters.
    pub stats: ReceiverStats,
    /// Current capture interval in seconds.
    pub capture_interval: f64,
    /// Latest self-test bit error rate, if one was measured.
    pub ber: Option<f64>,
}

impl MetricsSnapshot {
    /// Captures the current state of a receiver.
    pub fn from_receiver(receiver: &Receiver) -> Self {
        Self {
            roi_locked: receiver.roi().is_some(),
            stats: receiver.stats(),
            capture_interval: receiver.capture_interval(),
            ber: None,
        }
    }
}

/// Prometheus metrics registry for the optical link.
pub struct MetricsRegistry {
    registry: Registry,

    roi_locked: IntGauge,
    frames_seen: IntCounter,
    bits_sampled: IntCounter,
    messages_decoded: IntCounter,
    frames_discarded: IntCounterVec,

    buffer_bits: IntGauge,
    bits_trimmed: IntCounter,
    bits_evicted: IntCounter,

    capture_interval: Gauge,
    ber: Gauge,
}

impl MetricsRegistry {
    /// Creates a new registry with all link metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let roi_locked = IntGauge::new(
            "optical_link_roi_locked",
            "Whether the screen region is locked (1=locked, 0=searching)",
        )?;
        let frames_seen = IntCounter::new(
            "optical_link_frames_seen_total",
            "Total camera frames processed",
        )?;
        let bits_sampled = IntCounter::new(
            "optical_link_bits_sampled_total",
            "Total bits sampled from the screen",
        )?;
        let messages_decoded = IntCounter::new(
            "optical_link_messages_decoded_total",
            "Total frames that passed validation and decoded",
        )?;
        let frames_discarded = IntCounterVec::new(
            Opts::new(
                "optical_link_frames_discarded_total",
                "Total frames discarded, by reason",
            ),
            &["reason"],
        )?;

        let buffer_bits = IntGauge::new(
            "optical_link_buffer_bits",
            "Bits currently buffered awaiting a complete frame",
        )?;
        let bits_trimmed = IntCounter::new(
            "optical_link_bits_trimmed_total",
            "Bits dropped because no start sequence preceded them",
        )?;
        let bits_evicted = IntCounter::new(
            "optical_link_bits_evicted_total",
            "Bits dropped by the buffer cap",
        )?;

        let capture_interval = Gauge::new(
            "optical_link_capture_interval_seconds",
            "Current interval between bit samples",
        )?;
        let ber = Gauge::new(
            "optical_link_bit_error_rate",
            "Latest measured bit error rate",
        )?;

        registry.register(Box::new(roi_locked.clone()))?;
        registry.register(Box::new(frames_seen.clone()))?;
        registry.register(Box::new(bits_sampled.clone()))?;
        registry.register(Box::new(messages_decoded.clone()))?;
        registry.register(Box::new(frames_discarded.clone()))?;
        registry.register(Box::new(buffer_bits.clone()))?;
        registry.register(Box::new(bits_trimmed.clone()))?;
        registry.register(Box::new(bits_evicted.clone()))?;
        registry.register(Box::new(capture_interval.clone()))?;
        registry.register(Box::new(ber.clone()))?;

        // Expose every reason from the start
        for reason in ["parity", "checksum", "alignment"] {
            frames_discarded.with_label_values(&[reason]);
        }

        Ok(Self {
            registry,
            roi_locked,
            frames_seen,
            bits_sampled,
            messages_decoded,
            frames_discarded,
            buffer_bits,
            bits_trimmed,
            bits_evicted,
            capture_interval,
            ber,
        })
    }

    /// Updates all metrics from a snapshot.
    pub fn update(&self, snapshot: &MetricsSnapshot) {
        let stats = &snapshot.stats;

        self.roi_locked.set(i64::from(snapshot.roi_locked));
        self.buffer_bits.set(stats.buffered_bits as i64);
        self.capture_interval.set(snapshot.capture_interval);
        if let Some(ber) = snapshot.ber {
            self.ber.set(ber);
        }

        // Counters only move forward by the difference
        advance(&self.frames_seen, stats.frames_seen);
        advance(&self.bits_sampled, stats.bits_sampled);
        advance(&self.messages_decoded, stats.messages_decoded);
        advance(&self.bits_trimmed, stats.bits_trimmed);
        advance(&self.bits_evicted, stats.bits_evicted);
        advance(&self.frames_discarded.with_label_values(&["parity"]), stats.parity_failures);
        advance(&self.frames_discarded.with_label_values(&["checksum"]), stats.checksum_failures);
        advance(&self.frames_discarded.with_label_values(&["alignment"]), stats.alignment_failures);
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

fn advance(counter: &IntCounter, total: u64) {
    let current = counter.get();
    if total > current {
        counter.inc_by(total - current);
    }
}
