//! The receiver state machine.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use super::annotate::midline;
use super::{AnnotationSink, CancellationToken, LinkError, Overlay};
use crate::capture::{elapsed, Camera, CameraError, Frame};
use crate::classify::{Symbol, SymbolClassifier};
use crate::config::LinkConfig;
use crate::locate::{LocatorState, Roi, RoiLocator};
use crate::protocol::{validate_and_decode, FrameError, FrameSynchronizer, Validator};
use crate::sampling::{BitBuffer, BitSampler, SamplingMode};

const ROI_COLOR: [u8; 3] = [0, 255, 0];
const CANDIDATE_COLOR: [u8; 3] = [255, 255, 0];
const BAND_COLOR: [u8; 3] = [255, 0, 0];

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverState {
    /// Nothing seen yet.
    Idle,
    /// Waiting for the calibration marker to settle.
    LockingRoi,
    /// ROI fixed; polling slowly for the start color.
    Armed,
    /// Sampling bits at the capture interval.
    Receiving,
    /// End color seen; draining the buffer.
    Flushing,
}

/// A message that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedMessage {
    pub text: String,
    /// Payload length including the checksum trailer.
    pub payload_bits: usize,
    pub received_at: DateTime<Utc>,
}

/// Something observable happened while processing a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiverEvent {
    RoiLocked(Roi),
    StartDetected,
    BitsSampled(Vec<u8>),
    Decoded(DecodedMessage),
    /// A framed payload failed validation; `consumed` bits were dropped.
    Discarded { reason: FrameError, consumed: usize },
    /// End color seen; `leftover` unframed bits were dropped.
    EndDetected { leftover: usize },
}

/// Running counters for one receiver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    pub frames_seen: u64,
    pub bits_sampled: u64,
    pub messages_decoded: u64,
    pub parity_failures: u64,
    pub checksum_failures: u64,
    pub alignment_failures: u64,
    /// Bits dropped because no start sequence preceded them.
    pub bits_trimmed: u64,
    /// Bits dropped by the buffer cap.
    pub bits_evicted: u64,
    pub buffered_bits: usize,
}

impl ReceiverStats {
    /// Frames discarded for any reason.
    pub fn frames_discarded(&self) -> u64 {
        self.parity_failures + self.checksum_failures + self.alignment_failures
    }

    fn record_discard(&mut self, reason: &FrameError) {
        match reason {
            FrameError::ParityMismatch => self.parity_failures += 1,
            FrameError::ChecksumMismatch => self.checksum_failures += 1,
            FrameError::NotByteAligned { .. } => self.alignment_failures += 1,
        }
    }
}

/// Why [`Receiver::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    SourceExhausted,
    Cancelled,
}

/// Outcome of a completed session.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub messages: Vec<DecodedMessage>,
    pub stats: ReceiverStats,
    pub stop: StopReason,
    pub roi: Option<Roi>,
}

/// Frame-driven receiver.
///
/// Feed frames with [`process_frame`](Self::process_frame), or let
/// [`run`](Self::run) pull them from a camera until the stream ends.
#[derive(Debug)]
pub struct Receiver {
    classifier: SymbolClassifier,
    locator: RoiLocator,
    sampler: BitSampler,
    sync: FrameSynchronizer,
    validator: Validator,
    buffer: BitBuffer,
    idle_poll: Duration,
    state: ReceiverState,
    roi: Option<Roi>,
    // Start color still on screen; realign on every such frame.
    in_start: bool,
    last_poll: Option<Instant>,
    pending: VecDeque<DecodedMessage>,
    stats: ReceiverStats,
}

impl Receiver {
    /// Builds a receiver from a validated configuration.
    pub fn new(config: &LinkConfig) -> Result<Self, LinkError> {
        config.validate()?;
        let classifier = SymbolClassifier::new(config.channel.clone());
        Ok(Self {
            locator: RoiLocator::new(classifier.clone(), config.calibration.clone()),
            sampler: BitSampler::new(classifier.clone(), &config.sampling),
            classifier,
            sync: config.protocol.synchronizer(),
            validator: config.protocol.validator(),
            buffer: BitBuffer::new(config.protocol.max_buffer_bits),
            idle_poll: Duration::from_secs_f64(config.sampling.idle_poll_interval),
            state: ReceiverState::Idle,
            roi: None,
            in_start: false,
            last_poll: None,
            pending: VecDeque::new(),
            stats: ReceiverStats::default(),
        })
    }

    /// Builds a receiver that skips calibration and listens on `roi`.
    pub fn with_roi(config: &LinkConfig, roi: Roi) -> Result<Self, LinkError> {
        let mut receiver = Self::new(config)?;
        receiver.roi = Some(roi);
        receiver.state = ReceiverState::Armed;
        Ok(receiver)
    }

    pub fn state(&self) -> ReceiverState {
        self.state
    }

    pub fn roi(&self) -> Option<Roi> {
        self.roi
    }

    /// Returns a copy of the counters, including current buffer figures.
    pub fn stats(&self) -> ReceiverStats {
        ReceiverStats {
            buffered_bits: self.buffer.len(),
            bits_evicted: self.buffer.evicted(),
            ..self.stats.clone()
        }
    }

    /// Bits received but not yet framed.
    pub fn buffered_bits(&self) -> &[u8] {
        self.buffer.as_slice()
    }

    /// Current capture interval in seconds.
    pub fn capture_interval(&self) -> f64 {
        self.sampler.interval().as_secs_f64()
    }

    pub fn set_capture_interval(&mut self, seconds: f64) {
        self.sampler.set_interval(seconds);
    }

    /// Drops the ROI and any partial transmission and returns to
    /// calibration.
    pub fn reset_roi(&mut self) {
        self.locator.reset();
        self.roi = None;
        self.buffer.clear();
        self.sampler.reset();
        self.in_start = false;
        self.last_poll = None;
        self.state = ReceiverState::LockingRoi;
        tracing::info!("ROI reset, recalibrating");
    }

    /// Advances the state machine by one frame.
    pub fn process_frame(&mut self, frame: &Frame) -> Vec<ReceiverEvent> {
        self.stats.frames_seen += 1;
        let mut events = Vec::new();

        if self.state == ReceiverState::Idle {
            tracing::info!("Waiting for calibration marker");
            self.state = ReceiverState::LockingRoi;
        }

        match self.state {
            ReceiverState::Idle | ReceiverState::LockingRoi => self.lock(frame, &mut events),
            ReceiverState::Armed => self.poll_start(frame, &mut events),
            ReceiverState::Receiving => self.receive(frame, &mut events),
            ReceiverState::Flushing => self.flush(frame.timestamp(), &mut events),
        }

        for event in &events {
            if let ReceiverEvent::Decoded(message) = event {
                self.pending.push_back(message.clone());
            }
        }
        events
    }

    fn lock(&mut self, frame: &Frame, events: &mut Vec<ReceiverEvent>) {
        if let LocatorState::Locked(roi) = self.locator.observe(frame) {
            self.roi = Some(roi);
            self.state = ReceiverState::Armed;
            self.last_poll = None;
            events.push(ReceiverEvent::RoiLocked(roi));
        }
    }

    fn poll_start(&mut self, frame: &Frame, events: &mut Vec<ReceiverEvent>) {
        let Some(roi) = self.roi else {
            return;
        };
        let now = frame.timestamp();
        if let Some(last) = self.last_poll {
            if elapsed(last, now) < self.idle_poll {
                return;
            }
        }
        self.last_poll = Some(now);

        let symbol = self.classifier.classify_region(frame, &roi);
        tracing::trace!(frame = frame.sequence(), %symbol, "Idle poll");
        if symbol == Symbol::Start {
            tracing::info!(
                frame = frame.sequence(),
                interval_s = self.capture_interval(),
                "Start color detected, receiving"
            );
            self.state = ReceiverState::Receiving;
            self.in_start = true;
            self.sampler.align(now);
            events.push(ReceiverEvent::StartDetected);
        }
    }

    fn receive(&mut self, frame: &Frame, events: &mut Vec<ReceiverEvent>) {
        let Some(roi) = self.roi else {
            return;
        };
        let now = frame.timestamp();

        if self.in_start {
            if self.classifier.classify_region(frame, &roi) == Symbol::Start {
                self.sampler.align(now);
                return;
            }
            self.in_start = false;
            tracing::debug!(frame = frame.sequence(), "Start color ended");
        }

        if !self.sampler.take_tick(now) {
            return;
        }

        let symbol = self.classifier.classify_region(frame, &roi);
        match symbol {
            Symbol::End => {
                tracing::info!(frame = frame.sequence(), "End color detected");
                self.flush(now, events);
                return;
            }
            Symbol::Start => {
                tracing::debug!(frame = frame.sequence(), "Start color reappeared, realigning");
                self.in_start = true;
                self.sampler.align(now);
                return;
            }
            _ => {}
        }

        let symbols = match self.sampler.mode() {
            SamplingMode::Region => vec![symbol],
            SamplingMode::Lines => self.sampler.sample_lines(&roi, frame),
        };
        let bits: Vec<u8> = symbols.iter().filter_map(|s| s.bit()).collect();
        if bits.is_empty() {
            tracing::trace!(frame = frame.sequence(), %symbol, "No bit in sample");
            return;
        }

        self.buffer.extend(&bits);
        self.stats.bits_sampled += bits.len() as u64;
        tracing::debug!(
            frame = frame.sequence(),
            bits = ?bits,
            buffered = self.buffer.len(),
            "Sampled bits"
        );
        events.push(ReceiverEvent::BitsSampled(bits));
        self.drain(events);
    }

    // Extracts every complete frame, then trims bits that cannot begin one.
    fn drain(&mut self, events: &mut Vec<ReceiverEvent>) {
        while let Some(extracted) = self.sync.try_extract(self.buffer.as_slice()) {
            self.buffer.consume(extracted.consumed);
            match validate_and_decode(&extracted.payload, &self.validator) {
                Ok(text) => {
                    tracing::info!(text = %text, bits = extracted.payload.len(), "Message decoded");
                    self.stats.messages_decoded += 1;
                    events.push(ReceiverEvent::Decoded(DecodedMessage {
                        text,
                        payload_bits: extracted.payload.len(),
                        received_at: Utc::now(),
                    }));
                }
                Err(reason) => {
                    tracing::warn!(
                        %reason,
                        consumed = extracted.consumed,
                        "Frame discarded"
                    );
                    self.stats.record_discard(&reason);
                    events.push(ReceiverEvent::Discarded {
                        reason,
                        consumed: extracted.consumed,
                    });
                }
            }
        }

        if !self.sync.has_start(self.buffer.as_slice()) {
            let dropped = self.buffer.retain_tail(self.sync.stale_keep());
            if dropped > 0 {
                tracing::trace!(dropped, "Trimmed bits preceding any start sequence");
                self.stats.bits_trimmed += dropped as u64;
            }
        }
    }

    fn flush(&mut self, now: Instant, events: &mut Vec<ReceiverEvent>) {
        self.state = ReceiverState::Flushing;
        self.drain(events);

        let leftover = self.buffer.len();
        if leftover > 0 {
            tracing::warn!(leftover, "Transmission ended without a complete frame");
        }
        self.buffer.clear();
        events.push(ReceiverEvent::EndDetected { leftover });

        self.sampler.reset();
        self.in_start = false;
        self.last_poll = Some(now);
        self.state = ReceiverState::Armed;
    }

    /// Overlays describing the current view: the locked ROI (or the
    /// candidate while settling) and, in lines mode, each band's midline.
    pub fn overlays(&self) -> Vec<Overlay> {
        let Some(roi) = self.roi else {
            return match self.locator.state() {
                LocatorState::Candidate { bounds, .. } => vec![Overlay::Rectangle {
                    roi: bounds,
                    color: CANDIDATE_COLOR,
                }],
                _ => Vec::new(),
            };
        };

        let mut overlays = vec![Overlay::Rectangle {
            roi,
            color: ROI_COLOR,
        }];
        overlays.extend(
            self.sampler
                .bands(&roi)
                .iter()
                .map(|band| midline(band, BAND_COLOR)),
        );
        overlays
    }

    /// Runs the session until the camera runs dry or `cancel` fires.
    ///
    /// Every event is handed to `on_event` as it happens and every frame to
    /// `sink` with its overlays. The camera is closed on return.
    ///
    /// Fails with [`LinkError::NoMarkerDetected`] if the stream ends before
    /// the ROI locks.
    pub fn run<C, F>(
        &mut self,
        camera: &mut C,
        cancel: &CancellationToken,
        sink: &mut dyn AnnotationSink,
        mut on_event: F,
    ) -> Result<SessionSummary, LinkError>
    where
        C: Camera + ?Sized,
        F: FnMut(&ReceiverEvent),
    {
        let mut messages = Vec::new();

        let stop = loop {
            if cancel.is_cancelled() {
                tracing::info!("Session cancelled");
                break StopReason::Cancelled;
            }

            let frame = match camera.capture() {
                Ok(frame) => frame,
                Err(CameraError::EndOfStream) if self.roi.is_none() => {
                    camera.close();
                    return Err(LinkError::NoMarkerDetected);
                }
                Err(CameraError::EndOfStream) => {
                    tracing::info!("Frame source exhausted");
                    break StopReason::SourceExhausted;
                }
                Err(e) => {
                    camera.close();
                    return Err(e.into());
                }
            };

            let events = self.process_frame(&frame);
            sink.annotate(&frame, &self.overlays());
            for event in &events {
                on_event(event);
                if let ReceiverEvent::Decoded(message) = event {
                    messages.push(message.clone());
                }
            }
        };

        camera.close();
        self.pending.clear();
        let stats = self.stats();
        tracing::info!(
            decoded = stats.messages_decoded,
            discarded = stats.frames_discarded(),
            frames = stats.frames_seen,
            "Session finished"
        );
        Ok(SessionSummary {
            messages,
            stats,
            stop,
            roi: self.roi,
        })
    }

    /// Pulls frames until the next message decodes.
    ///
    /// Fails with [`LinkError::FrameSourceExhausted`] if the stream ends
    /// after calibration, [`LinkError::NoMarkerDetected`] if it ends
    /// before, and [`LinkError::Cancelled`] if `cancel` fires.
    pub fn receive_one<C: Camera + ?Sized>(
        &mut self,
        camera: &mut C,
        cancel: &CancellationToken,
    ) -> Result<DecodedMessage, LinkError> {
        loop {
            if let Some(message) = self.pending.pop_front() {
                return Ok(message);
            }
            if cancel.is_cancelled() {
                return Err(LinkError::Cancelled);
            }
            let frame = match camera.capture() {
                Ok(frame) => frame,
                Err(CameraError::EndOfStream) if self.roi.is_none() => {
                    return Err(LinkError::NoMarkerDetected)
                }
                Err(CameraError::EndOfStream) => return Err(LinkError::FrameSourceExhausted),
                Err(e) => return Err(e.into()),
            };
            self.process_frame(&frame);
        }
    }
}
