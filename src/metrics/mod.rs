//! Prometheus metrics exporter for the optical link.
//!
//! # Metrics Exposed
//!
//! ## Session
//! - `optical_link_roi_locked` - Whether the screen region is locked
//! - `optical_link_frames_seen_total` - Camera frames processed
//! - `optical_link_capture_interval_seconds` - Current bit sampling interval
//!
//! ## Decoding
//! - `optical_link_bits_sampled_total` - Bits read from the screen
//! - `optical_link_messages_decoded_total` - Frames that validated and decoded
//! - `optical_link_frames_discarded_total{reason}` - Discards by `parity`, `checksum` or `alignment`
//!
//! ## Buffer
//! - `optical_link_buffer_bits` - Bits awaiting a complete frame
//! - `optical_link_bits_trimmed_total` - Bits dropped with no start sequence before them
//! - `optical_link_bits_evicted_total` - Bits dropped by the buffer cap
//!
//! ## Self-test
//! - `optical_link_bit_error_rate` - Latest measured BER
//!
//! # Example
//!
//! ```no_run
//! use optical_link::config::LinkConfig;
//! use optical_link::metrics::{MetricsRegistry, MetricsSnapshot};
//! use optical_link::receiver::Receiver;
//!
//! let registry = MetricsRegistry::new().expect("Failed to create registry");
//! let receiver = Receiver::new(&LinkConfig::default()).expect("valid config");
//!
//! registry.update(&MetricsSnapshot::from_receiver(&receiver));
//! println!("{}", registry.encode().unwrap());
//! ```

mod collector;
#[cfg(feature = "metrics")]
mod server;

pub use collector::{MetricsError, MetricsRegistry, MetricsSnapshot};
#[cfg(feature = "metrics")]
pub use server::{MetricsServer, MetricsServerConfig, MetricsState, ServerError};
