//! Optical Link Receiver Library
//!
//! Receives text sent as a sequence of full-screen colors, filmed by a
//! camera. A sender shows a calibration marker, then a start color, one
//! color per bit, and an end color; the receiver finds the screen, samples
//! it on a timer and recovers framed, checksummed messages.
//!
//! # Architecture
//!
//! The receiver follows an explicit data flow:
//!
//! ```text
//! capture → locate → sampling → protocol (sync → validate → decode)
//!              ↓          ↓
//!          classify (HSV roles, luminance split)
//!
//! receiver: state machine driving the stages, one frame at a time
//! analysis: BER measurement and capture-rate control (self-test)
//! ```
//!
//! # Design Principles
//!
//! - **Single-threaded and poll-driven**: frames are pulled synchronously;
//!   timers compare frame timestamps instead of sleeping
//! - **Corrupt frames never stall the stream**: discarded payloads still
//!   advance the bit buffer past their sentinels
//! - **Bounded memory**: bits before any start sequence are trimmed and
//!   the buffer has a hard cap
//!
//! # Example
//!
//! ```no_run
//! use optical_link::{
//!     capture::{Camera, ScriptedCamera},
//!     config::LinkConfig,
//!     receiver::{CancellationToken, NullSink, Receiver},
//!     sender::{encode_frame, SenderSchedule},
//! };
//!
//! let config = LinkConfig::default();
//!
//! // Simulate a sender showing "hello"
//! let bits = encode_frame("hello", &config.protocol).unwrap();
//! let schedule = SenderSchedule::for_transmissions(
//!     &[bits],
//!     &config.channel,
//!     &config.sender,
//!     config.sampling.bits_per_tick(),
//! );
//! let screen = ScriptedCamera::centered_screen(&config.capture, 0.6);
//! let mut camera = ScriptedCamera::new(schedule, screen);
//! camera.open(&config.capture).unwrap();
//!
//! // Receive it
//! let mut receiver = Receiver::new(&config).unwrap();
//! let summary = receiver
//!     .run(&mut camera, &CancellationToken::new(), &mut NullSink, |_| {})
//!     .unwrap();
//! for message in summary.messages {
//!     println!("{}", message.text);
//! }
//! ```

#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod analysis;
pub mod capture;
pub mod classify;
pub mod config;
pub mod locate;
pub mod metrics;
pub mod protocol;
pub mod receiver;
pub mod sampling;
pub mod sender;

// Re-export commonly used types at crate root
pub use analysis::{RateController, SelfTest};
pub use capture::{Camera, CaptureConfig, Frame, ScriptedCamera};
pub use classify::{ChannelMap, Symbol, SymbolClassifier};
pub use config::LinkConfig;
pub use locate::{Roi, RoiLocator};
pub use protocol::{FrameError, FrameSynchronizer, Parity, Validator};
pub use receiver::{CancellationToken, LinkError, Receiver, ReceiverEvent};
pub use sampling::{BitBuffer, BitSampler};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
