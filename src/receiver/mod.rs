//! Receiver session: the loop tying every stage together.
//!
//! ```text
//! Idle ─→ LockingRoi ─→ Armed ─→ Receiving ─→ Flushing ─┐
//!              ↑          ↑                              │
//!          reset_roi      └──────────────────────────────┘
//! ```
//!
//! One [`Receiver`] owns the ROI, the capture interval and the bit buffer.
//! Frames are pulled synchronously from a [`Camera`]; cancellation is a
//! flag checked once per frame.
//!
//! [`Camera`]: crate::capture::Camera

mod annotate;
mod session;

pub use annotate::{AnnotationSink, NullSink, Overlay};
pub use session::{
    DecodedMessage, Receiver, ReceiverEvent, ReceiverState, ReceiverStats, SessionSummary,
    StopReason,
};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

use crate::capture::{CameraError, ConfigError};

/// Session-level failures.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("frame source exhausted")]
    FrameSourceExhausted,
    #[error("no calibration marker detected before the stream ended")]
    NoMarkerDetected,
    #[error("session cancelled")]
    Cancelled,
    #[error("camera error: {0}")]
    Camera(#[from] CameraError),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Cooperative stop flag shared between the session loop and whoever
/// wants it to stop (a Ctrl-C handler, a test).
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
