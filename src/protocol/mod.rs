//! Framing protocol: synchronization, validation and decoding.
//!
//! ```text
//! bits ─→ FrameSynchronizer ─→ payload ─→ Validator ─→ decode ─→ text
//!              (sentinels)               (parity +      (8-bit
//!                                         checksum)      groups)
//! ```
//!
//! Every stage that rejects a payload still lets the caller drop the
//! consumed bits, so a corrupted span is never matched twice.

mod decode;
mod sync;
mod validate;

pub use decode::{decode, encode_text};
pub use sync::{find_sequence, Extracted, FrameSynchronizer, SyncPolicy};
pub use validate::{
    bits_to_byte, byte_to_bits, check_checksum, check_parity, checksum, Parity,
    ValidationReport, Validator, CHECKSUM_BITS,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capture::ConfigError;

/// Reasons a located frame is discarded. None of these end a session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("parity mismatch")]
    ParityMismatch,
    #[error("checksum mismatch")]
    ChecksumMismatch,
    #[error("payload of {len} bits is not byte aligned")]
    NotByteAligned { len: usize },
}

/// Errors building a frame on the sending side.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("character {0:?} has no single-byte encoding")]
    UnrepresentableChar(char),
}

/// Protocol configuration shared by sender and receiver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    pub start_sequence: Vec<u8>,
    pub end_sequence: Vec<u8>,
    pub parity: Parity,
    pub sync_policy: SyncPolicy,
    /// Hard cap on buffered bits.
    pub max_buffer_bits: usize,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            start_sequence: vec![1, 1, 1, 1, 1, 1, 1, 0],
            end_sequence: vec![0, 1, 1, 1, 1, 1, 1, 1, 1, 0],
            parity: Parity::Even,
            sync_policy: SyncPolicy::FirstStart,
            max_buffer_bits: 4096,
        }
    }
}

impl ProtocolConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, seq) in [("start", &self.start_sequence), ("end", &self.end_sequence)] {
            if seq.is_empty() {
                return Err(ConfigError::InvalidSequence {
                    name,
                    reason: "must not be empty".into(),
                });
            }
            if seq.iter().any(|&b| b > 1) {
                return Err(ConfigError::InvalidSequence {
                    name,
                    reason: "bits must be 0 or 1".into(),
                });
            }
        }
        if self.start_sequence == self.end_sequence {
            return Err(ConfigError::InvalidSequence {
                name: "end",
                reason: "must differ from the start sequence".into(),
            });
        }
        if self.max_buffer_bits < self.start_sequence.len() + self.end_sequence.len() {
            return Err(ConfigError::InvalidThreshold {
                name: "max buffer bits",
                value: self.max_buffer_bits as f64,
            });
        }
        if self.parity == Parity::Unsupported {
            tracing::warn!("Unsupported parity setting, every frame will be rejected");
        }
        Ok(())
    }

    pub fn synchronizer(&self) -> FrameSynchronizer {
        FrameSynchronizer::new(
            self.start_sequence.clone(),
            self.end_sequence.clone(),
            self.sync_policy,
        )
    }

    pub fn validator(&self) -> Validator {
        Validator::new(self.parity)
    }
}

/// Validates a payload and decodes its data bits, checksum trailer
/// excluded.
pub fn validate_and_decode(payload: &[u8], validator: &Validator) -> Result<String, FrameError> {
    validator.validate(payload).into_result()?;
    decode(&payload[..payload.len() - CHECKSUM_BITS])
}
