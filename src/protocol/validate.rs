//! Parity and checksum validation of extracted payloads.
//!
//! The payload is `data · checksum`, where the checksum is the last eight
//! bits (MSB first) and equals the number of set data bits modulo 256.
//! Parity is taken over the whole payload, checksum included.

use serde::{Deserialize, Serialize};

use super::FrameError;

/// Number of trailing checksum bits.
pub const CHECKSUM_BITS: usize = 8;

/// Expected parity of the number of set bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parity {
    #[default]
    Even,
    Odd,
    /// Any unrecognized setting. Never satisfied.
    #[serde(other)]
    Unsupported,
}

/// Returns true if the count of set bits matches `parity`.
pub fn check_parity(bits: &[u8], parity: Parity) -> bool {
    let ones = count_ones(bits);
    match parity {
        Parity::Even => ones % 2 == 0,
        Parity::Odd => ones % 2 == 1,
        Parity::Unsupported => false,
    }
}

/// Checksum of a bit slice: set bits modulo 256.
pub fn checksum(bits: &[u8]) -> u8 {
    (count_ones(bits) % 256) as u8
}

/// Returns true if the trailing eight bits equal the checksum of the bits
/// before them. Payloads shorter than eight bits fail.
pub fn check_checksum(bits: &[u8]) -> bool {
    if bits.len() < CHECKSUM_BITS {
        return false;
    }
    let (data, trailer) = bits.split_at(bits.len() - CHECKSUM_BITS);
    bits_to_byte(trailer) == checksum(data)
}

/// Reads up to eight bits, MSB first, as a byte.
pub fn bits_to_byte(bits: &[u8]) -> u8 {
    bits.iter()
        .take(8)
        .fold(0u8, |acc, &bit| (acc << 1) | u8::from(bit != 0))
}

/// Expands a byte into eight bits, MSB first.
pub fn byte_to_bits(byte: u8) -> [u8; 8] {
    let mut bits = [0u8; 8];
    for (i, bit) in bits.iter_mut().enumerate() {
        *bit = (byte >> (7 - i)) & 1;
    }
    bits
}

fn count_ones(bits: &[u8]) -> usize {
    bits.iter().filter(|&&b| b != 0).count()
}

/// Outcome of both checks on one payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationReport {
    pub parity_ok: bool,
    pub checksum_ok: bool,
}

impl ValidationReport {
    /// Both checks passed.
    pub fn is_valid(&self) -> bool {
        self.parity_ok && self.checksum_ok
    }

    /// Converts a failed report into the first failing check.
    pub fn into_result(self) -> Result<(), FrameError> {
        if !self.parity_ok {
            Err(FrameError::ParityMismatch)
        } else if !self.checksum_ok {
            Err(FrameError::ChecksumMismatch)
        } else {
            Ok(())
        }
    }
}

/// Validates payloads against a configured parity.
#[derive(Debug, Clone, Copy, Default)]
pub struct Validator {
    parity: Parity,
}

impl Validator {
    pub fn new(parity: Parity) -> Self {
        Self { parity }
    }

    pub fn parity(&self) -> Parity {
        self.parity
    }

    /// Runs both checks.
    pub fn validate(&self, payload: &[u8]) -> ValidationReport {
        ValidationReport {
            parity_ok: check_parity(payload, self.parity),
            checksum_ok: check_checksum(payload),
        }
    }
}
