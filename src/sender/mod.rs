//! Sender side of the link, used to drive simulations.
//!
//! A real sender is a full-screen color player outside this crate. This
//! module builds the same display timeline so that [`ScriptedCamera`]
//! can film it:
//!
//! ```text
//! marker ─ idle ─ START ─ bit bit bit … ─ END ─ idle
//! ```
//!
//! [`ScriptedCamera`]: crate::capture::ScriptedCamera

mod schedule;

pub use schedule::{DisplayPattern, DisplayStep, SenderSchedule, SenderTiming};

use crate::protocol::{byte_to_bits, check_parity, checksum, encode_text, EncodeError, Parity, ProtocolConfig};

/// Character appended to the data until the payload has the configured
/// parity.
pub const PARITY_PAD: char = ' ';

/// Builds the on-wire bits for `text`:
/// `start · data · checksum · end`.
///
/// If `data · checksum` does not have the configured parity, spaces are
/// appended to the data until it does. The padding is part of the
/// message and is decoded like any other character.
pub fn encode_frame(text: &str, protocol: &ProtocolConfig) -> Result<Vec<u8>, EncodeError> {
    let mut data = encode_text(text)?;
    let pad = encode_text(&PARITY_PAD.to_string())?;

    let mut payload = with_checksum(&data);
    if protocol.parity != Parity::Unsupported {
        let mut pads = 0;
        while !check_parity(&payload, protocol.parity) && pads < 256 {
            data.extend(&pad);
            payload = with_checksum(&data);
            pads += 1;
        }
        if pads > 0 {
            tracing::debug!(pads, "Padded message to satisfy parity");
        }
    }

    let mut bits = protocol.start_sequence.clone();
    bits.extend(payload);
    bits.extend(&protocol.end_sequence);
    Ok(bits)
}

fn with_checksum(data: &[u8]) -> Vec<u8> {
    let mut payload = data.to_vec();
    payload.extend(byte_to_bits(checksum(data)));
    payload
}
