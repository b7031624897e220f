//! Sentinel-delimited frame synchronization.
//!
//! A frame on the wire is `START_SEQUENCE · payload · END_SEQUENCE`. The
//! payload is not escaped, so a payload that happens to contain the end
//! sequence is cut short; validation catches that downstream.

use serde::{Deserialize, Serialize};

/// What to do when a second start sequence appears before the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPolicy {
    /// Keep the first start; a repeated start becomes payload.
    #[default]
    FirstStart,
    /// Restart at the newest start preceding the end; earlier bits are
    /// consumed as part of the frame but not returned.
    LatestStart,
}

/// A payload located in a bit stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    /// Bits strictly between the sentinels.
    pub payload: Vec<u8>,
    /// Bits to drop from the front of the buffer, through the end sentinel.
    pub consumed: usize,
}

/// Returns the index of the first exact occurrence of `pattern` in
/// `bits` at or after `from`.
pub fn find_sequence(bits: &[u8], pattern: &[u8], from: usize) -> Option<usize> {
    if pattern.is_empty() || from > bits.len() {
        return None;
    }
    bits[from..]
        .windows(pattern.len())
        .position(|w| w == pattern)
        .map(|i| i + from)
}

/// Finds frames between start and end sentinels.
#[derive(Debug, Clone)]
pub struct FrameSynchronizer {
    start: Vec<u8>,
    end: Vec<u8>,
    policy: SyncPolicy,
}

impl FrameSynchronizer {
    pub fn new(start: Vec<u8>, end: Vec<u8>, policy: SyncPolicy) -> Self {
        Self { start, end, policy }
    }

    pub fn start_sequence(&self) -> &[u8] {
        &self.start
    }

    pub fn end_sequence(&self) -> &[u8] {
        &self.end
    }

    /// Extracts the first complete frame from `bits`.
    ///
    /// Returns `None` when no start sequence is present, or when a start is
    /// present but no end follows it. The input is never modified; the
    /// caller drops `consumed` bits on success.
    pub fn try_extract(&self, bits: &[u8]) -> Option<Extracted> {
        let s = find_sequence(bits, &self.start, 0)?;
        let payload_start = s + self.start.len();
        let e = find_sequence(bits, &self.end, payload_start)?;

        let payload_start = match self.policy {
            SyncPolicy::FirstStart => payload_start,
            SyncPolicy::LatestStart => self.latest_start(bits, payload_start, e),
        };

        Some(Extracted {
            payload: bits[payload_start..e].to_vec(),
            consumed: e + self.end.len(),
        })
    }

    // Payload start after the last start sequence that fits entirely
    // before `end`.
    fn latest_start(&self, bits: &[u8], mut payload_start: usize, end: usize) -> usize {
        let mut from = payload_start;
        while let Some(s) = find_sequence(&bits[..end], &self.start, from) {
            tracing::debug!(
                discarded = s + self.start.len() - payload_start,
                "Repeated start sequence, resynchronizing"
            );
            payload_start = s + self.start.len();
            from = s + 1;
        }
        payload_start
    }

    /// Returns true if `bits` contains the start sequence anywhere.
    pub fn has_start(&self, bits: &[u8]) -> bool {
        find_sequence(bits, &self.start, 0).is_some()
    }

    /// Number of trailing bits worth keeping when no start sequence is
    /// present: a partial start may straddle the buffer's end.
    pub fn stale_keep(&self) -> usize {
        self.start.len().saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const START: [u8; 4] = [1, 1, 1, 1];
    const END: [u8; 4] = [0, 0, 0, 0];

    fn sync(policy: SyncPolicy) -> FrameSynchronizer {
        FrameSynchronizer::new(START.to_vec(), END.to_vec(), policy)
    }

    fn framed(payload: &[u8]) -> Vec<u8> {
        [&START[..], payload, &END[..]].concat()
    }

    #[test]
    fn test_find_sequence() {
        let bits = [0, 1, 1, 0, 1, 1];
        assert_eq!(find_sequence(&bits, &[1, 1], 0), Some(1));
        assert_eq!(find_sequence(&bits, &[1, 1], 2), Some(4));
        assert_eq!(find_sequence(&bits, &[1, 1, 1], 0), None);
        assert_eq!(find_sequence(&bits, &[], 0), None);
        assert_eq!(find_sequence(&bits, &[1], 7), None);
    }

    #[test]
    fn test_simple_frame() {
        let bits = framed(&[0, 1, 0, 1]);
        let extracted = sync(SyncPolicy::FirstStart).try_extract(&bits).unwrap();
        assert_eq!(extracted.payload, vec![0, 1, 0, 1]);
        assert_eq!(extracted.consumed, 12);
    }

    #[test]
    fn test_leading_noise_and_trailing_bits() {
        let mut bits = vec![0, 0, 1, 0];
        bits.extend(framed(&[0, 1]));
        bits.extend([1, 1]);

        let extracted = sync(SyncPolicy::FirstStart).try_extract(&bits).unwrap();
        assert_eq!(extracted.payload, vec![0, 1]);
        assert_eq!(extracted.consumed, 4 + 10);
    }

    #[test]
    fn test_no_start() {
        let bits = [0, 0, 1, 0, 0, 1, 1, 0];
        assert!(sync(SyncPolicy::FirstStart).try_extract(&bits).is_none());
    }

    #[test]
    fn test_start_without_end() {
        let bits = [1, 1, 1, 1, 0, 0, 1, 0, 0];
        let sync = sync(SyncPolicy::FirstStart);
        assert!(sync.try_extract(&bits).is_none());
        assert!(sync.has_start(&bits));
    }

    #[test]
    fn test_end_before_start_is_ignored() {
        let mut bits = END.to_vec();
        bits.extend(framed(&[1, 1]));
        let extracted = sync(SyncPolicy::FirstStart).try_extract(&bits).unwrap();
        assert_eq!(extracted.payload, vec![1, 1]);
        assert_eq!(extracted.consumed, bits.len());
    }

    #[test]
    fn test_end_search_begins_after_start() {
        // 1101: the end sequence 101 overlaps the start 110 and must not
        // match.
        let sync = FrameSynchronizer::new(vec![1, 1, 0], vec![1, 0, 1], SyncPolicy::FirstStart);
        assert!(sync.try_extract(&[1, 1, 0, 1]).is_none());
        let extracted = sync.try_extract(&[1, 1, 0, 1, 0, 1]).unwrap();
        assert!(extracted.payload.is_empty());
        assert_eq!(extracted.consumed, 6);
    }

    #[test]
    fn test_second_start_first_policy_keeps_it_in_payload() {
        // START 00 START 01 END
        let mut bits = START.to_vec();
        bits.extend([0, 0]);
        bits.extend(framed(&[0, 1]));

        let extracted = sync(SyncPolicy::FirstStart).try_extract(&bits).unwrap();
        assert_eq!(extracted.payload, [&[0, 0][..], &START[..], &[0, 1][..]].concat());
        assert_eq!(extracted.consumed, bits.len());
    }

    #[test]
    fn test_second_start_latest_policy_resynchronizes() {
        let mut bits = START.to_vec();
        bits.extend([0, 0]);
        bits.extend(framed(&[0, 1]));

        let extracted = sync(SyncPolicy::LatestStart).try_extract(&bits).unwrap();
        assert_eq!(extracted.payload, vec![0, 1]);
        assert_eq!(extracted.consumed, bits.len());
    }

    #[test]
    fn test_stale_keep() {
        assert_eq!(sync(SyncPolicy::FirstStart).stale_keep(), 3);
    }

    proptest! {
        #[test]
        fn prop_framed_payload_is_extracted(payload in proptest::collection::vec(0u8..=1, 0..64)) {
            let bits = framed(&payload);
            // Payloads that contain (or run into) the end sentinel are
            // legitimately cut short.
            prop_assume!(find_sequence(&bits, &END, START.len()) == Some(START.len() + payload.len()));

            let extracted = sync(SyncPolicy::FirstStart).try_extract(&bits).unwrap();
            prop_assert_eq!(extracted.consumed, START.len() + payload.len() + END.len());
            prop_assert_eq!(extracted.payload, payload);
        }

        #[test]
        fn prop_no_start_returns_none(bits in proptest::collection::vec(0u8..=1, 0..64)) {
            prop_assume!(find_sequence(&bits, &START, 0).is_none());
            let before = bits.clone();
            prop_assert!(sync(SyncPolicy::FirstStart).try_extract(&bits).is_none());
            prop_assert_eq!(bits, before);
        }
    }
}
