//! Running buffer of received bits.

/// Append-only bit buffer, trimmed from the front as frames are consumed.
///
/// Holds at most `max_bits`; appending past the cap evicts the oldest
/// bits.
#[derive(Clone)]
pub struct BitBuffer {
    bits: Vec<u8>,
    max_bits: usize,
    evicted: u64,
}

impl BitBuffer {
    /// Creates a buffer holding at most `max_bits` bits.
    pub fn new(max_bits: usize) -> Self {
        let max_bits = max_bits.max(1);
        Self {
            bits: Vec::with_capacity(max_bits.min(4096)),
            max_bits,
            evicted: 0,
        }
    }

    /// Appends bits, evicting from the front if the cap is exceeded.
    pub fn extend(&mut self, bits: &[u8]) {
        self.bits.extend(bits.iter().map(|&b| u8::from(b != 0)));

        let overflow = self.bits.len().saturating_sub(self.max_bits);
        if overflow > 0 {
            self.bits.drain(..overflow);
            self.evicted += overflow as u64;
            tracing::warn!(
                evicted = overflow,
                max_bits = self.max_bits,
                "Bit buffer full, dropped oldest bits"
            );
        }
    }

    /// Appends a single bit.
    pub fn push(&mut self, bit: u8) {
        self.extend(&[bit]);
    }

    /// Returns the buffered bits, oldest first.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.bits
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Capacity in bits.
    pub fn max_bits(&self) -> usize {
        self.max_bits
    }

    /// Total bits dropped by the cap so far.
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    /// Drops the first `count` bits (all of them if fewer are buffered).
    pub fn consume(&mut self, count: usize) {
        let count = count.min(self.bits.len());
        self.bits.drain(..count);
    }

    /// Drops everything except the newest `keep` bits.
    ///
    /// Returns the number of bits dropped.
    pub fn retain_tail(&mut self, keep: usize) -> usize {
        let drop = self.bits.len().saturating_sub(keep);
        self.bits.drain(..drop);
        drop
    }

    /// Empties the buffer.
    pub fn clear(&mut self) {
        self.bits.clear();
    }
}

impl std::fmt::Debug for BitBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitBuffer")
            .field("len", &self.bits.len())
            .field("max_bits", &self.max_bits)
            .field("evicted", &self.evicted)
            .finish()
    }
}
