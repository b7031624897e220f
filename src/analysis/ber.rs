//! Bit error rate against a known transmission.

use std::collections::VecDeque;

/// Fraction of transmitted bits not received intact.
///
/// Bits are compared position by position. A transmitted bit with no
/// received counterpart counts as an error; surplus received bits are
/// ignored. An empty transmission has a rate of zero.
pub fn bit_error_rate(transmitted: &[u8], received: &[u8]) -> f64 {
    if transmitted.is_empty() {
        return 0.0;
    }
    errors(transmitted, received).filter(|&e| e).count() as f64 / transmitted.len() as f64
}

fn errors<'a>(transmitted: &'a [u8], received: &'a [u8]) -> impl Iterator<Item = bool> + 'a {
    transmitted
        .iter()
        .enumerate()
        .map(move |(i, &sent)| received.get(i).map_or(true, |&got| (sent != 0) != (got != 0)))
}

/// Bit error rate over the most recent compared bits.
#[derive(Debug, Clone)]
pub struct BerWindow {
    outcomes: VecDeque<bool>,
    capacity: usize,
    errors: usize,
}

impl BerWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            outcomes: VecDeque::with_capacity(capacity),
            capacity,
            errors: 0,
        }
    }

    /// Adds one transmission's comparison to the window.
    pub fn record(&mut self, transmitted: &[u8], received: &[u8]) {
        for error in errors(transmitted, received) {
            if self.outcomes.len() == self.capacity {
                if let Some(true) = self.outcomes.pop_front() {
                    self.errors -= 1;
                }
            }
            self.outcomes.push_back(error);
            if error {
                self.errors += 1;
            }
        }
    }

    /// Current rate, or `None` before anything was recorded.
    pub fn ber(&self) -> Option<f64> {
        if self.outcomes.is_empty() {
            None
        } else {
            Some(self.errors as f64 / self.outcomes.len() as f64)
        }
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn clear(&mut self) {
        self.outcomes.clear();
        self.errors = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_sequences() {
        assert_eq!(bit_error_rate(&[1, 0, 1, 1], &[1, 0, 1, 1]), 0.0);
    }

    #[test]
    fn test_mismatches() {
        assert_eq!(bit_error_rate(&[1, 0, 1, 1], &[1, 1, 1, 0]), 0.5);
    }

    #[test]
    fn test_missing_and_surplus_bits() {
        // Two bits never arrived
        assert_eq!(bit_error_rate(&[1, 0, 1, 1], &[1, 0]), 0.5);
        // Extra received bits are not counted
        assert_eq!(bit_error_rate(&[1, 0], &[1, 0, 1, 1, 1]), 0.0);
    }

    #[test]
    fn test_empty_transmission() {
        assert_eq!(bit_error_rate(&[], &[1, 0]), 0.0);
    }

    #[test]
    fn test_window_slides() {
        let mut window = BerWindow::new(4);
        assert_eq!(window.ber(), None);

        window.record(&[1, 1, 1, 1], &[0, 0, 1, 1]);
        assert_eq!(window.ber(), Some(0.5));

        // Pushes out the two errors
        window.record(&[0, 0], &[0, 0]);
        assert_eq!(window.len(), 4);
        assert_eq!(window.ber(), Some(0.0));

        window.clear();
        assert!(window.is_empty());
    }
}
