//! # Entropy Source
//!
//! The core never reaches for a random number generator on its own. OTP
//! codes and QR code strings draw from an [`Entropy`] handed in by the
//! caller: the server plugs in a CSPRNG, tests plug in a fixed sequence.

/// A source of uniformly distributed integers.
pub trait Entropy {
    /// Return an integer in `0..upper`. `upper` is never zero.
    fn below(&mut self, upper: u32) -> u32;
}

/// Replays a fixed sequence of draws, wrapping each into range.
///
/// Useful for tests that need to force collisions.
#[derive(Debug, Clone)]
pub struct SequenceEntropy {
    values: Vec<u32>,
    position: usize,
}

impl SequenceEntropy {
    #[must_use]
    pub fn new(values: Vec<u32>) -> Self {
        Self {
            values,
            position: 0,
        }
    }
}

impl Entropy for SequenceEntropy {
    fn below(&mut self, upper: u32) -> u32 {
        if self.values.is_empty() || upper == 0 {
            return 0;
        }
        let value = self.values[self.position % self.values.len()];
        self.position = self.position.wrapping_add(1);
        value % upper
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_wraps_values_and_position() {
        let mut e = SequenceEntropy::new(vec![3, 40]);
        assert_eq!(e.below(10), 3);
        assert_eq!(e.below(10), 0);
        assert_eq!(e.below(10), 3);
    }

    #[test]
    fn empty_sequence_yields_zero() {
        let mut e = SequenceEntropy::new(Vec::new());
        assert_eq!(e.below(36), 0);
    }
}
