//! # QR Code Strings
//!
//! Short codes printed into QR URLs (`/q/{code}`). Five characters over a
//! 36-symbol alphabet give ~60 million codes, so random draws rarely
//! collide; when they do, the generator retries up to a fixed bound.

use crate::entropy::Entropy;
use crate::error::{CoreError, CoreResult};

/// Symbols a code is drawn from.
pub const CODE_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Length of every generated code.
pub const CODE_LENGTH: usize = 5;

/// Draws attempted before giving up on finding a free code.
pub const MAX_ATTEMPTS: u32 = 1000;

/// Codes generated per admin request when no count is given.
pub const DEFAULT_BATCH: u32 = 10;

/// Upper bound on codes generated per admin request.
pub const MAX_BATCH: u32 = 1000;

/// Codes generated by the CLI when no count is given.
pub const DEFAULT_CLI_COUNT: u32 = 1000;

/// Progress is reported every this many codes.
pub const PROGRESS_EVERY: u32 = 100;

/// Draw one random code.
pub fn random_code(entropy: &mut impl Entropy) -> String {
    (0..CODE_LENGTH)
        .map(|_| {
            let index = entropy.below(CODE_ALPHABET.len() as u32) as usize;
            char::from(CODE_ALPHABET[index % CODE_ALPHABET.len()])
        })
        .collect()
}

/// Draw codes until `taken` reports one as free.
///
/// Fails with [`CoreError::CodeSpaceExhausted`] after [`MAX_ATTEMPTS`].
pub fn generate_unique(
    entropy: &mut impl Entropy,
    mut taken: impl FnMut(&str) -> bool,
) -> CoreResult<String> {
    for _ in 0..MAX_ATTEMPTS {
        let code = random_code(entropy);
        if !taken(&code) {
            return Ok(code);
        }
    }
    Err(CoreError::CodeSpaceExhausted {
        attempts: MAX_ATTEMPTS,
    })
}

/// Clamp an admin batch request into `1..=MAX_BATCH`.
#[must_use]
pub fn clamp_batch(requested: Option<i64>) -> u32 {
    let requested = requested.unwrap_or(i64::from(DEFAULT_BATCH));
    requested.clamp(1, i64::from(MAX_BATCH)) as u32
}

/// Whether a string could be a code produced by this module.
#[must_use]
pub fn is_well_formed(code: &str) -> bool {
    code.len() == CODE_LENGTH && code.bytes().all(|b| CODE_ALPHABET.contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entropy::SequenceEntropy;
    use std::collections::BTreeSet;

    #[test]
    fn random_code_uses_alphabet() {
        let mut e = SequenceEntropy::new(vec![0, 25, 26, 35, 1]);
        assert_eq!(random_code(&mut e), "az09b");
    }

    #[test]
    fn generate_retries_on_collision() {
        // First draw "aaaaa" collides, second draw "bbbbb" is free.
        let mut e = SequenceEntropy::new(vec![0, 0, 0, 0, 0, 1, 1, 1, 1, 1]);
        let taken: BTreeSet<&str> = ["aaaaa"].into_iter().collect();
        let mut attempts = 0;

        let code = generate_unique(&mut e, |c| {
            attempts += 1;
            taken.contains(c)
        })
        .unwrap();

        assert_eq!(code, "bbbbb");
        assert_eq!(attempts, 2);
    }

    #[test]
    fn generate_gives_up_after_bound() {
        let mut e = SequenceEntropy::new(vec![7]);
        let mut attempts = 0;
        let result = generate_unique(&mut e, |_| {
            attempts += 1;
            true
        });

        assert!(matches!(
            result,
            Err(CoreError::CodeSpaceExhausted { attempts: MAX_ATTEMPTS })
        ));
        assert_eq!(attempts, MAX_ATTEMPTS);
    }

    #[test]
    fn batch_is_clamped() {
        assert_eq!(clamp_batch(None), DEFAULT_BATCH);
        assert_eq!(clamp_batch(Some(0)), 1);
        assert_eq!(clamp_batch(Some(-5)), 1);
        assert_eq!(clamp_batch(Some(50)), 50);
        assert_eq!(clamp_batch(Some(5000)), MAX_BATCH);
    }

    #[test]
    fn well_formed_codes() {
        assert!(is_well_formed("ab12z"));
        assert!(!is_well_formed("AB12Z"));
        assert!(!is_well_formed("ab12"));
        assert!(!is_well_formed("ab-12"));
    }
}
