//! Randomness for the server: the core's [`Entropy`] backed by the thread
//! RNG, session tokens and unique upload names.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use menuqr_core::Entropy;
use rand::{Rng, RngCore};

/// Bytes of randomness in a session token.
pub const SESSION_TOKEN_BYTES: usize = 32;

/// [`Entropy`] drawing from `rand::thread_rng()`.
///
/// Create one per operation; it must not be held across an `.await`.
#[derive(Debug, Default)]
pub struct ThreadEntropy;

impl Entropy for ThreadEntropy {
    fn below(&mut self, upper: u32) -> u32 {
        rand::thread_rng().gen_range(0..upper.max(1))
    }
}

/// A fresh session token, base64url without padding.
pub fn session_token() -> String {
    let mut bytes = [0u8; SESSION_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Short unique suffix for stored file names (16 hex digits).
pub fn unique_suffix() -> String {
    format!("{:016x}", rand::thread_rng().next_u64())
}
