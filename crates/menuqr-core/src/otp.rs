//! # One-Time Codes
//!
//! Short-lived six digit codes for phone login, delivered over WhatsApp.
//!
//! ## Lifecycle
//!
//! - `generate` replaces any previous code for the phone, valid for 10 minutes
//! - `validate` consumes the code on success; a wrong guess leaves it in place
//! - expired codes are dropped on the next lookup
//!
//! ## Capacity
//!
//! The table is bounded. When full, expired codes are purged first, then the
//! codes closest to expiry are evicted in batches. Everything lives in a
//! `BTreeMap` keyed by phone number.

use crate::entropy::Entropy;
use crate::phone;
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use subtle::ConstantTimeEq;
use tracing::{info, warn};

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Seconds a code stays valid.
pub const OTP_EXPIRY_SECS: i64 = 600;

/// Code issued to configured test phone numbers.
pub const TEST_OTP: &str = "000000";

/// Smallest and largest generated code.
const OTP_MIN: u32 = 100_000;
const OTP_MAX: u32 = 999_999;

/// Default maximum number of outstanding codes.
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Default number of codes evicted at once when full.
pub const DEFAULT_EVICTION_BATCH: usize = 100;

// =============================================================================
// ENTRY
// =============================================================================

#[derive(Debug, Clone)]
struct OtpEntry {
    code: String,
    expires_at: DateTime<Utc>,
}

impl OtpEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Outcome of checking a submitted code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpCheck {
    /// Correct code; it has been consumed.
    Valid,
    /// No code outstanding, or it expired.
    Missing,
    /// A code is outstanding but the submission differs.
    Mismatch,
}

impl OtpCheck {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

// =============================================================================
// OTP CACHE
// =============================================================================

/// Outstanding codes keyed by phone number.
#[derive(Debug)]
pub struct OtpCache {
    entries: BTreeMap<String, OtpEntry>,
    test_numbers: Vec<String>,
    max_size: usize,
    eviction_batch: usize,
    issued: u64,
    accepted: u64,
    rejected: u64,
}

impl Default for OtpCache {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl OtpCache {
    /// Create an empty cache. `test_numbers` always receive [`TEST_OTP`].
    #[must_use]
    pub fn new(test_numbers: Vec<String>) -> Self {
        Self {
            entries: BTreeMap::new(),
            test_numbers,
            max_size: DEFAULT_CAPACITY,
            eviction_batch: DEFAULT_EVICTION_BATCH,
            issued: 0,
            accepted: 0,
            rejected: 0,
        }
    }

    #[must_use]
    pub fn with_capacity(mut self, max_size: usize) -> Self {
        self.max_size = max_size.max(1);
        self
    }

    #[must_use]
    pub fn with_eviction_batch(mut self, batch_size: usize) -> Self {
        self.eviction_batch = batch_size.max(1);
        self
    }

    /// Seconds a freshly generated code stays valid.
    #[must_use]
    pub fn expiry_secs(&self) -> i64 {
        OTP_EXPIRY_SECS
    }

    /// Issue a new code for `phone_number`, replacing any previous one.
    pub fn generate(
        &mut self,
        phone_number: &str,
        now: DateTime<Utc>,
        entropy: &mut impl Entropy,
    ) -> String {
        self.entries.remove(phone_number);

        let code = if phone::matches_test_number(phone_number, &self.test_numbers) {
            info!(phone_number, otp_code = TEST_OTP, "Test OTP generated");
            TEST_OTP.to_string()
        } else {
            let value = OTP_MIN + entropy.below(OTP_MAX - OTP_MIN + 1);
            format!("{value:06}")
        };

        if self.entries.len() >= self.max_size {
            self.evict(now);
        }

        self.entries.insert(
            phone_number.to_string(),
            OtpEntry {
                code: code.clone(),
                expires_at: now + Duration::seconds(OTP_EXPIRY_SECS),
            },
        );
        self.issued = self.issued.saturating_add(1);

        info!(phone_number, expires_in = OTP_EXPIRY_SECS, "OTP generated");
        code
    }

    /// Check a submitted code; a correct one is consumed.
    pub fn check(&mut self, phone_number: &str, code: &str, now: DateTime<Utc>) -> OtpCheck {
        let state = self.entries.get(phone_number).map(|entry| {
            let matches = bool::from(entry.code.as_bytes().ct_eq(code.trim().as_bytes()));
            (entry.is_expired(now), matches)
        });

        let outcome = match state {
            None => OtpCheck::Missing,
            Some((true, _)) => {
                self.entries.remove(phone_number);
                OtpCheck::Missing
            }
            Some((false, true)) => {
                self.entries.remove(phone_number);
                OtpCheck::Valid
            }
            Some((false, false)) => OtpCheck::Mismatch,
        };

        match outcome {
            OtpCheck::Valid => {
                self.accepted = self.accepted.saturating_add(1);
                info!(phone_number, "OTP validated successfully");
            }
            OtpCheck::Missing => {
                self.rejected = self.rejected.saturating_add(1);
                warn!(phone_number, "OTP validation failed - not found or expired");
            }
            OtpCheck::Mismatch => {
                self.rejected = self.rejected.saturating_add(1);
                warn!(phone_number, "OTP validation failed - code mismatch");
            }
        }

        outcome
    }

    /// Boolean form of [`OtpCache::check`].
    pub fn validate(&mut self, phone_number: &str, code: &str, now: DateTime<Utc>) -> bool {
        self.check(phone_number, code, now).is_valid()
    }

    /// Drop any outstanding code for `phone_number`.
    pub fn invalidate(&mut self, phone_number: &str) {
        self.entries.remove(phone_number);
    }

    /// Remove every expired code. Returns how many were dropped.
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before - self.entries.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn contains(&self, phone_number: &str) -> bool {
        self.entries.contains_key(phone_number)
    }

    #[must_use]
    pub fn stats(&self) -> OtpStats {
        OtpStats {
            outstanding: self.entries.len(),
            max_size: self.max_size,
            issued: self.issued,
            accepted: self.accepted,
            rejected: self.rejected,
        }
    }

    /// Make room: purge expired codes, then the soonest-expiring batch.
    fn evict(&mut self, now: DateTime<Utc>) {
        if self.purge_expired(now) > 0 && self.entries.len() < self.max_size {
            return;
        }

        let to_evict = self.eviction_batch.min(self.entries.len());

        let mut by_expiry: BTreeMap<DateTime<Utc>, Vec<String>> = BTreeMap::new();
        for (phone, entry) in &self.entries {
            by_expiry
                .entry(entry.expires_at)
                .or_default()
                .push(phone.clone());
        }

        let mut evicted = 0;
        'outer: for (_expires_at, phones) in by_expiry {
            for phone in phones {
                self.entries.remove(&phone);
                evicted += 1;
                if evicted >= to_evict {
                    break 'outer;
                }
            }
        }
    }
}

// =============================================================================
// STATISTICS
// =============================================================================

/// Counters about issued and checked codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OtpStats {
    pub outstanding: usize,
    pub max_size: usize,
    pub issued: u64,
    pub accepted: u64,
    pub rejected: u64,
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entropy::SequenceEntropy;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, 24, 12, 0, 0).single().unwrap()
    }

    fn entropy() -> SequenceEntropy {
        SequenceEntropy::new(vec![123_456, 654_321, 42])
    }

    #[test]
    fn generated_code_has_six_digits() {
        let mut cache = OtpCache::default();
        let code = cache.generate("0700000000", t0(), &mut entropy());
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(code, "223456");
    }

    #[test]
    fn code_validates_once_then_rejected() {
        let mut cache = OtpCache::default();
        let code = cache.generate("0700000000", t0(), &mut entropy());

        assert!(cache.validate("0700000000", &code, t0()));
        assert_eq!(cache.check("0700000000", &code, t0()), OtpCheck::Missing);
    }

    #[test]
    fn mismatch_keeps_code_outstanding() {
        let mut cache = OtpCache::default();
        let code = cache.generate("0700000000", t0(), &mut entropy());

        assert_eq!(cache.check("0700000000", "111111", t0()), OtpCheck::Mismatch);
        assert!(cache.validate("0700000000", &code, t0()));
    }

    #[test]
    fn expired_code_is_rejected_and_dropped() {
        let mut cache = OtpCache::default();
        let code = cache.generate("0700000000", t0(), &mut entropy());
        let later = t0() + Duration::seconds(OTP_EXPIRY_SECS);

        assert_eq!(cache.check("0700000000", &code, later), OtpCheck::Missing);
        assert!(!cache.contains("0700000000"));
    }

    #[test]
    fn code_valid_just_before_expiry() {
        let mut cache = OtpCache::default();
        let code = cache.generate("0700000000", t0(), &mut entropy());
        let almost = t0() + Duration::seconds(OTP_EXPIRY_SECS - 1);
        assert!(cache.validate("0700000000", &code, almost));
    }

    #[test]
    fn regenerate_replaces_previous_code() {
        let mut cache = OtpCache::default();
        let mut e = entropy();
        let first = cache.generate("0700000000", t0(), &mut e);
        let second = cache.generate("0700000000", t0(), &mut e);
        assert_ne!(first, second);

        assert!(!cache.validate("0700000000", &first, t0()));
        assert!(cache.validate("0700000000", &second, t0()));
    }

    #[test]
    fn test_numbers_get_fixed_code() {
        let mut cache = OtpCache::new(vec!["0779136356".to_string()]);
        let code = cache.generate("2250779136356", t0(), &mut entropy());
        assert_eq!(code, TEST_OTP);
        assert!(cache.validate("2250779136356", TEST_OTP, t0()));
    }

    #[test]
    fn invalidate_removes_code() {
        let mut cache = OtpCache::default();
        let code = cache.generate("0700000000", t0(), &mut entropy());
        cache.invalidate("0700000000");
        assert!(!cache.validate("0700000000", &code, t0()));
    }

    #[test]
    fn full_cache_evicts_soonest_expiring() {
        let mut cache = OtpCache::default()
            .with_capacity(2)
            .with_eviction_batch(1);
        let mut e = entropy();

        cache.generate("0700000001", t0(), &mut e);
        cache.generate("0700000002", t0() + Duration::seconds(10), &mut e);
        cache.generate("0700000003", t0() + Duration::seconds(20), &mut e);

        assert_eq!(cache.len(), 2);
        assert!(!cache.contains("0700000001"));
        assert!(cache.contains("0700000002"));
        assert!(cache.contains("0700000003"));
    }

    #[test]
    fn full_cache_prefers_purging_expired() {
        let mut cache = OtpCache::default()
            .with_capacity(2)
            .with_eviction_batch(1);
        let mut e = entropy();

        cache.generate("0700000001", t0(), &mut e);
        cache.generate("0700000002", t0() + Duration::seconds(300), &mut e);
        let later = t0() + Duration::seconds(OTP_EXPIRY_SECS + 1);
        cache.generate("0700000003", later, &mut e);

        assert!(!cache.contains("0700000001"));
        assert!(cache.contains("0700000002"));
        assert!(cache.contains("0700000003"));
    }

    #[test]
    fn stats_track_outcomes() {
        let mut cache = OtpCache::default();
        let code = cache.generate("0700000000", t0(), &mut entropy());
        let _ = cache.validate("0700000000", "000001", t0());
        let _ = cache.validate("0700000000", &code, t0());

        let stats = cache.stats();
        assert_eq!(stats.issued, 1);
        assert_eq!(stats.accepted, 1);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.outstanding, 0);
    }
}
