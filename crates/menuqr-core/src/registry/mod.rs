//! # Registry
//!
//! The single entry point the app layer drives. A [`Registry`] owns:
//! - the [`Store`] holding every record
//! - the [`OtpCache`] of outstanding login codes
//! - a writer lock serializing read-modify-write sequences
//!
//! Reads go straight to the store. Every mutation takes the writer lock
//! first, re-reads what it needs, and commits one [`Batch`], so concurrent
//! requests never lose an update (two scans of the same code both count).
//!
//! Operations are split by area across the submodules; each adds an
//! `impl<S: Store> Registry<S>` block.

mod menus;
mod notifications;
mod qrcodes;
mod restaurants;
mod users;

pub use qrcodes::QrFilter;
pub use users::NewUser;

use crate::entropy::Entropy;
use crate::error::{CoreError, CoreResult};
use crate::otp::{OtpCache, OtpCheck, OtpStats};
use crate::stats::AdminStats;
use crate::storage::{Batch, Record, Store, StoreExt};
use crate::types::{QrCode, Restaurant, User};
use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard};

/// Application façade over a [`Store`].
pub struct Registry<S: Store> {
    store: S,
    otp: Mutex<OtpCache>,
    writer: Mutex<()>,
}

impl<S: Store> std::fmt::Debug for Registry<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry").finish_non_exhaustive()
    }
}

impl<S: Store> Registry<S> {
    #[must_use]
    pub fn new(store: S, otp: OtpCache) -> Self {
        Self {
            store,
            otp: Mutex::new(otp),
            writer: Mutex::new(()),
        }
    }

    /// Underlying store, for read-only inspection.
    pub fn store(&self) -> &S {
        &self.store
    }

    // ===== LOCKS =====

    fn lock_writer(&self) -> CoreResult<MutexGuard<'_, ()>> {
        self.writer
            .lock()
            .map_err(|_| CoreError::LockPoisoned("registry writer"))
    }

    fn lock_otp(&self) -> CoreResult<MutexGuard<'_, OtpCache>> {
        self.otp
            .lock()
            .map_err(|_| CoreError::LockPoisoned("otp cache"))
    }

    // ===== RECORD HELPERS =====

    fn find<R: Record>(&self, key: &[u8]) -> CoreResult<Option<R>> {
        self.store.get(key)
    }

    fn require<R: Record>(&self, key: &[u8], what: &str) -> CoreResult<R> {
        self.find(key)?
            .ok_or_else(|| CoreError::not_found(format!("{what} not found")))
    }

    fn commit(&self, batch: Batch) -> CoreResult<()> {
        self.store.apply(batch)
    }

    fn save<R: Record>(&self, record: &R) -> CoreResult<()> {
        self.store.put(record)
    }

    // ===== ONE-TIME CODES =====

    /// Issue a login code for an already normalized phone number.
    pub fn issue_otp(
        &self,
        phone_number: &str,
        now: DateTime<Utc>,
        entropy: &mut impl Entropy,
    ) -> CoreResult<String> {
        Ok(self.lock_otp()?.generate(phone_number, now, entropy))
    }

    /// Check a submitted code. A valid code is consumed.
    pub fn check_otp(
        &self,
        phone_number: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> CoreResult<OtpCheck> {
        Ok(self.lock_otp()?.check(phone_number, code, now))
    }

    /// Drop expired codes. Returns how many were removed.
    pub fn purge_expired_otps(&self, now: DateTime<Utc>) -> CoreResult<usize> {
        Ok(self.lock_otp()?.purge_expired(now))
    }

    pub fn otp_stats(&self) -> CoreResult<OtpStats> {
        Ok(self.lock_otp()?.stats())
    }

    // ===== DASHBOARD =====

    pub fn admin_stats(&self) -> CoreResult<AdminStats> {
        let users: Vec<User> = self.store.all()?;
        let restaurants: Vec<Restaurant> = self.store.all()?;
        let qr_codes: Vec<QrCode> = self.store.all()?;
        Ok(AdminStats::compose(&users, &restaurants, &qr_codes))
    }
}

/// Newest first, ties broken by id for a stable order.
fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> (DateTime<Utc>, Vec<u8>)) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

/// Trimmed, non-empty text or a validation error carrying `message`.
fn required(value: &str, message: &str) -> CoreResult<String> {
    let value = value.trim();
    if value.is_empty() {
        Err(CoreError::validation(message))
    } else {
        Ok(value.to_string())
    }
}

/// Trimmed text, `None` when blank.
fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::storage::MemoryStore;
    use chrono::TimeZone;

    pub const TEST_PHONE: &str = "0700000000";

    pub fn registry() -> Registry<MemoryStore> {
        Registry::new(
            MemoryStore::new(),
            OtpCache::new(vec![TEST_PHONE.to_string()]),
        )
    }

    pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, day, hour, 0, 0)
            .single()
            .unwrap()
    }

    /// A user who finished onboarding, with their restaurant.
    pub fn owner(registry: &Registry<MemoryStore>, phone: &str) -> (User, Restaurant) {
        let user = registry.login_user(phone, at(1, 9)).unwrap();
        registry.onboarding_first_name(user.id, "Awa").unwrap();
        registry
            .onboarding_restaurant(user.id, &format!("Maquis {phone}"), at(1, 9))
            .unwrap()
    }
}
