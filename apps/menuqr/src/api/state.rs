//! Shared handler state.

use super::auth::SessionStore;
use crate::config::DEFAULT_OTP_PER_MINUTE;
use crate::uploads::UploadStore;
use crate::whatsapp::Messenger;
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use menuqr_core::{Registry, Store};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Registry over whichever store the server was started with.
pub type SharedRegistry = Arc<Registry<Box<dyn Store>>>;

/// Login code requests, keyed by normalized phone number.
pub type OtpLimiter = DefaultKeyedRateLimiter<String>;

/// Drop keys whose quota has fully replenished. Returns the keys left.
pub fn prune_limiter(limiter: &OtpLimiter) -> usize {
    limiter.retain_recent();
    limiter.shrink_to_fit();
    limiter.len()
}

/// Everything a handler needs. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub registry: SharedRegistry,
    pub sessions: Arc<SessionStore>,
    pub messenger: Arc<Messenger>,
    pub uploads: Arc<UploadStore>,
    /// Login code requests per phone number.
    pub otp_limiter: Arc<OtpLimiter>,
    /// Public URL encoded into printed QR codes.
    pub base_url: Arc<str>,
}

impl AppState {
    pub fn new(
        registry: SharedRegistry,
        messenger: Messenger,
        uploads: UploadStore,
        otp_per_minute: u32,
        base_url: &str,
    ) -> Self {
        let per_minute = NonZeroU32::new(otp_per_minute)
            .or(NonZeroU32::new(DEFAULT_OTP_PER_MINUTE))
            .unwrap_or(NonZeroU32::MIN);
        Self {
            registry,
            sessions: Arc::new(SessionStore::default()),
            messenger: Arc::new(messenger),
            uploads: Arc::new(uploads),
            otp_limiter: Arc::new(RateLimiter::keyed(Quota::per_minute(per_minute))),
            base_url: Arc::from(base_url.trim_end_matches('/')),
        }
    }

    /// Whether another login code may be sent to `phone_number` now.
    pub fn allow_otp_request(&self, phone_number: &str) -> bool {
        self.otp_limiter.check_key(&phone_number.to_string()).is_ok()
    }

    /// Forget phone numbers that are back to a full quota.
    pub fn prune_otp_limiter(&self) -> usize {
        prune_limiter(&self.otp_limiter)
    }

    /// Scan URL printed on the QR code `code`.
    #[must_use]
    pub fn scan_url(&self, code: &str) -> String {
        format!("{}/q/{code}", self.base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn prune_forgets_replenished_keys() {
        let quota = Quota::with_period(Duration::from_millis(200)).unwrap();
        let limiter: OtpLimiter = RateLimiter::keyed(quota);
        for phone in ["0700000001", "0700000002", "0700000003"] {
            assert!(limiter.check_key(&phone.to_string()).is_ok());
        }
        assert!(limiter.check_key(&"0700000001".to_string()).is_err());

        assert_eq!(prune_limiter(&limiter), 3);
        std::thread::sleep(Duration::from_millis(400));
        assert_eq!(prune_limiter(&limiter), 0);
        assert!(limiter.is_empty());
    }
}
