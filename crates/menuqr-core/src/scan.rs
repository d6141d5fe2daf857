//! # Scan Tracking
//!
//! Each visit to `/q/{code}` bumps the counters on the [`QrCode`] and
//! appends a [`QrCodeScan`] row. Anonymous visits are correlated through a
//! browser fingerprint, either sent along with the scan or attached later
//! by an asynchronous beacon.
//!
//! Counter rules:
//! - `total_scans` always increments
//! - `scans_today` restarts at 1 on the first scan of a new calendar day
//! - dates are UTC calendar days
//!
//! Fingerprints are stored exactly as received once they pass validation;
//! case is not normalized.

use crate::storage::ScanEntry;
use crate::types::QrCode;
use chrono::{DateTime, NaiveDate, Utc};

/// Length of a hex encoded SHA-256 digest.
pub const FINGERPRINT_LEN: usize = 64;

impl QrCode {
    /// Record one scan happening at `now`.
    pub fn increment_scans(&mut self, now: DateTime<Utc>) {
        let today = now.date_naive();

        self.total_scans = self.total_scans.saturating_add(1);
        self.last_scanned_at = Some(now);

        if self.last_scan_date == Some(today) {
            self.scans_today = self.scans_today.saturating_add(1);
        } else {
            self.scans_today = 1;
            self.last_scan_date = Some(today);
        }
    }

    /// Today's counter, or 0 when it belongs to an earlier day.
    #[must_use]
    pub fn scans_today_at(&self, today: NaiveDate) -> u64 {
        if self.last_scan_date == Some(today) {
            self.scans_today
        } else {
            0
        }
    }
}

/// A fingerprint is exactly 64 hex digits, any case.
#[must_use]
pub fn is_valid_fingerprint(value: &str) -> bool {
    value.len() == FINGERPRINT_LEN && value.bytes().all(|b| b.is_ascii_hexdigit())
}

/// The fingerprint as sent, or `None` if absent or malformed.
#[must_use]
pub fn accept_fingerprint(value: Option<&str>) -> Option<String> {
    value.filter(|v| is_valid_fingerprint(v)).map(str::to_string)
}

/// Index entries of one code falling on `day`.
#[must_use]
pub fn count_on_day(entries: &[ScanEntry], day: NaiveDate) -> u64 {
    entries
        .iter()
        .filter(|e| e.scanned_at.date_naive() == day)
        .count() as u64
}

/// Newest entry still waiting for its fingerprint. `entries` come from one
/// code, oldest first.
#[must_use]
pub fn latest_without_fingerprint(entries: &[ScanEntry]) -> Option<&ScanEntry> {
    entries.iter().rev().find(|e| !e.fingerprinted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ScanId;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, day, hour, 0, 0).single().unwrap()
    }

    fn entry(when: DateTime<Utc>, fingerprinted: bool) -> ScanEntry {
        ScanEntry {
            scan_id: ScanId::new(),
            scanned_at: when,
            fingerprinted,
        }
    }

    #[test]
    fn first_scan_starts_counters() {
        let mut qr = QrCode::new("abcde", at(1, 8));
        qr.increment_scans(at(2, 9));

        assert_eq!(qr.total_scans, 1);
        assert_eq!(qr.scans_today, 1);
        assert_eq!(qr.last_scan_date, Some(at(2, 9).date_naive()));
        assert_eq!(qr.last_scanned_at, Some(at(2, 9)));
    }

    #[test]
    fn same_day_scans_accumulate() {
        let mut qr = QrCode::new("abcde", at(1, 8));
        qr.increment_scans(at(2, 9));
        qr.increment_scans(at(2, 12));
        qr.increment_scans(at(2, 23));

        assert_eq!(qr.total_scans, 3);
        assert_eq!(qr.scans_today, 3);
    }

    #[test]
    fn new_day_resets_daily_counter() {
        let mut qr = QrCode::new("abcde", at(1, 8));
        qr.increment_scans(at(2, 9));
        qr.increment_scans(at(2, 10));
        qr.increment_scans(at(3, 0));

        assert_eq!(qr.total_scans, 3);
        assert_eq!(qr.scans_today, 1);
        assert_eq!(qr.last_scan_date, Some(at(3, 0).date_naive()));
    }

    #[test]
    fn stale_daily_counter_reads_zero() {
        let mut qr = QrCode::new("abcde", at(1, 8));
        qr.increment_scans(at(2, 9));

        assert_eq!(qr.scans_today_at(at(2, 0).date_naive()), 1);
        assert_eq!(qr.scans_today_at(at(5, 0).date_naive()), 0);
    }

    #[test]
    fn fingerprint_format() {
        let good = "a".repeat(64);
        let upper = "ABCDEF0123456789".repeat(4);
        assert!(is_valid_fingerprint(&good));
        assert!(is_valid_fingerprint(&upper));
        assert!(!is_valid_fingerprint(&"a".repeat(63)));
        assert!(!is_valid_fingerprint(&"g".repeat(64)));
        assert_eq!(accept_fingerprint(Some("nope")), None);
        assert_eq!(accept_fingerprint(None), None);
    }

    #[test]
    fn accepted_fingerprint_keeps_its_case() {
        let mixed = "ABCDEF0123456789abcdef0123456789".repeat(2);
        assert_eq!(accept_fingerprint(Some(&mixed)), Some(mixed.clone()));
        assert_eq!(accept_fingerprint(Some(&format!(" {mixed}"))), None);
    }

    #[test]
    fn log_counts_by_day() {
        let entries = vec![
            entry(at(2, 9), false),
            entry(at(3, 9), false),
            entry(at(3, 18), true),
        ];

        assert_eq!(count_on_day(&entries, at(3, 0).date_naive()), 2);
        assert_eq!(count_on_day(&entries, at(2, 0).date_naive()), 1);
        assert_eq!(count_on_day(&entries, at(4, 0).date_naive()), 0);
    }

    #[test]
    fn latest_unfingerprinted_scan_is_found() {
        let entries = vec![
            entry(at(3, 8), false),
            entry(at(3, 9), false),
            entry(at(3, 10), true),
        ];

        let found = latest_without_fingerprint(&entries).map(|e| e.scanned_at);
        assert_eq!(found, Some(at(3, 9)));
        assert!(latest_without_fingerprint(&entries[2..]).is_none());
    }
}
