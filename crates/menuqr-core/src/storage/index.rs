//! # Index Tables
//!
//! Raw lookup tables written in the same [`Batch`] as the record they point
//! at:
//! - `qr_codes_by_code`: code string to QR code id
//! - `qr_code_scans_by_qr_code`: QR code id + scan time + scan id to a
//!   one-byte "has fingerprint" flag
//!
//! Scan keys sort by time within one code, so a prefix range yields the scans
//! of a single code oldest first without decoding any scan row.

use super::{Batch, Store};
use crate::error::{CoreError, CoreResult};
use crate::types::{QrCode, QrCodeId, QrCodeScan, ScanId};
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub const QR_CODES_BY_CODE: &str = "qr_codes_by_code";
pub const SCANS_BY_QR_CODE: &str = "qr_code_scans_by_qr_code";

const ID_LEN: usize = 16;
const TIME_LEN: usize = 8;
const SCAN_KEY_LEN: usize = ID_LEN + TIME_LEN + ID_LEN;
const SIGN_BIT: u64 = 1 << 63;

fn corrupt() -> CoreError {
    CoreError::Storage("Corrupt index entry".to_string())
}

// Microseconds with the sign bit flipped: byte order equals time order.
fn time_bytes(at: DateTime<Utc>) -> [u8; TIME_LEN] {
    ((at.timestamp_micros() as u64) ^ SIGN_BIT).to_be_bytes()
}

fn time_from_bytes(bytes: [u8; TIME_LEN]) -> CoreResult<DateTime<Utc>> {
    let micros = (u64::from_be_bytes(bytes) ^ SIGN_BIT) as i64;
    DateTime::from_timestamp_micros(micros).ok_or_else(corrupt)
}

/// Key of `scan` in the scan index.
#[must_use]
pub fn scan_key(scan: &QrCodeScan) -> Vec<u8> {
    let mut key = Vec::with_capacity(SCAN_KEY_LEN);
    key.extend_from_slice(scan.qr_code_id.as_bytes());
    key.extend_from_slice(&time_bytes(scan.scanned_at));
    key.extend_from_slice(scan.id.as_bytes());
    key
}

/// One scan index row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanEntry {
    pub scan_id: ScanId,
    pub scanned_at: DateTime<Utc>,
    pub fingerprinted: bool,
}

impl ScanEntry {
    fn decode(key: &[u8], value: &[u8]) -> CoreResult<Self> {
        if key.len() != SCAN_KEY_LEN {
            return Err(corrupt());
        }
        let (time, id) = key[ID_LEN..].split_at(TIME_LEN);
        let time: [u8; TIME_LEN] = time.try_into().map_err(|_| corrupt())?;
        let id = Uuid::from_slice(id).map_err(|_| corrupt())?;

        Ok(Self {
            scan_id: ScanId(id),
            scanned_at: time_from_bytes(time)?,
            fingerprinted: value.first() == Some(&1),
        })
    }
}

impl Batch {
    /// Queue the code lookup entry of a new QR code.
    pub fn index_qr_code(&mut self, qr: &QrCode) -> &mut Self {
        self.put_raw(
            QR_CODES_BY_CODE,
            qr.code.as_bytes().to_vec(),
            qr.id.as_bytes().to_vec(),
        )
    }

    /// Queue the index entry of `scan`. Queue it again when the fingerprint
    /// gets filled in.
    pub fn index_scan(&mut self, scan: &QrCodeScan) -> &mut Self {
        self.put_raw(
            SCANS_BY_QR_CODE,
            scan_key(scan),
            vec![u8::from(scan.fingerprint.is_some())],
        )
    }
}

/// Index lookups over any [`Store`].
pub trait IndexExt: Store {
    fn qr_code_id_by_code(&self, code: &str) -> CoreResult<Option<QrCodeId>> {
        self.get_raw(QR_CODES_BY_CODE, code.as_bytes())?
            .map(|bytes| Uuid::from_slice(&bytes).map(QrCodeId).map_err(|_| corrupt()))
            .transpose()
    }

    /// Every indexed code string.
    fn indexed_codes(&self) -> CoreResult<Vec<Vec<u8>>> {
        Ok(self
            .scan_prefix_raw(QR_CODES_BY_CODE, &[])?
            .into_iter()
            .map(|(key, _)| key)
            .collect())
    }

    /// Scans of one QR code, oldest first.
    fn scan_entries(&self, qr_code: QrCodeId) -> CoreResult<Vec<ScanEntry>> {
        self.scan_prefix_raw(SCANS_BY_QR_CODE, qr_code.as_bytes())?
            .iter()
            .map(|(key, value)| ScanEntry::decode(key, value))
            .collect()
    }
}

impl<S: Store + ?Sized> IndexExt for S {}
