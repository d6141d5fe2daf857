//! QR codes: generation, assignment, scan tracking and their tables.

use super::{Registry, newest_first, optional};
use crate::codes;
use crate::entropy::Entropy;
use crate::error::{CoreError, CoreResult};
use crate::page::{Page, PageRequest, matches_any, search_term};
use crate::scan::{self, accept_fingerprint, is_valid_fingerprint};
use crate::storage::{Batch, IndexExt, ScanEntry, Store, StoreExt};
use crate::types::{QrCode, QrCodeId, QrCodeScan, Restaurant, RestaurantId, ScanId, ScanMetadata};
use crate::views::{OwnerQrCodeRow, QrCodeRow, ScanRow};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;
use tracing::{debug, info};

/// Assignment filter of the admin QR code table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QrFilter {
    #[default]
    All,
    Assigned,
    Unassigned,
}

impl QrFilter {
    /// Lenient parse: anything unrecognized means [`QrFilter::All`].
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        raw.and_then(|s| s.parse().ok()).unwrap_or_default()
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Assigned => "assigned",
            Self::Unassigned => "unassigned",
        }
    }

    #[must_use]
    pub fn admits(&self, qr: &QrCode) -> bool {
        match self {
            Self::All => true,
            Self::Assigned => qr.is_assigned(),
            Self::Unassigned => !qr.is_assigned(),
        }
    }
}

impl FromStr for QrFilter {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        match s.trim() {
            "all" | "" => Ok(Self::All),
            "assigned" => Ok(Self::Assigned),
            "unassigned" => Ok(Self::Unassigned),
            _ => Err(CoreError::validation("Invalid filter")),
        }
    }
}

const QR_NOT_FOUND: &str = "QR code not found";

impl<S: Store> Registry<S> {
    pub fn qr_code(&self, id: QrCodeId) -> CoreResult<Option<QrCode>> {
        self.find(id.as_bytes())
    }

    pub fn qr_code_by_code(&self, code: &str) -> CoreResult<Option<QrCode>> {
        match self.store.qr_code_id_by_code(code)? {
            Some(id) => self.qr_code(id),
            None => Ok(None),
        }
    }

    // ===== GENERATION & ASSIGNMENT =====

    /// Create `count` unassigned codes in one commit.
    pub fn generate_qr_codes(
        &self,
        count: u32,
        now: DateTime<Utc>,
        entropy: &mut impl Entropy,
    ) -> CoreResult<Vec<QrCode>> {
        let _guard = self.lock_writer()?;
        let mut taken: BTreeSet<Vec<u8>> = self.store.indexed_codes()?.into_iter().collect();

        let mut batch = Batch::new();
        let mut created = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let code = codes::generate_unique(entropy, |c| taken.contains(c.as_bytes()))?;
            taken.insert(code.as_bytes().to_vec());
            let qr = QrCode::new(code, now);
            batch.put(&qr)?.index_qr_code(&qr);
            created.push(qr);
        }
        self.commit(batch)?;

        info!(count = created.len(), "QR codes generated");
        Ok(created)
    }

    /// Attach a code to a restaurant (or detach it with `None`).
    pub fn assign_qr_code(
        &self,
        id: QrCodeId,
        restaurant_id: Option<RestaurantId>,
        table_name: Option<&str>,
        now: DateTime<Utc>,
    ) -> CoreResult<QrCode> {
        let _guard = self.lock_writer()?;
        let mut qr: QrCode = self.require(id.as_bytes(), "QR code")?;

        qr.restaurant_id = match restaurant_id {
            Some(rid) => Some(self.require_restaurant(rid)?.id),
            None => None,
        };
        qr.table_name = optional(table_name);
        qr.updated_at = Some(now);
        self.save(&qr)?;

        info!(
            code = %qr.code,
            restaurant_id = ?qr.restaurant_id,
            table_name = ?qr.table_name,
            "QR code assigned"
        );
        Ok(qr)
    }

    /// Clear both the restaurant and the table name.
    pub fn unassign_qr_code(&self, id: QrCodeId, now: DateTime<Utc>) -> CoreResult<QrCode> {
        let _guard = self.lock_writer()?;
        let mut qr: QrCode = self.require(id.as_bytes(), "QR code")?;
        qr.restaurant_id = None;
        qr.table_name = None;
        qr.updated_at = Some(now);
        self.save(&qr)?;
        info!(code = %qr.code, "QR code unassigned");
        Ok(qr)
    }

    // ===== TABLES =====

    /// Admin QR code table: newest first, filtered by assignment and by
    /// code, table name or restaurant name.
    pub fn list_qr_codes(
        &self,
        search: Option<&str>,
        filter: QrFilter,
        page: PageRequest,
    ) -> CoreResult<Page<QrCodeRow>> {
        let restaurants: BTreeMap<RestaurantId, Restaurant> = self
            .store
            .all::<Restaurant>()?
            .into_iter()
            .map(|r| (r.id, r))
            .collect();
        let restaurant_of = |qr: &QrCode| qr.restaurant_id.and_then(|id| restaurants.get(&id));

        let mut codes: Vec<QrCode> = self.store.all()?;
        codes.retain(|q| filter.admits(q));
        if let Some(term) = search_term(search) {
            codes.retain(|q| {
                matches_any(
                    &term,
                    [
                        Some(q.code.as_str()),
                        q.table_name.as_deref(),
                        restaurant_of(q).map(|r| r.name.as_str()),
                    ],
                )
            });
        }
        newest_first(&mut codes, |q| (q.created_at, q.id.as_bytes().to_vec()));

        let rows = codes
            .iter()
            .map(|q| QrCodeRow::new(q, restaurant_of(q)))
            .collect();
        Ok(page.slice(rows))
    }

    /// Owner view: the restaurant's codes with counts from the scan log.
    pub fn restaurant_qr_codes(
        &self,
        restaurant_id: RestaurantId,
        today: NaiveDate,
    ) -> CoreResult<Vec<OwnerQrCodeRow>> {
        let mut codes: Vec<QrCode> = self.store.all()?;
        codes.retain(|q| q.restaurant_id == Some(restaurant_id));
        codes.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));

        codes
            .into_iter()
            .map(|q| {
                let entries = self.store.scan_entries(q.id)?;
                Ok(OwnerQrCodeRow {
                    scans_today: scan::count_on_day(&entries, today),
                    scans_total: entries.len() as u64,
                    id: q.id,
                    code: q.code,
                    table_name: q.table_name,
                    created_at: q.created_at,
                })
            })
            .collect()
    }

    /// Scan log of one restaurant, newest first.
    pub fn restaurant_scans(
        &self,
        restaurant_id: RestaurantId,
        page: PageRequest,
    ) -> CoreResult<Page<ScanRow>> {
        let codes: BTreeMap<QrCodeId, QrCode> = self
            .store
            .all::<QrCode>()?
            .into_iter()
            .filter(|q| q.restaurant_id == Some(restaurant_id))
            .map(|q| (q.id, q))
            .collect();

        let mut entries: Vec<ScanEntry> = Vec::new();
        for id in codes.keys() {
            entries.extend(self.store.scan_entries(*id)?);
        }
        newest_first(&mut entries, |e| (e.scanned_at, e.scan_id.as_bytes().to_vec()));

        let window = page.slice(entries);
        let mut rows = Vec::with_capacity(window.items.len());
        for entry in &window.items {
            let scan: QrCodeScan = self.require(entry.scan_id.as_bytes(), "Scan")?;
            if let Some(qr) = codes.get(&scan.qr_code_id) {
                rows.push(ScanRow::new(&scan, qr));
            }
        }
        Ok(window.with_items(rows))
    }

    // ===== SCANS =====

    /// Log one scan of `code` and bump its counters in the same commit.
    ///
    /// A malformed fingerprint is dropped, not rejected. Returns the updated
    /// code and the restaurant it points at.
    pub fn record_scan(
        &self,
        code: &str,
        fingerprint: Option<&str>,
        metadata: ScanMetadata,
        now: DateTime<Utc>,
    ) -> CoreResult<(QrCode, Option<Restaurant>)> {
        let _guard = self.lock_writer()?;
        let mut qr = self
            .qr_code_by_code(code)?
            .ok_or_else(|| CoreError::not_found(QR_NOT_FOUND))?;

        let scan = QrCodeScan {
            id: ScanId::new(),
            qr_code_id: qr.id,
            scanned_at: now,
            fingerprint: accept_fingerprint(fingerprint),
            metadata,
        };
        qr.increment_scans(now);

        let mut batch = Batch::new();
        batch.put(&scan)?.put(&qr)?.index_scan(&scan);
        self.commit(batch)?;

        debug!(
            code = %qr.code,
            total_scans = qr.total_scans,
            scans_today = qr.scans_today,
            has_fingerprint = scan.fingerprint.is_some(),
            "QR code scanned"
        );

        let restaurant = match qr.restaurant_id {
            Some(id) => self.restaurant(id)?,
            None => None,
        };
        Ok((qr, restaurant))
    }

    /// Late fingerprint delivery: fill in the newest scan of `code` that
    /// does not have one yet.
    pub fn attach_fingerprint(&self, code: &str, fingerprint: &str) -> CoreResult<QrCodeScan> {
        let _guard = self.lock_writer()?;
        let qr = self
            .qr_code_by_code(code)?
            .ok_or_else(|| CoreError::not_found(QR_NOT_FOUND))?;
        if !is_valid_fingerprint(fingerprint) {
            return Err(CoreError::validation("Invalid fingerprint format"));
        }

        let entries = self.store.scan_entries(qr.id)?;
        let entry = scan::latest_without_fingerprint(&entries)
            .ok_or_else(|| CoreError::not_found("No recent scan found"))?;
        let mut scan: QrCodeScan = self.require(entry.scan_id.as_bytes(), "Scan")?;
        scan.fingerprint = Some(fingerprint.to_string());

        let mut batch = Batch::new();
        batch.put(&scan)?.index_scan(&scan);
        self.commit(batch)?;

        debug!(code = %qr.code, scan_id = %scan.id, "Fingerprint attached");
        Ok(scan)
    }
}
