//! # Dashboard Statistics
//!
//! Counts shown on the admin dashboard.

use crate::types::{QrCode, Restaurant, User};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub total_users: usize,
    pub total_restaurants: usize,
    #[serde(rename = "totalQRCodes")]
    pub total_qr_codes: usize,
    #[serde(rename = "assignedQRCodes")]
    pub assigned_qr_codes: usize,
    #[serde(rename = "unassignedQRCodes")]
    pub unassigned_qr_codes: usize,
}

impl AdminStats {
    /// Assemble the counts from full table contents.
    #[must_use]
    pub fn compose(users: &[User], restaurants: &[Restaurant], qr_codes: &[QrCode]) -> Self {
        let assigned = qr_codes.iter().filter(|q| q.is_assigned()).count();
        Self {
            total_users: users.len(),
            total_restaurants: restaurants.len(),
            total_qr_codes: qr_codes.len(),
            assigned_qr_codes: assigned,
            unassigned_qr_codes: qr_codes.len() - assigned,
        }
    }
}
