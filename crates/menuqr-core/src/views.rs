//! # Views
//!
//! Serializable shapes handed to the HTTP layer and to the page islands.
//!
//! Field names are camelCase because the browser side reads them directly.
//! Views never carry more than the screen needs: no OTP state, no scan
//! metadata outside the admin scan log.

use crate::types::{
    Menu, MenuId, MenuKind, Notification, NotificationId, QrCode, QrCodeId, QrCodeScan,
    Restaurant, RestaurantId, ScanId, ScanMetadata, User, UserId,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Row of the admin user table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRow {
    pub id: UserId,
    pub phone_number: String,
    pub name: String,
    /// `-` when the user has no restaurant.
    pub restaurant_name: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl UserRow {
    #[must_use]
    pub fn new(user: &User, restaurant: Option<&Restaurant>) -> Self {
        Self {
            id: user.id,
            phone_number: user.phone_number.clone(),
            name: user.display_name(),
            restaurant_name: restaurant
                .map(|r| r.name.clone())
                .unwrap_or_else(|| "-".to_string()),
            is_admin: user.is_admin,
            created_at: user.created_at,
        }
    }
}

/// A user as returned after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: UserId,
    pub phone_number: String,
    pub first_name: String,
    pub last_name: String,
    pub is_admin: bool,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            phone_number: user.phone_number.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            is_admin: user.is_admin,
        }
    }
}

/// Row of the admin restaurant table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantRow {
    pub id: RestaurantId,
    pub name: String,
    pub slug: String,
    pub user_phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl RestaurantRow {
    #[must_use]
    pub fn new(restaurant: &Restaurant, owner: Option<&User>) -> Self {
        Self {
            id: restaurant.id,
            name: restaurant.name.clone(),
            slug: restaurant.slug.clone(),
            user_phone: owner.map(|u| u.phone_number.clone()),
            created_at: restaurant.created_at,
        }
    }
}

/// Full restaurant details, used by admin edit forms, settings and the
/// public page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantDetail {
    pub id: RestaurantId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub photo_path: Option<String>,
    pub background_photo_path: Option<String>,
}

impl From<&Restaurant> for RestaurantDetail {
    fn from(r: &Restaurant) -> Self {
        Self {
            id: r.id,
            name: r.name.clone(),
            slug: r.slug.clone(),
            description: r.description.clone(),
            photo_path: r.photo_path.clone(),
            background_photo_path: r.background_photo_path.clone(),
        }
    }
}

/// Short restaurant reference for dropdowns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestaurantOption {
    pub id: RestaurantId,
    pub name: String,
}

impl From<&Restaurant> for RestaurantOption {
    fn from(r: &Restaurant) -> Self {
        Self {
            id: r.id,
            name: r.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuView {
    pub id: MenuId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: MenuKind,
    pub file_path: String,
    pub display_order: u32,
    pub created_at: DateTime<Utc>,
}

impl From<&Menu> for MenuView {
    fn from(m: &Menu) -> Self {
        Self {
            id: m.id,
            name: m.name.clone(),
            kind: m.kind,
            file_path: m.file_path.clone(),
            display_order: m.display_order,
            created_at: m.created_at,
        }
    }
}

/// Row of the admin QR code table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QrCodeRow {
    pub id: QrCodeId,
    pub code: String,
    pub table_name: Option<String>,
    pub restaurant_id: Option<RestaurantId>,
    pub restaurant_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl QrCodeRow {
    #[must_use]
    pub fn new(qr: &QrCode, restaurant: Option<&Restaurant>) -> Self {
        Self {
            id: qr.id,
            code: qr.code.clone(),
            table_name: qr.table_name.clone(),
            restaurant_id: qr.restaurant_id,
            restaurant_name: restaurant.map(|r| r.name.clone()),
            created_at: qr.created_at,
        }
    }
}

/// Row of the owner's QR code page, with counts from the scan log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerQrCodeRow {
    pub id: QrCodeId,
    pub code: String,
    pub table_name: Option<String>,
    pub scans_today: u64,
    pub scans_total: u64,
    pub created_at: DateTime<Utc>,
}

/// QR code reference nested in a scan row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanQrCode {
    pub code: String,
    pub table_name: Option<String>,
}

/// Row of the admin scan log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRow {
    pub id: ScanId,
    pub scanned_at: DateTime<Utc>,
    pub fingerprint: Option<String>,
    pub metadata: ScanMetadata,
    pub qr_code: ScanQrCode,
}

impl ScanRow {
    #[must_use]
    pub fn new(scan: &QrCodeScan, qr: &QrCode) -> Self {
        Self {
            id: scan.id,
            scanned_at: scan.scanned_at,
            fingerprint: scan.fingerprint.clone(),
            metadata: scan.metadata.clone(),
            qr_code: ScanQrCode {
                code: qr.code.clone(),
                table_name: qr.table_name.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    pub id: NotificationId,
    pub title: String,
    pub message: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub metadata: BTreeMap<String, String>,
}

impl From<&Notification> for NotificationView {
    fn from(n: &Notification) -> Self {
        Self {
            id: n.id,
            title: n.title.clone(),
            message: n.message.clone(),
            is_read: n.is_read,
            created_at: n.created_at,
            metadata: n.metadata.clone(),
        }
    }
}

/// What the public restaurant page shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicRestaurant {
    pub restaurant: RestaurantDetail,
    pub menus: Vec<MenuView>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_row_without_restaurant_shows_dash() {
        let user = User::from_login("0700000000", Utc::now());
        let row = UserRow::new(&user, None);
        assert_eq!(row.restaurant_name, "-");
        assert_eq!(row.name, "User 0700000000");
    }

    #[test]
    fn qr_row_carries_restaurant_name() {
        let now = Utc::now();
        let restaurant = Restaurant::new("Chez Ali", "chez-ali", now);
        let mut qr = QrCode::new("abcde", now);
        qr.restaurant_id = Some(restaurant.id);
        qr.table_name = Some("Table 4".into());

        let row = QrCodeRow::new(&qr, Some(&restaurant));
        assert_eq!(row.restaurant_name.as_deref(), Some("Chez Ali"));
        assert_eq!(row.restaurant_id, Some(restaurant.id));
        assert_eq!(row.table_name.as_deref(), Some("Table 4"));
    }
}
