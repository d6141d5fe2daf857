//! # Domain Types
//!
//! Identifiers and the six persisted entities: users, restaurants, menus,
//! QR codes, scan log rows and notifications.
//!
//! Relationships are stored as foreign ids on the owning side:
//! - a `User` points at the one `Restaurant` it owns
//! - a `Menu` points at its `Restaurant`
//! - a `QrCode` optionally points at a `Restaurant`
//! - a `QrCodeScan` points at its `QrCode`
//! - a `Notification` points at its `User`

use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// =============================================================================
// IDENTIFIERS
// =============================================================================

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Allocate a fresh random (v4) identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Raw bytes, used as the storage key.
            #[must_use]
            pub fn as_bytes(&self) -> &[u8; 16] {
                self.0.as_bytes()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0.hyphenated())
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> CoreResult<Self> {
                Uuid::parse_str(s.trim())
                    .map(Self)
                    .map_err(|_| CoreError::validation(format!("Invalid {} id", $label)))
            }
        }
    };
}

uuid_id!(
    /// Identifier of a [`User`].
    UserId,
    "user"
);
uuid_id!(
    /// Identifier of a [`Restaurant`].
    RestaurantId,
    "restaurant"
);
uuid_id!(
    /// Identifier of a [`Menu`].
    MenuId,
    "menu"
);
uuid_id!(
    /// Identifier of a [`QrCode`].
    QrCodeId,
    "QR code"
);
uuid_id!(
    /// Identifier of a [`QrCodeScan`].
    ScanId,
    "scan"
);
uuid_id!(
    /// Identifier of a [`Notification`].
    NotificationId,
    "notification"
);

// =============================================================================
// USER
// =============================================================================

/// First name given to accounts created by the login flow.
pub const PLACEHOLDER_FIRST_NAME: &str = "User";

/// A phone-identified account. Owners and admins share this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Digits only, see [`crate::phone::normalize`].
    pub phone_number: String,
    pub first_name: String,
    pub last_name: String,
    pub is_admin: bool,
    pub is_verified: bool,
    pub restaurant_id: Option<RestaurantId>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Account created on first login: placeholder names, unverified.
    #[must_use]
    pub fn from_login(phone_number: impl Into<String>, now: DateTime<Utc>) -> Self {
        let phone_number = phone_number.into();
        Self {
            id: UserId::new(),
            last_name: phone_number.clone(),
            phone_number,
            first_name: PLACEHOLDER_FIRST_NAME.to_string(),
            is_admin: false,
            is_verified: false,
            restaurant_id: None,
            created_at: now,
        }
    }

    /// An owner has finished onboarding once a restaurant is attached.
    #[must_use]
    pub fn has_completed_onboarding(&self) -> bool {
        self.restaurant_id.is_some()
    }

    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

// =============================================================================
// RESTAURANT
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: RestaurantId,
    pub name: String,
    /// Unique, URL-safe; see [`crate::slug`].
    pub slug: String,
    pub description: Option<String>,
    /// Logo, relative to the uploads root.
    pub photo_path: Option<String>,
    /// Cover image, relative to the uploads root.
    pub background_photo_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Restaurant {
    #[must_use]
    pub fn new(name: impl Into<String>, slug: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: RestaurantId::new(),
            name: name.into(),
            slug: slug.into(),
            description: None,
            photo_path: None,
            background_photo_path: None,
            created_at: now,
            updated_at: None,
        }
    }
}

// =============================================================================
// MENU
// =============================================================================

/// The kind of document a menu holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MenuKind {
    Pdf,
    Image,
}

impl MenuKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Image => "image",
        }
    }

    /// Whether an uploaded file with this MIME type fits the menu kind.
    #[must_use]
    pub fn accepts(&self, mime: &str) -> bool {
        let mime = mime.trim().to_ascii_lowercase();
        match self {
            Self::Pdf => mime == "application/pdf",
            Self::Image => mime.starts_with("image/"),
        }
    }

    /// Message shown when [`MenuKind::accepts`] fails.
    #[must_use]
    pub fn rejection_message(&self) -> &'static str {
        match self {
            Self::Pdf => "The file must be a PDF",
            Self::Image => "The file must be an image",
        }
    }
}

impl fmt::Display for MenuKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MenuKind {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        match s.trim() {
            "pdf" => Ok(Self::Pdf),
            "image" => Ok(Self::Image),
            _ => Err(CoreError::validation("Invalid menu type")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Menu {
    pub id: MenuId,
    pub restaurant_id: RestaurantId,
    pub name: String,
    pub kind: MenuKind,
    /// Relative to the uploads root.
    pub file_path: String,
    pub display_order: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

// =============================================================================
// QR CODE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrCode {
    pub id: QrCodeId,
    /// Unique short code printed in the URL (`/q/{code}`).
    pub code: String,
    pub restaurant_id: Option<RestaurantId>,
    pub table_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub last_scanned_at: Option<DateTime<Utc>>,
    pub total_scans: u64,
    pub scans_today: u64,
    /// Calendar day `scans_today` refers to.
    pub last_scan_date: Option<NaiveDate>,
}

impl QrCode {
    /// A fresh, unassigned code with zeroed counters.
    #[must_use]
    pub fn new(code: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: QrCodeId::new(),
            code: code.into(),
            restaurant_id: None,
            table_name: None,
            created_at: now,
            updated_at: None,
            last_scanned_at: None,
            total_scans: 0,
            scans_today: 0,
            last_scan_date: None,
        }
    }

    #[must_use]
    pub fn is_assigned(&self) -> bool {
        self.restaurant_id.is_some()
    }
}

// =============================================================================
// QR CODE SCAN
// =============================================================================

/// Request details captured with each scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ScanMetadata {
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub referer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrCodeScan {
    pub id: ScanId,
    pub qr_code_id: QrCodeId,
    pub scanned_at: DateTime<Utc>,
    /// SHA-256 hex as sent, see [`crate::scan::is_valid_fingerprint`].
    pub fingerprint: Option<String>,
    pub metadata: ScanMetadata,
}

// =============================================================================
// NOTIFICATION
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub title: String,
    pub message: Option<String>,
    pub metadata: BTreeMap<String, String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

impl Notification {
    /// Flag as read. Returns false if it already was.
    pub fn mark_read(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_read {
            return false;
        }
        self.is_read = true;
        self.read_at = Some(now);
        true
    }
}

// =============================================================================
// TESTS
// =============================================================================
