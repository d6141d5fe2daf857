//! # menuqr-core
//!
//! Domain engine for menuqr: restaurants publish menus behind QR codes
//! placed on their tables, owners log in with a one-time code, and every
//! scan is counted.
//!
//! The crate is synchronous and deterministic. Wall-clock time enters as a
//! `now` argument and randomness through [`Entropy`], so every operation can
//! be replayed in tests.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::panic))]

pub mod codes;
pub mod entropy;
pub mod error;
pub mod onboarding;
pub mod otp;
pub mod page;
pub mod phone;
pub mod registry;
pub mod scan;
pub mod slug;
pub mod stats;
pub mod storage;
pub mod types;
pub mod views;

pub use entropy::{Entropy, SequenceEntropy};
pub use error::{CoreError, CoreResult};
pub use onboarding::OnboardingStep;
pub use otp::{OtpCache, OtpCheck, OtpStats};
pub use page::{Page, PageRequest};
pub use registry::{NewUser, QrFilter, Registry};
pub use stats::AdminStats;
pub use storage::{MemoryStore, RedbStore, Store};
pub use types::{
    Menu, MenuId, MenuKind, Notification, NotificationId, QrCode, QrCodeId, QrCodeScan,
    Restaurant, RestaurantId, ScanId, ScanMetadata, User, UserId,
};
