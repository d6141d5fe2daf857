//! Integration tests for menuqr CLI commands.
//!
//! Uses tempfile for a throwaway redb database per test.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use chrono::Utc;
use menuqr::cli::{cmd_create_admin, cmd_generate_qr_codes, cmd_notify, cmd_stats, open_registry};
use menuqr_core::{PageRequest, QrFilter};
use serde_json::Value;
use std::path::PathBuf;
use tempfile::TempDir;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Create a temporary directory for tests.
fn create_temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

fn db_path(dir: &TempDir) -> PathBuf {
    dir.path().join("menuqr.redb")
}

fn output(buf: Vec<u8>) -> String {
    String::from_utf8(buf).unwrap()
}

// =============================================================================
// GENERATE-QR-CODES COMMAND TESTS
// =============================================================================

#[test]
fn test_generate_creates_unassigned_codes() {
    let temp = create_temp_dir();
    let db = db_path(&temp);
    let mut out = Vec::new();

    cmd_generate_qr_codes(&db, 250, &mut out).unwrap();
    let text = output(out);
    assert!(text.contains("Generated 100/250 QR codes..."));
    assert!(text.contains("Generated 200/250 QR codes..."));
    assert!(!text.contains("Generated 250/250"));
    assert!(text.contains("Successfully generated 250 QR codes!"));

    let registry = open_registry(&db).unwrap();
    let page = registry
        .list_qr_codes(None, QrFilter::Unassigned, PageRequest::new(None, 20))
        .unwrap();
    assert_eq!(page.total, 250);
}

#[test]
fn test_generate_zero_is_a_noop() {
    let temp = create_temp_dir();
    let db = db_path(&temp);
    let mut out = Vec::new();

    cmd_generate_qr_codes(&db, 0, &mut out).unwrap();
    assert!(output(out).contains("Successfully generated 0 QR codes!"));
}

#[test]
fn test_generate_accumulates_across_runs() {
    let temp = create_temp_dir();
    let db = db_path(&temp);

    cmd_generate_qr_codes(&db, 30, &mut Vec::new()).unwrap();
    cmd_generate_qr_codes(&db, 30, &mut Vec::new()).unwrap();

    let stats = open_registry(&db).unwrap().admin_stats().unwrap();
    assert_eq!(stats.total_qr_codes, 60);
    assert_eq!(stats.unassigned_qr_codes, 60);
}

// =============================================================================
// CREATE-ADMIN COMMAND TESTS
// =============================================================================

#[test]
fn test_create_admin() {
    let temp = create_temp_dir();
    let db = db_path(&temp);
    let mut out = Vec::new();

    cmd_create_admin(&db, "+225 07 79 13 63 56", "Awa", "Kone", &mut out).unwrap();
    assert!(output(out).contains("Admin Awa Kone created (2250779136356)"));

    let registry = open_registry(&db).unwrap();
    let user = registry.user_by_phone("2250779136356").unwrap().unwrap();
    assert!(user.is_admin);
    assert!(user.is_verified);
}

#[test]
fn test_create_admin_rejects_duplicate_phone() {
    let temp = create_temp_dir();
    let db = db_path(&temp);

    cmd_create_admin(&db, "0700000000", "Awa", "Kone", &mut Vec::new()).unwrap();
    let result = cmd_create_admin(&db, "0700000000", "Ali", "Traore", &mut Vec::new());
    assert!(result.is_err());
}

#[test]
fn test_create_admin_requires_names() {
    let temp = create_temp_dir();
    let db = db_path(&temp);

    let result = cmd_create_admin(&db, "0700000000", " ", "Kone", &mut Vec::new());
    assert!(result.is_err());
}

// =============================================================================
// NOTIFY COMMAND TESTS
// =============================================================================

#[test]
fn test_notify_existing_user() {
    let temp = create_temp_dir();
    let db = db_path(&temp);
    cmd_create_admin(&db, "0700000000", "Awa", "Kone", &mut Vec::new()).unwrap();

    let mut out = Vec::new();
    cmd_notify(&db, "0700000000", "Nouveaux QR", Some("10 codes ajoutes"), &mut out).unwrap();
    assert!(output(out).contains("sent to 0700000000"));

    let registry = open_registry(&db).unwrap();
    let user = registry.user_by_phone("0700000000").unwrap().unwrap();
    assert_eq!(registry.unread_count(user.id).unwrap(), 1);

    let listed = registry.notifications_for(user.id, Utc::now()).unwrap();
    assert_eq!(listed[0].title, "Nouveaux QR");
    assert_eq!(listed[0].message.as_deref(), Some("10 codes ajoutes"));
}

#[test]
fn test_notify_unknown_user_fails() {
    let temp = create_temp_dir();
    let db = db_path(&temp);

    let err = cmd_notify(&db, "0799999999", "Hello", None, &mut Vec::new()).unwrap_err();
    assert!(err.to_string().contains("User not found"));
}

// =============================================================================
// STATS COMMAND TESTS
// =============================================================================

#[test]
fn test_stats_text() {
    let temp = create_temp_dir();
    let db = db_path(&temp);
    cmd_generate_qr_codes(&db, 5, &mut Vec::new()).unwrap();
    cmd_create_admin(&db, "0700000000", "Awa", "Kone", &mut Vec::new()).unwrap();

    let mut out = Vec::new();
    cmd_stats(&db, false, &mut out).unwrap();
    let text = output(out);
    assert!(text.contains("Users:              1"));
    assert!(text.contains("QR codes:           5"));
    assert!(text.contains("  unassigned:       5"));
}

#[test]
fn test_stats_json() {
    let temp = create_temp_dir();
    let db = db_path(&temp);
    cmd_generate_qr_codes(&db, 2, &mut Vec::new()).unwrap();

    let mut out = Vec::new();
    cmd_stats(&db, true, &mut out).unwrap();
    let stats: Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(stats["totalUsers"], 0);
    assert_eq!(stats["totalQRCodes"], 2);
    assert_eq!(stats["assignedQRCodes"], 0);
}

#[test]
fn test_stats_on_fresh_database() {
    let temp = create_temp_dir();
    let db = db_path(&temp);

    let mut out = Vec::new();
    cmd_stats(&db, false, &mut out).unwrap();
    assert!(output(out).contains("Restaurants:        0"));
    assert!(db.exists());
}
