//! # menuqr Library
//!
//! This library exposes the menuqr modules for testing and integration.
//!
//! The main binary uses these modules through the `main.rs` entry point.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::panic))]

pub mod api;
pub mod cli;
pub mod config;
pub mod pages;
pub mod random;
pub mod uploads;
pub mod whatsapp;

// Re-export menuqr_core for convenience
pub use menuqr_core;
