//! # Command Line Interface
//!
//! `menuqr [--db PATH] <COMMAND>`:
//! - `serve`: run the HTTP server
//! - `generate-qr-codes [COUNT]`: stock unassigned QR codes
//! - `create-admin`: create a verified administrator
//! - `notify`: leave a notification for a user
//! - `stats`: print the dashboard counts
//!
//! Each command is a plain `cmd_*` function writing to `out`, so the
//! integration tests can drive them against a temporary database.

use crate::api;
use crate::config::{ServerConfig, StoreConfig};
use crate::random::ThreadEntropy;
use chrono::Utc;
use clap::{Parser, Subcommand};
use menuqr_core::codes::{DEFAULT_CLI_COUNT, PROGRESS_EVERY};
use menuqr_core::{CoreError, NewUser, OtpCache, RedbStore, Registry};
use std::collections::BTreeMap;
use std::error::Error;
use std::io::Write;
use std::path::Path;
use tracing::info;

pub type CliResult = Result<(), Box<dyn Error>>;

#[derive(Debug, Parser)]
#[command(name = "menuqr", version, about = "Restaurant menus behind QR codes")]
pub struct Cli {
    #[command(flatten)]
    pub store: StoreConfig,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the HTTP server
    Serve(ServerConfig),

    /// Generate QR codes without restaurant association
    GenerateQrCodes {
        /// Number of QR codes to generate
        #[arg(default_value_t = DEFAULT_CLI_COUNT)]
        count: u32,
    },

    /// Create a verified administrator account
    CreateAdmin {
        #[arg(long)]
        phone: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
    },

    /// Leave a notification for the user with this phone number
    Notify {
        #[arg(long)]
        phone: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        message: Option<String>,
    },

    /// Print dashboard statistics
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Registry over the redb file at `db_path`, created if missing.
pub fn open_registry(db_path: &Path) -> Result<Registry<RedbStore>, CoreError> {
    let store = RedbStore::open(db_path)?;
    Ok(Registry::new(store, OtpCache::new(Vec::new())))
}

pub async fn run(cli: Cli) -> CliResult {
    let db_path = cli.store.db_path;
    match cli.command {
        Commands::Serve(config) => cmd_serve(&db_path, config).await,
        command => run_offline(&db_path, command, &mut std::io::stdout().lock()),
    }
}

/// Commands that only touch the database.
fn run_offline(db_path: &Path, command: Commands, out: &mut dyn Write) -> CliResult {
    match command {
        Commands::Serve(_) => Err("serve must run inside the async runtime".into()),
        Commands::GenerateQrCodes { count } => cmd_generate_qr_codes(db_path, count, out),
        Commands::CreateAdmin {
            phone,
            first_name,
            last_name,
        } => cmd_create_admin(db_path, &phone, &first_name, &last_name, out),
        Commands::Notify {
            phone,
            title,
            message,
        } => cmd_notify(db_path, &phone, &title, message.as_deref(), out),
        Commands::Stats { json } => cmd_stats(db_path, json, out),
    }
}

pub async fn cmd_serve(db_path: &Path, config: ServerConfig) -> CliResult {
    let store = RedbStore::open(db_path)?;
    info!(db = %db_path.display(), "Database opened");
    api::serve(config, Box::new(store)).await?;
    Ok(())
}

/// Generate `count` codes, committing and reporting every hundred.
pub fn cmd_generate_qr_codes(db_path: &Path, count: u32, out: &mut dyn Write) -> CliResult {
    let registry = open_registry(db_path)?;
    writeln!(out, "Generating {count} QR codes")?;

    let mut generated: u32 = 0;
    while generated < count {
        let chunk = PROGRESS_EVERY.min(count - generated);
        let codes = registry.generate_qr_codes(chunk, Utc::now(), &mut ThreadEntropy)?;
        generated += codes.len() as u32;
        if generated % PROGRESS_EVERY == 0 {
            writeln!(out, "Generated {generated}/{count} QR codes...")?;
        }
    }

    writeln!(out, "Successfully generated {generated} QR codes!")?;
    Ok(())
}

pub fn cmd_create_admin(
    db_path: &Path,
    phone: &str,
    first_name: &str,
    last_name: &str,
    out: &mut dyn Write,
) -> CliResult {
    let registry = open_registry(db_path)?;
    let user = registry.admin_create_user(
        NewUser {
            phone_number: phone.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            is_admin: true,
            restaurant_id: None,
        },
        Utc::now(),
    )?;
    writeln!(out, "Admin {} created ({})", user.display_name(), user.phone_number)?;
    Ok(())
}

pub fn cmd_notify(
    db_path: &Path,
    phone: &str,
    title: &str,
    message: Option<&str>,
    out: &mut dyn Write,
) -> CliResult {
    let registry = open_registry(db_path)?;
    let user = registry
        .user_by_phone(phone)?
        .ok_or_else(|| CoreError::not_found("User not found"))?;
    let notification = registry.notify(user.id, title, message, BTreeMap::new(), Utc::now())?;
    writeln!(out, "Notification {} sent to {}", notification.id, user.phone_number)?;
    Ok(())
}

pub fn cmd_stats(db_path: &Path, json: bool, out: &mut dyn Write) -> CliResult {
    let registry = open_registry(db_path)?;
    let stats = registry.admin_stats()?;
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&stats)?)?;
    } else {
        writeln!(out, "Users:              {}", stats.total_users)?;
        writeln!(out, "Restaurants:        {}", stats.total_restaurants)?;
        writeln!(out, "QR codes:           {}", stats.total_qr_codes)?;
        writeln!(out, "  assigned:         {}", stats.assigned_qr_codes)?;
        writeln!(out, "  unassigned:       {}", stats.unassigned_qr_codes)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_generate_with_default_count() {
        let cli = Cli::try_parse_from(["menuqr", "generate-qr-codes"]).unwrap();
        assert!(matches!(cli.command, Commands::GenerateQrCodes { count: 1000 }));
        assert_eq!(cli.store.db_path, Path::new("menuqr.redb"));
    }

    #[test]
    fn parses_db_flag_and_notify() {
        let cli = Cli::try_parse_from([
            "menuqr", "--db", "/tmp/x.redb", "notify", "--phone", "0700000000", "--title", "Hello",
        ])
        .unwrap();
        assert_eq!(cli.store.db_path, Path::new("/tmp/x.redb"));
        match cli.command {
            Commands::Notify { phone, title, message } => {
                assert_eq!(phone, "0700000000");
                assert_eq!(title, "Hello");
                assert_eq!(message, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn create_admin_requires_names() {
        assert!(Cli::try_parse_from(["menuqr", "create-admin", "--phone", "07"]).is_err());
    }
}
