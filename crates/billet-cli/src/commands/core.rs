//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `parse_range` - Parse a time range argument
//! - `cmd_init` - Initialize the database

use std::path::Path;

use anyhow::{Context, Result};
use billet_core::{db::Database, TimeRange};

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path must be valid UTF-8")?;
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

/// Parse `7days`, `30days`, `90days` or `all`
pub fn parse_range(input: &str) -> Result<TimeRange> {
    input
        .parse::<TimeRange>()
        .map_err(|e: String| anyhow::anyhow!(e))
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let db = open_db(db_path, no_encrypt)?;

    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else {
        let encrypted = db.is_encrypted().context("Failed to check encryption")?;
        println!(
            "   🔒 Encryption: {}",
            if encrypted { "ENABLED" } else { "DISABLED" }
        );
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Add a client: billet clients add \"Client Name\"");
    println!("  2. Create an invoice: billet invoices create invoice.json");
    println!("  3. Start web UI: billet serve");

    Ok(())
}
