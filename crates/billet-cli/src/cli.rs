//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Billet - Invoice analytics and material breakdowns
#[derive(Parser)]
#[command(name = "billet")]
#[command(about = "Invoice analytics and material export for workshops", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "billet.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set BILLET_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Disable authentication (for local development only)
        ///
        /// WARNING: Do not use this flag when exposing the server to a network.
        /// By default, requests need `Authorization: Bearer <key>` with a key
        /// from BILLET_API_KEYS.
        #[arg(long)]
        no_auth: bool,

        /// Directory containing static files to serve (e.g., ui/dist)
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },

    /// Show invoice analytics for a time range
    Dashboard {
        /// Time range: 7days, 30days, 90days, all
        #[arg(short, long, default_value = "30days")]
        range: String,

        /// Print the analytics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage clients (list, add)
    Clients {
        #[command(subcommand)]
        action: Option<ClientsAction>,
    },

    /// Manage invoices (list, show, create, status, delete)
    Invoices {
        #[command(subcommand)]
        action: Option<InvoicesAction>,
    },

    /// Export the detailed material breakdown as CSV
    ///
    /// Without --ids, every invoice matching the filters is exported.
    Export {
        /// Output file (defaults to material-breakdown-detailed-<date>.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Comma-separated invoice IDs to export
        #[arg(long)]
        ids: Option<String>,

        /// Time range: 7days, 30days, 90days, all
        #[arg(short, long)]
        range: Option<String>,

        /// Match invoice number or client name
        #[arg(short, long)]
        search: Option<String>,

        /// Start date (YYYY-MM-DD, inclusive)
        #[arg(long)]
        from: Option<String>,

        /// End date (YYYY-MM-DD, inclusive)
        #[arg(long)]
        to: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ClientsAction {
    /// List all clients
    List,

    /// Add a client
    Add {
        /// Client name
        name: String,

        #[arg(long)]
        company: Option<String>,

        #[arg(long)]
        phone: Option<String>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        address: Option<String>,

        /// Where the work is installed
        #[arg(long)]
        site_address: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum InvoicesAction {
    /// List invoices, newest first
    List {
        /// Maximum number of invoices to show
        #[arg(short, long, default_value = "20")]
        limit: i64,

        /// Time range: 7days, 30days, 90days, all
        #[arg(short, long)]
        range: Option<String>,

        /// Match invoice number or client name
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Show an invoice with its items and materials
    Show {
        /// Invoice ID
        id: i64,
    },

    /// Create an invoice from a JSON definition file
    Create {
        /// Path to the JSON file
        file: PathBuf,
    },

    /// Change an invoice's status (draft, sent, paid)
    Status {
        /// Invoice ID
        id: i64,

        /// New status
        status: String,
    },

    /// Delete an invoice and its items
    Delete {
        /// Invoice ID
        id: i64,
    },
}
