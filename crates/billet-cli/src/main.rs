//! Billet CLI - Invoice analytics and material export
//!
//! Usage:
//!   billet init                       Initialize database
//!   billet dashboard --range 30days   Show analytics for a time range
//!   billet invoices create FILE       Create an invoice from a JSON definition
//!   billet export --output out.csv    Export the detailed material breakdown
//!   billet serve --port 3000          Start web server

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use billet_core::models::NewClient;
use billet_core::ExportFilter;
use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Serve {
            port,
            host,
            no_auth,
            static_dir,
        } => {
            commands::cmd_serve(
                &cli.db,
                &host,
                port,
                no_auth,
                cli.no_encrypt,
                static_dir.as_deref(),
            )
            .await
        }
        Commands::Dashboard { range, json } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let range = commands::parse_range(&range)?;
            commands::cmd_dashboard(&db, range, json).await
        }
        Commands::Clients { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None | Some(ClientsAction::List) => commands::cmd_clients_list(&db),
                Some(ClientsAction::Add {
                    name,
                    company,
                    phone,
                    email,
                    address,
                    site_address,
                }) => commands::cmd_clients_add(
                    &db,
                    &NewClient {
                        name,
                        company: company.unwrap_or_default(),
                        address: address.unwrap_or_default(),
                        phone: phone.unwrap_or_default(),
                        email: email.unwrap_or_default(),
                        site_address: site_address.unwrap_or_default(),
                    },
                ),
            }
        }
        Commands::Invoices { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None => commands::cmd_invoices_list(&db, 20, None, None),
                Some(InvoicesAction::List {
                    limit,
                    range,
                    search,
                }) => {
                    let range = range.as_deref().map(commands::parse_range).transpose()?;
                    commands::cmd_invoices_list(&db, limit, range, search)
                }
                Some(InvoicesAction::Show { id }) => commands::cmd_invoices_show(&db, id),
                Some(InvoicesAction::Create { file }) => commands::cmd_invoices_create(&db, &file),
                Some(InvoicesAction::Status { id, status }) => {
                    commands::cmd_invoices_status(&db, id, &status)
                }
                Some(InvoicesAction::Delete { id }) => commands::cmd_invoices_delete(&db, id),
            }
        }
        Commands::Export {
            output,
            ids,
            range,
            search,
            from,
            to,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let range = range.as_deref().map(commands::parse_range).transpose()?;
            let filter = ExportFilter {
                search,
                date_from: from,
                date_to: to,
            };
            commands::cmd_export_materials(&db, output, ids.as_deref(), range, filter)
        }
    }
}
