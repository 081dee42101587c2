//! Client commands

use anyhow::{Context, Result};

use billet_core::db::Database;
use billet_core::models::NewClient;

pub fn cmd_clients_list(db: &Database) -> Result<()> {
    let clients = db.list_clients()?;

    if clients.is_empty() {
        println!("No clients found. Add one with:");
        println!("  billet clients add \"Client Name\"");
        return Ok(());
    }

    println!();
    println!("👥 Clients");
    println!("   ─────────────────────────────");

    for client in clients {
        if client.company.is_empty() {
            println!("   [{}] {}", client.id, client.name);
        } else {
            println!("   [{}] {} ({})", client.id, client.name, client.company);
        }
    }

    Ok(())
}

pub fn cmd_clients_add(db: &Database, client: &NewClient) -> Result<()> {
    let created = db
        .create_client(client)
        .context("Failed to create client")?;

    println!("✅ Added client [{}] {}", created.id, created.name);
    Ok(())
}
