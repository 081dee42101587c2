//! Invoice commands (list, show, create, status, delete)

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;

use billet_core::db::Database;
use billet_core::models::{InvoiceQuery, InvoiceStatus, NewInvoice};
use billet_core::{ExportFilter, Notice, TimeRange};

use super::truncate;

pub fn cmd_invoices_list(
    db: &Database,
    limit: i64,
    range: Option<TimeRange>,
    search: Option<String>,
) -> Result<()> {
    let query = InvoiceQuery {
        since: range.and_then(|r| r.lower_bound(Utc::now())),
        limit: None,
    };
    let invoices = db.list_invoices(&query)?;
    let filter = ExportFilter {
        search,
        ..Default::default()
    };
    let shown: Vec<_> = filter
        .apply(&invoices)
        .into_iter()
        .take(limit.max(1) as usize)
        .collect();

    if shown.is_empty() {
        println!("No invoices found.");
        return Ok(());
    }

    println!();
    println!("🧾 Invoices");
    println!("   ─────────────────────────────");

    for invoice in shown {
        println!(
            "   [{:>4}] {}  {:<12} {:<24} {:>12.2}  {}",
            invoice.id,
            invoice.invoice_date,
            truncate(&invoice.invoice_no, 12),
            truncate(invoice.client_name.as_deref().unwrap_or("-"), 24),
            invoice.total,
            invoice.status
        );
    }

    Ok(())
}

pub fn cmd_invoices_show(db: &Database, id: i64) -> Result<()> {
    let Some(details) = db.get_invoice_details(id)? else {
        let notice = Notice::error("Load Failed", "Failed to load invoice details.");
        eprintln!("❌ {}: {}", notice.title, notice.message);
        anyhow::bail!("Invoice {} not found", id);
    };

    let invoice = &details.invoice;
    println!();
    println!("🧾 Invoice {} ({})", invoice.invoice_no, invoice.status);
    println!("   Date:     {}", invoice.invoice_date);
    if let Some(due) = invoice.due_date {
        println!("   Due:      {}", due);
    }
    if let Some(client) = &details.client {
        println!("   Client:   {}", client.name);
    }
    if !invoice.project_name.is_empty() {
        println!("   Project:  {}", invoice.project_name);
    }

    println!();
    for entry in &details.items {
        let item = &entry.item;
        let label = if item.code.is_empty() {
            item.category.as_str()
        } else {
            item.code.as_str()
        };
        println!(
            "   {:<12} {:<32} {:>6} x {:>10.2} = {:>12.2}",
            truncate(label, 12),
            truncate(&item.description, 32),
            item.qty,
            item.unit_price,
            item.line_total
        );
        for material in &entry.materials {
            println!(
                "      - {} {} {} @ {:.2}",
                material.total_qty, material.unit, material.material_name, material.unit_cost
            );
        }
    }

    println!();
    println!("   Subtotal: {:>12.2}", invoice.subtotal);
    if invoice.discount != 0.0 {
        println!("   Discount: {:>12.2}", invoice.discount);
    }
    println!(
        "   VAT {}%: {:>12.2}",
        invoice.vat_rate, invoice.vat_amount
    );
    println!("   Total:    {:>12.2}", invoice.total);

    Ok(())
}

/// Create an invoice from a JSON file shaped like the API's create body
pub fn cmd_invoices_create(db: &Database, file: &Path) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let new_invoice: NewInvoice = serde_json::from_str(&content)
        .with_context(|| format!("Invalid invoice definition in {}", file.display()))?;

    let details = db
        .create_invoice(&new_invoice)
        .context("Failed to create invoice")?;

    println!(
        "✅ Created invoice {} [{}]: {} items, total {:.2}",
        details.invoice.invoice_no,
        details.invoice.id,
        details.items.len(),
        details.invoice.total
    );
    Ok(())
}

pub fn cmd_invoices_status(db: &Database, id: i64, status: &str) -> Result<()> {
    let status: InvoiceStatus = status.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    db.update_invoice_status(id, status)
        .with_context(|| format!("Failed to update invoice {}", id))?;

    println!("✅ Invoice {} marked {}", id, status);
    Ok(())
}

pub fn cmd_invoices_delete(db: &Database, id: i64) -> Result<()> {
    db.delete_invoice(id)
        .with_context(|| format!("Failed to delete invoice {}", id))?;

    println!("🗑️  Deleted invoice {}", id);
    Ok(())
}
