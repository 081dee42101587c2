//! Detailed material export command

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::Utc;

use billet_core::db::Database;
use billet_core::models::{InvoiceListEntry, InvoiceQuery};
use billet_core::{Error as CoreError, ExportFilter, ExportSelection, TimeRange};

/// Parse a comma-separated id list
///
/// Any token that is not an invoice id is an error: an empty selection would
/// widen the export to every filtered invoice.
pub fn parse_ids(input: &str) -> Result<Vec<i64>> {
    let mut ids = Vec::new();
    for token in input.split(',').map(str::trim) {
        if token.is_empty() {
            continue;
        }
        match token.parse::<i64>() {
            Ok(id) => ids.push(id),
            Err(_) => bail!("Invalid invoice id '{}' in --ids", token),
        }
    }
    if ids.is_empty() {
        bail!("--ids was given but lists no invoice ids");
    }
    Ok(ids)
}

pub fn cmd_export_materials(
    db: &Database,
    output: Option<PathBuf>,
    ids: Option<&str>,
    range: Option<TimeRange>,
    filter: ExportFilter,
) -> Result<()> {
    let today = Utc::now().date_naive();
    let query = InvoiceQuery {
        since: range.and_then(|r| r.lower_bound(Utc::now())),
        limit: None,
    };
    let invoices = db.list_invoices(&query)?;

    let selected = match ids {
        Some(raw) => parse_ids(raw)?,
        None => Vec::new(),
    };
    let selection = ExportSelection::with_selected(filter, selected);
    let shown: Vec<&InvoiceListEntry> = selection.filter.apply(&invoices);
    let candidates = selection.candidates(&shown);

    let file = match db.export_detailed_csv(&candidates, today) {
        Ok(file) => file,
        Err(CoreError::NothingToExport(msg)) => {
            println!("⚠️  {}", msg);
            return Ok(());
        }
        Err(e) => return Err(anyhow::Error::new(e).context("Failed to export data")),
    };

    let path = output.unwrap_or_else(|| PathBuf::from(&file.filename));
    let mut out = File::create(&path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    out.write_all(file.content.as_bytes())?;

    println!(
        "✅ Exported {} rows from {} invoices to {}",
        file.row_count,
        candidates.len(),
        path.display()
    );
    Ok(())
}
