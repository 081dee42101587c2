//! Detailed material export
//!
//! One CSV row per (invoice, item, material). Items without materials still
//! get a row with blank material columns and zero amounts so every billed item
//! shows up in the extract.

use chrono::NaiveDate;
use rusqlite::params;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::db::Database;
use crate::error::{Error, Result};
use crate::numeric::WireNumber;

/// MIME type for the exported file
pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

const HEADER: [&str; 10] = [
    "Date",
    "Customer Name",
    "Invoice No",
    "Item Name",
    "Description",
    "Material",
    "Unit",
    "Quantity",
    "Unit Cost",
    "Total Cost",
];

/// One denormalized export row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedMaterialRow {
    pub date: String,
    pub customer_name: String,
    pub invoice_no: String,
    /// Item code, or its category when the code is blank
    pub item_name: String,
    pub description: String,
    pub material_name: String,
    pub unit: String,
    pub quantity: f64,
    pub unit_cost: f64,
    pub total_cost: f64,
}

/// A rendered CSV download
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub filename: String,
    pub content: String,
    pub row_count: usize,
}

/// Escape a field for CSV output
pub fn escape_csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn push_line<I, S>(out: &mut String, fields: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let line: Vec<String> = fields
        .into_iter()
        .map(|f| escape_csv_field(f.as_ref()))
        .collect();
    out.push_str(&line.join(","));
    out.push_str("\r\n");
}

/// Render rows as CSV text: header first, CRLF after every line, amounts
/// with two decimals
pub fn build_detailed_csv(rows: &[DetailedMaterialRow]) -> String {
    let mut csv = String::new();
    push_line(&mut csv, HEADER);

    for row in rows {
        push_line(
            &mut csv,
            [
                row.date.clone(),
                row.customer_name.clone(),
                row.invoice_no.clone(),
                row.item_name.clone(),
                row.description.clone(),
                row.material_name.clone(),
                row.unit.clone(),
                format!("{:.2}", row.quantity),
                format!("{:.2}", row.unit_cost),
                format!("{:.2}", row.total_cost),
            ],
        );
    }

    csv
}

/// `material-breakdown-detailed-<YYYY-MM-DD>.csv`
pub fn export_filename(date: NaiveDate) -> String {
    format!("material-breakdown-detailed-{}.csv", date.format("%Y-%m-%d"))
}

impl Database {
    /// Fetch export rows for the given invoices
    ///
    /// Ordered by invoice date, invoice number, item position and material.
    /// The ids travel as a single JSON array parameter, so any number of
    /// invoices fits in one statement.
    pub fn detailed_material_rows(&self, invoice_ids: &[i64]) -> Result<Vec<DetailedMaterialRow>> {
        if invoice_ids.is_empty() {
            return Ok(Vec::new());
        }

        let id_list = serde_json::to_string(invoice_ids)?;

        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT i.invoice_date, c.name, i.invoice_no, it.code, it.category, it.description,
                   m.material_name, m.unit, m.total_qty, m.unit_cost
            FROM invoices i
            JOIN invoice_items it ON it.invoice_id = i.id
            LEFT JOIN item_materials m ON m.invoice_item_id = it.id
            LEFT JOIN clients c ON c.id = i.client_id
            WHERE i.id IN (SELECT value FROM json_each(?))
            ORDER BY i.invoice_date, i.invoice_no, it.sort_order, it.id, m.id
            "#,
        )?;
        let raw = stmt
            .query_map(params![id_list], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, Option<String>>(6)?,
                    row.get::<_, Option<String>>(7)?,
                    row.get::<_, WireNumber>(8)?,
                    row.get::<_, WireNumber>(9)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut rows = Vec::with_capacity(raw.len());
        for (date, client, invoice_no, code, category, description, material, unit, qty, cost) in
            raw
        {
            let quantity = qty.to_f64("item_materials.total_qty")?;
            let unit_cost = cost.to_f64("item_materials.unit_cost")?;
            let item_name = if code.trim().is_empty() {
                category.unwrap_or_default()
            } else {
                code
            };

            rows.push(DetailedMaterialRow {
                date,
                customer_name: client.unwrap_or_default(),
                invoice_no,
                item_name,
                description,
                material_name: material.unwrap_or_default(),
                unit: unit.unwrap_or_default(),
                quantity,
                unit_cost,
                total_cost: quantity * unit_cost,
            });
        }

        Ok(rows)
    }

    /// Build the detailed CSV download for `invoice_ids`, named for `today`
    ///
    /// Fails with `NothingToExport` when no ids are given (no query runs) or
    /// when the invoices have no items to report.
    pub fn export_detailed_csv(&self, invoice_ids: &[i64], today: NaiveDate) -> Result<ExportFile> {
        if invoice_ids.is_empty() {
            return Err(Error::NothingToExport(
                "No invoices selected for export".to_string(),
            ));
        }

        let rows = self.detailed_material_rows(invoice_ids)?;
        if rows.is_empty() {
            return Err(Error::NothingToExport(
                "No material data found for selected invoices".to_string(),
            ));
        }

        info!(
            invoices = invoice_ids.len(),
            rows = rows.len(),
            "Exported detailed material breakdown"
        );

        Ok(ExportFile {
            filename: export_filename(today),
            content: build_detailed_csv(&rows),
            row_count: rows.len(),
        })
    }
}
