//! Invoice operations

use std::collections::HashMap;

use rusqlite::{params, OptionalExtension};
use tracing::{debug, info};

use super::{column_date, column_date_opt, column_datetime, column_number, Database};
use crate::error::{Error, Result};
use crate::models::{
    Invoice, InvoiceDetails, InvoiceItem, InvoiceListEntry, InvoiceQuery, InvoiceStatus,
    ItemMaterial, ItemWithMaterials, NewInvoice,
};

const INVOICE_COLUMNS: &str = r#"
    id, invoice_no, client_id, project_name, invoice_date, due_date, subtotal, discount,
    vat_rate, vat_amount, total, notes, status, created_at, updated_at
"#;

fn require_finite(field: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(Error::InvalidData(format!("{} must be a finite number", field)))
    }
}

fn require_non_negative(field: &str, value: f64) -> Result<()> {
    require_finite(field, value)?;
    if value < 0.0 {
        return Err(Error::InvalidData(format!("{} must not be negative", field)));
    }
    Ok(())
}

/// Reject input that would break the stored total invariants
fn validate_new_invoice(invoice: &NewInvoice) -> Result<()> {
    if invoice.invoice_no.trim().is_empty() {
        return Err(Error::InvalidData("Invoice number is required".to_string()));
    }
    require_non_negative("discount", invoice.discount)?;
    require_non_negative("vat_rate", invoice.vat_rate)?;

    for (idx, item) in invoice.items.iter().enumerate() {
        require_non_negative(&format!("items[{}].qty", idx), item.qty)?;
        require_finite(&format!("items[{}].unit_price", idx), item.unit_price)?;
        for (m_idx, material) in item.materials.iter().enumerate() {
            if material.material_name.trim().is_empty() {
                return Err(Error::InvalidData(format!(
                    "items[{}].materials[{}].material_name is required",
                    idx, m_idx
                )));
            }
            require_non_negative(
                &format!("items[{}].materials[{}].qty_per_item", idx, m_idx),
                material.qty_per_item,
            )?;
            require_finite(
                &format!("items[{}].materials[{}].unit_cost", idx, m_idx),
                material.unit_cost,
            )?;
        }
    }

    Ok(())
}

impl Database {
    /// Create an invoice with its items and materials in one transaction
    ///
    /// Derived amounts (`line_total`, material `total_qty`, `subtotal`,
    /// `vat_amount`, `total`) are computed here and stored; nothing downstream
    /// recomputes them.
    pub fn create_invoice(&self, invoice: &NewInvoice) -> Result<InvoiceDetails> {
        validate_new_invoice(invoice)?;
        let invoice_no = invoice.invoice_no.trim();

        let mut conn = self.conn()?;

        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM invoices WHERE invoice_no = ?",
                params![invoice_no],
                |row| row.get(0),
            )
            .optional()?;
        if existing.is_some() {
            return Err(Error::Conflict(format!(
                "Invoice number {} already exists",
                invoice_no
            )));
        }

        if let Some(client_id) = invoice.client_id {
            let known: Option<i64> = conn
                .query_row(
                    "SELECT id FROM clients WHERE id = ?",
                    params![client_id],
                    |row| row.get(0),
                )
                .optional()?;
            if known.is_none() {
                return Err(Error::InvalidData(format!("Unknown client id {}", client_id)));
            }
        }

        let subtotal: f64 = invoice
            .items
            .iter()
            .map(|item| item.qty * item.unit_price)
            .sum();
        let taxable = subtotal - invoice.discount;
        let vat_amount = taxable * invoice.vat_rate / 100.0;
        let total = taxable + vat_amount;

        let tx = conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO invoices (invoice_no, client_id, project_name, invoice_date, due_date,
                                  subtotal, discount, vat_rate, vat_amount, total, notes, status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                invoice_no,
                invoice.client_id,
                invoice.project_name,
                invoice.invoice_date.to_string(),
                invoice.due_date.map(|d| d.to_string()),
                subtotal,
                invoice.discount,
                invoice.vat_rate,
                vat_amount,
                total,
                invoice.notes,
                invoice.status.as_str(),
            ],
        )?;
        let invoice_id = tx.last_insert_rowid();

        for (sort_order, item) in invoice.items.iter().enumerate() {
            let category = item.category.trim();
            tx.execute(
                r#"
                INSERT INTO invoice_items (invoice_id, category, code, description, dimensions,
                                           qty, unit_price, line_total, image_url, sort_order)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
                params![
                    invoice_id,
                    (!category.is_empty()).then_some(category),
                    item.code,
                    item.description,
                    item.dimensions,
                    item.qty,
                    item.unit_price,
                    item.qty * item.unit_price,
                    item.image_url,
                    sort_order as i64,
                ],
            )?;
            let item_id = tx.last_insert_rowid();

            for material in &item.materials {
                tx.execute(
                    r#"
                    INSERT INTO item_materials (invoice_item_id, material_name, unit,
                                                qty_per_item, total_qty, unit_cost)
                    VALUES (?, ?, ?, ?, ?, ?)
                    "#,
                    params![
                        item_id,
                        material.material_name.trim(),
                        material.unit.trim(),
                        material.qty_per_item,
                        material.qty_per_item * item.qty,
                        material.unit_cost,
                    ],
                )?;
            }
        }

        tx.commit()?;
        drop(conn);

        info!(
            invoice_id,
            invoice_no,
            items = invoice.items.len(),
            total,
            "Created invoice"
        );

        self.get_invoice_details(invoice_id)?
            .ok_or_else(|| Error::NotFound(format!("invoice {}", invoice_id)))
    }

    /// Get a single invoice header by ID
    pub fn get_invoice(&self, id: i64) -> Result<Option<Invoice>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM invoices WHERE id = ?", INVOICE_COLUMNS);
        let invoice = conn
            .query_row(&sql, params![id], Self::row_to_invoice)
            .optional()?;
        Ok(invoice)
    }

    /// Load an invoice with its client, items and materials
    ///
    /// Returns `Ok(None)` when the invoice does not exist.
    pub fn get_invoice_details(&self, id: i64) -> Result<Option<InvoiceDetails>> {
        let Some(invoice) = self.get_invoice(id)? else {
            debug!(invoice_id = id, "Invoice not found");
            return Ok(None);
        };

        let client = match invoice.client_id {
            Some(client_id) => self.get_client(client_id)?,
            None => None,
        };

        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT id, invoice_id, category, code, description, dimensions, qty, unit_price,
                   line_total, image_url, sort_order, created_at
            FROM invoice_items
            WHERE invoice_id = ?
            ORDER BY sort_order, id
            "#,
        )?;
        let items = stmt
            .query_map(params![id], Self::row_to_item)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT m.id, m.invoice_item_id, m.material_name, m.unit, m.qty_per_item,
                   m.total_qty, m.unit_cost, m.created_at
            FROM item_materials m
            JOIN invoice_items i ON i.id = m.invoice_item_id
            WHERE i.invoice_id = ?
            ORDER BY m.id
            "#,
        )?;
        let materials = stmt
            .query_map(params![id], Self::row_to_material)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut by_item: HashMap<i64, Vec<ItemMaterial>> = HashMap::new();
        for material in materials {
            by_item
                .entry(material.invoice_item_id)
                .or_default()
                .push(material);
        }

        let items = items
            .into_iter()
            .map(|item| {
                let materials = by_item.remove(&item.id).unwrap_or_default();
                ItemWithMaterials { item, materials }
            })
            .collect();

        Ok(Some(InvoiceDetails {
            invoice,
            client,
            items,
        }))
    }

    /// List invoices with their client names, newest first
    pub fn list_invoices(&self, query: &InvoiceQuery) -> Result<Vec<InvoiceListEntry>> {
        let conn = self.conn()?;

        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(since) = query.since {
            conditions.push("i.invoice_date >= ?");
            params.push(Box::new(since.to_string()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let limit_clause = match query.limit {
            Some(limit) => {
                params.push(Box::new(limit));
                "LIMIT ?"
            }
            None => "",
        };

        let sql = format!(
            r#"
            SELECT i.id, i.invoice_no, c.name, i.project_name, i.invoice_date, i.total, i.status
            FROM invoices i
            LEFT JOIN clients c ON c.id = i.client_id
            {}
            ORDER BY i.invoice_date DESC, i.id DESC
            {}
            "#,
            where_clause, limit_clause
        );

        let mut stmt = conn.prepare(&sql)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let entries = stmt
            .query_map(params_refs.as_slice(), |row| {
                let status_str: String = row.get(6)?;
                Ok(InvoiceListEntry {
                    id: row.get(0)?,
                    invoice_no: row.get(1)?,
                    client_name: row.get(2)?,
                    project_name: row.get(3)?,
                    invoice_date: row.get(4)?,
                    total: column_number(row, 5, "invoices.total")?,
                    status: status_str.parse().unwrap_or_default(),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    /// Move an invoice to a new status
    pub fn update_invoice_status(&self, id: i64, status: InvoiceStatus) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE invoices SET status = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
            params![status.as_str(), id],
        )?;

        if updated == 0 {
            return Err(Error::NotFound(format!("invoice {}", id)));
        }

        info!(invoice_id = id, status = %status, "Updated invoice status");
        Ok(())
    }

    /// Delete an invoice; items and materials go with it
    pub fn delete_invoice(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM invoices WHERE id = ?", params![id])?;

        if deleted == 0 {
            return Err(Error::NotFound(format!("invoice {}", id)));
        }

        info!(invoice_id = id, "Deleted invoice");
        Ok(())
    }

    fn row_to_invoice(row: &rusqlite::Row) -> rusqlite::Result<Invoice> {
        let status_str: String = row.get(12)?;

        Ok(Invoice {
            id: row.get(0)?,
            invoice_no: row.get(1)?,
            client_id: row.get(2)?,
            project_name: row.get(3)?,
            invoice_date: column_date(row, 4)?,
            due_date: column_date_opt(row, 5)?,
            subtotal: column_number(row, 6, "invoices.subtotal")?,
            discount: column_number(row, 7, "invoices.discount")?,
            vat_rate: column_number(row, 8, "invoices.vat_rate")?,
            vat_amount: column_number(row, 9, "invoices.vat_amount")?,
            total: column_number(row, 10, "invoices.total")?,
            notes: row.get(11)?,
            status: status_str.parse().unwrap_or_default(),
            created_at: column_datetime(row, 13)?,
            updated_at: column_datetime(row, 14)?,
        })
    }

    fn row_to_item(row: &rusqlite::Row) -> rusqlite::Result<InvoiceItem> {
        let category: Option<String> = row.get(2)?;

        Ok(InvoiceItem {
            id: row.get(0)?,
            invoice_id: row.get(1)?,
            category: category.unwrap_or_default(),
            code: row.get(3)?,
            description: row.get(4)?,
            dimensions: row.get(5)?,
            qty: column_number(row, 6, "invoice_items.qty")?,
            unit_price: column_number(row, 7, "invoice_items.unit_price")?,
            line_total: column_number(row, 8, "invoice_items.line_total")?,
            image_url: row.get(9)?,
            sort_order: row.get(10)?,
            created_at: column_datetime(row, 11)?,
        })
    }

    fn row_to_material(row: &rusqlite::Row) -> rusqlite::Result<ItemMaterial> {
        Ok(ItemMaterial {
            id: row.get(0)?,
            invoice_item_id: row.get(1)?,
            material_name: row.get(2)?,
            unit: row.get(3)?,
            qty_per_item: column_number(row, 4, "item_materials.qty_per_item")?,
            total_qty: column_number(row, 5, "item_materials.total_qty")?,
            unit_cost: column_number(row, 6, "item_materials.unit_cost")?,
            created_at: column_datetime(row, 7)?,
        })
    }
}
