//! Window-filtered row fetches for the analytics engine
//!
//! Child tables carry no date of their own. They are limited by a subquery
//! over the invoices inside the window, so the number of bound parameters
//! stays fixed however many invoices match.

use chrono::NaiveDate;

use super::Database;
use crate::error::Result;
use crate::models::{InvoiceRow, ItemRow, MaterialRow};

impl Database {
    /// Invoices dated on or after `since`, oldest first, with client names
    pub fn analytics_invoice_rows(&self, since: Option<NaiveDate>) -> Result<Vec<InvoiceRow>> {
        let conn = self.conn()?;

        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        let where_clause = match since {
            Some(bound) => {
                params.push(Box::new(bound.to_string()));
                "WHERE i.invoice_date >= ?"
            }
            None => "",
        };

        let sql = format!(
            r#"
            SELECT i.id, i.invoice_date, i.total, i.status, c.name
            FROM invoices i
            LEFT JOIN clients c ON c.id = i.client_id
            {}
            ORDER BY i.invoice_date ASC, i.id ASC
            "#,
            where_clause
        );

        let mut stmt = conn.prepare(&sql)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let rows = stmt
            .query_map(params_refs.as_slice(), |row| {
                Ok(InvoiceRow {
                    id: row.get(0)?,
                    invoice_date: row.get(1)?,
                    total: row.get(2)?,
                    status: row.get(3)?,
                    client_name: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Line items on invoices dated on or after `since`
    pub fn analytics_item_rows(&self, since: Option<NaiveDate>) -> Result<Vec<ItemRow>> {
        let (window, params) = invoice_window(since);
        let sql = format!(
            r#"
            SELECT invoice_id, category, qty, unit_price
            FROM invoice_items
            {}
            ORDER BY invoice_id, sort_order, id
            "#,
            window
                .map(|w| format!("WHERE invoice_id IN ({})", w))
                .unwrap_or_default()
        );

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(params.iter()), |row| {
                Ok(ItemRow {
                    invoice_id: row.get(0)?,
                    category: row.get(1)?,
                    qty: row.get(2)?,
                    unit_price: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Material usages on line items of invoices dated on or after `since`
    pub fn analytics_material_rows(&self, since: Option<NaiveDate>) -> Result<Vec<MaterialRow>> {
        let (window, params) = invoice_window(since);
        let sql = format!(
            r#"
            SELECT material_name, unit, total_qty, unit_cost
            FROM item_materials
            {}
            ORDER BY id
            "#,
            window
                .map(|w| {
                    format!(
                        "WHERE invoice_item_id IN \
                         (SELECT id FROM invoice_items WHERE invoice_id IN ({}))",
                        w
                    )
                })
                .unwrap_or_default()
        );

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(params.iter()), |row| {
                Ok(MaterialRow {
                    material_name: row.get(0)?,
                    unit: row.get(1)?,
                    total_qty: row.get(2)?,
                    unit_cost: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}

/// Subquery selecting the ids of invoices inside the window, with its single
/// bound parameter; `None` when the window is unbounded
fn invoice_window(since: Option<NaiveDate>) -> (Option<&'static str>, Vec<String>) {
    match since {
        Some(bound) => (
            Some("SELECT id FROM invoices WHERE invoice_date >= ?"),
            vec![bound.to_string()],
        ),
        None => (None, Vec::new()),
    }
}
