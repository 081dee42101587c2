//! Request audit trail
//!
//! Each entry names what was done and which invoices it touched. Invoice ids
//! are kept as a JSON array so an export of many invoices stays one row, and
//! the log can still be searched for every request involving one invoice.

use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};

use super::{column_datetime, Database};
use crate::error::Result;
use crate::export::ExportFile;
use crate::window::TimeRange;

/// Kind of audited request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    ViewDashboard,
    SetDashboardRange,
    ListClients,
    CreateClient,
    ViewClient,
    ListInvoices,
    CreateInvoice,
    ViewInvoice,
    UpdateInvoiceStatus,
    DeleteInvoice,
    ExportMaterials,
    ListAudit,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ViewDashboard => "view_dashboard",
            Self::SetDashboardRange => "set_dashboard_range",
            Self::ListClients => "list_clients",
            Self::CreateClient => "create_client",
            Self::ViewClient => "view_client",
            Self::ListInvoices => "list_invoices",
            Self::CreateInvoice => "create_invoice",
            Self::ViewInvoice => "view_invoice",
            Self::UpdateInvoiceStatus => "update_invoice_status",
            Self::DeleteInvoice => "delete_invoice",
            Self::ExportMaterials => "export_materials",
            Self::ListAudit => "list_audit",
        }
    }
}

impl std::str::FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "view_dashboard" => Ok(Self::ViewDashboard),
            "set_dashboard_range" => Ok(Self::SetDashboardRange),
            "list_clients" => Ok(Self::ListClients),
            "create_client" => Ok(Self::CreateClient),
            "view_client" => Ok(Self::ViewClient),
            "list_invoices" => Ok(Self::ListInvoices),
            "create_invoice" => Ok(Self::CreateInvoice),
            "view_invoice" => Ok(Self::ViewInvoice),
            "update_invoice_status" => Ok(Self::UpdateInvoiceStatus),
            "delete_invoice" => Ok(Self::DeleteInvoice),
            "export_materials" => Ok(Self::ExportMaterials),
            "list_audit" => Ok(Self::ListAudit),
            _ => Err(format!("Unknown audit action: {}", s)),
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A request about to be recorded
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub action: AuditAction,
    pub client_id: Option<i64>,
    pub invoice_ids: Vec<i64>,
    pub range: Option<TimeRange>,
    pub export_file: Option<String>,
    pub row_count: Option<i64>,
    pub details: Option<String>,
}

impl AuditEvent {
    pub fn new(action: AuditAction) -> Self {
        Self {
            action,
            client_id: None,
            invoice_ids: Vec::new(),
            range: None,
            export_file: None,
            row_count: None,
            details: None,
        }
    }

    pub fn client(mut self, id: impl Into<Option<i64>>) -> Self {
        self.client_id = id.into();
        self
    }

    pub fn invoice(mut self, id: i64) -> Self {
        self.invoice_ids.push(id);
        self
    }

    pub fn invoices(mut self, ids: &[i64]) -> Self {
        self.invoice_ids.extend_from_slice(ids);
        self
    }

    pub fn range(mut self, range: TimeRange) -> Self {
        self.range = Some(range);
        self
    }

    /// Record the file handed out by an export
    pub fn export(mut self, file: &ExportFile) -> Self {
        self.export_file = Some(file.filename.clone());
        self.row_count = Some(file.row_count as i64);
        self
    }

    /// Result size of a listing
    pub fn returned(mut self, count: usize) -> Self {
        self.row_count = Some(count as i64);
        self
    }

    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// A recorded audit entry
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    pub action: AuditAction,
    pub client_id: Option<i64>,
    pub invoice_ids: Vec<i64>,
    pub range: Option<TimeRange>,
    pub export_file: Option<String>,
    pub row_count: Option<i64>,
    pub details: Option<String>,
}

/// Filters for reading the audit trail
#[derive(Debug, Clone)]
pub struct AuditQuery {
    pub limit: i64,
    pub action: Option<AuditAction>,
    /// Only entries that touched this invoice
    pub invoice_id: Option<i64>,
}

impl Default for AuditQuery {
    fn default() -> Self {
        Self {
            limit: 100,
            action: None,
            invoice_id: None,
        }
    }
}

/// Parse a stored text value, reporting failures as a column conversion error
fn parse_text<T, E>(
    idx: usize,
    raw: &str,
    parse: impl Fn(&str) -> std::result::Result<T, E>,
) -> rusqlite::Result<T>
where
    E: std::fmt::Display,
{
    parse(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            e.to_string().into(),
        )
    })
}

impl Database {
    /// Record a request made by `actor`
    pub fn log_audit(&self, actor: &str, event: &AuditEvent) -> Result<i64> {
        let invoice_ids = serde_json::to_string(&event.invoice_ids)?;
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO audit_log
                (actor, action, client_id, invoice_ids, time_range, export_file, row_count, details)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                actor,
                event.action.as_str(),
                event.client_id,
                invoice_ids,
                event.range.map(|r| r.as_str()),
                event.export_file,
                event.row_count,
                event.details,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// List audit entries, newest first
    pub fn list_audit_log(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>> {
        let conn = self.conn()?;

        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(action) = query.action {
            conditions.push("action = ?");
            params.push(Box::new(action.as_str()));
        }
        if let Some(invoice_id) = query.invoice_id {
            conditions.push("EXISTS (SELECT 1 FROM json_each(invoice_ids) WHERE value = ?)");
            params.push(Box::new(invoice_id));
        }
        params.push(Box::new(query.limit));

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let sql = format!(
            r#"
            SELECT id, timestamp, actor, action, client_id, invoice_ids, time_range,
                   export_file, row_count, details
            FROM audit_log
            {}
            ORDER BY timestamp DESC, id DESC
            LIMIT ?
            "#,
            where_clause
        );

        let mut stmt = conn.prepare(&sql)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let entries = stmt
            .query_map(params_refs.as_slice(), |row| {
                let action: String = row.get(3)?;
                let invoice_ids: String = row.get(5)?;
                let time_range: Option<String> = row.get(6)?;
                Ok(AuditEntry {
                    id: row.get(0)?,
                    timestamp: column_datetime(row, 1)?,
                    actor: row.get(2)?,
                    action: parse_text(3, &action, |s| s.parse::<AuditAction>())?,
                    client_id: row.get(4)?,
                    invoice_ids: parse_text(5, &invoice_ids, |s| {
                        serde_json::from_str::<Vec<i64>>(s)
                    })?,
                    range: time_range
                        .map(|r| parse_text(6, &r, |s| s.parse::<TimeRange>()))
                        .transpose()?,
                    export_file: row.get(7)?,
                    row_count: row.get(8)?,
                    details: row.get(9)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entries)
    }
}
