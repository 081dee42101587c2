//! Billet Core Library
//!
//! Shared functionality for the Billet invoice analytics tool:
//! - Database access and migrations (clients, invoices, items, materials)
//! - Time window resolution for analytics queries
//! - Analytics aggregation engine and concurrent loader
//! - Detailed material CSV export
//! - View state (dashboard refresh generations, export selection, notices)

pub mod analytics;
pub mod db;
pub mod error;
pub mod export;
pub mod models;
pub mod numeric;
pub mod view;
pub mod window;

pub use analytics::{load_analytics, TOP_CLIENTS_LIMIT, TOP_MATERIALS_LIMIT};
pub use db::{AuditAction, AuditEntry, AuditEvent, AuditQuery, Database};
pub use error::{Error, Result};
pub use export::{export_filename, DetailedMaterialRow, ExportFile, CSV_CONTENT_TYPE};
pub use numeric::WireNumber;
pub use view::{
    DashboardSnapshot, DashboardView, ExportFilter, ExportSelection, Notice, NoticeLevel,
    RefreshTicket,
};
pub use window::TimeRange;
