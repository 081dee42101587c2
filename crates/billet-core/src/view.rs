//! Presentation state held as explicit values
//!
//! `DashboardView` tracks the selected range and the last committed analytics.
//! Every refresh takes a ticket; only the newest ticket may commit, so a slow
//! request that finishes after a newer one is dropped instead of overwriting it.
//!
//! `ExportSelection` tracks which invoices are ticked in the export table and
//! the search/date filters narrowing it.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Analytics, InvoiceListEntry};
use crate::window::TimeRange;

// ============================================================================
// Notices
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Error,
    Warning,
    Info,
}

/// A user-facing message (toast)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, title, message)
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, title, message)
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, title, message)
    }

    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, title, message)
    }
}

// ============================================================================
// Dashboard
// ============================================================================

/// Proof that a refresh was started; needed to commit its result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTicket {
    generation: u64,
    range: TimeRange,
}

impl RefreshTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn range(&self) -> TimeRange {
        self.range
    }
}

/// Dashboard view state
#[derive(Debug, Clone, Default)]
pub struct DashboardView {
    range: TimeRange,
    generation: u64,
    loading: bool,
    analytics: Option<Analytics>,
    notice: Option<Notice>,
    updated_at: Option<DateTime<Utc>>,
}

/// Serializable copy of the dashboard state
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub range: TimeRange,
    pub generation: u64,
    pub loading: bool,
    pub analytics: Option<Analytics>,
    pub notice: Option<Notice>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl DashboardView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn range(&self) -> TimeRange {
        self.range
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn analytics(&self) -> Option<&Analytics> {
        self.analytics.as_ref()
    }

    /// Select `range` and start a new refresh, superseding any in flight
    pub fn begin_refresh(&mut self, range: TimeRange) -> RefreshTicket {
        self.generation += 1;
        self.range = range;
        self.loading = true;
        self.notice = None;
        RefreshTicket {
            generation: self.generation,
            range,
        }
    }

    fn is_current(&self, ticket: RefreshTicket) -> bool {
        ticket.generation == self.generation
    }

    /// Apply a finished refresh. Returns false (and changes nothing) when a
    /// newer refresh has started since `ticket` was issued.
    pub fn commit(&mut self, ticket: RefreshTicket, analytics: Analytics) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.updated_at = Some(analytics.generated_at);
        self.analytics = Some(analytics);
        self.loading = false;
        true
    }

    /// Record a failed refresh. Stale failures are ignored like stale results.
    pub fn fail(&mut self, ticket: RefreshTicket, notice: Notice) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.loading = false;
        self.notice = Some(notice);
        true
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        DashboardSnapshot {
            range: self.range,
            generation: self.generation,
            loading: self.loading,
            analytics: self.analytics.clone(),
            notice: self.notice.clone(),
            updated_at: self.updated_at,
        }
    }
}

// ============================================================================
// Export selection
// ============================================================================

/// Filters narrowing the export table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportFilter {
    /// Case-insensitive match against invoice number or client name
    #[serde(default)]
    pub search: Option<String>,
    /// Inclusive `YYYY-MM-DD` lower bound
    #[serde(default)]
    pub date_from: Option<String>,
    /// Inclusive `YYYY-MM-DD` upper bound
    #[serde(default)]
    pub date_to: Option<String>,
}

impl ExportFilter {
    pub fn matches(&self, invoice: &InvoiceListEntry) -> bool {
        if let Some(search) = self.search.as_deref().map(str::trim) {
            if !search.is_empty() {
                let needle = search.to_lowercase();
                let in_number = invoice.invoice_no.to_lowercase().contains(&needle);
                let in_client = invoice
                    .client_name
                    .as_deref()
                    .is_some_and(|name| name.to_lowercase().contains(&needle));
                if !in_number && !in_client {
                    return false;
                }
            }
        }

        if let Some(from) = self.date_from.as_deref().filter(|d| !d.is_empty()) {
            if invoice.invoice_date.as_str() < from {
                return false;
            }
        }

        if let Some(to) = self.date_to.as_deref().filter(|d| !d.is_empty()) {
            if invoice.invoice_date.as_str() > to {
                return false;
            }
        }

        true
    }

    /// Keep only the invoices matching this filter, preserving order
    pub fn apply<'a>(&self, invoices: &'a [InvoiceListEntry]) -> Vec<&'a InvoiceListEntry> {
        invoices.iter().filter(|inv| self.matches(inv)).collect()
    }
}

/// Which invoices are ticked for export
#[derive(Debug, Clone, Default)]
pub struct ExportSelection {
    selected: BTreeSet<i64>,
    pub filter: ExportFilter,
}

impl ExportSelection {
    pub fn new(filter: ExportFilter) -> Self {
        Self {
            selected: BTreeSet::new(),
            filter,
        }
    }

    /// Start from an explicit set of ticked ids
    pub fn with_selected(filter: ExportFilter, ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            selected: ids.into_iter().collect(),
            filter,
        }
    }

    pub fn selected(&self) -> impl Iterator<Item = i64> + '_ {
        self.selected.iter().copied()
    }

    pub fn is_selected(&self, id: i64) -> bool {
        self.selected.contains(&id)
    }

    /// Tick every invoice currently shown
    pub fn select_all(&mut self, filtered: &[&InvoiceListEntry]) {
        self.selected = filtered.iter().map(|inv| inv.id).collect();
    }

    pub fn toggle(&mut self, id: i64, checked: bool) {
        if checked {
            self.selected.insert(id);
        } else {
            self.selected.remove(&id);
        }
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Every shown invoice is ticked (false when nothing is shown)
    pub fn all_selected(&self, filtered: &[&InvoiceListEntry]) -> bool {
        !filtered.is_empty() && filtered.iter().all(|inv| self.selected.contains(&inv.id))
    }

    /// Some, but not all, shown invoices are ticked
    pub fn some_selected(&self, filtered: &[&InvoiceListEntry]) -> bool {
        let ticked = filtered
            .iter()
            .filter(|inv| self.selected.contains(&inv.id))
            .count();
        ticked > 0 && ticked < filtered.len()
    }

    /// Invoice ids to export: the ticked ones, or every shown invoice when
    /// nothing is ticked
    pub fn candidates(&self, filtered: &[&InvoiceListEntry]) -> Vec<i64> {
        if self.selected.is_empty() {
            filtered.iter().map(|inv| inv.id).collect()
        } else {
            self.selected.iter().copied().collect()
        }
    }
}
