//! Domain models for Billet

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::numeric::WireNumber;
use crate::window::TimeRange;

// ============================================================================
// Stored entities
// ============================================================================

/// A customer that invoices are issued to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: i64,
    pub name: String,
    pub company: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub site_address: String,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a client
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewClient {
    pub name: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub site_address: String,
}

/// Invoice lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Sent,
    Paid,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Sent => "sent",
            Self::Paid => "paid",
        }
    }
}

impl std::str::FromStr for InvoiceStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "sent" => Ok(Self::Sent),
            "paid" => Ok(Self::Paid),
            _ => Err(format!("Unknown invoice status: {}", s)),
        }
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An invoice header
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: i64,
    pub invoice_no: String,
    pub client_id: Option<i64>,
    pub project_name: String,
    pub invoice_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub subtotal: f64,
    pub discount: f64,
    /// VAT percentage, e.g. 14.0
    pub vat_rate: f64,
    pub vat_amount: f64,
    pub total: f64,
    pub notes: String,
    pub status: InvoiceStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A line item on an invoice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub id: i64,
    pub invoice_id: i64,
    pub category: String,
    pub code: String,
    pub description: String,
    pub dimensions: String,
    pub qty: f64,
    pub unit_price: f64,
    pub line_total: f64,
    pub image_url: Option<String>,
    pub sort_order: i64,
    pub created_at: DateTime<Utc>,
}

/// Material consumed by a line item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemMaterial {
    pub id: i64,
    pub invoice_item_id: i64,
    pub material_name: String,
    pub unit: String,
    pub qty_per_item: f64,
    /// Stored total; authoritative even if the item quantity changed later
    pub total_qty: f64,
    pub unit_cost: f64,
    pub created_at: DateTime<Utc>,
}

/// A line item together with its materials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemWithMaterials {
    #[serde(flatten)]
    pub item: InvoiceItem,
    pub materials: Vec<ItemMaterial>,
}

/// Everything needed to render one invoice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceDetails {
    pub invoice: Invoice,
    pub client: Option<Client>,
    pub items: Vec<ItemWithMaterials>,
}

/// Compact invoice row for lists and export selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceListEntry {
    pub id: i64,
    pub invoice_no: String,
    pub client_name: Option<String>,
    pub project_name: String,
    pub invoice_date: String,
    pub total: f64,
    pub status: InvoiceStatus,
}

// ============================================================================
// Creation inputs
// ============================================================================

/// Input for creating an invoice with its items and materials
///
/// Totals are derived on insert: `line_total = qty * unit_price`,
/// `subtotal = sum(line_total)`, `vat_amount = (subtotal - discount) * vat_rate / 100`
/// and `total = subtotal - discount + vat_amount`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInvoice {
    pub invoice_no: String,
    #[serde(default)]
    pub client_id: Option<i64>,
    #[serde(default)]
    pub project_name: String,
    pub invoice_date: NaiveDate,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub discount: f64,
    #[serde(default)]
    pub vat_rate: f64,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub status: InvoiceStatus,
    #[serde(default)]
    pub items: Vec<NewInvoiceItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewInvoiceItem {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub dimensions: String,
    pub qty: f64,
    pub unit_price: f64,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub materials: Vec<NewItemMaterial>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewItemMaterial {
    pub material_name: String,
    #[serde(default)]
    pub unit: String,
    pub qty_per_item: f64,
    #[serde(default)]
    pub unit_cost: f64,
}

/// Filters for listing invoices
#[derive(Debug, Clone, Default)]
pub struct InvoiceQuery {
    /// Only invoices dated on or after this day
    pub since: Option<NaiveDate>,
    pub limit: Option<i64>,
}

// ============================================================================
// Raw analytics rows (as fetched, numbers not yet coerced)
// ============================================================================

/// Invoice columns used by summary, time series and top clients
#[derive(Debug, Clone)]
pub struct InvoiceRow {
    pub id: i64,
    pub invoice_date: String,
    pub total: WireNumber,
    pub status: String,
    /// Resolved client display name, `None` when the reference is missing
    pub client_name: Option<String>,
}

/// Item columns used by the summary and category breakdown
#[derive(Debug, Clone)]
pub struct ItemRow {
    pub invoice_id: i64,
    pub category: Option<String>,
    pub qty: WireNumber,
    pub unit_price: WireNumber,
}

/// Material columns used by the material breakdown
#[derive(Debug, Clone)]
pub struct MaterialRow {
    pub material_name: String,
    pub unit: String,
    pub total_qty: WireNumber,
    pub unit_cost: WireNumber,
}

// ============================================================================
// Derived analytics records
// ============================================================================

/// Headline numbers for the KPI cards
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub total_invoices: i64,
    pub total_revenue: f64,
    pub avg_invoice_value: f64,
    pub total_items_sold: f64,
    pub draft_count: i64,
    pub paid_count: i64,
    pub sent_count: i64,
}

/// Invoices and revenue on one invoice date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub period: String,
    pub invoice_count: i64,
    pub revenue: f64,
}

/// Quantity and revenue per item category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    pub category: String,
    /// Sum of item quantities
    pub item_count: f64,
    pub revenue: f64,
}

/// Consumption per (material, unit) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialBreakdown {
    pub material_name: String,
    pub unit: String,
    pub total_qty: f64,
    /// Number of material rows (item usages) contributing
    pub usage_count: i64,
    pub total_cost: f64,
}

/// Revenue per client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopClient {
    pub client_name: String,
    pub invoice_count: i64,
    pub total_revenue: f64,
}

/// One full dashboard computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analytics {
    pub range: TimeRange,
    /// Inclusive lower bound applied to invoice dates
    pub since: Option<NaiveDate>,
    pub generated_at: DateTime<Utc>,
    pub summary: AnalyticsSummary,
    pub time_series: Vec<TimeSeriesPoint>,
    pub categories: Vec<CategoryBreakdown>,
    pub materials: Vec<MaterialBreakdown>,
    pub top_clients: Vec<TopClient>,
}
