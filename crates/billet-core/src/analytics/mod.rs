//! Analytics aggregation engine
//!
//! Each breakdown is a single linear pass over raw rows with a key to
//! accumulator map. Groups keep first-seen order, so the only reordering is
//! the explicit (stable) sort a breakdown asks for. Every amount goes through
//! [`WireNumber::to_f64`](crate::numeric::WireNumber::to_f64) before it is
//! summed; a bad value fails that breakdown and nothing else.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::hash::Hash;

use crate::error::Result;
use crate::models::{
    AnalyticsSummary, CategoryBreakdown, InvoiceRow, ItemRow, MaterialBreakdown, MaterialRow,
    TimeSeriesPoint, TopClient,
};

mod loader;

pub use loader::load_analytics;

/// Label for items without a category
pub const UNCATEGORIZED_LABEL: &str = "Uncategorized";

/// Label for invoices whose client reference does not resolve
pub const UNKNOWN_CLIENT_LABEL: &str = "Unknown";

/// Number of clients kept in the top clients breakdown
pub const TOP_CLIENTS_LIMIT: usize = 5;

/// Number of (material, unit) groups kept in the material breakdown
pub const TOP_MATERIALS_LIMIT: usize = 10;

/// Insertion-ordered grouping accumulator
struct Groups<K, V> {
    index: HashMap<K, usize>,
    entries: Vec<V>,
}

impl<K: Eq + Hash, V> Groups<K, V> {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }

    /// Get the accumulator for `key`, creating it with `init` on first sight
    fn entry(&mut self, key: K, init: impl FnOnce() -> V) -> &mut V {
        let idx = match self.index.get(&key) {
            Some(&idx) => idx,
            None => {
                self.entries.push(init());
                let idx = self.entries.len() - 1;
                self.index.insert(key, idx);
                idx
            }
        };
        &mut self.entries[idx]
    }

    fn into_vec(self) -> Vec<V> {
        self.entries
    }
}

/// Descending comparison where NaN compares equal to everything
fn descending(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Headline totals and status counts
pub fn summarize(invoices: &[InvoiceRow], items: &[ItemRow]) -> Result<AnalyticsSummary> {
    let mut summary = AnalyticsSummary {
        total_invoices: invoices.len() as i64,
        ..Default::default()
    };

    for invoice in invoices {
        summary.total_revenue += invoice.total.to_f64("invoices.total")?;
        match invoice.status.trim().to_lowercase().as_str() {
            "draft" => summary.draft_count += 1,
            "sent" => summary.sent_count += 1,
            "paid" => summary.paid_count += 1,
            _ => {}
        }
    }

    for item in items {
        summary.total_items_sold += item.qty.to_f64("invoice_items.qty")?;
    }

    if summary.total_invoices > 0 {
        summary.avg_invoice_value = summary.total_revenue / summary.total_invoices as f64;
    }

    Ok(summary)
}

/// Invoice count and revenue per invoice date, in input order
pub fn time_series(invoices: &[InvoiceRow]) -> Result<Vec<TimeSeriesPoint>> {
    let mut groups: Groups<&str, TimeSeriesPoint> = Groups::new();

    for invoice in invoices {
        let total = invoice.total.to_f64("invoices.total")?;
        let point = groups.entry(invoice.invoice_date.as_str(), || TimeSeriesPoint {
            period: invoice.invoice_date.clone(),
            invoice_count: 0,
            revenue: 0.0,
        });
        point.invoice_count += 1;
        point.revenue += total;
    }

    Ok(groups.into_vec())
}

/// Quantity and revenue per category, highest revenue first
pub fn category_breakdown(items: &[ItemRow]) -> Result<Vec<CategoryBreakdown>> {
    let mut groups: Groups<&str, CategoryBreakdown> = Groups::new();

    for item in items {
        let qty = item.qty.to_f64("invoice_items.qty")?;
        let unit_price = item.unit_price.to_f64("invoice_items.unit_price")?;
        let category = non_blank(item.category.as_deref()).unwrap_or(UNCATEGORIZED_LABEL);

        let entry = groups.entry(category, || CategoryBreakdown {
            category: category.to_string(),
            item_count: 0.0,
            revenue: 0.0,
        });
        entry.item_count += qty;
        entry.revenue += qty * unit_price;
    }

    let mut categories = groups.into_vec();
    categories.sort_by(|a, b| descending(a.revenue, b.revenue));
    Ok(categories)
}

/// Consumption per (material, unit), largest quantity first
///
/// The same material measured in different units stays in separate groups.
pub fn material_breakdown(materials: &[MaterialRow]) -> Result<Vec<MaterialBreakdown>> {
    let mut groups: Groups<(&str, &str), MaterialBreakdown> = Groups::new();

    for material in materials {
        let total_qty = material.total_qty.to_f64("item_materials.total_qty")?;
        let unit_cost = material.unit_cost.to_f64("item_materials.unit_cost")?;

        let entry = groups.entry(
            (material.material_name.as_str(), material.unit.as_str()),
            || MaterialBreakdown {
                material_name: material.material_name.clone(),
                unit: material.unit.clone(),
                total_qty: 0.0,
                usage_count: 0,
                total_cost: 0.0,
            },
        );
        entry.total_qty += total_qty;
        entry.usage_count += 1;
        entry.total_cost += total_qty * unit_cost;
    }

    let mut breakdown = groups.into_vec();
    breakdown.sort_by(|a, b| descending(a.total_qty, b.total_qty));
    breakdown.truncate(TOP_MATERIALS_LIMIT);
    Ok(breakdown)
}

/// Revenue per client, highest first
pub fn top_clients(invoices: &[InvoiceRow]) -> Result<Vec<TopClient>> {
    let mut groups: Groups<&str, TopClient> = Groups::new();

    for invoice in invoices {
        let total = invoice.total.to_f64("invoices.total")?;
        let name = non_blank(invoice.client_name.as_deref()).unwrap_or(UNKNOWN_CLIENT_LABEL);

        let entry = groups.entry(name, || TopClient {
            client_name: name.to_string(),
            invoice_count: 0,
            total_revenue: 0.0,
        });
        entry.invoice_count += 1;
        entry.total_revenue += total;
    }

    let mut clients = groups.into_vec();
    clients.sort_by(|a, b| descending(a.total_revenue, b.total_revenue));
    clients.truncate(TOP_CLIENTS_LIMIT);
    Ok(clients)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::WireNumber;

    fn invoice(id: i64, date: &str, total: impl Into<WireNumber>, status: &str) -> InvoiceRow {
        InvoiceRow {
            id,
            invoice_date: date.to_string(),
            total: total.into(),
            status: status.to_string(),
            client_name: None,
        }
    }

    fn client_invoice(id: i64, client: Option<&str>, total: f64) -> InvoiceRow {
        InvoiceRow {
            client_name: client.map(String::from),
            ..invoice(id, "2024-01-01", total, "paid")
        }
    }

    fn item(category: Option<&str>, qty: impl Into<WireNumber>, unit_price: f64) -> ItemRow {
        ItemRow {
            invoice_id: 1,
            category: category.map(String::from),
            qty: qty.into(),
            unit_price: unit_price.into(),
        }
    }

    fn material(name: &str, unit: &str, total_qty: f64, unit_cost: f64) -> MaterialRow {
        MaterialRow {
            material_name: name.to_string(),
            unit: unit.to_string(),
            total_qty: total_qty.into(),
            unit_cost: unit_cost.into(),
        }
    }

    #[test]
    fn test_same_day_invoices_collapse_into_one_point() {
        let invoices = vec![
            invoice(1, "2024-01-01", 100.0, "paid"),
            invoice(2, "2024-01-01", 50.0, "draft"),
        ];

        let series = time_series(&invoices).unwrap();
        assert_eq!(
            series,
            vec![TimeSeriesPoint {
                period: "2024-01-01".to_string(),
                invoice_count: 2,
                revenue: 150.0,
            }]
        );
    }

    #[test]
    fn test_time_series_keeps_date_order() {
        let invoices = vec![
            invoice(1, "2024-01-01", 10.0, "paid"),
            invoice(2, "2024-01-02", 20.0, "paid"),
            invoice(3, "2024-01-02", 5.0, "sent"),
            invoice(4, "2024-01-05", 1.0, "draft"),
        ];

        let periods: Vec<_> = time_series(&invoices)
            .unwrap()
            .into_iter()
            .map(|p| p.period)
            .collect();
        assert_eq!(periods, vec!["2024-01-01", "2024-01-02", "2024-01-05"]);
    }

    #[test]
    fn test_summary_counts_and_average() {
        let invoices = vec![
            invoice(1, "2024-01-01", 100.0, "paid"),
            invoice(2, "2024-01-02", 50.0, "draft"),
            invoice(3, "2024-01-03", "30", "sent"),
            invoice(4, "2024-01-03", 20.0, "Paid"),
        ];
        let items = vec![item(Some("Doors"), 2.0, 10.0), item(None, "3", 5.0)];

        let summary = summarize(&invoices, &items).unwrap();
        assert_eq!(summary.total_invoices, 4);
        assert_eq!(summary.total_revenue, 200.0);
        assert_eq!(summary.avg_invoice_value, 50.0);
        assert_eq!(summary.total_items_sold, 5.0);
        assert_eq!(summary.paid_count, 2);
        assert_eq!(summary.draft_count, 1);
        assert_eq!(summary.sent_count, 1);
    }

    #[test]
    fn test_summary_of_nothing_is_zero() {
        let summary = summarize(&[], &[]).unwrap();
        assert_eq!(summary, AnalyticsSummary::default());
    }

    #[test]
    fn test_category_breakdown_sorted_with_fallback_label() {
        let items = vec![
            item(Some("Kitchens"), 1.0, 500.0),
            item(None, 4.0, 10.0),
            item(Some("Doors"), 2.0, 300.0),
            item(Some("  "), 1.0, 5.0),
            item(Some("Kitchens"), 1.0, 250.0),
        ];

        let categories = category_breakdown(&items).unwrap();
        assert_eq!(categories.len(), 3);
        assert_eq!(categories[0].category, "Kitchens");
        assert_eq!(categories[0].item_count, 2.0);
        assert_eq!(categories[0].revenue, 750.0);
        assert_eq!(categories[1].category, "Doors");
        assert_eq!(categories[2].category, UNCATEGORIZED_LABEL);
        assert_eq!(categories[2].item_count, 5.0);
        assert_eq!(categories[2].revenue, 45.0);
    }

    #[test]
    fn test_category_revenue_partitions_total() {
        let items = vec![
            item(Some("A"), 3.0, 12.5),
            item(Some("B"), 1.5, 40.0),
            item(None, 2.0, 7.25),
            item(Some("A"), 1.0, 0.5),
        ];

        let ungrouped: f64 = items
            .iter()
            .map(|i| i.qty.to_f64("qty").unwrap() * i.unit_price.to_f64("price").unwrap())
            .sum();
        let grouped: f64 = category_breakdown(&items)
            .unwrap()
            .iter()
            .map(|c| c.revenue)
            .sum();
        assert!((grouped - ungrouped).abs() < 1e-9);
    }

    #[test]
    fn test_equal_revenue_keeps_first_seen_order() {
        let items = vec![
            item(Some("Second"), 1.0, 10.0),
            item(Some("First"), 1.0, 10.0),
        ];
        let categories = category_breakdown(&items).unwrap();
        assert_eq!(categories[0].category, "Second");
        assert_eq!(categories[1].category, "First");
    }

    #[test]
    fn test_material_units_are_separate_groups() {
        let materials = vec![
            material("Oak", "m2", 4.0, 100.0),
            material("Oak", "m3", 1.0, 900.0),
            material("Oak", "m2", 2.0, 100.0),
        ];

        let breakdown = material_breakdown(&materials).unwrap();
        assert_eq!(breakdown.len(), 2);
        assert_eq!(breakdown[0].unit, "m2");
        assert_eq!(breakdown[0].total_qty, 6.0);
        assert_eq!(breakdown[0].usage_count, 2);
        assert_eq!(breakdown[0].total_cost, 600.0);
        assert_eq!(breakdown[1].unit, "m3");
        assert_eq!(breakdown[1].usage_count, 1);
    }

    #[test]
    fn test_material_breakdown_limited_and_non_increasing() {
        let materials: Vec<_> = (0..15)
            .map(|i| material(&format!("M{}", i), "pcs", i as f64, 1.0))
            .collect();

        let breakdown = material_breakdown(&materials).unwrap();
        assert_eq!(breakdown.len(), TOP_MATERIALS_LIMIT);
        assert_eq!(breakdown[0].material_name, "M14");
        assert!(breakdown
            .windows(2)
            .all(|pair| pair[0].total_qty >= pair[1].total_qty));
    }

    #[test]
    fn test_top_clients_limited_with_unknown_label() {
        let mut invoices = vec![
            client_invoice(1, Some("Nile Builders"), 900.0),
            client_invoice(2, None, 500.0),
            client_invoice(3, Some("Nile Builders"), 100.0),
        ];
        for i in 0..6 {
            let name = format!("Client {}", i);
            invoices.push(client_invoice(10 + i, Some(name.as_str()), 10.0 * i as f64));
        }

        let clients = top_clients(&invoices).unwrap();
        assert_eq!(clients.len(), TOP_CLIENTS_LIMIT);
        assert_eq!(clients[0].client_name, "Nile Builders");
        assert_eq!(clients[0].invoice_count, 2);
        assert_eq!(clients[0].total_revenue, 1000.0);
        assert_eq!(clients[1].client_name, UNKNOWN_CLIENT_LABEL);
        assert!(clients
            .windows(2)
            .all(|pair| pair[0].total_revenue >= pair[1].total_revenue));
    }

    #[test]
    fn test_bad_number_fails_only_that_breakdown() {
        let invoices = vec![invoice(1, "2024-01-01", "n/a", "paid")];
        let items = vec![item(Some("Doors"), 1.0, 10.0)];

        assert!(time_series(&invoices).is_err());
        assert!(top_clients(&invoices).is_err());
        assert!(summarize(&invoices, &items).is_err());
        assert_eq!(category_breakdown(&items).unwrap().len(), 1);
    }

    #[test]
    fn test_nan_sort_keys_do_not_panic() {
        let materials = vec![
            material("A", "pcs", 1.0, 1.0),
            material("B", "pcs", 3.0, 1.0),
        ];
        let mut breakdown = material_breakdown(&materials).unwrap();
        breakdown[0].total_qty = f64::NAN;
        breakdown.sort_by(|a, b| descending(a.total_qty, b.total_qty));
        assert_eq!(breakdown.len(), 2);
    }
}
